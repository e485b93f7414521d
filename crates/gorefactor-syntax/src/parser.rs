// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Recursive-descent parser for Go source files.
//!
//! The grammar follows the Go reference closely enough for refactoring:
//! declarations, statements (except `select`), expressions and type
//! expressions. Generic type parameters are not supported.
//!
//! As in the Go parser, composite literals whose type is a bare type name
//! are not recognized inside `if`, `for` and `switch` headers unless they
//! are parenthesized; `expr_lev` tracks that context.

use gorefactor_core::Span;

use crate::ast::{Ast, BranchKind, ChanDir, DeclKeyword, FileId, LitKind, NodeId, NodeKind};
use crate::error::ParseError;
use crate::lexer::tokenize;
use crate::token::{Token, TokenKind};

type PResult<T> = Result<T, ParseError>;

/// Deepest nesting of expressions, types, statements and literal values
/// accepted before parsing gives up instead of exhausting the stack.
const MAX_NEST_DEPTH: u32 = 200;

/// Parse one file into `ast`.
///
/// On success the returned `File` node spans the whole source and every node
/// below it has its parent set. On failure nothing is left in the arena.
pub fn parse_file(ast: &mut Ast, file: FileId, source: &str) -> Result<NodeId, ParseError> {
    let tokens = tokenize(source)?;
    let mark = ast.len();
    let mut parser = Parser::new(ast, file, source, tokens);
    match parser.parse_file() {
        Ok(root) => {
            parser.ast.link_parents(root);
            Ok(root)
        }
        Err(err) => {
            parser.ast.truncate(mark);
            Err(err)
        }
    }
}

/// Parse a standalone expression, such as `a + b`.
pub fn parse_expr(ast: &mut Ast, file: FileId, source: &str) -> Result<NodeId, ParseError> {
    let tokens = tokenize(source)?;
    let mark = ast.len();
    let mut parser = Parser::new(ast, file, source, tokens);
    match parser.parse_standalone_expr() {
        Ok(root) => {
            parser.ast.link_parents(root);
            Ok(root)
        }
        Err(err) => {
            parser.ast.truncate(mark);
            Err(err)
        }
    }
}

/// Result of parsing a simple statement before its context decides what it
/// becomes.
enum Simple {
    /// A bare expression, not yet wrapped in an `ExprStmt`.
    Expr(NodeId),
    Stmt(NodeId),
    /// The header of a range loop.
    Range {
        key: Option<NodeId>,
        value: Option<NodeId>,
        define: bool,
        x: NodeId,
    },
}

/// One entry of a parameter list before grouping.
enum Param {
    /// An identifier that is either a name or a type.
    Bare(NodeId),
    Named(NodeId, NodeId),
    Type(NodeId),
}

struct Parser<'a> {
    ast: &'a mut Ast,
    file: FileId,
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    /// End of the last consumed token that appears in the source.
    prev_end: usize,
    /// < 0 in control clause headers, >= 0 inside expressions.
    expr_lev: i32,
    depth: u32,
}

impl<'a> Parser<'a> {
    fn new(ast: &'a mut Ast, file: FileId, source: &'a str, tokens: Vec<Token>) -> Self {
        Parser {
            ast,
            file,
            source,
            tokens,
            pos: 0,
            prev_end: 0,
            expr_lev: 0,
            depth: 0,
        }
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn tok(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn start(&self) -> usize {
        self.tokens[self.pos].span.start
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos];
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        if !token.is_implicit() {
            self.prev_end = token.span.end;
        }
        token
    }

    fn got(&mut self, kind: TokenKind) -> bool {
        if self.tok() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.tok() == kind {
            Ok(self.bump())
        } else if kind == TokenKind::Ident || kind.is_literal() {
            Err(self.error_expected(kind.as_str()))
        } else {
            Err(self.error_expected(&format!("'{}'", kind.as_str())))
        }
    }

    /// Accept a statement terminator; it may be omitted before a closing
    /// delimiter.
    fn expect_semi(&mut self) -> PResult<()> {
        match self.tok() {
            TokenKind::Semicolon => {
                self.bump();
                Ok(())
            }
            TokenKind::RParen | TokenKind::RBrace | TokenKind::Eof => Ok(()),
            _ => Err(self.error_expected("';'")),
        }
    }

    fn error_expected(&self, what: &str) -> ParseError {
        let token = self.tokens[self.pos];
        let found = if token.is_implicit() {
            "newline".to_string()
        } else if token.kind == TokenKind::Eof {
            "EOF".to_string()
        } else if token.kind == TokenKind::Ident || token.kind.is_literal() {
            format!("{} {}", token.kind, token.text(self.source))
        } else {
            format!("'{}'", token.text(self.source))
        };
        ParseError::new(
            format!("expected {}, found {}", what, found),
            token.span.start,
        )
    }

    /// Run one level of recursive parsing, failing past `MAX_NEST_DEPTH`.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NEST_DEPTH {
            return Err(ParseError::new("exceeded max nesting depth", self.start()));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Allocate a node spanning from `start` to the end of the last token.
    fn finish(&mut self, kind: NodeKind, start: usize) -> NodeId {
        let end = self.prev_end.max(start);
        self.ast.alloc(kind, Span::new(start, end), self.file)
    }

    // ========================================================================
    // Files and declarations
    // ========================================================================

    fn parse_file(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Package)?;
        let name = self.parse_ident()?;
        self.expect_semi()?;

        let mut decls = Vec::new();
        while self.tok() == TokenKind::Import {
            decls.push(self.parse_gen_decl(DeclKeyword::Import)?);
            self.expect_semi()?;
        }
        while self.tok() != TokenKind::Eof {
            decls.push(self.parse_decl()?);
            self.expect_semi()?;
        }

        Ok(self.ast.alloc(
            NodeKind::File { name, decls },
            Span::new(0, self.source.len()),
            self.file,
        ))
    }

    fn parse_standalone_expr(&mut self) -> PResult<NodeId> {
        let x = self.parse_expr()?;
        self.got(TokenKind::Semicolon);
        if self.tok() != TokenKind::Eof {
            return Err(self.error_expected("end of expression"));
        }
        Ok(x)
    }

    fn parse_decl(&mut self) -> PResult<NodeId> {
        match self.tok() {
            TokenKind::Func => self.parse_func_decl(),
            TokenKind::Const => self.parse_gen_decl(DeclKeyword::Const),
            TokenKind::Type => self.parse_gen_decl(DeclKeyword::Type),
            TokenKind::Var => self.parse_gen_decl(DeclKeyword::Var),
            TokenKind::Import => Err(ParseError::new(
                "imports must appear before other declarations",
                self.start(),
            )),
            _ => Err(self.error_expected("declaration")),
        }
    }

    fn parse_gen_decl(&mut self, keyword: DeclKeyword) -> PResult<NodeId> {
        let start = self.start();
        self.bump();
        let mut specs = Vec::new();
        if self.got(TokenKind::LParen) {
            while !matches!(self.tok(), TokenKind::RParen | TokenKind::Eof) {
                specs.push(self.parse_spec(keyword)?);
                if self.tok() != TokenKind::RParen {
                    self.expect(TokenKind::Semicolon)?;
                }
            }
            self.expect(TokenKind::RParen)?;
        } else {
            specs.push(self.parse_spec(keyword)?);
        }
        Ok(self.finish(NodeKind::GenDecl { keyword, specs }, start))
    }

    fn parse_spec(&mut self, keyword: DeclKeyword) -> PResult<NodeId> {
        let start = self.start();
        let kind = match keyword {
            DeclKeyword::Import => {
                let name = match self.tok() {
                    TokenKind::Ident => Some(self.parse_ident()?),
                    TokenKind::Period => {
                        let dot = self.bump();
                        Some(self.ast.alloc(
                            NodeKind::Ident { name: ".".into() },
                            dot.span,
                            self.file,
                        ))
                    }
                    _ => None,
                };
                if self.tok() != TokenKind::String {
                    return Err(self.error_expected("import path"));
                }
                let path = self.parse_basic_lit()?;
                NodeKind::ImportSpec { name, path }
            }
            DeclKeyword::Const | DeclKeyword::Var => {
                let names = self.parse_ident_list()?;
                let ty = if matches!(
                    self.tok(),
                    TokenKind::Assign | TokenKind::Semicolon | TokenKind::RParen
                ) {
                    None
                } else {
                    Some(self.parse_type()?)
                };
                let values = if self.got(TokenKind::Assign) {
                    self.parse_expr_list()?
                } else {
                    Vec::new()
                };
                NodeKind::ValueSpec { names, ty, values }
            }
            DeclKeyword::Type => {
                let name = self.parse_ident()?;
                let assign = self.got(TokenKind::Assign);
                let ty = self.parse_type()?;
                NodeKind::TypeSpec { name, assign, ty }
            }
        };
        Ok(self.finish(kind, start))
    }

    fn parse_func_decl(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(TokenKind::Func)?;
        let recv = if self.tok() == TokenKind::LParen {
            Some(self.parse_parameters()?)
        } else {
            None
        };
        let name = self.parse_ident()?;
        let sig_start = self.start();
        let ty = self.parse_signature(sig_start)?;
        let body = if self.tok() == TokenKind::LBrace {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(self.finish(
            NodeKind::FuncDecl {
                recv,
                name,
                ty,
                body,
            },
            start,
        ))
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn parse_signature(&mut self, start: usize) -> PResult<NodeId> {
        let params = self.parse_parameters()?;
        let results = if self.tok() == TokenKind::LParen {
            Some(self.parse_parameters()?)
        } else if starts_type(self.tok()) {
            let result_start = self.start();
            let ty = self.parse_type()?;
            let field = self.finish(
                NodeKind::Field {
                    names: Vec::new(),
                    ty,
                    tag: None,
                },
                result_start,
            );
            Some(self.finish(
                NodeKind::FieldList {
                    fields: vec![field],
                },
                result_start,
            ))
        } else {
            None
        };
        Ok(self.finish(NodeKind::FuncType { params, results }, start))
    }

    fn parse_parameters(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(TokenKind::LParen)?;

        let mut params = Vec::new();
        while !matches!(self.tok(), TokenKind::RParen | TokenKind::Eof) {
            if self.tok() == TokenKind::Ident {
                let ident = self.parse_ident()?;
                match self.tok() {
                    TokenKind::Comma | TokenKind::RParen => params.push(Param::Bare(ident)),
                    TokenKind::Period => {
                        let qualified = self.parse_qualified(ident)?;
                        params.push(Param::Type(qualified));
                    }
                    _ => {
                        let ty = self.parse_param_type()?;
                        params.push(Param::Named(ident, ty));
                    }
                }
            } else {
                params.push(Param::Type(self.parse_param_type()?));
            }
            if !self.got(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        // `a, b int` groups several names under one type; a list without any
        // name/type pair is a list of types.
        let named = params.iter().any(|p| matches!(p, Param::Named(..)));
        let mut fields = Vec::new();
        let mut pending = Vec::new();
        for param in params {
            match param {
                Param::Bare(ident) if named => pending.push(ident),
                Param::Bare(ty) | Param::Type(ty) => {
                    if named {
                        return Err(ParseError::new(
                            "mixed named and unnamed parameters",
                            self.ast.span(ty).start,
                        ));
                    }
                    let span = self.ast.span(ty);
                    fields.push(self.ast.alloc(
                        NodeKind::Field {
                            names: Vec::new(),
                            ty,
                            tag: None,
                        },
                        span,
                        self.file,
                    ));
                }
                Param::Named(ident, ty) => {
                    pending.push(ident);
                    let names = std::mem::take(&mut pending);
                    let span = Span::new(self.ast.span(names[0]).start, self.ast.span(ty).end);
                    fields.push(self.ast.alloc(
                        NodeKind::Field {
                            names,
                            ty,
                            tag: None,
                        },
                        span,
                        self.file,
                    ));
                }
            }
        }
        if let Some(&dangling) = pending.first() {
            return Err(ParseError::new(
                "mixed named and unnamed parameters",
                self.ast.span(dangling).start,
            ));
        }

        Ok(self.finish(NodeKind::FieldList { fields }, start))
    }

    fn parse_param_type(&mut self) -> PResult<NodeId> {
        if self.tok() == TokenKind::Ellipsis {
            let start = self.start();
            self.bump();
            let elt = self.parse_type()?;
            return Ok(self.finish(NodeKind::Ellipsis { elt: Some(elt) }, start));
        }
        self.parse_type()
    }

    fn parse_type(&mut self) -> PResult<NodeId> {
        self.nested(Self::type_expr)
    }

    fn type_expr(&mut self) -> PResult<NodeId> {
        let start = self.start();
        match self.tok() {
            TokenKind::Ident => {
                let ident = self.parse_ident()?;
                if self.tok() == TokenKind::Period {
                    self.parse_qualified(ident)
                } else {
                    Ok(ident)
                }
            }
            TokenKind::LBrack => {
                self.bump();
                let len = match self.tok() {
                    TokenKind::RBrack => None,
                    TokenKind::Ellipsis => {
                        let dots = self.bump();
                        Some(
                            self.ast
                                .alloc(NodeKind::Ellipsis { elt: None }, dots.span, self.file),
                        )
                    }
                    _ => {
                        self.expr_lev += 1;
                        let len = self.parse_expr()?;
                        self.expr_lev -= 1;
                        Some(len)
                    }
                };
                self.expect(TokenKind::RBrack)?;
                let elt = self.parse_type()?;
                Ok(self.finish(NodeKind::ArrayType { len, elt }, start))
            }
            TokenKind::Struct => self.parse_struct_type(),
            TokenKind::Interface => self.parse_interface_type(),
            TokenKind::Mul => {
                self.bump();
                let x = self.parse_type()?;
                Ok(self.finish(NodeKind::StarExpr { x }, start))
            }
            TokenKind::Func => {
                self.bump();
                self.parse_signature(start)
            }
            TokenKind::Map => {
                self.bump();
                self.expect(TokenKind::LBrack)?;
                let key = self.parse_type()?;
                self.expect(TokenKind::RBrack)?;
                let value = self.parse_type()?;
                Ok(self.finish(NodeKind::MapType { key, value }, start))
            }
            TokenKind::Chan | TokenKind::Arrow => self.parse_chan_type(),
            TokenKind::LParen => {
                self.bump();
                let x = self.parse_type()?;
                self.expect(TokenKind::RParen)?;
                Ok(self.finish(NodeKind::ParenExpr { x }, start))
            }
            _ => Err(self.error_expected("type")),
        }
    }

    /// `pkg.Name` after `pkg` has been parsed.
    fn parse_qualified(&mut self, x: NodeId) -> PResult<NodeId> {
        let start = self.ast.span(x).start;
        self.expect(TokenKind::Period)?;
        let sel = self.parse_ident()?;
        Ok(self.finish(NodeKind::SelectorExpr { x, sel }, start))
    }

    fn parse_chan_type(&mut self) -> PResult<NodeId> {
        let start = self.start();
        let dir = if self.got(TokenKind::Arrow) {
            self.expect(TokenKind::Chan)?;
            ChanDir::Recv
        } else {
            self.expect(TokenKind::Chan)?;
            if self.got(TokenKind::Arrow) {
                ChanDir::Send
            } else {
                ChanDir::Both
            }
        };
        let value = self.parse_type()?;
        Ok(self.finish(NodeKind::ChanType { dir, value }, start))
    }

    fn parse_struct_type(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(TokenKind::Struct)?;
        let list_start = self.start();
        self.expect(TokenKind::LBrace)?;

        let mut fields = Vec::new();
        while !matches!(self.tok(), TokenKind::RBrace | TokenKind::Eof) {
            let field_start = self.start();
            let (names, ty) = if self.tok() == TokenKind::Mul {
                (Vec::new(), self.parse_type()?)
            } else {
                let ident = self.parse_ident()?;
                match self.tok() {
                    TokenKind::Period => (Vec::new(), self.parse_qualified(ident)?),
                    TokenKind::Semicolon | TokenKind::RBrace | TokenKind::String => {
                        (Vec::new(), ident)
                    }
                    _ => {
                        let mut names = vec![ident];
                        while self.got(TokenKind::Comma) {
                            names.push(self.parse_ident()?);
                        }
                        (names, self.parse_type()?)
                    }
                }
            };
            let tag = if self.tok() == TokenKind::String {
                Some(self.parse_basic_lit()?)
            } else {
                None
            };
            fields.push(self.finish(NodeKind::Field { names, ty, tag }, field_start));
            if self.tok() != TokenKind::RBrace {
                self.expect(TokenKind::Semicolon)?;
            }
        }
        self.expect(TokenKind::RBrace)?;

        let fields = self.finish(NodeKind::FieldList { fields }, list_start);
        Ok(self.finish(NodeKind::StructType { fields }, start))
    }

    fn parse_interface_type(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(TokenKind::Interface)?;
        let list_start = self.start();
        self.expect(TokenKind::LBrace)?;

        let mut methods = Vec::new();
        while !matches!(self.tok(), TokenKind::RBrace | TokenKind::Eof) {
            let elem_start = self.start();
            let (names, ty) = if self.tok() == TokenKind::Ident {
                let ident = self.parse_ident()?;
                match self.tok() {
                    TokenKind::LParen => {
                        let sig_start = self.start();
                        (vec![ident], self.parse_signature(sig_start)?)
                    }
                    TokenKind::Period => (Vec::new(), self.parse_qualified(ident)?),
                    _ => (Vec::new(), ident),
                }
            } else {
                (Vec::new(), self.parse_type()?)
            };
            methods.push(self.finish(
                NodeKind::Field {
                    names,
                    ty,
                    tag: None,
                },
                elem_start,
            ));
            if self.tok() != TokenKind::RBrace {
                self.expect(TokenKind::Semicolon)?;
            }
        }
        self.expect(TokenKind::RBrace)?;

        let methods = self.finish(NodeKind::FieldList { fields: methods }, list_start);
        Ok(self.finish(NodeKind::InterfaceType { methods }, start))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_block(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(TokenKind::LBrace)?;
        let stmts = self.parse_stmt_list()?;
        self.expect(TokenKind::RBrace)?;
        Ok(self.finish(NodeKind::BlockStmt { stmts }, start))
    }

    fn parse_stmt_list(&mut self) -> PResult<Vec<NodeId>> {
        let mut list = Vec::new();
        while !matches!(
            self.tok(),
            TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
        ) {
            list.push(self.parse_stmt()?);
            if !matches!(
                self.tok(),
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace
            ) {
                self.expect(TokenKind::Semicolon)?;
            }
        }
        Ok(list)
    }

    fn parse_stmt(&mut self) -> PResult<NodeId> {
        self.nested(Self::stmt)
    }

    fn stmt(&mut self) -> PResult<NodeId> {
        let start = self.start();
        match self.tok() {
            TokenKind::Const | TokenKind::Type | TokenKind::Var => {
                let keyword = match self.tok() {
                    TokenKind::Const => DeclKeyword::Const,
                    TokenKind::Type => DeclKeyword::Type,
                    _ => DeclKeyword::Var,
                };
                let decl = self.parse_gen_decl(keyword)?;
                Ok(self.finish(NodeKind::DeclStmt { decl }, start))
            }
            TokenKind::Ident
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Imag
            | TokenKind::Char
            | TokenKind::String
            | TokenKind::Func
            | TokenKind::LParen
            | TokenKind::LBrack
            | TokenKind::Struct
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::Interface
            | TokenKind::Add
            | TokenKind::Sub
            | TokenKind::Mul
            | TokenKind::And
            | TokenKind::Xor
            | TokenKind::Arrow
            | TokenKind::Not => {
                let simple = self.parse_simple_stmt(true, false)?;
                self.wrap_stmt(simple)
            }
            TokenKind::Go | TokenKind::Defer => {
                let keyword = self.bump().kind;
                let call = self.parse_expr()?;
                let kind = if keyword == TokenKind::Go {
                    NodeKind::GoStmt { call }
                } else {
                    NodeKind::DeferStmt { call }
                };
                Ok(self.finish(kind, start))
            }
            TokenKind::Return => {
                self.bump();
                let results = if matches!(self.tok(), TokenKind::Semicolon | TokenKind::RBrace) {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                Ok(self.finish(NodeKind::ReturnStmt { results }, start))
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Goto | TokenKind::Fallthrough => {
                let kind = match self.bump().kind {
                    TokenKind::Break => BranchKind::Break,
                    TokenKind::Continue => BranchKind::Continue,
                    TokenKind::Goto => BranchKind::Goto,
                    _ => BranchKind::Fallthrough,
                };
                let label = if kind != BranchKind::Fallthrough && self.tok() == TokenKind::Ident {
                    Some(self.parse_ident()?)
                } else {
                    None
                };
                Ok(self.finish(NodeKind::BranchStmt { kind, label }, start))
            }
            TokenKind::LBrace => self.parse_block(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Semicolon | TokenKind::RBrace => Ok(self.finish(NodeKind::EmptyStmt, start)),
            TokenKind::Select => Err(ParseError::new(
                "select statements are not supported",
                start,
            )),
            _ => Err(self.error_expected("statement")),
        }
    }

    fn parse_simple_stmt(&mut self, label_ok: bool, range_ok: bool) -> PResult<Simple> {
        let start = self.start();
        if range_ok && self.got(TokenKind::Range) {
            let x = self.parse_expr()?;
            return Ok(Simple::Range {
                key: None,
                value: None,
                define: false,
                x,
            });
        }

        let lhs = self.parse_expr_list()?;
        match self.tok() {
            TokenKind::Define
            | TokenKind::Assign
            | TokenKind::AddAssign
            | TokenKind::SubAssign
            | TokenKind::MulAssign
            | TokenKind::QuoAssign
            | TokenKind::RemAssign
            | TokenKind::AndAssign
            | TokenKind::OrAssign
            | TokenKind::XorAssign
            | TokenKind::ShlAssign
            | TokenKind::ShrAssign
            | TokenKind::AndNotAssign => {
                let op = self.bump().kind;
                if range_ok
                    && self.tok() == TokenKind::Range
                    && matches!(op, TokenKind::Define | TokenKind::Assign)
                {
                    self.bump();
                    if lhs.len() > 2 {
                        return Err(ParseError::new(
                            "range clause permits at most two iteration variables",
                            start,
                        ));
                    }
                    let x = self.parse_expr()?;
                    return Ok(Simple::Range {
                        key: lhs.first().copied(),
                        value: lhs.get(1).copied(),
                        define: op == TokenKind::Define,
                        x,
                    });
                }
                let rhs = self.parse_expr_list()?;
                Ok(Simple::Stmt(
                    self.finish(NodeKind::AssignStmt { lhs, op, rhs }, start),
                ))
            }
            _ if lhs.len() > 1 => Err(self.error_expected("':=', '=' or ','")),
            TokenKind::Colon
                if label_ok && matches!(self.ast.kind(lhs[0]), NodeKind::Ident { .. }) =>
            {
                self.bump();
                // A label may directly precede the closing brace of a block.
                let stmt = if self.tok() == TokenKind::RBrace {
                    let at = self.start();
                    self.ast
                        .alloc(NodeKind::EmptyStmt, Span::new(at, at), self.file)
                } else {
                    self.parse_stmt()?
                };
                Ok(Simple::Stmt(self.finish(
                    NodeKind::LabeledStmt {
                        label: lhs[0],
                        stmt,
                    },
                    start,
                )))
            }
            TokenKind::Arrow => {
                self.bump();
                let value = self.parse_expr()?;
                Ok(Simple::Stmt(self.finish(
                    NodeKind::SendStmt {
                        chan: lhs[0],
                        value,
                    },
                    start,
                )))
            }
            TokenKind::Inc | TokenKind::Dec => {
                let op = self.bump().kind;
                Ok(Simple::Stmt(
                    self.finish(NodeKind::IncDecStmt { x: lhs[0], op }, start),
                ))
            }
            _ => Ok(Simple::Expr(lhs[0])),
        }
    }

    fn wrap_stmt(&mut self, simple: Simple) -> PResult<NodeId> {
        match simple {
            Simple::Expr(x) => {
                let span = self.ast.span(x);
                Ok(self.ast.alloc(NodeKind::ExprStmt { x }, span, self.file))
            }
            Simple::Stmt(stmt) => Ok(stmt),
            Simple::Range { x, .. } => Err(ParseError::new(
                "unexpected range clause",
                self.ast.span(x).start,
            )),
        }
    }

    fn expect_expr(&self, simple: Simple, what: &str) -> PResult<NodeId> {
        match simple {
            Simple::Expr(x) => Ok(x),
            Simple::Stmt(stmt) => Err(ParseError::new(
                format!("cannot use statement as {}", what),
                self.ast.span(stmt).start,
            )),
            Simple::Range { x, .. } => Err(ParseError::new(
                format!("cannot use range clause as {}", what),
                self.ast.span(x).start,
            )),
        }
    }

    fn parse_if_stmt(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(TokenKind::If)?;
        if self.tok() == TokenKind::LBrace {
            return Err(ParseError::new(
                "missing condition in if statement",
                self.start(),
            ));
        }

        let outer = self.expr_lev;
        self.expr_lev = -1;
        let mut init = None;
        let mut cond = None;
        if self.tok() != TokenKind::Semicolon {
            cond = Some(self.parse_simple_stmt(false, false)?);
        }
        if self.got(TokenKind::Semicolon) {
            init = cond.take();
            if self.tok() != TokenKind::LBrace {
                cond = Some(self.parse_simple_stmt(false, false)?);
            }
        }
        self.expr_lev = outer;

        let init = match init {
            Some(s) => Some(self.wrap_stmt(s)?),
            None => None,
        };
        let Some(cond) = cond else {
            return Err(ParseError::new(
                "missing condition in if statement",
                self.start(),
            ));
        };
        let cond = self.expect_expr(cond, "if condition")?;

        let body = self.parse_block()?;
        let els = if self.got(TokenKind::Else) {
            match self.tok() {
                TokenKind::If => Some(self.nested(Self::parse_if_stmt)?),
                TokenKind::LBrace => Some(self.parse_block()?),
                _ => return Err(self.error_expected("if statement or block")),
            }
        } else {
            None
        };

        Ok(self.finish(
            NodeKind::IfStmt {
                init,
                cond,
                body,
                els,
            },
            start,
        ))
    }

    fn parse_switch_stmt(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(TokenKind::Switch)?;

        let outer = self.expr_lev;
        self.expr_lev = -1;
        let mut init = None;
        let mut tag = None;
        if self.tok() != TokenKind::LBrace {
            if self.tok() != TokenKind::Semicolon {
                tag = Some(self.parse_simple_stmt(false, false)?);
            }
            if self.got(TokenKind::Semicolon) {
                init = tag.take();
                if self.tok() != TokenKind::LBrace {
                    tag = Some(self.parse_simple_stmt(false, false)?);
                }
            }
        }
        self.expr_lev = outer;

        let body_start = self.start();
        self.expect(TokenKind::LBrace)?;
        let mut clauses = Vec::new();
        while matches!(self.tok(), TokenKind::Case | TokenKind::Default) {
            clauses.push(self.parse_case_clause()?);
        }
        self.expect(TokenKind::RBrace)?;
        let body = self.finish(NodeKind::BlockStmt { stmts: clauses }, body_start);

        let init = match init {
            Some(s) => Some(self.wrap_stmt(s)?),
            None => None,
        };
        let kind = match tag {
            Some(s) if self.is_type_switch_guard(&s) => {
                let assign = self.wrap_stmt(s)?;
                NodeKind::TypeSwitchStmt { init, assign, body }
            }
            Some(s) => {
                let tag = self.expect_expr(s, "switch expression")?;
                NodeKind::SwitchStmt {
                    init,
                    tag: Some(tag),
                    body,
                }
            }
            None => NodeKind::SwitchStmt {
                init,
                tag: None,
                body,
            },
        };
        Ok(self.finish(kind, start))
    }

    fn is_type_switch_guard(&self, simple: &Simple) -> bool {
        let is_guard = |x: NodeId| matches!(self.ast.kind(x), NodeKind::TypeAssertExpr { ty: None, .. });
        match simple {
            Simple::Expr(x) => is_guard(*x),
            Simple::Stmt(stmt) => match self.ast.kind(*stmt) {
                NodeKind::AssignStmt {
                    lhs,
                    op: TokenKind::Define,
                    rhs,
                } => lhs.len() == 1 && rhs.len() == 1 && is_guard(rhs[0]),
                _ => false,
            },
            Simple::Range { .. } => false,
        }
    }

    fn parse_case_clause(&mut self) -> PResult<NodeId> {
        let start = self.start();
        let list = if self.got(TokenKind::Case) {
            self.parse_expr_list()?
        } else {
            self.expect(TokenKind::Default)?;
            Vec::new()
        };
        self.expect(TokenKind::Colon)?;
        let body = self.parse_stmt_list()?;
        Ok(self.finish(NodeKind::CaseClause { list, body }, start))
    }

    fn parse_for_stmt(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(TokenKind::For)?;

        let outer = self.expr_lev;
        self.expr_lev = -1;
        let mut init = None;
        let mut cond = None;
        let mut post = None;
        let mut range = None;
        if self.tok() != TokenKind::LBrace {
            if self.tok() != TokenKind::Semicolon {
                match self.parse_simple_stmt(false, true)? {
                    header @ Simple::Range { .. } => range = Some(header),
                    other => cond = Some(other),
                }
            }
            if range.is_none() && self.got(TokenKind::Semicolon) {
                init = cond.take();
                if self.tok() != TokenKind::Semicolon {
                    cond = Some(self.parse_simple_stmt(false, false)?);
                }
                self.expect(TokenKind::Semicolon)?;
                if self.tok() != TokenKind::LBrace {
                    post = Some(self.parse_simple_stmt(false, false)?);
                }
            }
        }
        self.expr_lev = outer;

        let body = self.parse_block()?;
        let kind = if let Some(Simple::Range {
            key,
            value,
            define,
            x,
        }) = range
        {
            NodeKind::RangeStmt {
                key,
                value,
                define,
                x,
                body,
            }
        } else {
            let init = match init {
                Some(s) => Some(self.wrap_stmt(s)?),
                None => None,
            };
            let cond = match cond {
                Some(s) => Some(self.expect_expr(s, "for loop condition")?),
                None => None,
            };
            let post = match post {
                Some(s) => Some(self.wrap_stmt(s)?),
                None => None,
            };
            NodeKind::ForStmt {
                init,
                cond,
                post,
                body,
            }
        };
        Ok(self.finish(kind, start))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_ident(&mut self) -> PResult<NodeId> {
        let token = self.expect(TokenKind::Ident)?;
        let name = token.text(self.source).to_string();
        Ok(self
            .ast
            .alloc(NodeKind::Ident { name }, token.span, self.file))
    }

    fn parse_ident_list(&mut self) -> PResult<Vec<NodeId>> {
        let mut list = vec![self.parse_ident()?];
        while self.got(TokenKind::Comma) {
            list.push(self.parse_ident()?);
        }
        Ok(list)
    }

    fn parse_basic_lit(&mut self) -> PResult<NodeId> {
        let kind = match self.tok() {
            TokenKind::Int => LitKind::Int,
            TokenKind::Float => LitKind::Float,
            TokenKind::Imag => LitKind::Imag,
            TokenKind::Char => LitKind::Char,
            TokenKind::String => LitKind::String,
            _ => return Err(self.error_expected("literal")),
        };
        let token = self.bump();
        let value = token.text(self.source).to_string();
        Ok(self
            .ast
            .alloc(NodeKind::BasicLit { kind, value }, token.span, self.file))
    }

    fn parse_expr_list(&mut self) -> PResult<Vec<NodeId>> {
        let mut list = vec![self.parse_expr()?];
        while self.got(TokenKind::Comma) {
            list.push(self.parse_expr()?);
        }
        Ok(list)
    }

    fn parse_expr(&mut self) -> PResult<NodeId> {
        self.parse_binary_expr(1)
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> PResult<NodeId> {
        let mut x = self.parse_unary_expr()?;
        loop {
            let op = self.tok();
            let prec = op.precedence();
            if prec < min_prec {
                return Ok(x);
            }
            self.bump();
            let y = self.parse_binary_expr(prec + 1)?;
            let start = self.ast.span(x).start;
            x = self.finish(NodeKind::BinaryExpr { x, op, y }, start);
        }
    }

    fn parse_unary_expr(&mut self) -> PResult<NodeId> {
        self.nested(Self::unary_expr)
    }

    fn unary_expr(&mut self) -> PResult<NodeId> {
        let start = self.start();
        match self.tok() {
            TokenKind::Add
            | TokenKind::Sub
            | TokenKind::Not
            | TokenKind::Xor
            | TokenKind::And
            | TokenKind::Tilde => {
                let op = self.bump().kind;
                let x = self.parse_unary_expr()?;
                Ok(self.finish(NodeKind::UnaryExpr { op, x }, start))
            }
            TokenKind::Arrow => {
                self.bump();
                if self.got(TokenKind::Chan) {
                    let value = self.parse_type()?;
                    return Ok(self.finish(
                        NodeKind::ChanType {
                            dir: ChanDir::Recv,
                            value,
                        },
                        start,
                    ));
                }
                let x = self.parse_unary_expr()?;
                Ok(self.finish(
                    NodeKind::UnaryExpr {
                        op: TokenKind::Arrow,
                        x,
                    },
                    start,
                ))
            }
            TokenKind::Mul => {
                self.bump();
                let x = self.parse_unary_expr()?;
                Ok(self.finish(NodeKind::StarExpr { x }, start))
            }
            _ => self.parse_primary_expr(),
        }
    }

    fn parse_primary_expr(&mut self) -> PResult<NodeId> {
        let start = self.start();
        let mut x = self.parse_operand()?;
        loop {
            match self.tok() {
                TokenKind::Period => {
                    self.bump();
                    match self.tok() {
                        TokenKind::Ident => {
                            let sel = self.parse_ident()?;
                            x = self.finish(NodeKind::SelectorExpr { x, sel }, start);
                        }
                        TokenKind::LParen => {
                            self.bump();
                            let ty = if self.got(TokenKind::Type) {
                                None
                            } else {
                                Some(self.parse_type()?)
                            };
                            self.expect(TokenKind::RParen)?;
                            x = self.finish(NodeKind::TypeAssertExpr { x, ty }, start);
                        }
                        _ => return Err(self.error_expected("selector or type assertion")),
                    }
                }
                TokenKind::LBrack => {
                    self.bump();
                    self.expr_lev += 1;
                    let low = if self.tok() == TokenKind::Colon {
                        None
                    } else {
                        Some(self.parse_expr()?)
                    };
                    if self.got(TokenKind::Colon) {
                        let high = if matches!(self.tok(), TokenKind::Colon | TokenKind::RBrack) {
                            None
                        } else {
                            Some(self.parse_expr()?)
                        };
                        let max = if self.got(TokenKind::Colon) {
                            Some(self.parse_expr()?)
                        } else {
                            None
                        };
                        self.expr_lev -= 1;
                        self.expect(TokenKind::RBrack)?;
                        x = self.finish(NodeKind::SliceExpr { x, low, high, max }, start);
                    } else {
                        self.expr_lev -= 1;
                        let Some(index) = low else {
                            return Err(self.error_expected("operand"));
                        };
                        self.expect(TokenKind::RBrack)?;
                        x = self.finish(NodeKind::IndexExpr { x, index }, start);
                    }
                }
                TokenKind::LParen => {
                    self.bump();
                    self.expr_lev += 1;
                    let mut args = Vec::new();
                    let mut ellipsis = false;
                    while !matches!(self.tok(), TokenKind::RParen | TokenKind::Eof) {
                        args.push(self.parse_expr()?);
                        if self.got(TokenKind::Ellipsis) {
                            ellipsis = true;
                        }
                        if !self.got(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expr_lev -= 1;
                    self.expect(TokenKind::RParen)?;
                    x = self.finish(
                        NodeKind::CallExpr {
                            fun: x,
                            args,
                            ellipsis,
                        },
                        start,
                    );
                }
                TokenKind::LBrace
                    if self.is_literal_type(x) && (self.expr_lev >= 0 || !self.is_type_name(x)) =>
                {
                    x = self.parse_composite_lit(Some(x), start)?;
                }
                _ => return Ok(x),
            }
        }
    }

    fn parse_operand(&mut self) -> PResult<NodeId> {
        let start = self.start();
        match self.tok() {
            TokenKind::Ident => self.parse_ident(),
            TokenKind::Int
            | TokenKind::Float
            | TokenKind::Imag
            | TokenKind::Char
            | TokenKind::String => self.parse_basic_lit(),
            TokenKind::LParen => {
                self.bump();
                self.expr_lev += 1;
                let x = self.parse_expr()?;
                self.expr_lev -= 1;
                self.expect(TokenKind::RParen)?;
                Ok(self.finish(NodeKind::ParenExpr { x }, start))
            }
            TokenKind::Func => {
                self.bump();
                let ty = self.parse_signature(start)?;
                if self.tok() != TokenKind::LBrace {
                    return Ok(ty);
                }
                self.expr_lev += 1;
                let body = self.parse_block()?;
                self.expr_lev -= 1;
                Ok(self.finish(NodeKind::FuncLit { ty, body }, start))
            }
            TokenKind::LBrack
            | TokenKind::Struct
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::Interface => self.parse_type(),
            _ => Err(self.error_expected("operand")),
        }
    }

    fn parse_composite_lit(&mut self, ty: Option<NodeId>, start: usize) -> PResult<NodeId> {
        self.nested(|parser| parser.composite_lit(ty, start))
    }

    fn composite_lit(&mut self, ty: Option<NodeId>, start: usize) -> PResult<NodeId> {
        self.expect(TokenKind::LBrace)?;
        self.expr_lev += 1;
        let mut elts = Vec::new();
        while !matches!(self.tok(), TokenKind::RBrace | TokenKind::Eof) {
            elts.push(self.parse_element()?);
            if !self.got(TokenKind::Comma) {
                break;
            }
        }
        self.expr_lev -= 1;
        self.expect(TokenKind::RBrace)?;
        Ok(self.finish(NodeKind::CompositeLit { ty, elts }, start))
    }

    fn parse_element(&mut self) -> PResult<NodeId> {
        let start = self.start();
        let x = self.parse_value()?;
        if self.got(TokenKind::Colon) {
            let value = self.parse_value()?;
            return Ok(self.finish(NodeKind::KeyValueExpr { key: x, value }, start));
        }
        Ok(x)
    }

    fn parse_value(&mut self) -> PResult<NodeId> {
        if self.tok() == TokenKind::LBrace {
            let start = self.start();
            return self.parse_composite_lit(None, start);
        }
        self.parse_expr()
    }

    fn is_type_name(&self, x: NodeId) -> bool {
        match self.ast.kind(x) {
            NodeKind::Ident { .. } => true,
            NodeKind::SelectorExpr { x, .. } => {
                matches!(self.ast.kind(*x), NodeKind::Ident { .. })
            }
            _ => false,
        }
    }

    fn is_literal_type(&self, x: NodeId) -> bool {
        self.is_type_name(x)
            || matches!(
                self.ast.kind(x),
                NodeKind::ArrayType { .. } | NodeKind::MapType { .. } | NodeKind::StructType { .. }
            )
    }
}

fn starts_type(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident
            | TokenKind::LBrack
            | TokenKind::Struct
            | TokenKind::Mul
            | TokenKind::Func
            | TokenKind::Interface
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::Arrow
    )
}
