// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Arena-allocated syntax tree.
//!
//! All nodes of every file in a program live in one [`Ast`] and are referred
//! to by [`NodeId`]. Each node records its span, the file it came from and,
//! once [`Ast::link_parents`] has run, its parent. The node set is a closed
//! enum; [`NodeKind::children`] lists the direct children in source order,
//! which is all the generic traversals need.

use std::ops::Index;

use gorefactor_core::Span;

use crate::token::TokenKind;

// ============================================================================
// Identifiers
// ============================================================================

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a file in the program's file set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

impl FileId {
    pub fn new(index: usize) -> Self {
        FileId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// Node Kinds
// ============================================================================

/// Keyword of a general declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKeyword {
    Import,
    Const,
    Type,
    Var,
}

/// Keyword of a branch statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

/// Kind of a basic literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

/// Direction of a channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// Every syntactic construct the parser produces.
///
/// Child references are `NodeId`s into the same arena. Optional parts of the
/// grammar are `Option<NodeId>`; lists keep source order.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A source file. `decls` includes import declarations.
    File { name: NodeId, decls: Vec<NodeId> },

    // Declarations and specs
    FuncDecl {
        recv: Option<NodeId>,
        name: NodeId,
        ty: NodeId,
        body: Option<NodeId>,
    },
    GenDecl {
        keyword: DeclKeyword,
        specs: Vec<NodeId>,
    },
    ImportSpec { name: Option<NodeId>, path: NodeId },
    ValueSpec {
        names: Vec<NodeId>,
        ty: Option<NodeId>,
        values: Vec<NodeId>,
    },
    TypeSpec {
        name: NodeId,
        assign: bool,
        ty: NodeId,
    },

    // Fields and types
    FieldList { fields: Vec<NodeId> },
    /// A parameter, result, struct field or interface method. `names` is
    /// empty for anonymous parameters and embedded fields.
    Field {
        names: Vec<NodeId>,
        ty: NodeId,
        tag: Option<NodeId>,
    },
    FuncType {
        params: NodeId,
        results: Option<NodeId>,
    },
    StructType { fields: NodeId },
    InterfaceType { methods: NodeId },
    ArrayType { len: Option<NodeId>, elt: NodeId },
    MapType { key: NodeId, value: NodeId },
    ChanType { dir: ChanDir, value: NodeId },
    /// `...T` in a parameter list, or `...` as an array length.
    Ellipsis { elt: Option<NodeId> },

    // Statements
    DeclStmt { decl: NodeId },
    EmptyStmt,
    LabeledStmt { label: NodeId, stmt: NodeId },
    ExprStmt { x: NodeId },
    SendStmt { chan: NodeId, value: NodeId },
    IncDecStmt { x: NodeId, op: TokenKind },
    AssignStmt {
        lhs: Vec<NodeId>,
        op: TokenKind,
        rhs: Vec<NodeId>,
    },
    GoStmt { call: NodeId },
    DeferStmt { call: NodeId },
    ReturnStmt { results: Vec<NodeId> },
    BranchStmt {
        kind: BranchKind,
        label: Option<NodeId>,
    },
    BlockStmt { stmts: Vec<NodeId> },
    IfStmt {
        init: Option<NodeId>,
        cond: NodeId,
        body: NodeId,
        els: Option<NodeId>,
    },
    /// A `case` or `default` clause; `list` is empty for `default`.
    CaseClause { list: Vec<NodeId>, body: Vec<NodeId> },
    SwitchStmt {
        init: Option<NodeId>,
        tag: Option<NodeId>,
        body: NodeId,
    },
    /// `assign` is an `ExprStmt` or a `:=` `AssignStmt` around `x.(type)`.
    TypeSwitchStmt {
        init: Option<NodeId>,
        assign: NodeId,
        body: NodeId,
    },
    ForStmt {
        init: Option<NodeId>,
        cond: Option<NodeId>,
        post: Option<NodeId>,
        body: NodeId,
    },
    RangeStmt {
        key: Option<NodeId>,
        value: Option<NodeId>,
        define: bool,
        x: NodeId,
        body: NodeId,
    },

    // Expressions
    Ident { name: String },
    BasicLit { kind: LitKind, value: String },
    CompositeLit { ty: Option<NodeId>, elts: Vec<NodeId> },
    FuncLit { ty: NodeId, body: NodeId },
    ParenExpr { x: NodeId },
    SelectorExpr { x: NodeId, sel: NodeId },
    IndexExpr { x: NodeId, index: NodeId },
    SliceExpr {
        x: NodeId,
        low: Option<NodeId>,
        high: Option<NodeId>,
        max: Option<NodeId>,
    },
    /// `ty` is `None` for `x.(type)`.
    TypeAssertExpr { x: NodeId, ty: Option<NodeId> },
    CallExpr {
        fun: NodeId,
        args: Vec<NodeId>,
        ellipsis: bool,
    },
    StarExpr { x: NodeId },
    UnaryExpr { op: TokenKind, x: NodeId },
    BinaryExpr { x: NodeId, op: TokenKind, y: NodeId },
    KeyValueExpr { key: NodeId, value: NodeId },
}

impl NodeKind {
    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let opt = |out: &mut Vec<NodeId>, id: &Option<NodeId>| out.extend(id.iter().copied());
        match self {
            NodeKind::File { name, decls } => {
                out.push(*name);
                out.extend(decls);
            }
            NodeKind::FuncDecl {
                recv,
                name,
                ty,
                body,
            } => {
                opt(&mut out, recv);
                out.push(*name);
                out.push(*ty);
                opt(&mut out, body);
            }
            NodeKind::GenDecl { specs, .. } => out.extend(specs),
            NodeKind::ImportSpec { name, path } => {
                opt(&mut out, name);
                out.push(*path);
            }
            NodeKind::ValueSpec { names, ty, values } => {
                out.extend(names);
                opt(&mut out, ty);
                out.extend(values);
            }
            NodeKind::TypeSpec { name, ty, .. } => {
                out.push(*name);
                out.push(*ty);
            }
            NodeKind::FieldList { fields } => out.extend(fields),
            NodeKind::Field { names, ty, tag } => {
                out.extend(names);
                out.push(*ty);
                opt(&mut out, tag);
            }
            NodeKind::FuncType { params, results } => {
                out.push(*params);
                opt(&mut out, results);
            }
            NodeKind::StructType { fields } => out.push(*fields),
            NodeKind::InterfaceType { methods } => out.push(*methods),
            NodeKind::ArrayType { len, elt } => {
                opt(&mut out, len);
                out.push(*elt);
            }
            NodeKind::MapType { key, value } => {
                out.push(*key);
                out.push(*value);
            }
            NodeKind::ChanType { value, .. } => out.push(*value),
            NodeKind::Ellipsis { elt } => opt(&mut out, elt),
            NodeKind::DeclStmt { decl } => out.push(*decl),
            NodeKind::EmptyStmt => {}
            NodeKind::LabeledStmt { label, stmt } => {
                out.push(*label);
                out.push(*stmt);
            }
            NodeKind::ExprStmt { x } => out.push(*x),
            NodeKind::SendStmt { chan, value } => {
                out.push(*chan);
                out.push(*value);
            }
            NodeKind::IncDecStmt { x, .. } => out.push(*x),
            NodeKind::AssignStmt { lhs, rhs, .. } => {
                out.extend(lhs);
                out.extend(rhs);
            }
            NodeKind::GoStmt { call } | NodeKind::DeferStmt { call } => out.push(*call),
            NodeKind::ReturnStmt { results } => out.extend(results),
            NodeKind::BranchStmt { label, .. } => opt(&mut out, label),
            NodeKind::BlockStmt { stmts } => out.extend(stmts),
            NodeKind::IfStmt {
                init,
                cond,
                body,
                els,
            } => {
                opt(&mut out, init);
                out.push(*cond);
                out.push(*body);
                opt(&mut out, els);
            }
            NodeKind::CaseClause { list, body } => {
                out.extend(list);
                out.extend(body);
            }
            NodeKind::SwitchStmt { init, tag, body } => {
                opt(&mut out, init);
                opt(&mut out, tag);
                out.push(*body);
            }
            NodeKind::TypeSwitchStmt { init, assign, body } => {
                opt(&mut out, init);
                out.push(*assign);
                out.push(*body);
            }
            NodeKind::ForStmt {
                init,
                cond,
                post,
                body,
            } => {
                opt(&mut out, init);
                opt(&mut out, cond);
                opt(&mut out, post);
                out.push(*body);
            }
            NodeKind::RangeStmt {
                key,
                value,
                x,
                body,
                ..
            } => {
                opt(&mut out, key);
                opt(&mut out, value);
                out.push(*x);
                out.push(*body);
            }
            NodeKind::Ident { .. } | NodeKind::BasicLit { .. } => {}
            NodeKind::CompositeLit { ty, elts } => {
                opt(&mut out, ty);
                out.extend(elts);
            }
            NodeKind::FuncLit { ty, body } => {
                out.push(*ty);
                out.push(*body);
            }
            NodeKind::ParenExpr { x } | NodeKind::StarExpr { x } | NodeKind::UnaryExpr { x, .. } => {
                out.push(*x)
            }
            NodeKind::SelectorExpr { x, sel } => {
                out.push(*x);
                out.push(*sel);
            }
            NodeKind::IndexExpr { x, index } => {
                out.push(*x);
                out.push(*index);
            }
            NodeKind::SliceExpr { x, low, high, max } => {
                out.push(*x);
                opt(&mut out, low);
                opt(&mut out, high);
                opt(&mut out, max);
            }
            NodeKind::TypeAssertExpr { x, ty } => {
                out.push(*x);
                opt(&mut out, ty);
            }
            NodeKind::CallExpr { fun, args, .. } => {
                out.push(*fun);
                out.extend(args);
            }
            NodeKind::BinaryExpr { x, y, .. } => {
                out.push(*x);
                out.push(*y);
            }
            NodeKind::KeyValueExpr { key, value } => {
                out.push(*key);
                out.push(*value);
            }
        }
        out
    }

    /// Name of the node type, for diagnostics and debugging.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::File { .. } => "File",
            NodeKind::FuncDecl { .. } => "FuncDecl",
            NodeKind::GenDecl { .. } => "GenDecl",
            NodeKind::ImportSpec { .. } => "ImportSpec",
            NodeKind::ValueSpec { .. } => "ValueSpec",
            NodeKind::TypeSpec { .. } => "TypeSpec",
            NodeKind::FieldList { .. } => "FieldList",
            NodeKind::Field { .. } => "Field",
            NodeKind::FuncType { .. } => "FuncType",
            NodeKind::StructType { .. } => "StructType",
            NodeKind::InterfaceType { .. } => "InterfaceType",
            NodeKind::ArrayType { .. } => "ArrayType",
            NodeKind::MapType { .. } => "MapType",
            NodeKind::ChanType { .. } => "ChanType",
            NodeKind::Ellipsis { .. } => "Ellipsis",
            NodeKind::DeclStmt { .. } => "DeclStmt",
            NodeKind::EmptyStmt => "EmptyStmt",
            NodeKind::LabeledStmt { .. } => "LabeledStmt",
            NodeKind::ExprStmt { .. } => "ExprStmt",
            NodeKind::SendStmt { .. } => "SendStmt",
            NodeKind::IncDecStmt { .. } => "IncDecStmt",
            NodeKind::AssignStmt { .. } => "AssignStmt",
            NodeKind::GoStmt { .. } => "GoStmt",
            NodeKind::DeferStmt { .. } => "DeferStmt",
            NodeKind::ReturnStmt { .. } => "ReturnStmt",
            NodeKind::BranchStmt { .. } => "BranchStmt",
            NodeKind::BlockStmt { .. } => "BlockStmt",
            NodeKind::IfStmt { .. } => "IfStmt",
            NodeKind::CaseClause { .. } => "CaseClause",
            NodeKind::SwitchStmt { .. } => "SwitchStmt",
            NodeKind::TypeSwitchStmt { .. } => "TypeSwitchStmt",
            NodeKind::ForStmt { .. } => "ForStmt",
            NodeKind::RangeStmt { .. } => "RangeStmt",
            NodeKind::Ident { .. } => "Ident",
            NodeKind::BasicLit { .. } => "BasicLit",
            NodeKind::CompositeLit { .. } => "CompositeLit",
            NodeKind::FuncLit { .. } => "FuncLit",
            NodeKind::ParenExpr { .. } => "ParenExpr",
            NodeKind::SelectorExpr { .. } => "SelectorExpr",
            NodeKind::IndexExpr { .. } => "IndexExpr",
            NodeKind::SliceExpr { .. } => "SliceExpr",
            NodeKind::TypeAssertExpr { .. } => "TypeAssertExpr",
            NodeKind::CallExpr { .. } => "CallExpr",
            NodeKind::StarExpr { .. } => "StarExpr",
            NodeKind::UnaryExpr { .. } => "UnaryExpr",
            NodeKind::BinaryExpr { .. } => "BinaryExpr",
            NodeKind::KeyValueExpr { .. } => "KeyValueExpr",
        }
    }

    /// Check if this node is a statement.
    pub fn is_stmt(&self) -> bool {
        matches!(
            self,
            NodeKind::DeclStmt { .. }
                | NodeKind::EmptyStmt
                | NodeKind::LabeledStmt { .. }
                | NodeKind::ExprStmt { .. }
                | NodeKind::SendStmt { .. }
                | NodeKind::IncDecStmt { .. }
                | NodeKind::AssignStmt { .. }
                | NodeKind::GoStmt { .. }
                | NodeKind::DeferStmt { .. }
                | NodeKind::ReturnStmt { .. }
                | NodeKind::BranchStmt { .. }
                | NodeKind::BlockStmt { .. }
                | NodeKind::IfStmt { .. }
                | NodeKind::CaseClause { .. }
                | NodeKind::SwitchStmt { .. }
                | NodeKind::TypeSwitchStmt { .. }
                | NodeKind::ForStmt { .. }
                | NodeKind::RangeStmt { .. }
        )
    }

    /// Check if this node is an expression (type expressions included).
    pub fn is_expr(&self) -> bool {
        matches!(
            self,
            NodeKind::Ident { .. }
                | NodeKind::BasicLit { .. }
                | NodeKind::CompositeLit { .. }
                | NodeKind::FuncLit { .. }
                | NodeKind::ParenExpr { .. }
                | NodeKind::SelectorExpr { .. }
                | NodeKind::IndexExpr { .. }
                | NodeKind::SliceExpr { .. }
                | NodeKind::TypeAssertExpr { .. }
                | NodeKind::CallExpr { .. }
                | NodeKind::StarExpr { .. }
                | NodeKind::UnaryExpr { .. }
                | NodeKind::BinaryExpr { .. }
                | NodeKind::KeyValueExpr { .. }
                | NodeKind::FuncType { .. }
                | NodeKind::StructType { .. }
                | NodeKind::InterfaceType { .. }
                | NodeKind::ArrayType { .. }
                | NodeKind::MapType { .. }
                | NodeKind::ChanType { .. }
                | NodeKind::Ellipsis { .. }
        )
    }
}

// ============================================================================
// Arena
// ============================================================================

/// One node in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub file: FileId,
    pub parent: Option<NodeId>,
}

/// Arena holding the nodes of every parsed file.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node. The parent is filled in by [`Ast::link_parents`].
    pub fn alloc(&mut self, kind: NodeKind, span: Span, file: FileId) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            span,
            file,
            parent: None,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node allocated after the arena had `len` nodes.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub fn file(&self, id: NodeId) -> FileId {
        self.nodes[id.index()].file
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// Name of an identifier node.
    pub fn ident_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Ident { name } => Some(name),
            _ => None,
        }
    }

    /// Record parent links for every node reachable from `root`.
    pub fn link_parents(&mut self, root: NodeId) {
        self.nodes[root.index()].parent = None;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            for child in self.children(id) {
                self.nodes[child.index()].parent = Some(id);
                stack.push(child);
            }
        }
    }

    /// Visit `root` and its descendants in source order. Returning `false`
    /// from `visit` skips the children of that node.
    pub fn inspect(&self, root: NodeId, mut visit: impl FnMut(NodeId) -> bool) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if visit(id) {
                let mut children = self.children(id);
                children.reverse();
                stack.extend(children);
            }
        }
    }

    /// `root` and all its descendants in source order.
    pub fn preorder(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.inspect(root, |id| {
            out.push(id);
            true
        });
        out
    }

    /// Parent, grandparent, and so on up to the file root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            ast: self,
            next: self.parent(id),
        }
    }

    /// Path from the file root down to `id`, inclusive.
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path: Vec<NodeId> = self.ancestors(id).collect();
        path.reverse();
        path.push(id);
        path
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparen(&self, mut id: NodeId) -> NodeId {
        while let NodeKind::ParenExpr { x } = self.kind(id) {
            id = *x;
        }
        id
    }
}

impl Index<NodeId> for Ast {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.node(id)
    }
}

/// Iterator over the ancestors of a node.
pub struct Ancestors<'a> {
    ast: &'a Ast,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.ast.parent(current);
        Some(current)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(ast: &mut Ast, name: &str, start: usize) -> NodeId {
        ast.alloc(
            NodeKind::Ident { name: name.into() },
            Span::at(start, name.len()),
            FileId::new(0),
        )
    }

    #[test]
    fn parents_and_paths() {
        // a + b
        let mut ast = Ast::new();
        let a = ident(&mut ast, "a", 0);
        let b = ident(&mut ast, "b", 4);
        let sum = ast.alloc(
            NodeKind::BinaryExpr {
                x: a,
                op: TokenKind::Add,
                y: b,
            },
            Span::new(0, 5),
            FileId::new(0),
        );
        let paren = ast.alloc(NodeKind::ParenExpr { x: sum }, Span::new(0, 7), FileId::new(0));
        ast.link_parents(paren);

        assert_eq!(ast.parent(b), Some(sum));
        assert_eq!(ast.path_to(b), vec![paren, sum, b]);
        assert_eq!(ast.ancestors(a).collect::<Vec<_>>(), vec![sum, paren]);
        assert_eq!(ast.unparen(paren), sum);
        assert_eq!(ast.preorder(paren), vec![paren, sum, a, b]);
        assert_eq!(ast[sum].kind.name(), "BinaryExpr");
        assert_eq!(ast.ident_name(a), Some("a"));
    }

    #[test]
    fn inspect_can_prune() {
        let mut ast = Ast::new();
        let x = ident(&mut ast, "x", 1);
        let star = ast.alloc(NodeKind::StarExpr { x }, Span::new(0, 2), FileId::new(0));
        let mut seen = Vec::new();
        ast.inspect(star, |id| {
            seen.push(id);
            false
        });
        assert_eq!(seen, vec![star]);
    }

    #[test]
    fn statement_and_expression_classes() {
        assert!(NodeKind::EmptyStmt.is_stmt());
        assert!(!NodeKind::EmptyStmt.is_expr());
        let ident = NodeKind::Ident { name: "x".into() };
        assert!(ident.is_expr());
        assert!(!ident.is_stmt());
    }
}
