// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Extract-local-variable refactoring.
//!
//! Replaces the selected expression with a reference to a new variable and
//! declares that variable, initialized with the expression's source text,
//! just before the statement that contains it:
//!
//! ```text
//! if x > 0 { y := x + 1 }     =>     if x > 0 { z := x + 1
//!                                    y := z }
//! ```
//!
//! Most of the work is deciding whether the selection may be extracted at
//! all. Statements are never extracted. Expressions go through an ordered set
//! of exclusion checks over the enclosing path; the first one that matches
//! produces the single [`Rejection`] reported for the run.

use thiserror::Error;
use tracing::{debug, info_span};

use gorefactor_core::Span;
use gorefactor_syntax::{Ast, NodeId, NodeKind};

use crate::program::Program;
use crate::types::ObjectKind;
use crate::validation::{is_predeclared, validate_go_identifier, ValidationError};

use super::{Config, Description, Parameter, Refactoring, RefactoringBase, RefactoringResult};

// ============================================================================
// Rejections
// ============================================================================

/// Why a selection cannot be extracted into a local variable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Please select an expression to extract.")]
    NoExpression,

    #[error("You can't extract from a for loop's conditions (any part in the for statement).")]
    ForLoopHeader,

    #[error("You can't select a block for extract local. Please use the extract refactoring when selecting blocks or functions.")]
    Block,

    #[error("Sorry, you can't extract a goto, break, continue, or fallthrough statement")]
    Branch,

    #[error("You can't create a variable for a Label.")]
    Label,

    #[error("You can't extract from a multi-assign statement (ie: a, b := 0, 0).")]
    MultiAssign,

    #[error("Sorry, you can't pull out a predetermined identifier like string or reflect and make a variable of that type (reflect.String can't be made newVar.String since it isn't type reflect)")]
    Predeclared,

    #[error("Extracting from a var stmt will alter the definition and should be avoided.")]
    VarDecl,

    #[error("You can't extract a variable from the lhs of an assignment statement.")]
    AssignLhs,

    #[error("You can't extract this part of a 'call expr' (ie:  fmt.Println('____') can't extract the fmt or Println, or fmt.Println).")]
    CallPart,

    #[error("You can't extract from the function parameters/results/method input at the function definition or the whole function itself (for full function extraction use the extract refactoring).")]
    FuncSignature,

    #[error("You can't extract the type from a selector expr (ie: case reflect.Float32:  can't extract Float32).")]
    SelectorName,

    #[error("Sorry, you can't extract the switch key or the case selector.")]
    SwitchCase,

    #[error("You can't extract nil since nil isn't a type.")]
    Nil,

    #[error("You can't extract the whole key/value from a key value expression (ie: key: value can't be newVar := key: value).")]
    KeyValue,

    #[error("You can't extract a type variable from a type switch statement or it's case statements.")]
    TypeSwitch,

    #[error("You can't extract from an if statement with an assign stmt in it")]
    IfInit,

    #[error("You can't extract an increment or decrement statement (ie: i++).")]
    IncDec,

    #[error("You can't extract a loop statement. Please select an expression inside it.")]
    Loop,

    #[error("You can't extract an if statement. Please select an expression inside it.")]
    IfStatement,

    #[error("You can't extract an assignment statement (ie: a := b). Please select its right-hand side.")]
    AssignStatement,

    #[error("You can't extract a statement. Please select an expression to extract.")]
    Statement,

    #[error("You can't extract a type or package name; only values can be assigned to a variable.")]
    TypeOrPackage,

    #[error("You can't extract a parenthesized expression; select the expression inside the parentheses.")]
    Paren,

    #[error("You can't extract a type assertion (ie: x.(T)).")]
    TypeAssert,

    #[error("You can't extract a pointer dereference (ie: *p) unless it is part of an assignment.")]
    Dereference,

    #[error("The name {name} is already declared in this scope; please choose another name for the new variable.")]
    NameTaken { name: String },
}

// ============================================================================
// Refactoring
// ============================================================================

/// Extracts the selected expression into a new local variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractLocal;

impl Refactoring for ExtractLocal {
    fn description(&self) -> Description {
        Description {
            name: "Extract Local Variable Refactoring".to_string(),
            synopsis: "Extract a selection to a new variable".to_string(),
            usage: "<new_name>".to_string(),
            params: vec![Parameter {
                label: "newVar name: ".to_string(),
                prompt: "Please select name for the new Variable.".to_string(),
                default_value: String::new(),
            }],
            multifile: false,
            hidden: false,
        }
    }

    fn run(&self, program: &Program, config: &Config) -> RefactoringResult {
        let _span = info_span!("extract_local", file = %config.file).entered();
        let mut base = RefactoringBase::start(program, config);
        if !base.failed() && base.validate_args(config, &self.description()) {
            extract(&mut base, &config.args[0]);
        }
        base.finish()
    }
}

fn extract(base: &mut RefactoringBase<'_>, name: &str) {
    match validate_go_identifier(name) {
        Ok(()) => {}
        Err(ValidationError::Empty) => {
            return base.fatal("You must enter a name for the new variable.");
        }
        Err(_) => {
            return base.fatal(format!(
                "The new name {} is not a valid Go identifier",
                name
            ));
        }
    }

    let program = base.program;
    let enclosing = base.path.clone();
    let selection = match Selection::new(program, &enclosing) {
        Some(selection) => selection,
        None => return base.fatal(Rejection::NoExpression.to_string()),
    };
    let anchor = match selection.check().and_then(|()| selection.anchor()) {
        Ok(anchor) => anchor,
        Err(rejection) => {
            debug!(%rejection, "selection rejected");
            return base.fatal(rejection.to_string());
        }
    };
    if let Err(rejection) = selection.check_name(anchor, name) {
        return base.fatal(rejection.to_string());
    }

    let ast = program.ast();
    let path = program.file_of(selection.node).path.clone();
    let text = program.node_text(selection.node);
    debug!(anchor = ast.kind(anchor).name(), "inserting declaration");

    let declaration = format!("{} := {}\n", name, text);
    if base.add_edit(&path, Span::at(ast.span(anchor).start, 0), declaration) {
        base.add_edit(&path, ast.span(selection.node), name);
    }
    base.info(format!("Extracted {} into {}", text, name));
}

// ============================================================================
// Selection Analysis
// ============================================================================

/// The selected node and its enclosing path.
struct Selection<'a> {
    program: &'a Program,
    ast: &'a Ast,
    /// From the file root down to `node`, inclusive.
    path: &'a [NodeId],
    node: NodeId,
}

impl<'a> Selection<'a> {
    fn new(program: &'a Program, path: &'a [NodeId]) -> Option<Self> {
        let node = *path.last()?;
        Some(Selection {
            program,
            ast: program.ast(),
            path,
            node,
        })
    }

    fn kind(&self, id: NodeId) -> &'a NodeKind {
        self.ast.kind(id)
    }

    /// `(child, parent)` pairs from the selection outward to the root.
    fn outward(&self) -> impl Iterator<Item = (NodeId, NodeId)> + 'a {
        self.path.windows(2).rev().map(|pair| (pair[1], pair[0]))
    }

    /// `(child, parent)` pairs from the selection outward, up to and
    /// including the nearest enclosing function.
    fn local(&self) -> Vec<(NodeId, NodeId)> {
        let mut pairs = Vec::new();
        for (child, parent) in self.outward() {
            pairs.push((child, parent));
            if matches!(
                self.kind(parent),
                NodeKind::FuncLit { .. } | NodeKind::FuncDecl { .. }
            ) {
                break;
            }
        }
        pairs
    }

    fn parent(&self) -> Option<NodeId> {
        let len = self.path.len();
        (len >= 2).then(|| self.path[len - 2])
    }

    /// Run every exclusion check in order; the first match wins.
    fn check(&self) -> Result<(), Rejection> {
        self.check_category()?;
        self.check_label()?;
        self.check_signature()?;
        self.check_nil()?;
        self.check_predeclared()?;
        self.check_declaration()?;
        self.check_assignment_lhs()?;
        self.check_selector_name()?;
        self.check_call()?;
        self.check_loop_header()?;
        self.check_if_init()?;
        self.check_type_switch()?;
        self.check_switch_header()?;
        self.check_dereference()?;
        self.check_type_or_package()
    }

    /// Statements and declarations are never extracted.
    fn check_category(&self) -> Result<(), Rejection> {
        match self.kind(self.node) {
            NodeKind::BranchStmt { .. } => Err(Rejection::Branch),
            NodeKind::LabeledStmt { .. } => Err(Rejection::Label),
            NodeKind::CaseClause { .. } => Err(Rejection::SwitchCase),
            NodeKind::IncDecStmt { .. } => Err(Rejection::IncDec),
            NodeKind::BlockStmt { .. } => Err(Rejection::Block),
            NodeKind::ForStmt { .. } | NodeKind::RangeStmt { .. } => Err(Rejection::Loop),
            NodeKind::IfStmt { .. } => Err(Rejection::IfStatement),
            NodeKind::AssignStmt { .. } => Err(Rejection::AssignStatement),
            NodeKind::DeclStmt { .. }
            | NodeKind::GenDecl { .. }
            | NodeKind::ValueSpec { .. }
            | NodeKind::TypeSpec { .. } => Err(Rejection::VarDecl),
            kind if kind.is_stmt() => Err(Rejection::Statement),
            NodeKind::FuncDecl { .. }
            | NodeKind::FuncType { .. }
            | NodeKind::Field { .. }
            | NodeKind::FieldList { .. } => Err(Rejection::FuncSignature),
            kind if kind.is_expr() => Ok(()),
            _ => Err(Rejection::NoExpression),
        }
    }

    fn check_label(&self) -> Result<(), Rejection> {
        let Some(parent) = self.parent() else {
            return Ok(());
        };
        match self.kind(parent) {
            NodeKind::LabeledStmt { label, .. } if *label == self.node => Err(Rejection::Label),
            NodeKind::BranchStmt { .. } => Err(Rejection::Label),
            _ => Ok(()),
        }
    }

    fn check_signature(&self) -> Result<(), Rejection> {
        let in_signature = self.local().into_iter().any(|(child, parent)| {
            match self.kind(parent) {
                NodeKind::Field { .. } | NodeKind::FieldList { .. } => true,
                NodeKind::FuncDecl { name, .. } => *name == child,
                _ => false,
            }
        });
        if in_signature {
            Err(Rejection::FuncSignature)
        } else {
            Ok(())
        }
    }

    fn check_nil(&self) -> Result<(), Rejection> {
        if self.ast.ident_name(self.node) == Some("nil") {
            Err(Rejection::Nil)
        } else {
            Ok(())
        }
    }

    fn check_predeclared(&self) -> Result<(), Rejection> {
        if is_predeclared(self.program.node_text(self.node)) {
            Err(Rejection::Predeclared)
        } else {
            Ok(())
        }
    }

    fn check_declaration(&self) -> Result<(), Rejection> {
        let in_decl = self
            .local()
            .into_iter()
            .any(|(_, parent)| matches!(self.kind(parent), NodeKind::GenDecl { .. }));
        if in_decl {
            Err(Rejection::VarDecl)
        } else {
            Ok(())
        }
    }

    /// Anything written to by the nearest enclosing statement.
    fn check_assignment_lhs(&self) -> Result<(), Rejection> {
        for (child, parent) in self.local() {
            match self.kind(parent) {
                NodeKind::AssignStmt { lhs, .. } if lhs.contains(&child) => {
                    return Err(if lhs.len() > 1 {
                        Rejection::MultiAssign
                    } else {
                        Rejection::AssignLhs
                    });
                }
                NodeKind::IncDecStmt { .. } => return Err(Rejection::AssignLhs),
                kind if kind.is_stmt() => return Ok(()),
                _ => {}
            }
        }
        Ok(())
    }

    fn check_selector_name(&self) -> Result<(), Rejection> {
        match self.parent().map(|p| self.kind(p)) {
            Some(NodeKind::SelectorExpr { sel, .. }) if *sel == self.node => {
                Err(Rejection::SelectorName)
            }
            _ => Ok(()),
        }
    }

    /// Calls, and the parts of an expression that only make sense whole.
    fn check_call(&self) -> Result<(), Rejection> {
        match self.kind(self.node) {
            NodeKind::CallExpr { .. } => return Err(Rejection::CallPart),
            NodeKind::KeyValueExpr { .. } => return Err(Rejection::KeyValue),
            NodeKind::CompositeLit { .. } => return Err(Rejection::Block),
            NodeKind::ParenExpr { .. } => return Err(Rejection::Paren),
            NodeKind::TypeAssertExpr { .. } => return Err(Rejection::TypeAssert),
            _ => {}
        }
        if let Some(NodeKind::KeyValueExpr { key, .. }) = self.parent().map(|p| self.kind(p)) {
            if *key == self.node {
                return Err(Rejection::KeyValue);
            }
        }

        for (child, parent) in self.local() {
            match self.kind(parent) {
                NodeKind::CallExpr { fun, .. } if *fun == child => {
                    return Err(Rejection::CallPart);
                }
                NodeKind::CallExpr { .. } => return Ok(()),
                kind if kind.is_stmt() => return Ok(()),
                _ => {}
            }
        }
        Ok(())
    }

    fn check_loop_header(&self) -> Result<(), Rejection> {
        for (child, parent) in self.local() {
            let in_header = match self.kind(parent) {
                NodeKind::ForStmt {
                    init, cond, post, ..
                } => [init, cond, post].into_iter().any(|part| *part == Some(child)),
                NodeKind::RangeStmt { key, value, .. } => {
                    *key == Some(child) || *value == Some(child)
                }
                _ => false,
            };
            if in_header {
                return Err(Rejection::ForLoopHeader);
            }
        }
        Ok(())
    }

    fn check_if_init(&self) -> Result<(), Rejection> {
        for (child, parent) in self.local() {
            if let NodeKind::IfStmt {
                init: Some(init),
                cond,
                ..
            } = self.kind(parent)
            {
                let assigns = matches!(self.kind(*init), NodeKind::AssignStmt { .. });
                if assigns && (child == *init || child == *cond) {
                    return Err(Rejection::IfInit);
                }
            }
        }
        Ok(())
    }

    fn check_type_switch(&self) -> Result<(), Rejection> {
        let in_type_switch = self
            .local()
            .into_iter()
            .any(|(_, parent)| matches!(self.kind(parent), NodeKind::TypeSwitchStmt { .. }));
        if in_type_switch {
            Err(Rejection::TypeSwitch)
        } else {
            Ok(())
        }
    }

    /// A switch tag or case expression is hoisted above the switch, out of
    /// reach of the names its init statement declares.
    fn check_switch_header(&self) -> Result<(), Rejection> {
        for (child, parent) in self.local() {
            match self.kind(parent) {
                NodeKind::SwitchStmt {
                    init: Some(_), tag, ..
                } if *tag == Some(child) => return Err(Rejection::SwitchCase),
                NodeKind::CaseClause { list, .. } if list.contains(&child) => {
                    let switch = self.switch_of(parent);
                    if let Some(NodeKind::SwitchStmt { init: Some(_), .. }) =
                        switch.map(|s| self.kind(s))
                    {
                        return Err(Rejection::SwitchCase);
                    }
                    return Ok(());
                }
                kind if kind.is_stmt() => return Ok(()),
                _ => {}
            }
        }
        Ok(())
    }

    fn check_dereference(&self) -> Result<(), Rejection> {
        if !matches!(self.kind(self.node), NodeKind::StarExpr { .. }) {
            return Ok(());
        }
        let in_assignment = self
            .local()
            .into_iter()
            .any(|(_, parent)| matches!(self.kind(parent), NodeKind::AssignStmt { .. }));
        if in_assignment {
            Ok(())
        } else {
            Err(Rejection::Dereference)
        }
    }

    fn check_type_or_package(&self) -> Result<(), Rejection> {
        if self.denotes_type_or_package(self.node) {
            Err(Rejection::TypeOrPackage)
        } else {
            Ok(())
        }
    }

    fn denotes_type_or_package(&self, node: NodeId) -> bool {
        let info = self.program.info();
        let names_type = |ident: NodeId| {
            info.object_of(ident).is_some_and(|obj| {
                matches!(
                    info.object(obj).kind,
                    ObjectKind::TypeName | ObjectKind::PkgName
                )
            })
        };
        match self.kind(node) {
            NodeKind::Ident { .. } => names_type(node),
            NodeKind::SelectorExpr { sel, .. } => names_type(*sel),
            NodeKind::ParenExpr { x } | NodeKind::StarExpr { x } => {
                self.denotes_type_or_package(*x)
            }
            NodeKind::ArrayType { .. }
            | NodeKind::MapType { .. }
            | NodeKind::ChanType { .. }
            | NodeKind::FuncType { .. }
            | NodeKind::StructType { .. }
            | NodeKind::InterfaceType { .. }
            | NodeKind::Ellipsis { .. } => true,
            _ => false,
        }
    }

    /// The switch statement owning a case clause.
    fn switch_of(&self, clause: NodeId) -> Option<NodeId> {
        let body = self.ast.parent(clause)?;
        self.ast.parent(body)
    }

    // ------------------------------------------------------------------------
    // Insertion point
    // ------------------------------------------------------------------------

    /// The statement the declaration is inserted in front of.
    fn anchor(&self) -> Result<NodeId, Rejection> {
        for (child, parent) in self.outward() {
            match self.kind(parent) {
                NodeKind::BlockStmt { .. } => return Ok(child),
                NodeKind::CaseClause { body, .. } if body.contains(&child) => return Ok(child),
                NodeKind::CaseClause { .. } => {
                    let switch = self.switch_of(parent).ok_or(Rejection::NoExpression)?;
                    return Ok(self.outermost_label(switch));
                }
                _ => {}
            }
        }
        Err(Rejection::NoExpression)
    }

    /// `stmt`, or the outermost label attached to it.
    fn outermost_label(&self, mut stmt: NodeId) -> NodeId {
        while let Some(parent) = self.ast.parent(stmt) {
            if !matches!(self.kind(parent), NodeKind::LabeledStmt { .. }) {
                break;
            }
            stmt = parent;
        }
        stmt
    }

    /// The new name must not already mean something where it is declared.
    fn check_name(&self, anchor: NodeId, name: &str) -> Result<(), Rejection> {
        let info = self.program.info();
        let scope = self
            .ast
            .ancestors(anchor)
            .find_map(|node| info.scope_of_node(node));
        match scope.and_then(|scope| info.lookup_parent(scope, name)) {
            Some(_) => Err(Rejection::NameTaken {
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn load(source: &str) -> Program {
        Program::load(vec![("main.go".to_string(), source.to_string())])
    }

    fn selection_path(program: &Program, needle: &str) -> Vec<NodeId> {
        let file = program.file_by_path("main.go").unwrap();
        let start = file.contents.find(needle).unwrap();
        gorefactor_syntax::path_enclosing_interval(
            program.ast(),
            file.root,
            &file.contents,
            Span::at(start, needle.len()),
        )
    }

    fn anchor_text(source: &str, needle: &str) -> String {
        let program = load(source);
        let path = selection_path(&program, needle);
        let selection = Selection::new(&program, &path).unwrap();
        let anchor = selection.anchor().unwrap();
        program.node_text(anchor).to_string()
    }

    mod anchors {
        use super::*;

        #[test]
        fn statement_in_block() {
            let source = "package main\n\nfunc f(x int) int {\n\ty := x * 2\n\treturn y\n}\n";
            assert_eq!(anchor_text(source, "x * 2"), "y := x * 2");
        }

        #[test]
        fn statement_in_case_body() {
            let source = "package main\n\nfunc f(x int) int {\n\tswitch x {\n\tcase 1:\n\t\treturn x + 1\n\t}\n\treturn 0\n}\n";
            assert_eq!(anchor_text(source, "x + 1"), "return x + 1");
        }

        #[test]
        fn case_expression_hoists_above_labeled_switch() {
            let source = "package main\n\nfunc f(x int) int {\nouter:\n\tswitch {\n\tcase x+1 > 2:\n\t\tbreak outer\n\t}\n\treturn 0\n}\n";
            let anchor = anchor_text(source, "x+1");
            assert!(anchor.starts_with("outer:"), "{}", anchor);
        }

        #[test]
        fn if_condition_anchors_on_if() {
            let source = "package main\n\nfunc f(x int) int {\n\tif x+1 > 2 {\n\t\treturn 1\n\t}\n\treturn 0\n}\n";
            assert!(anchor_text(source, "x+1").starts_with("if x+1 > 2"));
        }

        #[test]
        fn closure_body_is_its_own_block() {
            let source = "package main\n\nvar g = func(x int) int { return x * 3 }\n";
            assert_eq!(anchor_text(source, "x * 3"), "return x * 3");
        }
    }

    mod checks {
        use super::*;

        /// Check the selection of `target` where it first appears inside
        /// `context`.
        fn check(source: &str, context: &str, target: &str) -> Result<(), Rejection> {
            let program = load(source);
            let file = program.file_by_path("main.go").unwrap();
            let start = file.contents.find(context).unwrap() + context.find(target).unwrap();
            let path = gorefactor_syntax::path_enclosing_interval(
                program.ast(),
                file.root,
                &file.contents,
                Span::at(start, target.len()),
            );
            Selection::new(&program, &path).unwrap().check()
        }

        #[test]
        fn plain_expression_passes() {
            let source = "package main\n\nfunc f(x int) int { return x * 2 + 1 }\n";
            assert_eq!(check(source, "x * 2", "x * 2"), Ok(()));
        }

        #[test]
        fn call_argument_passes_but_callee_does_not() {
            let source = "package main\n\nfunc g(n int) int { return n }\n\nfunc f(x int) int { return g(x + 1) }\n";
            assert_eq!(check(source, "g(x + 1)", "x + 1"), Ok(()));
            assert_eq!(check(source, "g(x + 1)", "g"), Err(Rejection::CallPart));
            assert_eq!(check(source, "g(x + 1)", "g(x + 1)"), Err(Rejection::CallPart));
        }

        #[test]
        fn selector_base_passes() {
            let source = "package main\n\ntype T struct{ n int }\n\nfunc f(ts []T) int { return ts[0].n }\n";
            assert_eq!(check(source, "ts[0].n", "ts[0]"), Ok(()));
            assert_eq!(check(source, "ts[0].n", "n"), Err(Rejection::SelectorName));
        }

        #[test]
        fn type_name() {
            let source = "package main\n\ntype T struct{ n int }\n\nfunc f() T { return T{n: 1} }\n";
            assert_eq!(check(source, "T{n", "T"), Err(Rejection::TypeOrPackage));
        }

        #[test]
        fn dereference_inside_assignment_passes() {
            let source = "package main\n\nfunc f(p *int) int {\n\tv := *p + 1\n\treturn v\n}\n";
            assert_eq!(check(source, "*p + 1", "*p"), Ok(()));
        }

        #[test]
        fn dereference_outside_assignment() {
            let source = "package main\n\nfunc f(p *int) int { return *p }\n";
            assert_eq!(check(source, "return *p", "*p"), Err(Rejection::Dereference));
        }
    }

    #[test]
    fn rejection_messages_are_user_facing() {
        assert_eq!(
            Rejection::Nil.to_string(),
            "You can't extract nil since nil isn't a type."
        );
        assert_eq!(
            Rejection::NameTaken {
                name: "total".to_string()
            }
            .to_string(),
            "The name total is already declared in this scope; please choose another name for the new variable."
        );
    }
}
