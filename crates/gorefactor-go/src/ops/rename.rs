//! Rename refactoring.
//!
//! Renames the entity denoted by the selected identifier everywhere it is
//! declared or referenced. The occurrence set comes from [`SearchEngine`], so
//! a shadowed name is never touched by renaming its shadow.
//!
//! Renaming a package name edits its `package` clauses and the qualifiers of
//! files importing it under the default name. When the package lives in a
//! directory named after it, and every file there agrees on the package name,
//! the directory is renamed as well and import paths follow.

use std::collections::BTreeSet;

use tracing::{debug, info_span};

use gorefactor_core::{FsChange, Span};
use gorefactor_syntax::{NodeId, NodeKind};

use crate::program::{base_name, PackageId, Program};
use crate::search::{SearchEngine, SearchTarget};
use crate::types::{is_exported, ObjectId, ObjectKind, Owner, Type};
use crate::validation::{validate_go_identifier, ValidationError};

use super::{Config, Description, Parameter, Refactoring, RefactoringBase, RefactoringResult};

const COLLISION: &str = "the new name already exists in scope; please choose another name";

/// Renames an identifier across the program.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rename;

impl Refactoring for Rename {
    fn description(&self) -> Description {
        Description {
            name: "Rename".to_string(),
            synopsis: "Changes the name of an identifier".to_string(),
            usage: "<new_name>".to_string(),
            params: vec![Parameter {
                label: "New Name:".to_string(),
                prompt: "What to rename this identifier to.".to_string(),
                default_value: String::new(),
            }],
            multifile: true,
            hidden: false,
        }
    }

    fn run(&self, program: &Program, config: &Config) -> RefactoringResult {
        let _span = info_span!("rename", file = %config.file).entered();
        let mut base = RefactoringBase::start(program, config);
        if !base.failed() && base.validate_args(config, &self.description()) {
            rename(&mut base, &config.args[0]);
        }
        base.finish()
    }
}

fn rename(base: &mut RefactoringBase<'_>, new_name: &str) {
    match validate_go_identifier(new_name) {
        Ok(()) => {}
        Err(ValidationError::Empty) => return base.fatal("newName cannot be empty"),
        Err(_) => {
            return base.fatal(format!(
                "The new name {} is not a valid Go identifier",
                new_name
            ))
        }
    }

    let program = base.program;
    let ast = program.ast();
    let Some(ident) = base.selected().filter(|&id| ast.ident_name(id).is_some()) else {
        return base.fatal("Please select an identifier to rename.");
    };
    let old_name = ast.ident_name(ident).unwrap_or_default();

    if is_exported(old_name) && !is_exported(new_name) {
        return base
            .fatal("newName cannot be non Exportable if selected identifier name is Exportable");
    }

    let engine = SearchEngine::new(program);
    let target = match engine.target(ident) {
        Ok(target) => target,
        Err(err) => return base.fatal(err.to_string()),
    };
    if let SearchTarget::Object(obj) = target {
        if program.info().is_universe_object(obj) {
            return base.fatal(format!(
                "{} is a predeclared identifier and cannot be renamed",
                old_name
            ));
        }
        if collides(program, obj, new_name) {
            return base.fatal(COLLISION);
        }
    }

    let occurrences = match engine.find_occurrences(ident) {
        Ok(occurrences) => occurrences,
        Err(err) => return base.fatal(err.to_string()),
    };
    let mut count = 0;
    for (path, spans) in &occurrences {
        for &span in spans {
            if !base.add_edit(path, span, new_name) {
                return;
            }
            count += 1;
        }
    }
    debug!(occurrences = count, files = occurrences.len(), "renamed");

    if let SearchTarget::Package(package) = target {
        rename_package_dir(base, package, old_name, new_name);
    }

    base.info(format!(
        "Renamed {} occurrence(s) in {} file(s)",
        count,
        occurrences.len()
    ));
}

// ============================================================================
// Collisions
// ============================================================================

/// Check if `new_name` already means something where `obj` is visible.
fn collides(program: &Program, obj: ObjectId, new_name: &str) -> bool {
    let info = program.info();
    let object = info.object(obj);

    match object.owner {
        Some(Owner::Receiver { base, .. }) => {
            let receiver = Type::Pointer(Box::new(Type::Named(base)));
            info.lookup_field_or_method(&receiver, new_name)
                .is_some_and(|found| found != obj && info.object(found).is_method())
        }
        Some(Owner::Interface(literal)) => info
            .members_of(literal)
            .iter()
            .any(|&m| m != obj && info.object(m).name == new_name),
        Some(Owner::Struct(literal)) => {
            let field = info
                .members_of(literal)
                .iter()
                .any(|&f| f != obj && info.object(f).name == new_name);
            let method = info.named_type_of(literal).is_some_and(|named| {
                info.methods_of(named)
                    .iter()
                    .any(|&m| info.object(m).name == new_name)
            });
            field || method
        }
        None => {
            let Some(scope) = object.parent else {
                return false;
            };
            if info
                .lookup_parent(scope, new_name)
                .is_some_and(|found| found != obj)
            {
                return true;
            }
            object.kind != ObjectKind::Label && captured_at_use(program, obj, new_name)
        }
    }
}

/// Check if some use of `obj` would resolve to a different declaration of
/// `new_name` after the rename.
fn captured_at_use(program: &Program, obj: ObjectId, new_name: &str) -> bool {
    let ast = program.ast();
    let info = program.info();
    let decl = info.object(obj).decl;

    info.idents_of(obj)
        .filter(|&id| Some(id) != decl && !is_qualified(program, id))
        .any(|id| {
            let scope = ast
                .ancestors(id)
                .find_map(|node| info.scope_of_node(node))
                .or_else(|| info.file_scope(ast.file(id)));
            scope
                .and_then(|scope| info.lookup_parent(scope, new_name))
                .is_some_and(|found| found != obj)
        })
}

/// Check if `ident` is the selected name of a selector expression.
fn is_qualified(program: &Program, ident: NodeId) -> bool {
    let ast = program.ast();
    ast.parent(ident).is_some_and(
        |parent| matches!(ast.kind(parent), NodeKind::SelectorExpr { sel, .. } if *sel == ident),
    )
}

// ============================================================================
// Package Directories
// ============================================================================

fn rename_package_dir(
    base: &mut RefactoringBase<'_>,
    package: PackageId,
    old_name: &str,
    new_name: &str,
) {
    let program = base.program;
    let package = program.package(package);
    let dir = package.dir.as_str();
    if dir.is_empty() || base_name(dir) != old_name {
        return;
    }
    let clauses = program.package_clauses_in(dir);
    if clauses.is_empty() || clauses.iter().any(|clause| *clause != Some(old_name)) {
        debug!(dir, "directory mixes packages; not renaming it");
        return;
    }

    base.result
        .fs_changes
        .push(FsChange::rename_in_place(dir, new_name));

    let old_path = package.import_path.as_str();
    let new_path = match old_path.rsplit_once('/') {
        Some((prefix, _)) => format!("{}/{}", prefix, new_name),
        None => new_name.to_string(),
    };
    for (path, span) in import_paths_of(program, old_path) {
        if !base.add_edit(&path, span, format!("\"{}\"", new_path)) {
            return;
        }
    }
}

/// Spans of import path literals that import `import_path`.
fn import_paths_of(program: &Program, import_path: &str) -> Vec<(String, Span)> {
    let ast = program.ast();
    let mut found = BTreeSet::new();
    for file in program.files().iter() {
        ast.inspect(file.root, |id| match ast.kind(id) {
            NodeKind::ImportSpec { path, .. } => {
                let text = program.node_text(*path);
                if unquote(text) == import_path {
                    found.insert((file.path.clone(), ast.span(*path)));
                }
                false
            }
            NodeKind::FuncDecl { .. } => false,
            _ => true,
        });
    }
    found.into_iter().collect()
}

fn unquote(literal: &str) -> &str {
    literal
        .strip_prefix(['"', '`'])
        .and_then(|s| s.strip_suffix(['"', '`']))
        .unwrap_or(literal)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gorefactor_core::Severity;

    fn load(pairs: &[(&str, &str)]) -> Program {
        Program::load(
            pairs
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
        )
    }

    /// Run a rename with the cursor on the `n`th occurrence of `needle`.
    fn run(program: &Program, path: &str, needle: &str, n: usize, new: &str) -> RefactoringResult {
        let contents = &program.file_by_path(path).unwrap().contents;
        let start = contents.match_indices(needle).nth(n).unwrap().0;
        let config = Config::new(
            path,
            Span::at(start, needle.len()),
            vec![new.to_string()],
        );
        Rename.run(program, &config)
    }

    fn applied(program: &Program, result: &RefactoringResult, path: &str) -> String {
        let file = program.file_by_path(path).unwrap();
        result.edits[path].apply(&file.contents).unwrap()
    }

    fn fatal_message(result: &RefactoringResult) -> &str {
        let entries = result.log.refactoring_entries();
        assert_eq!(entries.len(), 1, "{:?}", entries);
        assert_eq!(entries[0].severity, Severity::FatalError);
        assert!(result.edits.is_empty());
        &entries[0].message
    }

    mod locals {
        use super::*;

        const SOURCE: &str = "package p\n\nfunc f() int {\n\tx := 1\n\tif x > 0 {\n\t\tx := 2\n\t\treturn x\n\t}\n\treturn x + 1\n}\n";

        #[test]
        fn renames_every_occurrence_but_not_shadow() {
            let program = load(&[("p.go", SOURCE)]);
            let result = run(&program, "p.go", "x", 0, "count");
            assert!(!result.log.contains_errors());
            assert_eq!(
                applied(&program, &result, "p.go"),
                "package p\n\nfunc f() int {\n\tcount := 1\n\tif count > 0 {\n\t\tx := 2\n\t\treturn x\n\t}\n\treturn count + 1\n}\n"
            );
        }

        #[test]
        fn collision_in_scope() {
            let program = load(&[(
                "p.go",
                "package p\n\nfunc f() int {\n\tx := 1\n\ty := 2\n\treturn x + y\n}\n",
            )]);
            let result = run(&program, "p.go", "x", 0, "y");
            assert_eq!(fatal_message(&result), COLLISION);
        }

        #[test]
        fn use_captured_by_inner_declaration() {
            let program = load(&[(
                "p.go",
                "package p\n\nfunc f() int {\n\tx := 1\n\tif true {\n\t\ty := 2\n\t\treturn x + y\n\t}\n\treturn x\n}\n",
            )]);
            let result = run(&program, "p.go", "x", 0, "y");
            assert_eq!(fatal_message(&result), COLLISION);
        }

        #[test]
        fn same_name_is_a_no_op_rename() {
            let program = load(&[("p.go", SOURCE)]);
            let result = run(&program, "p.go", "x", 0, "x");
            assert!(!result.log.contains_errors());
            assert_eq!(applied(&program, &result, "p.go"), SOURCE);
        }
    }

    mod preconditions {
        use super::*;

        const SOURCE: &str = "package p\n\nfunc Area() int { return len(\"ab\") }\n";

        #[test]
        fn invalid_name() {
            let program = load(&[("p.go", SOURCE)]);
            let result = run(&program, "p.go", "Area", 0, "9lives");
            assert_eq!(
                fatal_message(&result),
                "The new name 9lives is not a valid Go identifier"
            );
        }

        #[test]
        fn keyword() {
            let program = load(&[("p.go", SOURCE)]);
            let result = run(&program, "p.go", "Area", 0, "func");
            assert_eq!(
                fatal_message(&result),
                "The new name func is not a valid Go identifier"
            );
        }

        #[test]
        fn empty_name() {
            let program = load(&[("p.go", SOURCE)]);
            let result = run(&program, "p.go", "Area", 0, "");
            assert_eq!(fatal_message(&result), "newName cannot be empty");
        }

        #[test]
        fn exported_to_unexported() {
            let program = load(&[("p.go", SOURCE)]);
            let result = run(&program, "p.go", "Area", 0, "area");
            assert_eq!(
                fatal_message(&result),
                "newName cannot be non Exportable if selected identifier name is Exportable"
            );
        }

        #[test]
        fn not_an_identifier() {
            let program = load(&[("p.go", SOURCE)]);
            let result = run(&program, "p.go", "\"ab\"", 0, "x");
            assert_eq!(
                fatal_message(&result),
                "Please select an identifier to rename."
            );
        }

        #[test]
        fn predeclared() {
            let program = load(&[("p.go", SOURCE)]);
            let result = run(&program, "p.go", "len", 0, "length");
            assert_eq!(
                fatal_message(&result),
                "len is a predeclared identifier and cannot be renamed"
            );
        }

        #[test]
        fn missing_argument() {
            let program = load(&[("p.go", SOURCE)]);
            let config = Config::new("p.go", Span::at(SOURCE.find("Area").unwrap(), 4), vec![]);
            let result = Rename.run(&program, &config);
            assert_eq!(
                fatal_message(&result),
                "This refactoring requires 1 argument(s): <new_name>"
            );
        }
    }

    mod members {
        use super::*;

        const SOURCE: &str = "package p\n\ntype Shape struct {\n\tW int\n\tH int\n}\n\nfunc (s *Shape) Area() int { return s.W * s.H }\n\nfunc (s Shape) Scale() Shape { return Shape{W: s.W * 2, H: s.H} }\n";

        #[test]
        fn field_renames_selectors_and_keys() {
            let program = load(&[("p.go", SOURCE)]);
            let result = run(&program, "p.go", "W", 0, "Width");
            assert!(!result.log.contains_errors());
            assert_eq!(result.edit_count(), 4);
        }

        #[test]
        fn field_collides_with_field() {
            let program = load(&[("p.go", SOURCE)]);
            let result = run(&program, "p.go", "W", 0, "H");
            assert_eq!(fatal_message(&result), COLLISION);
        }

        #[test]
        fn field_collides_with_method() {
            let program = load(&[("p.go", SOURCE)]);
            let result = run(&program, "p.go", "W", 0, "Area");
            assert_eq!(fatal_message(&result), COLLISION);
        }

        #[test]
        fn method_collides_through_pointer_receiver() {
            let program = load(&[("p.go", SOURCE)]);
            let result = run(&program, "p.go", "Scale", 0, "Area");
            assert_eq!(fatal_message(&result), COLLISION);
        }

        #[test]
        fn method_may_take_a_free_name() {
            let program = load(&[("p.go", SOURCE)]);
            let result = run(&program, "p.go", "Area", 0, "Size");
            assert!(!result.log.contains_errors());
            assert_eq!(result.edit_count(), 1);
        }
    }
}
