//! Integration tests for the rename refactoring.
//!
//! These tests load whole programs (in memory and from disk) and check the
//! edits and file-system changes a rename produces: every occurrence edited
//! exactly once, shadowed names left alone, collisions rejected without
//! edits, and package directories renamed only when the directory agrees on
//! the package name.

use std::collections::BTreeMap;

use tempfile::TempDir;

use gorefactor_core::{FsChange, Severity, Span};
use gorefactor_go::{Config, Program, Refactoring, RefactoringResult, Rename, SearchEngine};

/// Write `files` under a fresh temporary directory.
fn setup_workspace(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    for (path, content) in files {
        let full_path = temp_dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directories");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
    }
    temp_dir
}

fn load(files: &[(&str, &str)]) -> Program {
    Program::load(
        files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect(),
    )
}

/// Rename the `n`th occurrence of `needle` in `path`.
fn rename_at(program: &Program, path: &str, needle: &str, n: usize, new: &str) -> RefactoringResult {
    let contents = &program
        .file_by_path(path)
        .expect("file is part of the program")
        .contents;
    let start = contents
        .match_indices(needle)
        .nth(n)
        .expect("needle occurs")
        .0;
    let config = Config::new(path, Span::at(start, needle.len()), vec![new.to_string()]);
    Rename.run(program, &config)
}

/// Apply every edit set and return the new contents per file.
fn apply_all(program: &Program, result: &RefactoringResult) -> BTreeMap<String, String> {
    result
        .edits
        .iter()
        .map(|(path, edits)| {
            let file = program.file_by_path(path).expect("edited file exists");
            (path.clone(), edits.apply(&file.contents).expect("edits apply"))
        })
        .collect()
}

fn assert_rejected(result: &RefactoringResult, message: &str) {
    let entries = result.log.refactoring_entries();
    assert_eq!(entries.len(), 1, "expected one entry, got {:?}", entries);
    assert_eq!(entries[0].severity, Severity::FatalError);
    assert_eq!(entries[0].message, message);
    assert!(result.edits.is_empty());
    assert!(result.fs_changes.is_empty());
}

// ============================================================================
// Completeness
// ============================================================================

mod completeness {
    use super::*;

    const LIB: &str = "package shapes\n\n// Area of a rectangle.\nfunc Area(w, h int) int {\n\treturn w * h\n}\n";
    const MAIN: &str = "package main\n\nimport \"shapes\"\n\nfunc main() {\n\ta := shapes.Area(1, 2)\n\tb := shapes.Area(a, a)\n\t_ = b\n}\n";

    #[test]
    fn test_one_edit_per_occurrence() {
        let program = load(&[("shapes/shapes.go", LIB), ("main.go", MAIN)]);
        let result = rename_at(&program, "main.go", "Area", 1, "Surface");
        assert!(!result.log.contains_errors(), "{}", result.log);

        let ident = {
            let file = program.file_by_path("shapes/shapes.go").unwrap();
            let start = file.contents.find("Area(").unwrap();
            gorefactor_syntax::path_enclosing_interval(
                program.ast(),
                file.root,
                &file.contents,
                Span::at(start, 4),
            )
            .last()
            .copied()
            .unwrap()
        };
        let occurrences = SearchEngine::new(&program).find_occurrences(ident).unwrap();

        for (path, spans) in &occurrences {
            let edits = &result.edits[path];
            assert_eq!(edits.len(), spans.len());
            for (edit, span) in edits.iter().zip(spans) {
                assert_eq!(edit.span, *span);
                assert_eq!(edit.replacement, "Surface");
            }
        }
        assert_eq!(result.edit_count(), 3);
    }

    #[test]
    fn test_applied_text() {
        let program = load(&[("shapes/shapes.go", LIB), ("main.go", MAIN)]);
        // occurrence 0 is in the doc comment
        let result = rename_at(&program, "shapes/shapes.go", "Area", 1, "Surface");
        let applied = apply_all(&program, &result);
        assert_eq!(
            applied["main.go"],
            "package main\n\nimport \"shapes\"\n\nfunc main() {\n\ta := shapes.Surface(1, 2)\n\tb := shapes.Surface(a, a)\n\t_ = b\n}\n"
        );
        // the comment is not an occurrence
        assert!(applied["shapes/shapes.go"].contains("// Area of a rectangle."));
        assert!(applied["shapes/shapes.go"].contains("func Surface(w, h int) int"));
    }

    #[test]
    fn test_parameters_in_different_functions_are_distinct() {
        let source = "package p\n\nfunc a(value int) int { return value * 2 }\n\nfunc b(value int) int { return value * 3 }\n";
        let program = load(&[("p.go", source)]);
        let result = rename_at(&program, "p.go", "value", 0, "input");
        let applied = apply_all(&program, &result);
        assert_eq!(
            applied["p.go"],
            "package p\n\nfunc a(input int) int { return input * 2 }\n\nfunc b(value int) int { return value * 3 }\n"
        );
    }

    #[test]
    fn test_method_and_call_sites() {
        let source = "package p\n\ntype Counter struct{ n int }\n\nfunc (c *Counter) Inc() { c.n++ }\n\nfunc use(c *Counter) {\n\tc.Inc()\n\tc.Inc()\n}\n";
        let program = load(&[("p.go", source)]);
        let result = rename_at(&program, "p.go", "Inc", 0, "Increment");
        assert_eq!(result.edit_count(), 3);
    }

    #[test]
    fn test_verbose_run_reports_counts() {
        let program = load(&[("shapes/shapes.go", LIB), ("main.go", MAIN)]);
        let start = MAIN.find("Area").unwrap();
        let mut config = Config::new("main.go", Span::at(start, 4), vec!["Surface".to_string()]);
        config.verbose = true;
        let result = Rename.run(&program, &config);
        let entries = result.log.refactoring_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Info);
        assert_eq!(entries[0].message, "Renamed 3 occurrence(s) in 2 file(s)");
    }
}

// ============================================================================
// Collisions
// ============================================================================

mod collisions {
    use super::*;

    const COLLISION: &str = "the new name already exists in scope; please choose another name";

    #[test]
    fn test_existing_local() {
        let source = "package p\n\nfunc f() int {\n\tx := 1\n\ty := 2\n\treturn x + y\n}\n";
        let program = load(&[("p.go", source)]);
        assert_rejected(&rename_at(&program, "p.go", "x", 0, "y"), COLLISION);
    }

    #[test]
    fn test_parameter_against_package_level_name() {
        let source = "package p\n\nvar total = 0\n\nfunc f(count int) int { return count + total }\n";
        let program = load(&[("p.go", source)]);
        assert_rejected(&rename_at(&program, "p.go", "count", 0, "total"), COLLISION);
    }

    #[test]
    fn test_top_level_across_files() {
        let program = load(&[
            ("a.go", "package p\n\nfunc helper() int { return 1 }\n"),
            ("b.go", "package p\n\nfunc other() int { return helper() }\n"),
        ]);
        assert_rejected(&rename_at(&program, "a.go", "helper", 0, "other"), COLLISION);
    }

    #[test]
    fn test_import_name_in_using_file() {
        let program = load(&[
            ("a.go", "package p\n\nfunc helper() int { return 1 }\n"),
            (
                "b.go",
                "package p\n\nimport \"fmt\"\n\nfunc show() { fmt.Println(helper()) }\n",
            ),
        ]);
        assert_rejected(&rename_at(&program, "a.go", "helper", 0, "fmt"), COLLISION);
    }

    #[test]
    fn test_interface_methods() {
        let source = "package p\n\ntype Shape interface {\n\tArea() int\n\tPerimeter() int\n}\n";
        let program = load(&[("p.go", source)]);
        assert_rejected(&rename_at(&program, "p.go", "Area", 0, "Perimeter"), COLLISION);
        let ok = rename_at(&program, "p.go", "Area", 0, "Size");
        assert!(!ok.log.contains_errors());
        assert_eq!(ok.edit_count(), 1);
    }

    #[test]
    fn test_method_reachable_through_embedding() {
        let source = "package p\n\ntype Base struct{}\n\nfunc (b *Base) Close() {}\n\ntype File struct {\n\tBase\n}\n\nfunc (f *File) Flush() {}\n";
        let program = load(&[("p.go", source)]);
        assert_rejected(&rename_at(&program, "p.go", "Flush", 0, "Close"), COLLISION);
    }

    #[test]
    fn test_unresolved_identifier() {
        let source = "package p\n\nvar x = missing\n";
        let program = load(&[("p.go", source)]);
        let result = rename_at(&program, "p.go", "missing", 0, "found");
        assert_rejected(&result, "unable to find declaration of selected identifier");
        // the undeclared name is also reported, downgraded, ahead of the run
        assert_eq!(result.log.entries()[0].severity, Severity::Warning);
    }
}

// ============================================================================
// Packages
// ============================================================================

mod packages {
    use super::*;

    const AREA: &str = "package geo\n\nfunc Area() int { return 1 }\n";
    const PERIMETER: &str = "package geo\n\nfunc Perimeter() int { return 2 }\n";
    const MAIN: &str = "package main\n\nimport \"example.com/app/geo\"\n\nfunc main() { _ = geo.Area() + geo.Perimeter() }\n";

    #[test]
    fn test_directory_rename_when_all_files_agree() {
        let workspace = setup_workspace(&[
            ("geo/area.go", AREA),
            ("geo/perimeter.go", PERIMETER),
            ("main.go", MAIN),
        ]);
        let program = Program::load_dir(workspace.path(), Some("example.com/app")).unwrap();
        let result = rename_at(&program, "geo/area.go", "geo", 0, "shapes");
        assert!(!result.log.contains_errors(), "{}", result.log);

        assert_eq!(
            result.fs_changes,
            vec![FsChange::rename_in_place("geo", "shapes")]
        );
        let applied = apply_all(&program, &result);
        assert_eq!(applied["geo/area.go"], "package shapes\n\nfunc Area() int { return 1 }\n");
        assert_eq!(
            applied["geo/perimeter.go"],
            "package shapes\n\nfunc Perimeter() int { return 2 }\n"
        );
        assert_eq!(
            applied["main.go"],
            "package main\n\nimport \"example.com/app/shapes\"\n\nfunc main() { _ = shapes.Area() + shapes.Perimeter() }\n"
        );
    }

    #[test]
    fn test_no_directory_rename_when_a_file_disagrees() {
        let workspace = setup_workspace(&[
            ("geo/area.go", AREA),
            ("geo/perimeter.go", PERIMETER),
            ("geo/doc.go", "package geometry\n"),
            ("main.go", MAIN),
        ]);
        let program = Program::load_dir(workspace.path(), Some("example.com/app")).unwrap();
        let result = rename_at(&program, "geo/area.go", "geo", 0, "shapes");

        assert!(!result.log.contains_fatal());
        assert!(result.fs_changes.is_empty());
        let applied = apply_all(&program, &result);
        assert!(applied["geo/area.go"].starts_with("package shapes"));
        assert!(!applied.contains_key("geo/doc.go"));
    }

    #[test]
    fn test_no_directory_rename_when_names_differ() {
        let program = load(&[
            ("lib/area.go", AREA),
            ("main.go", "package main\n\nimport \"lib\"\n\nfunc main() { _ = geo.Area() }\n"),
        ]);
        let result = rename_at(&program, "lib/area.go", "geo", 0, "shapes");
        assert!(result.fs_changes.is_empty());
        let applied = apply_all(&program, &result);
        assert_eq!(applied["main.go"], "package main\n\nimport \"lib\"\n\nfunc main() { _ = shapes.Area() }\n");
    }

    #[test]
    fn test_named_import_stays_local() {
        let program = load(&[
            ("geo/area.go", AREA),
            ("main.go", "package main\n\nimport g \"geo\"\n\nfunc main() { _ = g.Area() }\n"),
        ]);
        // occurrence 0 is inside `package`
        let result = rename_at(&program, "main.go", "g", 1, "gg");
        assert!(result.fs_changes.is_empty());
        assert_eq!(result.edits.len(), 1);
        assert_eq!(result.edit_count(), 2);
    }
}
