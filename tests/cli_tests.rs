//! CLI end-to-end tests.
//!
//! These tests spawn the actual `gorefactor` binary against temporary
//! workspaces and validate stdout, files on disk and exit codes.
//!
//! Exit code expectations:
//! - 0: Success
//! - 2: Invalid arguments (bad position, missing refactoring arguments)
//! - 3: Resolution error (unknown refactoring, file not found)
//! - 5: The refactoring rejected the request

use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

const MAIN: &str = "package main\n\nfunc area(w, h int) int {\n\treturn w * h\n}\n\nfunc main() {\n\tsize := area(2, 3)\n\t_ = size\n}\n";

/// Run gorefactor in `workspace` and return (stdout, stderr, exit_code).
fn run_gorefactor(workspace: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_gorefactor"))
        .arg("--workspace")
        .arg(workspace)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute gorefactor");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn setup_workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, contents) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, contents).unwrap();
    }
    dir
}

// ============================================================================
// Listing
// ============================================================================

mod list {
    use super::*;

    #[test]
    fn test_lists_defaults() {
        let dir = setup_workspace(&[("main.go", MAIN)]);
        let (stdout, _stderr, exit_code) = run_gorefactor(dir.path(), &["list"]);
        assert_eq!(exit_code, 0);

        let lines: Vec<&str> = stdout.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("rename"));
        assert!(lines[0].contains("Changes the name of an identifier"));
        assert!(lines[1].starts_with("var"));
        assert!(lines[1].contains("<new_name>"));
    }
}

// ============================================================================
// Running Refactorings
// ============================================================================

mod refactor {
    use super::*;

    #[test]
    fn test_rename_prints_diff() {
        let dir = setup_workspace(&[("main.go", MAIN)]);
        let (stdout, _stderr, exit_code) = run_gorefactor(
            dir.path(),
            &["rename", "--file", "main.go", "--pos", "3:6", "surface"],
        );
        assert_eq!(exit_code, 0);
        assert!(stdout.starts_with("--- a/main.go\n+++ b/main.go\n"));
        assert!(stdout.contains("+func surface(w, h int) int {\n"));
        assert!(stdout.contains("+\tsize := surface(2, 3)\n"));

        // Preview leaves the file alone
        assert_eq!(fs::read_to_string(dir.path().join("main.go")).unwrap(), MAIN);
    }

    #[test]
    fn test_extract_writes_file() {
        let dir = setup_workspace(&[("main.go", MAIN)]);
        let (stdout, _stderr, exit_code) = run_gorefactor(
            dir.path(),
            &["var", "--file", "main.go", "--pos", "4:9-4:14", "--write", "product"],
        );
        assert_eq!(exit_code, 0);
        assert_eq!(stdout, "M main.go\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("main.go")).unwrap(),
            "package main\n\nfunc area(w, h int) int {\n\tproduct := w * h\nreturn product\n}\n\nfunc main() {\n\tsize := area(2, 3)\n\t_ = size\n}\n"
        );
    }

    #[test]
    fn test_json_envelope() {
        let dir = setup_workspace(&[("main.go", MAIN)]);
        let start = MAIN.find("w * h").unwrap();
        let pos = format!("{},{}", start, start + 5);
        let (stdout, _stderr, exit_code) = run_gorefactor(
            dir.path(),
            &["var", "--file", "main.go", "--pos", &pos, "--json", "product"],
        );
        assert_eq!(exit_code, 0);

        let json: Value = serde_json::from_str(&stdout).expect("stdout should be valid JSON");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["refactoring"], "var");
        assert_eq!(json["edits"]["main.go"]["edits"].as_array().unwrap().len(), 2);
        assert!(json["fs_changes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_package_rename_moves_directory() {
        let dir = setup_workspace(&[
            ("shapes/shapes.go", "package shapes\n\nconst Sides = 4\n"),
            (
                "main.go",
                "package main\n\nimport \"example.com/app/shapes\"\n\nvar n = shapes.Sides\n",
            ),
        ]);
        let (stdout, _stderr, exit_code) = run_gorefactor(
            dir.path(),
            &[
                "--module",
                "example.com/app",
                "rename",
                "--file",
                "shapes/shapes.go",
                "--pos",
                "1:9",
                "--write",
                "geometry",
            ],
        );
        assert_eq!(exit_code, 0);
        assert!(stdout.contains("R shapes -> geometry"));
        assert!(dir.path().join("geometry/shapes.go").exists());
        assert!(fs::read_to_string(dir.path().join("main.go"))
            .unwrap()
            .contains("geometry.Sides"));
    }
}

// ============================================================================
// Exit Codes
// ============================================================================

mod exit_codes {
    use super::*;

    #[test]
    fn test_rejected_selection_exits_5() {
        let dir = setup_workspace(&[("main.go", MAIN)]);
        let (stdout, stderr, exit_code) = run_gorefactor(
            dir.path(),
            &["var", "--file", "main.go", "--pos", "4:2-4:14", "product"],
        );
        assert_eq!(exit_code, 5);
        assert!(stdout.is_empty());
        assert!(stderr.contains("You can't extract a statement."));
        assert_eq!(fs::read_to_string(dir.path().join("main.go")).unwrap(), MAIN);
    }

    #[test]
    fn test_unknown_refactoring_exits_3() {
        let dir = setup_workspace(&[("main.go", MAIN)]);
        let (_stdout, stderr, exit_code) = run_gorefactor(
            dir.path(),
            &["inline", "--file", "main.go", "--pos", "1", "x"],
        );
        assert_eq!(exit_code, 3);
        assert!(stderr.contains("unknown refactoring 'inline'"));
    }

    #[test]
    fn test_json_error_envelope() {
        let dir = setup_workspace(&[("main.go", MAIN)]);
        let (stdout, stderr, exit_code) = run_gorefactor(
            dir.path(),
            &["rename", "--file", "nope.go", "--pos", "1", "--json", "x"],
        );
        assert_eq!(exit_code, 3);
        assert!(stderr.contains("error:"));

        let json: Value = serde_json::from_str(&stdout).expect("stdout should be valid JSON");
        assert_eq!(json["status"], "error");
        assert_eq!(json["schema_version"], "1");
        assert_eq!(json["error"]["code"], 3);
        assert_eq!(json["error"]["details"]["path"], "nope.go");
    }

    #[test]
    fn test_missing_file_exits_3() {
        let dir = setup_workspace(&[("main.go", MAIN)]);
        let (_stdout, _stderr, exit_code) = run_gorefactor(
            dir.path(),
            &["rename", "--file", "nope.go", "--pos", "1", "x"],
        );
        assert_eq!(exit_code, 3);
    }

    #[test]
    fn test_bad_arguments_exit_2() {
        let dir = setup_workspace(&[("main.go", MAIN)]);
        let (_stdout, _stderr, exit_code) = run_gorefactor(
            dir.path(),
            &["rename", "--file", "main.go", "--pos", "nowhere", "x"],
        );
        assert_eq!(exit_code, 2);

        let (_stdout, _stderr, exit_code) =
            run_gorefactor(dir.path(), &["rename", "--pos", "3:6", "x"]);
        assert_eq!(exit_code, 2);
    }

    #[test]
    fn test_missing_refactoring_argument_exits_5() {
        let dir = setup_workspace(&[("main.go", MAIN)]);
        let (_stdout, stderr, exit_code) = run_gorefactor(
            dir.path(),
            &["rename", "--file", "main.go", "--pos", "3:6"],
        );
        assert_eq!(exit_code, 5);
        assert!(stderr.contains("This refactoring requires 1 argument"));
    }
}
