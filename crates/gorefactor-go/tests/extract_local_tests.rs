//! Integration tests for the extract-local-variable refactoring.
//!
//! Accepted selections are checked by comparing the edited file with the
//! expected text. Rejected selections must leave the edit set empty and log
//! exactly one entry explaining why.

use gorefactor_core::{Severity, Span};
use gorefactor_go::ops::extract_local::Rejection;
use gorefactor_go::{Config, ExtractLocal, Program, Refactoring, RefactoringResult};

fn load(source: &str) -> Program {
    Program::load(vec![("main.go".to_string(), source.to_string())])
}

/// Extract `target`, found at its first position inside the first
/// occurrence of `context`, into a variable called `name`.
fn extract_in(program: &Program, context: &str, target: &str, name: &str) -> RefactoringResult {
    let contents = &program.file_by_path("main.go").expect("main.go loaded").contents;
    let start = contents.find(context).expect("context occurs")
        + context.find(target).expect("target occurs in context");
    let config = Config::new(
        "main.go",
        Span::at(start, target.len()),
        vec![name.to_string()],
    );
    ExtractLocal.run(program, &config)
}

fn applied(program: &Program, result: &RefactoringResult) -> String {
    assert!(!result.log.contains_errors(), "{}", result.log);
    let file = program.file_by_path("main.go").unwrap();
    result.edits["main.go"].apply(&file.contents).unwrap()
}

fn single_fatal(result: &RefactoringResult) -> String {
    let entries = result.log.refactoring_entries();
    assert_eq!(entries.len(), 1, "expected one entry, got {:?}", entries);
    assert_eq!(entries[0].severity, Severity::FatalError);
    assert!(entries[0].position.is_some());
    assert!(result.edits.is_empty());
    assert!(result.fs_changes.is_empty());
    entries[0].message.clone()
}

// ============================================================================
// Accepted Selections
// ============================================================================

mod accepted {
    use super::*;

    #[test]
    fn test_expression_in_block() {
        let source = "package main\n\nfunc f(x int) {\n\tif x > 0 { y := x + 1 }\n}\n";
        let program = load(source);
        let result = extract_in(&program, "y := x + 1", "x + 1", "z");
        assert_eq!(
            applied(&program, &result),
            "package main\n\nfunc f(x int) {\n\tif x > 0 { z := x + 1\ny := z }\n}\n"
        );
        assert!(result.fs_changes.is_empty());
    }

    #[test]
    fn test_case_expression_hoists_above_switch() {
        let source = "package main\n\nfunc f(a, b int) int {\n\tswitch {\n\tcase a + b == 1:\n\t\treturn 1\n\t}\n\treturn 0\n}\n";
        let program = load(source);
        let result = extract_in(&program, "a + b == 1", "a + b", "sum");
        assert_eq!(
            applied(&program, &result),
            "package main\n\nfunc f(a, b int) int {\n\tsum := a + b\nswitch {\n\tcase sum == 1:\n\t\treturn 1\n\t}\n\treturn 0\n}\n"
        );
    }

    #[test]
    fn test_call_argument() {
        let source = "package main\n\nfunc g(n int) int { return n }\n\nfunc f(x int) int {\n\tr := g(x * 2)\n\treturn r\n}\n";
        let program = load(source);
        let result = extract_in(&program, "g(x * 2)", "x * 2", "double");
        assert_eq!(
            applied(&program, &result),
            "package main\n\nfunc g(n int) int { return n }\n\nfunc f(x int) int {\n\tdouble := x * 2\nr := g(double)\n\treturn r\n}\n"
        );
    }

    #[test]
    fn test_statement_in_case_body() {
        let source = "package main\n\nfunc f(x int) int {\n\tswitch x {\n\tcase 1:\n\t\treturn x * 10\n\t}\n\treturn 0\n}\n";
        let program = load(source);
        let result = extract_in(&program, "return x * 10", "x * 10", "scaled");
        assert_eq!(
            applied(&program, &result),
            "package main\n\nfunc f(x int) int {\n\tswitch x {\n\tcase 1:\n\t\tscaled := x * 10\nreturn scaled\n\t}\n\treturn 0\n}\n"
        );
    }

    #[test]
    fn test_inside_function_literal() {
        let source = "package main\n\nvar double = func(x int) int { return x * 2 }\n";
        let program = load(source);
        let result = extract_in(&program, "x * 2", "x * 2", "d");
        assert_eq!(
            applied(&program, &result),
            "package main\n\nvar double = func(x int) int { d := x * 2\nreturn d }\n"
        );
    }

    #[test]
    fn test_labeled_switch_case_goes_above_label() {
        let source = "package main\n\nfunc f(x int) int {\nouter:\n\tswitch {\n\tcase x+1 > 2:\n\t\tbreak outer\n\t}\n\treturn x\n}\n";
        let program = load(source);
        let result = extract_in(&program, "x+1 > 2", "x+1", "next");
        assert_eq!(
            applied(&program, &result),
            "package main\n\nfunc f(x int) int {\nnext := x+1\nouter:\n\tswitch {\n\tcase next > 2:\n\t\tbreak outer\n\t}\n\treturn x\n}\n"
        );
    }

    #[test]
    fn test_cursor_selects_identifier() {
        let source = "package main\n\nfunc f(count int) int {\n\treturn count + 1\n}\n";
        let program = load(source);
        let start = source.find("count + 1").unwrap() + 2;
        let config = Config::new("main.go", Span::at(start, 0), vec!["c".to_string()]);
        let result = ExtractLocal.run(&program, &config);
        assert_eq!(
            applied(&program, &result),
            "package main\n\nfunc f(count int) int {\n\tc := count\nreturn c + 1\n}\n"
        );
    }

    #[test]
    fn test_condition_of_if_with_call_init() {
        let source = "package main\n\nfunc g(n int) int { return n }\n\nfunc f(x int) {\n\tif g(x); x+1 > 2 {\n\t}\n}\n";
        let program = load(source);
        let result = extract_in(&program, "x+1 > 2", "x+1", "next");
        assert_eq!(
            applied(&program, &result),
            "package main\n\nfunc g(n int) int { return n }\n\nfunc f(x int) {\n\tnext := x+1\nif g(x); next > 2 {\n\t}\n}\n"
        );
    }
}

// ============================================================================
// Rejected Selections
// ============================================================================

mod rejected {
    use super::*;

    const SOURCE: &str = r#"package main

type Point struct {
	X int
	Y int
}

func g(n int) int { return n }

func calls(x int) int {
	r := g(x)
	return r
}

func values(x int, p *int) int {
	var y = x + 1
	a, b := 0, 0
	x = 5
	p = nil
	z := (x + 1) * 2
	pt := Point{X: 1, Y: 2}
	s := make([]string, 0)
	_ = s
	return a + b + y + z + pt.X
}

func loops(m map[string]int) int {
	total := 0
outer:
	for i := 0; i < 10; i++ {
		total++
		if total > 3 {
			break outer
		}
	}
	for k, v := range m {
		total += len(k) + v
	}
	return total
}

func conditions(x int, v interface{}) int {
	if w := g(x); w > 0 {
		return w
	}
	switch t := v.(type) {
	case int:
		return t
	}
	switch y := x * 2; y {
	case 1:
		return 1
	}
	n := v.(int)
	return n
}

func deref(p *int) int { return *p }
"#;

    fn rejection(context: &str, target: &str) -> String {
        let program = load(SOURCE);
        single_fatal(&extract_in(&program, context, target, "extracted"))
    }

    fn expect(context: &str, target: &str, expected: Rejection) {
        assert_eq!(
            rejection(context, target),
            expected.to_string(),
            "selecting {:?} in {:?}",
            target,
            context
        );
    }

    #[test]
    fn test_statements() {
        expect("total := 0", "total := 0", Rejection::AssignStatement);
        expect("total++", "total++", Rejection::IncDec);
        expect("break outer", "break outer", Rejection::Branch);
        expect("if total > 3", "if total > 3", Rejection::IfStatement);
        expect("for k, v := range m", "for k, v := range m", Rejection::Loop);
        expect("return total", "return total", Rejection::Statement);
        expect(
            "{\n\t\t\tbreak outer\n\t\t}",
            "{\n\t\t\tbreak outer\n\t\t}",
            Rejection::Block,
        );
        expect("case int:", "case int:", Rejection::SwitchCase);
    }

    #[test]
    fn test_labels() {
        expect("outer:", "outer", Rejection::Label);
        expect("break outer", "outer", Rejection::Label);
    }

    #[test]
    fn test_signatures_and_declarations() {
        expect("x int, p *int", "x int", Rejection::FuncSignature);
        expect("func deref", "deref", Rejection::FuncSignature);
        expect("var y = x + 1", "x + 1", Rejection::VarDecl);
    }

    #[test]
    fn test_assignment_targets() {
        expect("a, b := 0, 0", "a", Rejection::MultiAssign);
        expect("x = 5", "x", Rejection::AssignLhs);
        expect("total++", "total", Rejection::AssignLhs);
    }

    #[test]
    fn test_values_that_are_not_expressions_to_extract() {
        expect("p = nil", "nil", Rejection::Nil);
        expect("[]string", "string", Rejection::Predeclared);
        expect("Point{X", "Point", Rejection::TypeOrPackage);
    }

    #[test]
    fn test_partial_expressions() {
        expect("r := g(x)", "g(x)", Rejection::CallPart);
        expect("r := g(x)", "g", Rejection::CallPart);
        expect("pt.X", "X", Rejection::SelectorName);
        expect("Point{X: 1, Y: 2}", "X: 1", Rejection::KeyValue);
        expect("Point{X: 1, Y: 2}", "X", Rejection::KeyValue);
        expect("Point{X: 1, Y: 2}", "Point{X: 1, Y: 2}", Rejection::Block);
        expect("(x + 1) * 2", "(x + 1)", Rejection::Paren);
        expect("v.(int)", "v.(int)", Rejection::TypeAssert);
        expect("{ return *p }", "*p", Rejection::Dereference);
    }

    #[test]
    fn test_control_headers() {
        expect("i < 10", "i < 10", Rejection::ForLoopHeader);
        expect("i := 0", "0", Rejection::ForLoopHeader);
        expect("i++", "i", Rejection::AssignLhs);
        expect("k, v := range", "k", Rejection::ForLoopHeader);
        expect("w > 0", "w > 0", Rejection::IfInit);
        expect("return t", "t", Rejection::TypeSwitch);
        expect("; y {", "y", Rejection::SwitchCase);
    }

    #[test]
    fn test_outside_any_function() {
        expect("package main", "main", Rejection::NoExpression);
    }

    #[test]
    fn test_name_already_declared() {
        let program = load(SOURCE);
        let result = extract_in(&program, "(x + 1) * 2", "x + 1", "y");
        assert_eq!(
            single_fatal(&result),
            Rejection::NameTaken {
                name: "y".to_string()
            }
            .to_string()
        );
    }

    #[test]
    fn test_name_must_be_an_identifier() {
        let program = load(SOURCE);
        let result = extract_in(&program, "(x + 1) * 2", "x + 1", "");
        assert_eq!(
            single_fatal(&result),
            "You must enter a name for the new variable."
        );
        let result = extract_in(&program, "(x + 1) * 2", "x + 1", "for");
        assert_eq!(
            single_fatal(&result),
            "The new name for is not a valid Go identifier"
        );
    }

    #[test]
    fn test_unknown_file() {
        let program = load(SOURCE);
        let config = Config::new("other.go", Span::at(0, 1), vec!["v".to_string()]);
        let result = ExtractLocal.run(&program, &config);
        let entries = result.log.refactoring_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "The file other.go is not part of the program");
        assert!(result.edits.is_empty());
    }
}
