// Integration tests for the loxwalk interpreter
//
// These tests run complete programs through the public pipeline and check
// printed output, diagnostics and runtime errors. Tests cover:
// - Expressions: comma, both ternaries, logical short-circuit, arithmetic
// - Variables: scoping, shadowing, unassigned vs undefined
// - Functions, lambdas and closures
// - Loops with break/continue
// - Resolver diagnostics and warnings
// - State persisting across runs on one interpreter

use loxwalk::errors::{Reporter, RuntimeErrorKind};
use loxwalk::interpreter::Interpreter;
use loxwalk::{run_source, RunError};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

struct Run {
    output: String,
    result: Result<(), RunError>,
    diagnostics: Vec<String>,
}

impl Run {
    fn runtime_error(&self) -> Option<(RuntimeErrorKind, usize)> {
        match &self.result {
            Err(RunError::Runtime(err)) => Some((err.kind.clone(), err.line)),
            _ => None,
        }
    }
}

fn run_with(interp: &mut Interpreter, output: &Arc<Mutex<Vec<u8>>>, code: &str) -> Run {
    output.lock().unwrap().clear();
    let mut reporter = Reporter::new();
    let result = run_source(code, interp, &mut reporter);
    let output = String::from_utf8(output.lock().unwrap().clone()).unwrap();
    let diagnostics = reporter.diagnostics().iter().map(|d| d.to_string()).collect();
    Run { output, result, diagnostics }
}

fn run_code(code: &str) -> Run {
    let output = Arc::new(Mutex::new(Vec::new()));
    let mut interp = Interpreter::new();
    interp.set_output(output.clone());
    run_with(&mut interp, &output, code)
}

#[test]
fn test_comma_operator_yields_rightmost_value() {
    let run = run_code("print (1, 2, 3); var x = (4, 5); print x;");
    assert!(run.result.is_ok());
    assert_eq!(run.output, "3\n5\n");
}

#[test]
fn test_closure_counter_keeps_state() {
    let code = r#"
        fun makeCounter() {
            var i = 0;
            fun count() {
                i = i + 1;
                print i;
            }
            return count;
        }
        var counter = makeCounter();
        counter();
        counter();
    "#;
    let run = run_code(code);
    assert!(run.result.is_ok());
    assert_eq!(run.output, "1\n2\n");
    assert!(run.diagnostics.is_empty(), "{:?}", run.diagnostics);
}

#[test]
fn test_independent_closures_do_not_share_state() {
    let code = r#"
        fun makeCounter() { var n = 0; return () => n = n + 1; }
        var a = makeCounter();
        var b = makeCounter();
        a(); a();
        print a();
        print b();
    "#;
    assert_eq!(run_code(code).output, "3\n1\n");
}

#[test]
fn test_comma_operands_run_left_to_right_for_effect() {
    let run = run_code("fun p(x) { print x; return x; }\nprint (p(1), p(2), p(3));");
    assert!(run.result.is_ok());
    assert_eq!(run.output, "1\n2\n3\n3\n");
}

#[test]
fn test_ternaries_evaluate_exactly_one_branch() {
    let code = r#"
        fun p(x) { print x; return x; }
        print true ? p("t") : p("e");
        print false ?. p("t") : p("e");
        print false ? p("t") : true ?. p("inner") : p("never");
    "#;
    let run = run_code(code);
    assert!(run.result.is_ok());
    assert_eq!(run.output, "t\nt\ne\ne\ninner\ninner\n");
}

#[test]
fn test_non_local_exits_restore_the_enclosing_frame() {
    let code = r#"
        var x = "outer";
        fun leave() {
            {
                var x = "shadow";
                return x;
            }
        }
        print leave();
        print x;
        while (true) {
            var x = "loop";
            {
                var x = "inner";
                print x;
                break;
            }
        }
        print x;
        for (var i = 0; i < 2; i = i + 1) {
            var x = i;
            print x;
            continue;
        }
        print x;
    "#;
    let run = run_code(code);
    assert!(run.result.is_ok(), "{:?}", run.diagnostics);
    assert_eq!(run.output, "shadow\nouter\ninner\nouter\n0\n1\nouter\n");
}

#[test]
fn test_runtime_error_inside_a_call_restores_the_global_frame() {
    let output = Arc::new(Mutex::new(Vec::new()));
    let mut interp = Interpreter::new();
    interp.set_output(output.clone());

    let code = "var x = \"global\";\nfun fail() { var x = \"local\"; { var y = nil + 1; } }\nfail();";
    assert!(run_with(&mut interp, &output, code).runtime_error().is_some());
    assert_eq!(run_with(&mut interp, &output, "print x;").output, "global\n");
}

#[test]
fn test_unassigned_and_undefined_are_distinct_errors() {
    let unassigned = run_code("var a;\nprint a;");
    assert_eq!(
        unassigned.runtime_error(),
        Some((RuntimeErrorKind::UnassignedVariable("a".into()), 2))
    );

    let undefined = run_code("print b;");
    assert_eq!(undefined.runtime_error(), Some((RuntimeErrorKind::UndefinedVariable("b".into()), 1)));

    let local = run_code("{ var c; print c; }");
    assert_eq!(local.runtime_error(), Some((RuntimeErrorKind::UnassignedVariable("c".into()), 1)));
}

#[test]
fn test_assignment_makes_a_variable_readable() {
    let run = run_code("var a; var b; a = b = 3; print a; print b;");
    assert!(run.result.is_ok());
    assert_eq!(run.output, "3\n3\n");
}

#[test]
fn test_runtime_error_message_format() {
    let run = run_code("var a;\n\nprint a;");
    match run.result {
        Err(RunError::Runtime(err)) => {
            assert_eq!(err.to_string(), "Unassigned variable 'a' accessed.\n[line 3]")
        }
        other => panic!("expected runtime error, got {:?}", other),
    }
}

#[test]
fn test_self_referencing_initializer_is_a_resolution_error() {
    let run = run_code("var a = a;");
    assert!(matches!(run.result, Err(RunError::Compile(1))));
    assert_eq!(
        run.diagnostics,
        vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
    );
    assert_eq!(run.output, "");
}

#[test]
fn test_unused_local_is_a_warning_only() {
    let run = run_code("{ var unused = 1; }\nprint \"ran\";");
    assert!(run.result.is_ok());
    assert_eq!(run.output, "ran\n");
    assert_eq!(run.diagnostics, vec!["[line 1] Warning at 'unused': Variable is unused."]);
}

#[test]
fn test_logical_operators_short_circuit() {
    let code = r#"
        fun sideEffect() { print "called"; return true; }
        print false and sideEffect();
        print true or sideEffect();
        print nil or "default";
        print 1 and 2;
    "#;
    assert_eq!(run_code(code).output, "false\ntrue\ndefault\n2\n");
}

#[test]
fn test_ternary_associativity() {
    let code = r#"
        print true ? 1 : 2;
        print false ? 1 : true ? 2 : 3;
        print true ? false : true ? "a" : "b";
        print true ?. false : true ?. "a" : "b";
    "#;
    assert_eq!(run_code(code).output, "1\n2\nfalse\nb\n");
}

#[test]
fn test_for_loop_continue_still_runs_increment() {
    let code = r#"
        for (var i = 0; i < 6; i = i + 1) {
            if (i == 2) continue;
            if (i == 4) break;
            print i;
        }
    "#;
    let run = run_code(code);
    assert!(run.result.is_ok());
    assert_eq!(run.output, "0\n1\n3\n");
}

#[test]
fn test_while_loop_break_and_continue() {
    let code = r#"
        var i = 0;
        while (true) {
            i = i + 1;
            if (i < 3) continue;
            print i;
            break;
        }
    "#;
    assert_eq!(run_code(code).output, "3\n");
}

#[test]
fn test_return_unwinds_nested_loops() {
    let code = r#"
        fun find() {
            for (var i = 0; i < 10; i = i + 1) {
                while (true) {
                    if (i == 3) return i;
                    break;
                }
            }
            return -1;
        }
        print find();
    "#;
    assert_eq!(run_code(code).output, "3\n");
}

#[test]
fn test_recursion() {
    let code = "fun fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }\nprint fib(15);";
    assert_eq!(run_code(code).output, "610\n");
}

#[test]
fn test_lambdas_and_grouping_disambiguation() {
    let code = r#"
        var add = (a, b) => a + b;
        print add(2, 3);
        print (x => x * 2)(4);
        var a = 1;
        var b = 2;
        print (a + b) * 2;
        print (a) + 1;
        var shout = s => { return s + "!"; };
        print shout("hi");
        print (() => "thunk")();
    "#;
    let run = run_code(code);
    assert!(run.result.is_ok(), "{:?}", run.diagnostics);
    assert_eq!(run.output, "5\n8\n6\n2\nhi!\nthunk\n");
}

#[test]
fn test_arity_and_callable_errors() {
    let arity = run_code("fun f(a) { return a; }\nf(1, 2);");
    assert_eq!(
        arity.runtime_error(),
        Some((RuntimeErrorKind::ArityMismatch { expected: 1, got: 2 }, 2))
    );

    let not_callable = run_code("\"str\"();");
    assert_eq!(not_callable.runtime_error(), Some((RuntimeErrorKind::NotCallable, 1)));

    let native = run_code("clock(1);");
    assert_eq!(
        native.runtime_error(),
        Some((RuntimeErrorKind::ArityMismatch { expected: 0, got: 1 }, 1))
    );
}

#[test]
fn test_string_concatenation_and_type_errors() {
    assert_eq!(run_code("print \"a\" + \"b\";").output, "ab\n");
    assert_eq!(
        run_code("print \"a\" + 1;").runtime_error(),
        Some((RuntimeErrorKind::InvalidAddition, 1))
    );
    assert_eq!(
        run_code("print 1 < \"2\";").runtime_error(),
        Some((RuntimeErrorKind::OperandsMustBeNumbers, 1))
    );
    assert_eq!(
        run_code("var x = 1;\nprint -\"a\";").runtime_error(),
        Some((RuntimeErrorKind::OperandMustBeNumber, 2))
    );
}

#[test]
fn test_value_display() {
    let code = r#"
        fun named() {}
        print 1 / 2;
        print 10 / 2;
        print 1 / 0;
        print nil;
        print named;
        print () => 1;
        print clock;
        print !nil;
        print 0 ? "truthy" : "falsey";
    "#;
    assert_eq!(
        run_code(code).output,
        "0.5\n5\ninf\nnil\n<fn named>\n<lambda>\n<native fn clock>\ntrue\ntruthy\n"
    );
}

#[test]
fn test_equality_never_crosses_types() {
    let code = "print nil == nil; print 1 == \"1\"; print \"a\" == \"a\"; print nil != false;";
    assert_eq!(run_code(code).output, "true\nfalse\ntrue\ntrue\n");
}

#[test]
fn test_print_sexpr_shows_tree_and_value() {
    assert_eq!(run_code("printSexpr 1 + 2 * 3;").output, "(+ 1 (* 2 3)) => 7\n");
}

#[test]
fn test_closures_bind_statically() {
    let code = r#"
        var a = "global";
        {
            fun show() { print a; }
            show();
            var a = "block";
            show();
        }
    "#;
    let run = run_code(code);
    assert_eq!(run.output, "global\nglobal\n");
    assert_eq!(run.diagnostics, vec!["[line 6] Warning at 'a': Variable is unused."]);
}

#[test]
fn test_block_scoping_and_shadowing() {
    let code = r#"
        var x = "outer";
        {
            var x = "inner";
            print x;
        }
        print x;
    "#;
    assert_eq!(run_code(code).output, "inner\nouter\n");
}

#[test]
fn test_resolver_errors_block_execution() {
    let run = run_code("print 1;\nreturn 2;");
    assert!(matches!(run.result, Err(RunError::Compile(1))));
    assert_eq!(run.output, "");
    assert_eq!(run.diagnostics, vec!["[line 2] Error at 'return': Can't return from top-level code."]);

    let run = run_code("{ var a = 1; var a = 2; print a; }");
    assert_eq!(
        run.diagnostics,
        vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
    );
}

#[test]
fn test_break_does_not_cross_a_lambda_boundary() {
    let run = run_code("while (true) { var f = () => { break; }; f(); break; }");
    assert!(matches!(run.result, Err(RunError::Compile(1))));
    assert_eq!(run.diagnostics, vec!["[line 1] Error at 'break': Can't use 'break' outside of a loop."]);
}

#[test]
fn test_parse_errors_are_collected_after_synchronizing() {
    let run = run_code("var = 1;\nprint ;\nprint \"ok\";");
    assert!(matches!(run.result, Err(RunError::Compile(2))));
    assert_eq!(
        run.diagnostics,
        vec![
            "[line 1] Error at '=': Expect variable name.",
            "[line 2] Error at ';': Expect expression.",
        ]
    );
    assert_eq!(run.output, "");
}

#[test]
fn test_lexical_errors_are_reported_without_a_lexeme() {
    let run = run_code("print 1;\n@");
    assert!(matches!(run.result, Err(RunError::Compile(_))));
    assert_eq!(run.diagnostics[0], "[line 2] Error: Unexpected character, '@'.");
}

#[test]
fn test_runtime_error_stops_execution() {
    let run = run_code("print 1;\nprint nil + 1;\nprint 2;");
    assert_eq!(run.output, "1\n");
    assert_eq!(run.runtime_error(), Some((RuntimeErrorKind::InvalidAddition, 2)));
}

#[test]
fn test_globals_persist_across_runs() {
    let output = Arc::new(Mutex::new(Vec::new()));
    let mut interp = Interpreter::new();
    interp.set_output(output.clone());

    assert!(run_with(&mut interp, &output, "var total = 1; fun bump() { total = total + 1; }").result.is_ok());
    assert!(run_with(&mut interp, &output, "bump(); bump();").result.is_ok());
    assert_eq!(run_with(&mut interp, &output, "print total;").output, "3\n");

    // Redeclaring a global may read the previous binding.
    assert_eq!(run_with(&mut interp, &output, "var total = total * 10; print total;").output, "30\n");

    let failed = run_with(&mut interp, &output, "fun broken() { return missing; } broken();");
    assert!(failed.runtime_error().is_some());
    assert_eq!(run_with(&mut interp, &output, "print total;").output, "30\n");
}

#[test]
fn test_clock_is_a_number() {
    assert_eq!(run_code("print clock() > 0;").output, "true\n");
}

#[test]
fn test_deep_recursion_reports_stack_overflow() {
    // Run on a thread with a generous stack; the interpreter stops at its own
    // call depth limit well before the host stack is exhausted.
    let handle = std::thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(|| run_code("fun dive(n) { return dive(n + 1); }\ndive(0);").runtime_error())
        .unwrap();
    assert_eq!(handle.join().unwrap(), Some((RuntimeErrorKind::StackOverflow, 1)));
}
