//! End-to-end sessions through the public API: each line is run against one
//! persistent global environment and its printed form is compared the way
//! the read loop would show it.

use tinylisp::environment::Environment;
use tinylisp::evaluator::{create_global_env, eval};
use tinylisp::lexer::lex;
use tinylisp::parser::parse_str;
use tinylisp::value::Value;
use tinylisp::{Error, EvalLimits, run_line};

/// What the read loop prints for one line: nothing for `Unspecified`, the
/// value otherwise, `Error: ...` on failure
fn printed(line: &str, env: &Environment) -> String {
    match run_line(line, env, &EvalLimits::default()) {
        Ok(Value::Unspecified) => String::new(),
        Ok(value) => value.to_string(),
        Err(e) => format!("Error: {e}"),
    }
}

fn run_session(lines: &[(&str, &str)]) {
    let env = create_global_env();
    for (i, (line, expected)) in lines.iter().enumerate() {
        let output = printed(line, &env);
        if let Some(prefix) = expected.strip_suffix("...") {
            assert!(
                output.starts_with(prefix),
                "line #{} '{line}': expected output starting with {prefix:?}, got {output:?}",
                i + 1
            );
        } else {
            assert_eq!(output, *expected, "line #{} '{line}'", i + 1);
        }
    }
}

#[test]
fn test_pipeline_stages() {
    assert_eq!(lex("(+ 1 2)"), ["(", "+", "1", "2", ")"]);

    let expr = parse_str("(+ 1 2)").unwrap();
    assert_eq!(expr.to_string(), "(+ 1 2)");

    let env = create_global_env();
    assert_eq!(eval(&expr, &env).unwrap(), Value::Integer(3));
}

#[test]
fn test_arithmetic_session() {
    run_session(&[
        ("(+ 1 2)", "3"),
        ("(* 1.5 2)", "3.0"),
        ("(/ 1 4)", "0.25"),
        ("(- 5)", "-5"),
        ("(< 1 2)", "#t"),
        ("(> 1 2)", "#f"),
        ("(sqrt 2)", "1.4142135623730951"),
        ("(floor pi)", "3"),
        ("(gamma 5)", "24.0"),
        ("(erf 0)", "0.0"),
        ("inf", "inf"),
        ("(/ 1 0)", "Error: EvaluationError: division by zero..."),
        ("(exp 1000)", "Error: EvaluationError: math range error..."),
    ]);
}

#[test]
fn test_definitions_session() {
    run_session(&[
        ("(define x 5)", ""),
        ("x", "5"),
        ("(define square (lambda (n) (* n n)))", ""),
        ("(square x)", "25"),
        ("square", "#<closure (n)>"),
        ("car", "#<builtin:car>"),
        ("(if 0 1 2)", "2"),
        ("(quote (a (b 1.5) ()))", "((a (b 1.5) ()))"),
        ("(cons x (list 1 2))", "(5 1 2)"),
        ("(cdr (list))", "()"),
    ]);
}

#[test]
fn test_errors_do_not_end_session() {
    run_session(&[
        ("(define total 1)", ""),
        ("(", "Error: SyntaxError: unexpected end of input"),
        (")", "Error: SyntaxError: unexpected close paren"),
        ("nope", "Error: Unbound symbol: nope"),
        ("(1 2)", "Error: Cannot apply non-callable value: 1"),
        ("(car 1 2)", "Error: ArityError: expected 1 arguments, got 2"),
        ("(define total (car (list)))", "Error: EvaluationError: car of empty list..."),
        ("total", "1"),
        ("(+ total 1)", "2"),
    ]);
}

#[test]
fn test_untaken_branch_define_never_happens() {
    let env = create_global_env();
    assert_eq!(printed("(if 1 (define taken 1) (define skipped 2))", &env), "");
    assert_eq!(printed("taken", &env), "1");
    assert_eq!(printed("skipped", &env), "Error: Unbound symbol: skipped");
}

#[test]
fn test_lambda_application_and_scoping() {
    let env = create_global_env();
    assert_eq!(printed("((lambda (x) (+ x x)) 3)", &env), "6");

    // define inside a body binds in the call frame only
    assert_eq!(printed("(define x 1)", &env), "");
    assert_eq!(printed("(define set-x (lambda () (define x 99)))", &env), "");
    assert_eq!(printed("(set-x)", &env), "");
    assert_eq!(printed("x", &env), "1");

    // A frame created by an unrelated call is invisible to the closure body
    assert_eq!(printed("(define make (lambda () (lambda () y)))", &env), "");
    assert_eq!(printed("(define get-y (make))", &env), "");
    assert_eq!(printed("(define with-y (lambda (y) (get-y)))", &env), "");
    assert_eq!(printed("(with-y 42)", &env), "Error: Unbound symbol: y");
}

#[test]
fn test_recursive_program() {
    let env = create_global_env();
    let program = [
        "(define fact (lambda (n) (if (<= n 1) 1 (* n (fact (- n 1))))))",
        "(define range (lambda (a b) (if (>= a b) (list) (cons a (range (+ a 1) b)))))",
        "(define map (lambda (f xs) (if (null? xs) (list) (cons (f (car xs)) (map f (cdr xs))))))",
    ];
    for line in program {
        run_line(line, &env, &EvalLimits::default()).unwrap();
    }

    assert_eq!(printed("(fact 10)", &env), "3628800");
    assert_eq!(printed("(map fact (range 1 6))", &env), "(1 2 6 24 120)");
    assert_eq!(printed("(length (range 0 20))", &env), "20");
}

#[test]
fn test_depth_limit_is_recoverable() {
    let env = create_global_env();
    let limits = EvalLimits { max_depth: 64 };
    run_line("(define spin (lambda (n) (spin (+ n 1))))", &env, &limits).unwrap();

    let err = run_line("(spin 0)", &env, &limits).unwrap_err();
    assert!(!err.is_syntax_error());
    assert!(matches!(err, Error::EvalError(ref msg) if msg.contains("depth limit")));
    assert_eq!(run_line("(+ 2 2)", &env, &limits).unwrap(), Value::Integer(4));
}

#[test]
fn test_default_depth_limit_on_small_thread_stack() {
    // The evaluator grows its own stack, so even a small thread reaches the
    // depth limit instead of overflowing
    let worker = std::thread::Builder::new()
        .stack_size(512 * 1024)
        .spawn(|| {
            let env = create_global_env();
            let limits = EvalLimits::default();
            run_line("(define spin (lambda (n) (spin (+ n 1))))", &env, &limits).unwrap();
            run_line("(spin 0)", &env, &limits).unwrap_err()
        })
        .unwrap();

    let err = worker.join().unwrap();
    assert!(
        matches!(err, Error::EvalError(ref msg) if msg.starts_with("Evaluation depth limit exceeded")),
        "{err:?}"
    );
}

#[test]
fn test_integer_literal_round_trip() {
    let env = create_global_env();
    for literal in ["0", "42", "-17", "+8", "9223372036854775807", "-9223372036854775808"] {
        let first = printed(literal, &env);
        assert_eq!(printed(&first, &env), first, "{literal}");
    }
}
