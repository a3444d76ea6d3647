//! Evaluator tests: reading, the quote protocol, dispatch, builtins

use csl::reader::parse;
use csl::*;
use pretty_assertions::assert_eq;

fn eval(src: &str) -> Value {
    let (io, _, _) = RuntimeIo::capture("");
    Runtime::with_io(io).eval_str(src).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════
// Arithmetic and Comparison
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_arithmetic() {
    assert_eq!(eval("(+ 1 2)"), Value::Int(3));
    assert_eq!(eval("(+ 1 2.5)"), Value::Float(3.5));
    assert_eq!(eval("(+ 1 2.5)").to_string(), "3.50000");
    assert_eq!(eval("(- 5)"), Value::Int(-5));
    assert_eq!(eval("(- 10 1 2)"), Value::Int(7));
    assert_eq!(eval("(* 2 3 4)"), Value::Int(24));
    assert_eq!(eval("(/ 7 2)"), Value::Int(3));
    assert_eq!(eval("(% 7 2)"), Value::Int(1));
    assert_eq!(eval("(+)"), Value::Int(0));
}

#[test]
fn test_comparison_chains() {
    assert_eq!(eval("(< 1 2 3)"), Value::Int(1));
    assert_eq!(eval("(< 1 3 2)"), Value::Int(0));
    assert_eq!(eval("(= 1 1.0)"), Value::Int(1));
    assert_eq!(eval("(>= 3 3 1)"), Value::Int(1));
    assert_eq!(eval("(!= \"a\" \"b\")"), Value::Int(1));
}

#[test]
fn test_integer_division_by_zero_raises_sigfpe() {
    let mut rt = Runtime::new();
    rt.set_trap("SIGFPE", Value::symbol("list"));
    let result = rt.eval_str("(/ 1 0)").unwrap();
    assert_eq!(result.index(0), Some(&Value::symbol("SIGFPE")));
}

// ═══════════════════════════════════════════════════════════════════════
// Quote Protocol
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_quote_takes_next_item_literally() {
    assert_eq!(eval("'x"), Value::symbol("x"));
    assert_eq!(
        eval("(list 'a '(+ 1 2))"),
        Value::list(vec![
            Value::symbol("a"),
            Value::list(vec![Value::symbol("+"), Value::Int(1), Value::Int(2)]),
        ])
    );
    assert_eq!(eval("(eval '(+ 1 2))"), Value::Int(3));
}

#[test]
fn test_quote_marker_is_not_collected() {
    // A quote at the end of a list has nothing to apply to.
    assert_eq!(eval("(list 1 ')"), Value::list(vec![Value::Int(1)]));
    // A quoted quote is an ordinary item.
    assert_eq!(eval("(length (list '' 1))"), Value::Int(2));
}

#[test]
fn test_functions_are_taken_literally() {
    let f = eval("(lambda '(x) 'x)");
    assert!(f.is_function());
    // Evaluating a function value yields the function itself.
    assert_eq!(eval("(eval (lambda '(x) 'x))"), f);
}

// ═══════════════════════════════════════════════════════════════════════
// Functions and Control
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_defun_and_scope() -> anyhow::Result<()> {
    let mut rt = Runtime::new();
    rt.set_trap("EVAL-ERROR", Value::symbol("list"));
    rt.eval_str("(defun 'sq '(x) '(* x x))")?;
    assert_eq!(rt.eval_str("(sq 5)")?, Value::Int(25));
    let after = rt.eval_str("x")?;
    assert_eq!(after.index(0), Some(&Value::symbol("EVAL-ERROR")));
    Ok(())
}

#[test]
fn test_while_loop() -> anyhow::Result<()> {
    let mut rt = Runtime::new();
    let program = "
        (define 'i 0)
        (define 'sum 0)
        (while '(< i 5) '(progn (set 'sum (+ sum i)) (set 'i (+ i 1))))
        sum
    ";
    assert_eq!(rt.eval_str(program)?, Value::Int(10));
    Ok(())
}

#[test]
fn test_rest_parameters() {
    assert_eq!(
        eval("(funcall (lambda '(a &rest more) '(length more)) 1 2 3)"),
        Value::Int(2)
    );
}

#[test]
fn test_print_writes_output() -> anyhow::Result<()> {
    let (io, out, _) = RuntimeIo::capture("");
    let mut rt = Runtime::with_io(io);
    rt.eval_str("(print \"sum\" (+ 1 2.5) '(a \"b\"))")?;
    assert_eq!(out.contents(), "sum 3.50000 (a \"b\")\n");
    Ok(())
}

#[test]
fn test_program_value_is_last_form() -> anyhow::Result<()> {
    let mut rt = Runtime::new();
    assert_eq!(rt.eval_str("")?, Value::Nil);
    let forms = parse("(define 'a 1) (+ a 1)")?;
    assert_eq!(rt.eval_program(&forms)?, Value::Int(2));
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Faults in Dispatch
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_arity_conditions() -> anyhow::Result<()> {
    let mut rt = Runtime::new();
    rt.eval_str("(trap 'MISSING-PARAM list) (trap 'PARAM-COUNT list)")?;

    let few = rt.eval_str("(nth '(1 2))")?;
    assert_eq!(few.index(0), Some(&Value::symbol("MISSING-PARAM")));

    let many = rt.eval_str("(not 1 2)")?;
    assert_eq!(many.index(0), Some(&Value::symbol("PARAM-COUNT")));

    rt.eval_str("(defun 'two '(a b) 'a)")?;
    let few = rt.eval_str("(two 1)")?;
    assert_eq!(few.index(0), Some(&Value::symbol("MISSING-PARAM")));
    assert_eq!(
        few.index(1),
        Some(&Value::string("`two`: too few arguments (1)"))
    );

    let many = rt.eval_str("(two 1 2 3)")?;
    assert_eq!(
        many.index(1),
        Some(&Value::string("`two`: too many arguments (3)"))
    );

    // An anonymous function has no name to report.
    let few = rt.eval_str("(funcall (lambda '(a b) 'a) 1)")?;
    assert_eq!(
        few.index(1),
        Some(&Value::string("`lambda`: too few arguments (1)"))
    );
    Ok(())
}

#[test]
fn test_uncallable_head() -> anyhow::Result<()> {
    let mut rt = Runtime::new();
    rt.eval_str("(trap 'EVAL-ERROR list)")?;
    assert_eq!(
        rt.eval_str("(1 2)")?.index(0),
        Some(&Value::symbol("EVAL-ERROR"))
    );
    assert_eq!(
        rt.eval_str("()")?.index(0),
        Some(&Value::symbol("EVAL-ERROR"))
    );
    Ok(())
}

#[test]
fn test_parse_errors_surface_directly() {
    let mut rt = Runtime::new();
    assert!(matches!(
        rt.eval_str("(+ 1 2"),
        Err(CslError::Parse(ParseError::UnclosedList { line: 1, column: 1 }))
    ));
    assert!(matches!(
        rt.eval_str("\"open"),
        Err(CslError::Parse(ParseError::UnterminatedString { .. }))
    ));
    assert!(matches!(
        rt.eval_str(")"),
        Err(CslError::Parse(ParseError::UnexpectedClose { .. }))
    ));
}
