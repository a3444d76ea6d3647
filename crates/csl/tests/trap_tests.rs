//! Trap protocol and debugger console tests
//!
//! Every runtime here talks to captured streams so an unhandled fault
//! reads its debugger commands from a string instead of stdin.

use csl::*;
use pretty_assertions::assert_eq;

fn console(control: &str) -> (Runtime, SharedBuffer) {
    let (io, _, diag) = RuntimeIo::capture(control);
    (Runtime::with_io(io), diag)
}

// ═══════════════════════════════════════════════════════════════════════
// Debugger Console
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_resume_supplies_result() -> anyhow::Result<()> {
    let (mut rt, diag) = console("resume 5\n");
    assert_eq!(rt.eval_str("(+ 1 \"x\")")?, Value::Int(5));

    let text = diag.contents();
    assert!(text.contains("*** condition `BAD-PARAM`"), "{text}");
    assert!(text.contains("debug[1:BAD-PARAM]> "), "{text}");
    Ok(())
}

#[test]
fn test_kill_is_fatal() {
    let (mut rt, _) = console("kill 3\n");
    let err = rt.eval_str("(+ 1 \"x\")").unwrap_err();
    assert!(matches!(err, CslError::Eval(EvalError::Killed { code: 3 })));
}

#[test]
fn test_closed_control_stream_is_unresolved() {
    let (mut rt, _) = console("");
    let err = rt.eval_str("(+ 1 \"x\")").unwrap_err();
    assert!(matches!(
        err,
        CslError::Eval(EvalError::Unresolved { ref condition }) if condition == "BAD-PARAM"
    ));
}

#[test]
fn test_eval_prints_then_resume() -> anyhow::Result<()> {
    let (mut rt, diag) = console("eval (+ 2 2)\nresume 1\n");
    assert_eq!(rt.eval_str("(+ 1 \"x\")")?, Value::Int(1));
    assert!(diag.contents().contains("4\n"));
    Ok(())
}

#[test]
fn test_eval_sees_faulting_scope() -> anyhow::Result<()> {
    let (mut rt, diag) = console("eval (* n 10)\nresume n\n");
    rt.eval_str("(defun 'f '(n) '(+ n \"x\"))")?;
    assert_eq!(rt.eval_str("(f 4)")?, Value::Int(4));
    assert!(diag.contents().contains("40\n"));
    Ok(())
}

#[test]
fn test_nested_sessions() -> anyhow::Result<()> {
    let (mut rt, diag) = console("eval nope\nresume 7\nresume 1\n");
    assert_eq!(rt.eval_str("(+ 1 \"x\")")?, Value::Int(1));

    let text = diag.contents();
    assert!(text.contains("debug[1:BAD-PARAM]> "), "{text}");
    assert!(text.contains("debug[2:EVAL-ERROR]> "), "{text}");
    // The inner session's resolution is what `eval` printed.
    assert!(text.contains("7\n"), "{text}");
    Ok(())
}

#[test]
fn test_console_commands() -> anyhow::Result<()> {
    let (mut rt, diag) = console("help\nbt\nfrob\nkill x\nresume\n");
    assert_eq!(rt.eval_str("(+ 1 \"x\")")?, Value::Nil);

    let text = diag.contents();
    assert!(text.contains("resume <expr>"), "{text}");
    assert!(text.contains("unknown command `frob`"), "{text}");
    assert!(text.contains("kill: `x` is not an exit code"), "{text}");
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Handlers
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_handler_result_replaces_call() -> anyhow::Result<()> {
    let (mut rt, _) = console("");
    rt.eval_str("(trap 'BAD-PARAM (lambda '(c msg &rest culprits) 'culprits))")?;
    assert_eq!(
        rt.eval_str("(+ 1 \"x\")")?,
        Value::list(vec![Value::Int(1), Value::string("x")])
    );
    Ok(())
}

#[test]
fn test_handler_retry_after_binding() -> anyhow::Result<()> {
    let (mut rt, _) = console("");
    rt.eval_str(
        "(trap 'EVAL-ERROR (lambda '(c msg name) '(progn (define name 10) 0)))",
    )?;
    assert_eq!(rt.eval_str("(+ y 1)")?, Value::Int(11));
    assert_eq!(rt.globals().find("y"), Some(&Value::Int(10)));
    Ok(())
}

#[test]
fn test_retry_limit() {
    let (io, _, _) = RuntimeIo::capture("");
    let ctx = EvalContext {
        max_trap_retries: 3,
        ..EvalContext::default()
    };
    let mut rt = Runtime::with_parts(ctx, io);
    rt.eval_str("(trap 'BAD-PARAM (lambda '(&rest any) 0))").unwrap();

    let err = rt.eval_str("(+ 1 \"x\")").unwrap_err();
    assert!(matches!(
        err,
        CslError::Eval(EvalError::RetryLimit { retries: 3, .. })
    ));
}

#[test]
fn test_faulting_handler_hits_trap_depth() {
    let (io, _, _) = RuntimeIo::capture("");
    let mut rt = Runtime::with_parts(EvalContext::with_max_trap_depth(4), io);
    rt.eval_str("(trap 'BAD-PARAM (lambda '(&rest any) '(+ 1 \"again\")))")
        .unwrap();

    let err = rt.eval_str("(+ 1 \"x\")").unwrap_err();
    assert!(matches!(
        err,
        CslError::Eval(EvalError::TrapDepthExceeded { max: 4, .. })
    ));
    assert_eq!(rt.trap_depth(), 0);
}

#[test]
fn test_unhandled_condition() {
    let (mut rt, _) = console("");
    let err = rt.eval_str("(raise 'NOBODY-LISTENS 1)").unwrap_err();
    assert!(matches!(
        err,
        CslError::Eval(EvalError::Unhandled { ref condition }) if condition == "NOBODY-LISTENS"
    ));
}

#[test]
fn test_interrupt_raises_sigint() -> anyhow::Result<()> {
    let (mut rt, _) = console("");
    rt.set_trap("SIGINT", Value::symbol("list"));
    rt.context().interrupt();
    // The handler's value is discarded; evaluation carries on.
    assert_eq!(rt.eval_str("(+ 1 2)")?, Value::Int(3));
    assert!(!rt.context().is_interrupted());
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_delivered_signal_raises_its_trap() -> anyhow::Result<()> {
    use signal_hook::consts::SIGUSR1;

    let (mut rt, _) = console("");
    rt.watch_signals()?;
    rt.eval_str("(define 'hits 0)")?;
    rt.eval_str("(trap 'SIGUSR1 (lambda '(&rest any) '(set 'hits (+ hits 1))))")?;

    signal_hook::low_level::raise(SIGUSR1)?;
    assert_eq!(rt.eval_str("(+ 1 1)")?, Value::Int(2));
    assert_eq!(rt.globals().find("hits"), Some(&Value::Int(1)));

    // The flag was consumed; the next evaluation raises nothing.
    rt.eval_str("(+ 1 1)")?;
    assert_eq!(rt.globals().find("hits"), Some(&Value::Int(1)));
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Limits
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_runaway_recursion_is_stack_overflow() {
    let (io, _, _) = RuntimeIo::capture("");
    let mut rt = Runtime::with_parts(EvalContext::with_max_call_depth(64), io);
    rt.eval_str("(defun 'forever '(n) '(forever (+ n 1)))").unwrap();

    let err = rt.eval_str("(forever 0)").unwrap_err();
    assert!(matches!(
        err,
        CslError::Eval(EvalError::StackOverflow { max: 64, .. })
    ));
    assert!(rt.stack().is_empty());
}
