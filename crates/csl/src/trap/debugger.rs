//! The interactive fallback handler

use std::io::Write;

use tracing::{debug, warn};

use crate::environment::Scope;
use crate::error::EvalError;
use crate::eval::{CallResult, EvalResult};
use crate::reader;
use crate::runtime::Runtime;
use crate::value::Value;

const HELP: &str = "\
commands:
   help            this text
   bt              print the call stack
   locals          print the local scope
   globals         print the global table
   traps           print the trap table
   kill <code>     terminate with exit code <code>
   eval <expr>     evaluate <expr> in the faulting scope and print it
   resume <expr>   evaluate <expr> and use it as the handler result
                   (resume 0 retries the faulting operation)
";

/// One interactive session, opened when a condition reaches the
/// `debugger` handler.
///
/// The session reads `<command>[: <argument>]` lines from the runtime's
/// control stream and writes to its diagnostic stream. Sessions nest: a
/// fault raised by an `eval` inside a session opens another one.
pub struct DebugSession<'a> {
    rt: &'a mut Runtime,
    scope: Scope,
    condition: String,
    args: Vec<Value>,
    depth: usize,
    stack_mark: usize,
}

/// A parsed console line.
#[derive(Debug, PartialEq)]
enum Command<'l> {
    Help,
    Backtrace,
    Locals,
    Globals,
    Traps,
    Kill(&'l str),
    Eval(&'l str),
    Resume(&'l str),
    Empty,
    Unknown(&'l str),
}

impl<'l> Command<'l> {
    fn parse(line: &'l str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }

        let (cmd, arg) = match line.find(|c: char| c == ':' || c.is_whitespace()) {
            Some(at) => (&line[..at], line[at + 1..].trim()),
            None => (line, ""),
        };

        match cmd {
            "help" | "?" => Command::Help,
            "bt" => Command::Backtrace,
            "locals" => Command::Locals,
            "globals" => Command::Globals,
            "traps" => Command::Traps,
            "kill" => Command::Kill(arg),
            "eval" => Command::Eval(arg),
            "resume" => Command::Resume(arg),
            other => Command::Unknown(other),
        }
    }
}

impl<'a> DebugSession<'a> {
    /// Open a session for `condition` raised with `args` in `scope`.
    pub fn new(rt: &'a mut Runtime, scope: Scope, condition: String, args: Vec<Value>) -> Self {
        let depth = rt.trap_depth;
        let stack_mark = rt.stack.len();
        Self {
            rt,
            scope,
            condition,
            args,
            depth,
            stack_mark,
        }
    }

    /// Print the state report, then serve console commands until one
    /// resolves the condition.
    ///
    /// # Errors
    ///
    /// - `Unresolved` when the control stream ends
    /// - `Killed` on the `kill` command
    /// - `Io` if a stream fails
    pub fn run(mut self) -> EvalResult {
        debug!(condition = %self.condition, depth = self.depth, "debugger session opened");
        self.report()?;

        loop {
            write!(
                self.rt.io.diagnostics,
                "debug[{}:{}]> ",
                self.depth, self.condition
            )?;
            self.rt.io.diagnostics.flush()?;

            let mut line = String::new();
            if self.rt.io.control.read_line(&mut line)? == 0 {
                warn!(condition = %self.condition, "debugger control input closed");
                return Err(EvalError::Unresolved {
                    condition: self.condition,
                });
            }

            match Command::parse(&line) {
                Command::Empty => {}
                Command::Help => self.rt.io.diagnostics.write_all(HELP.as_bytes())?,
                Command::Backtrace => {
                    let stack = self.rt.stack.to_string();
                    writeln!(self.rt.io.diagnostics, "call stack (height at entry {}):", self.stack_mark)?;
                    write!(self.rt.io.diagnostics, "{}", stack)?;
                }
                Command::Locals => {
                    let locals = self.scope.to_string();
                    write!(self.rt.io.diagnostics, "{}", locals)?;
                }
                Command::Globals => {
                    let globals = self.rt.globals.to_string();
                    write!(self.rt.io.diagnostics, "{}", globals)?;
                }
                Command::Traps => {
                    let traps = self.rt.traps.to_string();
                    write!(self.rt.io.diagnostics, "{}", traps)?;
                }
                Command::Kill(arg) => match parse_exit_code(arg) {
                    Some(code) => {
                        debug!(code, "debugger kill");
                        return Err(EvalError::Killed { code });
                    }
                    None => writeln!(self.rt.io.diagnostics, "kill: `{}` is not an exit code", arg)?,
                },
                Command::Eval(src) => {
                    if let Some(value) = self.evaluate(src)? {
                        writeln!(self.rt.io.diagnostics, "{}", value)?;
                    }
                }
                Command::Resume(src) => {
                    if src.is_empty() {
                        return Ok(Value::Nil);
                    }
                    if let Some(value) = self.evaluate(src)? {
                        debug!(condition = %self.condition, %value, "debugger resumed");
                        return Ok(value);
                    }
                }
                Command::Unknown(cmd) => writeln!(
                    self.rt.io.diagnostics,
                    "unknown command `{}`; try `help`",
                    cmd
                )?,
            }
        }
    }

    /// Evaluate console text in the faulting scope. Reader errors are
    /// reported and yield `None`.
    fn evaluate(&mut self, src: &str) -> Result<Option<Value>, EvalError> {
        let forms = match reader::parse(src) {
            Ok(forms) => forms,
            Err(err) => {
                writeln!(self.rt.io.diagnostics, "parse error: {}", err)?;
                return Ok(None);
            }
        };
        let mut values = self.rt.eval_items(&self.scope, &forms)?;
        Ok(Some(values.pop().unwrap_or(Value::Nil)))
    }

    fn report(&mut self) -> Result<(), EvalError> {
        let out = &mut self.rt.io.diagnostics;
        writeln!(
            out,
            "*** condition `{}` (debugger depth {}, stack height {})",
            self.condition, self.depth, self.stack_mark
        )?;
        for (i, arg) in self.args.iter().enumerate() {
            writeln!(out, "   arg {}: {}", i, arg)?;
        }
        writeln!(out, "locals:")?;
        write!(out, "{}", self.scope)?;
        writeln!(out, "globals:")?;
        write!(out, "{}", self.rt.globals)?;
        writeln!(out, "call stack:")?;
        write!(out, "{}", self.rt.stack)?;
        writeln!(out, "traps:")?;
        write!(out, "{}", self.rt.traps)?;
        Ok(())
    }
}

fn parse_exit_code(arg: &str) -> Option<i32> {
    if arg.is_empty() {
        return Some(1);
    }
    arg.parse().ok()
}

/// The `debugger` builtin: `(debugger 'NAME args…)`.
pub(crate) fn builtin_debugger(rt: &mut Runtime, scope: &Scope, args: &[Value]) -> CallResult {
    let (name, rest) = match args.split_first() {
        Some((first, rest)) => (first.as_name().unwrap_or("?").to_string(), rest),
        None => ("?".to_string(), args),
    };
    Ok(DebugSession::new(rt, scope.clone(), name, rest.to_vec()).run()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_colon_and_space_forms() {
        assert_eq!(Command::parse("resume: 5\n"), Command::Resume("5"));
        assert_eq!(Command::parse("resume 5"), Command::Resume("5"));
        assert_eq!(Command::parse("eval (+ 1 2)"), Command::Eval("(+ 1 2)"));
        assert_eq!(Command::parse("  bt  "), Command::Backtrace);
        assert_eq!(Command::parse(""), Command::Empty);
        assert_eq!(Command::parse("frob"), Command::Unknown("frob"));
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(parse_exit_code("3"), Some(3));
        assert_eq!(parse_exit_code(""), Some(1));
        assert_eq!(parse_exit_code("x"), None);
    }
}
