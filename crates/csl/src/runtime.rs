//! The runtime instance and its I/O streams

use std::cell::RefCell;
use std::fmt;
use std::io::{self, BufRead, Cursor, Write};
use std::rc::Rc;

use tracing::debug;

use crate::context::EvalContext;
use crate::environment::{Environment, Scope};
use crate::error::{EvalError, Result};
use crate::eval::{CallStack, EvalResult};
use crate::ffi::FfiRegistry;
use crate::reader;
use crate::trap::{Condition, Signal, SignalWatch};
use crate::value::Value;

/// An in-memory sink that can be cloned and read back.
///
/// # Example
///
/// ```
/// use std::io::Write;
/// use csl::SharedBuffer;
///
/// let buf = SharedBuffer::new();
/// let mut sink = buf.clone();
/// write!(sink, "hello").unwrap();
/// assert_eq!(buf.contents(), "hello");
/// ```
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Discard everything written so far.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedBuffer({} bytes)", self.0.borrow().len())
    }
}

/// The streams a runtime talks to.
pub struct RuntimeIo {
    /// Where `print` and `dump` write
    pub output: Box<dyn Write>,

    /// Where trap reports and the debugger console write
    pub diagnostics: Box<dyn Write>,

    /// Where the debugger console reads commands
    pub control: Box<dyn BufRead>,
}

impl Default for RuntimeIo {
    /// stdout, stderr, stdin
    fn default() -> Self {
        Self {
            output: Box::new(io::stdout()),
            diagnostics: Box::new(io::stderr()),
            control: Box::new(io::stdin().lock()),
        }
    }
}

impl RuntimeIo {
    /// Capture output and diagnostics in memory and feed the debugger
    /// console from `control`.
    ///
    /// Returns the streams plus handles to the output and diagnostic
    /// buffers.
    pub fn capture(control: &str) -> (Self, SharedBuffer, SharedBuffer) {
        let output = SharedBuffer::new();
        let diagnostics = SharedBuffer::new();
        let io = Self {
            output: Box::new(output.clone()),
            diagnostics: Box::new(diagnostics.clone()),
            control: Box::new(Cursor::new(control.as_bytes().to_vec())),
        };
        (io, output, diagnostics)
    }
}

impl fmt::Debug for RuntimeIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RuntimeIo")
    }
}

/// The interpreter: global table, trap table, call stack, FFI registry,
/// configuration, and streams.
///
/// A fresh runtime has the builtin library bound in its global table and
/// the `debugger` handler registered for every signal name and runtime
/// condition.
pub struct Runtime {
    pub(crate) globals: Environment,
    pub(crate) traps: Environment,
    pub(crate) stack: CallStack,
    pub(crate) ffi: FfiRegistry,
    pub(crate) ctx: EvalContext,
    pub(crate) io: RuntimeIo,
    pub(crate) trap_depth: usize,
    pub(crate) signals: Option<SignalWatch>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create a runtime with default configuration and standard streams.
    pub fn new() -> Self {
        Self::with_parts(EvalContext::default(), RuntimeIo::default())
    }

    /// Create a runtime with custom limits.
    pub fn with_context(ctx: EvalContext) -> Self {
        Self::with_parts(ctx, RuntimeIo::default())
    }

    /// Create a runtime talking to custom streams.
    pub fn with_io(io: RuntimeIo) -> Self {
        Self::with_parts(EvalContext::default(), io)
    }

    /// Create a runtime with custom limits and streams.
    pub fn with_parts(ctx: EvalContext, io: RuntimeIo) -> Self {
        let mut traps = Environment::new();
        for condition in Condition::defaults() {
            traps.add(condition.name(), Value::symbol("debugger"));
        }

        Self {
            globals: Environment::with_prelude(),
            traps,
            stack: CallStack::new(),
            ffi: FfiRegistry::new(),
            ctx,
            io,
            trap_depth: 0,
            signals: None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Evaluation entry points
    // ═══════════════════════════════════════════════════════════════════

    /// Read `src` and evaluate it as a program, returning the value of the
    /// last top-level form (or `Nil` for an empty program).
    pub fn eval_str(&mut self, src: &str) -> Result<Value> {
        let forms = reader::parse(src)?;
        Ok(self.eval_program(&forms)?)
    }

    /// Evaluate top-level forms in the global scope.
    ///
    /// Top-level forms follow the same quote protocol as list items.
    pub fn eval_program(&mut self, forms: &[Value]) -> EvalResult {
        self.eval_sequence(&Scope::global(), forms)
    }

    /// Install flag handlers for the POSIX signals; delivered signals
    /// raise the condition of the same name at the next list evaluation.
    pub fn watch_signals(&mut self) -> io::Result<()> {
        if self.signals.is_none() {
            let watch = SignalWatch::install()?;
            let names: Vec<_> = watch.watched().map(Signal::name).collect();
            debug!(signals = ?names, "watching signals");
            self.signals = Some(watch);
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════

    /// The global table.
    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    /// The global table, mutably.
    pub fn globals_mut(&mut self) -> &mut Environment {
        &mut self.globals
    }

    /// Bind a global.
    pub fn define(&mut self, name: &str, value: Value) {
        self.globals.add(name, value);
    }

    /// The trap table.
    pub fn traps(&self) -> &Environment {
        &self.traps
    }

    /// Calls in progress.
    pub fn stack(&self) -> &CallStack {
        &self.stack
    }

    /// The FFI registry.
    pub fn ffi(&self) -> &FfiRegistry {
        &self.ffi
    }

    /// The FFI registry, mutably (e.g. to preload symbols).
    pub fn ffi_mut(&mut self) -> &mut FfiRegistry {
        &mut self.ffi
    }

    /// Configuration.
    pub fn context(&self) -> &EvalContext {
        &self.ctx
    }

    /// The streams.
    pub fn io_mut(&mut self) -> &mut RuntimeIo {
        &mut self.io
    }

    /// Current trap nesting.
    pub fn trap_depth(&self) -> usize {
        self.trap_depth
    }

    /// Write to the output stream.
    pub(crate) fn write_output(&mut self, text: &str) -> std::result::Result<(), EvalError> {
        self.io.output.write_all(text.as_bytes())?;
        self.io.output.flush()?;
        Ok(())
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("globals", &self.globals.len())
            .field("traps", &self.traps.len())
            .field("stack", &self.stack.len())
            .field("trap_depth", &self.trap_depth)
            .finish()
    }
}
