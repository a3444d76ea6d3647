//! Evaluation context configuration

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Configuration and limits for evaluation.
///
/// Owned by the [`crate::Runtime`] and consulted on every call, trap raise,
/// and list evaluation.
#[derive(Debug, Clone)]
pub struct EvalContext {
    /// Maximum call depth (stack overflow protection)
    pub max_call_depth: usize,

    /// Maximum trap-within-trap nesting
    pub max_trap_depth: usize,

    /// Maximum consecutive retries a handler may request for one fault
    pub max_trap_retries: usize,

    /// Interrupt flag - when set, the next list evaluation raises `SIGINT`
    pub interrupt: Arc<AtomicBool>,

    /// Whether to trace call dispatch (for debugging)
    pub trace: bool,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            max_trap_depth: 16,
            max_trap_retries: 1000,
            interrupt: Arc::new(AtomicBool::new(false)),
            trace: false,
        }
    }
}

impl EvalContext {
    /// Create a new context with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a custom call depth limit.
    pub fn with_max_call_depth(max_depth: usize) -> Self {
        Self {
            max_call_depth: max_depth,
            ..Default::default()
        }
    }

    /// Create a context with a custom trap nesting limit.
    pub fn with_max_trap_depth(max_depth: usize) -> Self {
        Self {
            max_trap_depth: max_depth,
            ..Default::default()
        }
    }

    /// Check if evaluation has been interrupted.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Request interruption of evaluation.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    /// Consume a pending interrupt, returning whether one was set.
    pub fn take_interrupt(&self) -> bool {
        self.interrupt.swap(false, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ctx = EvalContext::new();
        assert_eq!(ctx.max_call_depth, 1000);
        assert_eq!(ctx.max_trap_depth, 16);
        assert!(!ctx.is_interrupted());
    }

    #[test]
    fn test_take_interrupt_clears_flag() {
        let ctx = EvalContext::with_max_call_depth(10);
        ctx.interrupt();
        assert!(ctx.is_interrupted());
        assert!(ctx.take_interrupt());
        assert!(!ctx.is_interrupted());
        assert!(!ctx.take_interrupt());
    }
}
