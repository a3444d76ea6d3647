//! Standard prelude with built-in functions

use super::Environment;
use crate::builtins::{arith, closure, compare, control, env, ffi, list, trap};
use crate::value::{Arity, BuiltinFn, Value};

impl Environment {
    /// Create an environment with standard built-in functions.
    pub fn with_prelude() -> Self {
        let mut env = Self::new();
        env.load_prelude();
        env
    }

    /// Load the standard prelude into this environment.
    pub fn load_prelude(&mut self) {
        let builtins = [
            // Arithmetic
            BuiltinFn::new("+", Arity::at_least(0), arith::add),
            BuiltinFn::new("-", Arity::at_least(1), arith::sub),
            BuiltinFn::new("*", Arity::at_least(0), arith::mul),
            BuiltinFn::new("/", Arity::at_least(1), arith::div),
            BuiltinFn::new("%", Arity::exact(2), arith::rem),
            // Comparison
            BuiltinFn::new("<", Arity::at_least(1), compare::lt),
            BuiltinFn::new("<=", Arity::at_least(1), compare::le),
            BuiltinFn::new(">", Arity::at_least(1), compare::gt),
            BuiltinFn::new(">=", Arity::at_least(1), compare::ge),
            BuiltinFn::new("=", Arity::at_least(1), compare::eq),
            BuiltinFn::new("!=", Arity::at_least(1), compare::ne),
            // Lists
            BuiltinFn::new("list", Arity::at_least(0), list::list),
            BuiltinFn::new("length", Arity::exact(1), list::length),
            BuiltinFn::new("nth", Arity::exact(2), list::nth),
            BuiltinFn::new("first", Arity::exact(1), list::first),
            BuiltinFn::new("rest", Arity::exact(1), list::rest),
            BuiltinFn::new("cons", Arity::exact(2), list::cons),
            BuiltinFn::new("append", Arity::at_least(1), list::append),
            BuiltinFn::new("remove", Arity::exact(2), list::remove),
            BuiltinFn::new("concat", Arity::at_least(0), list::concat),
            BuiltinFn::new("pair", Arity::exact(2), list::pair),
            // Bindings
            BuiltinFn::new("define", Arity::exact(2), env::define),
            BuiltinFn::new("set", Arity::exact(2), env::set),
            BuiltinFn::new("undefine", Arity::exact(1), env::undefine),
            // Evaluation and control
            BuiltinFn::new("eval", Arity::exact(1), control::eval),
            BuiltinFn::new("progn", Arity::at_least(0), control::progn),
            BuiltinFn::new("print", Arity::at_least(0), control::print),
            BuiltinFn::new("dump", Arity::at_least(0), control::dump),
            BuiltinFn::new("if", Arity::range(2, 3), control::if_),
            BuiltinFn::new("while", Arity::exact(2), control::while_),
            BuiltinFn::new("not", Arity::exact(1), control::not),
            // Functions
            BuiltinFn::new("let", Arity::exact(2), closure::let_),
            BuiltinFn::new("defun", Arity::exact(3), closure::defun),
            BuiltinFn::new("lambda", Arity::exact(2), closure::lambda),
            BuiltinFn::new("funcall", Arity::at_least(1), closure::funcall),
            // Traps
            BuiltinFn::new("trap", Arity::exact(2), trap::trap),
            BuiltinFn::new("untrap", Arity::exact(1), trap::untrap),
            BuiltinFn::new("raise", Arity::at_least(1), trap::raise),
            BuiltinFn::new("debugger", Arity::at_least(0), crate::trap::builtin_debugger),
            // Native interface
            BuiltinFn::new("ffi", Arity::exact(4), ffi::ffi),
            BuiltinFn::new("defstruct", Arity::exact(2), ffi::defstruct),
            BuiltinFn::new("struct", Arity::at_least(1), ffi::pack),
            BuiltinFn::new("sizeof", Arity::exact(1), ffi::sizeof),
            BuiltinFn::new("alignof", Arity::exact(1), ffi::alignof),
            BuiltinFn::new("offsetof", Arity::exact(2), ffi::offsetof),
            BuiltinFn::new("buffer", Arity::exact(1), ffi::buffer),
        ];

        for builtin in builtins {
            self.define_builtin(builtin);
        }

        self.add("quote", Value::Quote);
    }
}
