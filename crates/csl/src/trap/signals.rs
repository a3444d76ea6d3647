//! POSIX signal names and the flag-based signal watch
//!
//! Handlers installed by [`SignalWatch`] only set an atomic flag; nothing
//! runs in signal context. The evaluator polls the flags before each list
//! evaluation and raises the trap named after the signal.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

/// A POSIX signal the runtime has a condition name for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `SIGHUP`
    Hup,
    /// `SIGINT`
    Int,
    /// `SIGQUIT`
    Quit,
    /// `SIGILL`
    Ill,
    /// `SIGTRAP`
    Trap,
    /// `SIGABRT`
    Abrt,
    /// `SIGBUS`
    Bus,
    /// `SIGFPE`
    Fpe,
    /// `SIGUSR1`
    Usr1,
    /// `SIGSEGV`
    Segv,
    /// `SIGUSR2`
    Usr2,
    /// `SIGPIPE`
    Pipe,
    /// `SIGALRM`
    Alrm,
    /// `SIGTERM`
    Term,
}

impl Signal {
    /// Every signal, in trap-table registration order.
    pub const ALL: [Signal; 14] = [
        Signal::Hup,
        Signal::Int,
        Signal::Quit,
        Signal::Ill,
        Signal::Trap,
        Signal::Abrt,
        Signal::Bus,
        Signal::Fpe,
        Signal::Usr1,
        Signal::Segv,
        Signal::Usr2,
        Signal::Pipe,
        Signal::Alrm,
        Signal::Term,
    ];

    /// The conventional name, e.g. `SIGINT`.
    pub fn name(self) -> &'static str {
        match self {
            Signal::Hup => "SIGHUP",
            Signal::Int => "SIGINT",
            Signal::Quit => "SIGQUIT",
            Signal::Ill => "SIGILL",
            Signal::Trap => "SIGTRAP",
            Signal::Abrt => "SIGABRT",
            Signal::Bus => "SIGBUS",
            Signal::Fpe => "SIGFPE",
            Signal::Usr1 => "SIGUSR1",
            Signal::Segv => "SIGSEGV",
            Signal::Usr2 => "SIGUSR2",
            Signal::Pipe => "SIGPIPE",
            Signal::Alrm => "SIGALRM",
            Signal::Term => "SIGTERM",
        }
    }

    /// Look a signal up by its conventional name.
    pub fn from_name(name: &str) -> Option<Signal> {
        Self::ALL.into_iter().find(|sig| sig.name() == name)
    }

    /// The platform signal number.
    #[cfg(unix)]
    pub fn number(self) -> i32 {
        use signal_hook::consts::signal::*;
        match self {
            Signal::Hup => SIGHUP,
            Signal::Int => SIGINT,
            Signal::Quit => SIGQUIT,
            Signal::Ill => SIGILL,
            Signal::Trap => SIGTRAP,
            Signal::Abrt => SIGABRT,
            Signal::Bus => SIGBUS,
            Signal::Fpe => SIGFPE,
            Signal::Usr1 => SIGUSR1,
            Signal::Segv => SIGSEGV,
            Signal::Usr2 => SIGUSR2,
            Signal::Pipe => SIGPIPE,
            Signal::Alrm => SIGALRM,
            Signal::Term => SIGTERM,
        }
    }
}

/// Installed flag handlers, unregistered on drop.
pub(crate) struct SignalWatch {
    flags: Vec<(Signal, Arc<AtomicBool>)>,
    #[cfg(unix)]
    ids: Vec<signal_hook::SigId>,
}

impl SignalWatch {
    /// Install a flag handler for every signal that may be caught.
    ///
    /// Signals that cannot be handled safely (`SIGILL`, `SIGFPE`, `SIGSEGV`)
    /// are skipped; their conditions can still be raised explicitly.
    #[cfg(unix)]
    pub(crate) fn install() -> io::Result<Self> {
        let mut flags = Vec::new();
        let mut ids = Vec::new();

        for sig in Signal::ALL {
            if signal_hook::consts::FORBIDDEN.contains(&sig.number()) {
                continue;
            }
            let flag = Arc::new(AtomicBool::new(false));
            ids.push(signal_hook::flag::register(sig.number(), Arc::clone(&flag))?);
            flags.push((sig, flag));
        }

        debug!(count = flags.len(), "signal watch installed");
        Ok(Self { flags, ids })
    }

    /// No signals are delivered on this platform.
    #[cfg(not(unix))]
    pub(crate) fn install() -> io::Result<Self> {
        Ok(Self { flags: Vec::new() })
    }

    /// Consume the first pending signal, if any.
    pub(crate) fn take_pending(&self) -> Option<Signal> {
        self.flags
            .iter()
            .find(|(_, flag)| flag.swap(false, Ordering::Relaxed))
            .map(|(sig, _)| *sig)
    }

    /// Signals being watched.
    pub(crate) fn watched(&self) -> impl Iterator<Item = Signal> + '_ {
        self.flags.iter().map(|(sig, _)| *sig)
    }
}

impl Drop for SignalWatch {
    fn drop(&mut self) {
        #[cfg(unix)]
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_lookup() {
        assert_eq!(Signal::from_name("SIGTERM"), Some(Signal::Term));
        assert_eq!(Signal::from_name("SIGWINCH"), None);
        for sig in Signal::ALL {
            assert_eq!(Signal::from_name(sig.name()), Some(sig));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_watch_skips_forbidden() {
        let watch = SignalWatch::install().unwrap();
        let watched: Vec<Signal> = watch.watched().collect();
        assert!(!watched.contains(&Signal::Segv));
        assert!(!watched.contains(&Signal::Fpe));
        assert!(watched.contains(&Signal::Usr1));
        assert_eq!(watch.take_pending(), None);
    }
}
