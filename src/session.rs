//! Build flags and the abort flag, as an explicit handle. A `Session` is
//! constructed once by the CLI layer and held inside `Context`; nothing in
//! this crate reaches for a process global.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Flags read by the reporter and by the worker pool.
pub struct Session {
    /// Worker count, already clamped by the caller (see `worker::clamp_threads`).
    pub threads: usize,
    /// Draw the overprinting progress bar (fancy reporter only).
    pub report_bar: bool,
    /// Emit one line per completed/started step.
    pub report_steps: bool,
    /// Colorize reporter output.
    pub report_color: bool,
    /// Use the line-oriented reporter even on a tty.
    pub simpleoutput: bool,
    /// Echo full command lines as they run.
    pub verbose: bool,
    /// Flipped by the SIGINT handler; workers check it at each sweep boundary.
    pub abort: Arc<AtomicBool>,
    /// Program name, used in a couple of reporter messages.
    pub name: String,
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        Session {
            threads: 1,
            report_bar: true,
            report_steps: true,
            report_color: true,
            simpleoutput: false,
            verbose: false,
            abort: Arc::new(AtomicBool::new(false)),
            name: name.into(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(std::sync::atomic::Ordering::SeqCst)
    }
}
