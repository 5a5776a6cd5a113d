//! SIGINT handling.
//!
//! We let the first SIGINT reach child processes, which ought to build-fail
//! and let the parent properly print that progress. The handler itself does
//! nothing but flip a flag: `Session::abort` is the thing workers actually
//! check, at their next sweep boundary (spec: "cooperative via the abort
//! flag; in-flight subprocesses are allowed to finish").
//!
//! A signal handler is a bare `extern "C" fn(c_int)` with no user data, so
//! the flag it flips has to be a static. `install_abort_signal` stashes the
//! caller's `Arc<AtomicBool>` here once per process; later deliveries flip
//! that shared flag, which is the same one `Session::abort` reads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static ABORT_TARGET: OnceLock<Arc<AtomicBool>> = OnceLock::new();

#[cfg(unix)]
extern "C" fn sigint_handler(_sig: libc::c_int) {
    if let Some(flag) = ABORT_TARGET.get() {
        flag.store(true, Ordering::SeqCst);
    }
    // Do nothing else; SA_RESETHAND clears the handler so a second SIGINT
    // falls through to the default action and actually kills us.
}

/// Installs the SIGINT handler, routing delivery into `abort`.
///
/// Safe to call more than once; only the first call's `abort` flag is used,
/// matching the single-build-per-process model this crate assumes.
#[cfg(unix)]
pub fn install_abort_signal(abort: Arc<AtomicBool>) {
    if ABORT_TARGET.set(abort).is_err() {
        return;
    }
    // Safety: registering a signal handler is libc unsafe code.
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigint_handler as libc::sighandler_t;
        sa.sa_flags = libc::SA_RESETHAND;
        libc::sigaction(libc::SIGINT, &sa, std::ptr::null_mut());
    }
}

#[cfg(not(unix))]
pub fn install_abort_signal(_abort: Arc<AtomicBool>) {
    // TODO: Windows console-control-handler equivalent.
}
