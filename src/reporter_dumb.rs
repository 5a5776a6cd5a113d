//! Line-oriented reporter, no overprinting. Used for non-ttys and CI
//! logs, where redrawing a progress bar in place just produces garbage.

use crate::reporter::Reporter;
use std::io::Write;
use std::sync::Mutex;

#[derive(Default)]
pub struct DumbReporter {
    // Plain Mutex<()>: the only state worth serializing is "don't interleave
    // two lines of output," which a unit value guards just as well as any
    // richer state would.
    lock: Mutex<()>,
}

impl DumbReporter {
    pub fn new() -> Self {
        DumbReporter::default()
    }
}

impl Reporter for DumbReporter {
    fn clear_progress(&self) {
        // Nothing to clear; nothing was ever drawn in place.
    }

    fn draw_progress(&self, _current: usize, _total: usize, _colored: bool) {
        // A dumb console has no redrawable region; progress is implied by
        // the step lines themselves.
    }

    fn step_line(&self, current: usize, total: usize, worker_id: usize, label: &str, _simple: bool) {
        let _guard = self.lock.lock().unwrap();
        println!("[{}/{}] (w{}) {}", current, total, worker_id, label);
    }

    fn verbose_cmdline(&self, cmdline: &str, _colored: bool) {
        let _guard = self.lock.lock().unwrap();
        println!("$ {}", cmdline);
    }

    fn error_line(&self, msg: &str) {
        let _guard = self.lock.lock().unwrap();
        let _ = writeln!(std::io::stderr(), "anvil: error: {}", msg);
    }
}
