//! Overprinting console reporter with a live progress bar. A background
//! thread debounces redraws so a flurry of step lines from several workers
//! doesn't thrash the terminal, and the main thread only ever queues text
//! and flips a dirty flag.

use crate::reporter::Reporter;
use crate::terminal;
use std::io::Write;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

const UPDATE_DELAY: Duration = Duration::from_millis(50);
const TIMEOUT_DELAY: Duration = Duration::from_millis(500);

struct State {
    done: bool,
    dirty: bool,
    /// Lines queued by step_line/verbose_cmdline/error_line since the last
    /// redraw; printed above the progress bar, scrolling normally.
    pending_lines: Vec<u8>,
    current: usize,
    total: usize,
    colored: bool,
    /// Byte length of the last thing we printed in place, so we know how
    /// much to erase before the next redraw.
    last_bar_lines: usize,
}

pub struct FancyReporter {
    state: Arc<(Mutex<State>, Condvar)>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl FancyReporter {
    pub fn new() -> Self {
        let state = Arc::new((
            Mutex::new(State {
                done: false,
                dirty: false,
                pending_lines: Vec::new(),
                current: 0,
                total: 0,
                colored: true,
                last_bar_lines: 0,
            }),
            Condvar::new(),
        ));

        let thread = std::thread::spawn({
            let state = state.clone();
            move || loop {
                let (lock, cvar) = &*state;
                let mut guard = lock.lock().unwrap();
                let (mut guard2, _) = cvar
                    .wait_timeout_while(guard, TIMEOUT_DELAY - UPDATE_DELAY, |s| !s.done && !s.dirty)
                    .unwrap();
                if guard2.done {
                    flush_pending(&mut guard2);
                    return;
                }
                drop(guard2);
                std::thread::sleep(UPDATE_DELAY);
                guard = lock.lock().unwrap();
                redraw(&mut guard);
            }
        });

        FancyReporter {
            state,
            thread: Some(thread),
        }
    }

    fn notify(&self) {
        let (lock, cvar) = &*self.state;
        lock.lock().unwrap().dirty = true;
        cvar.notify_one();
    }
}

impl Default for FancyReporter {
    fn default() -> Self {
        FancyReporter::new()
    }
}

fn flush_pending(state: &mut State) {
    if !state.pending_lines.is_empty() {
        let _ = std::io::stdout().write_all(&state.pending_lines);
        state.pending_lines.clear();
    }
}

fn redraw(state: &mut State) {
    // Erase whatever bar we drew last time, print queued lines, then draw a
    // fresh bar.
    let mut out = Vec::new();
    if state.last_bar_lines > 0 {
        let _ = write!(out, "\x1b[{}A\r\x1b[J", state.last_bar_lines);
    }
    out.extend_from_slice(&state.pending_lines);
    state.pending_lines.clear();

    let cols = terminal::get_cols().unwrap_or(80);
    let bar = render_bar(state.current, state.total, cols.saturating_sub(20).max(10));
    if state.colored {
        let _ = write!(out, "\x1b[32m[{}]\x1b[0m {}/{}\n", bar, state.current, state.total);
    } else {
        let _ = write!(out, "[{}] {}/{}\n", bar, state.current, state.total);
    }
    state.last_bar_lines = 1;

    let _ = std::io::stdout().write_all(&out);
    let _ = std::io::stdout().flush();
    state.dirty = false;
}

fn render_bar(current: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return " ".repeat(width);
    }
    let filled = (current * width / total).min(width);
    let mut bar = "=".repeat(filled);
    bar.push_str(&" ".repeat(width - filled));
    bar
}

impl Reporter for FancyReporter {
    fn clear_progress(&self) {
        let (lock, _) = &*self.state;
        let mut s = lock.lock().unwrap();
        if s.last_bar_lines > 0 {
            let _ = write!(std::io::stdout(), "\x1b[{}A\r\x1b[J", s.last_bar_lines);
            let _ = std::io::stdout().flush();
            s.last_bar_lines = 0;
        }
    }

    fn draw_progress(&self, current: usize, total: usize, colored: bool) {
        let (lock, _) = &*self.state;
        {
            let mut s = lock.lock().unwrap();
            s.current = current;
            s.total = total;
            s.colored = colored;
        }
        self.notify();
    }

    fn step_line(&self, current: usize, total: usize, worker_id: usize, label: &str, simple: bool) {
        if simple {
            println!("[{}/{}] (w{}) {}", current, total, worker_id, label);
            return;
        }
        let (lock, _) = &*self.state;
        {
            let mut s = lock.lock().unwrap();
            let _ = writeln!(s.pending_lines, "[{}/{}] (w{}) {}", current, total, worker_id, label);
        }
        self.notify();
    }

    fn verbose_cmdline(&self, cmdline: &str, _colored: bool) {
        let (lock, _) = &*self.state;
        {
            let mut s = lock.lock().unwrap();
            let _ = writeln!(s.pending_lines, "$ {}", cmdline);
        }
        self.notify();
    }

    fn error_line(&self, msg: &str) {
        let (lock, _) = &*self.state;
        {
            let mut s = lock.lock().unwrap();
            let _ = writeln!(s.pending_lines, "anvil: error: {}", msg);
        }
        self.notify();
    }
}

impl Drop for FancyReporter {
    fn drop(&mut self) {
        let (lock, cvar) = &*self.state;
        lock.lock().unwrap().done = true;
        cvar.notify_one();
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(render_bar(0, 10, 10), "          ");
        assert_eq!(render_bar(5, 10, 10), "=====     ");
        assert_eq!(render_bar(10, 10, 10), "==========");
    }

    #[test]
    fn empty_total_renders_blank_bar() {
        assert_eq!(render_bar(0, 0, 4), "    ");
    }

    #[test]
    fn construction_and_teardown_does_not_panic() {
        let r = FancyReporter::new();
        r.draw_progress(1, 2, false);
        r.step_line(1, 2, 0, "CC obj.o", false);
        r.clear_progress();
        drop(r);
    }
}
