//! Newline-delimited JSON progress events, for tools that want to consume
//! build progress programmatically instead of scraping terminal output.

use crate::reporter::Reporter;
use serde_json::json;
use std::io::Write;
use std::sync::Mutex;

pub struct JsonReporter {
    stream: Mutex<Box<dyn Write + Send>>,
}

impl JsonReporter {
    pub fn new(stream: Box<dyn Write + Send>) -> Self {
        JsonReporter {
            stream: Mutex::new(stream),
        }
    }

    fn write(&self, value: serde_json::Value) {
        let mut stream = self.stream.lock().unwrap();
        let mut line = value.to_string();
        line.push('\n');
        let _ = stream.write_all(line.as_bytes());
    }
}

impl Reporter for JsonReporter {
    fn clear_progress(&self) {
        // No terminal state to clear in a machine-readable stream.
    }

    fn draw_progress(&self, current: usize, total: usize, _colored: bool) {
        self.write(json!({ "progress": { "current": current, "total": total } }));
    }

    fn step_line(&self, current: usize, total: usize, worker_id: usize, label: &str, _simple: bool) {
        self.write(json!({
            "step": { "current": current, "total": total, "worker": worker_id, "label": label }
        }));
    }

    fn verbose_cmdline(&self, cmdline: &str, _colored: bool) {
        self.write(json!({ "cmdline": cmdline }));
    }

    fn error_line(&self, msg: &str) {
        self.write(json!({ "error": msg }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<StdMutex<Vec<u8>>>);
    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn emits_one_json_object_per_line() {
        let buf = SharedBuf::default();
        let reporter = JsonReporter::new(Box::new(buf.clone()));
        reporter.step_line(1, 2, 0, "CC obj.o", false);
        reporter.draw_progress(1, 2, false);

        let contents = buf.0.lock().unwrap().clone();
        let text = String::from_utf8(contents).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["step"]["label"], "CC obj.o");
    }
}
