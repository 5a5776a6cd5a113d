//! Chrome trace output.
//!
//! The worker pool calls `event_begin`/`event_end` from multiple OS
//! threads concurrently and outside the graph's critical section, since
//! that's exactly the window where a subprocess is running. So the sink
//! itself needs its own lock; it is a narrow, purely-diagnostic one,
//! never nested with the graph lock.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Mutex;
use std::time::Instant;

enum Phase {
    /// A duration already known at record time.
    Complete(Instant, Instant),
    /// The start of an unmatched B/E pair, tagged with a worker id so
    /// concurrent jobs land on distinct tracks in the viewer.
    Begin(usize, Instant),
    End(usize, Instant),
}

struct Event {
    name: String,
    event_type: Phase,
}

struct Trace {
    start: Instant,
    w: BufWriter<File>,
}

impl Trace {
    fn new(path: &str) -> std::io::Result<Self> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "[")?;
        Ok(Trace {
            start: Instant::now(),
            w,
        })
    }

    fn write_event(&mut self, event: &Event) -> std::io::Result<()> {
        match event.event_type {
            Phase::Complete(start, end) => write!(
                self.w,
                "{{ \"pid\": 0, \"tid\": 0, \"name\": {:?}, \"ts\": {}, \"ph\": \"X\", \"dur\": {} }}",
                event.name,
                start.duration_since(self.start).as_micros(),
                end.duration_since(start).as_micros(),
            ),
            Phase::Begin(tid, ts) => write!(
                self.w,
                "{{ \"pid\": 0, \"tid\": {}, \"name\": {:?}, \"ts\": {}, \"ph\": \"B\" }}",
                tid,
                event.name,
                ts.duration_since(self.start).as_micros(),
            ),
            Phase::End(tid, ts) => write!(
                self.w,
                "{{ \"pid\": 0, \"tid\": {}, \"name\": {:?}, \"ts\": {}, \"ph\": \"E\" }}",
                tid,
                event.name,
                ts.duration_since(self.start).as_micros(),
            ),
        }
    }

    fn write(&mut self, event: Event) -> std::io::Result<()> {
        self.write_event(&event)?;
        writeln!(self.w, ",")
    }

    fn close(&mut self) -> std::io::Result<()> {
        writeln!(self.w, "{{}}]")?;
        self.w.flush()
    }
}

static TRACE: Mutex<Option<Trace>> = Mutex::new(None);

pub fn open(path: &str) -> std::io::Result<()> {
    let trace = Trace::new(path)?;
    *TRACE.lock().unwrap() = Some(trace);
    Ok(())
}

pub fn is_enabled() -> bool {
    TRACE.lock().unwrap().is_some()
}

pub fn if_enabled(f: impl FnOnce(&mut dyn FnMut(&str))) {
    let mut guard = TRACE.lock().unwrap();
    if let Some(t) = guard.as_mut() {
        let mut emit = |name: &str| {
            let _ = t.write(Event {
                name: name.to_string(),
                event_type: Phase::Complete(t.start, Instant::now()),
            });
        };
        f(&mut emit);
    }
}

/// Times `f`, recording it as a single complete ("X") event if tracing is on.
#[inline]
pub fn scope<T>(name: &'static str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    let mut guard = TRACE.lock().unwrap();
    if let Some(t) = guard.as_mut() {
        let _ = t.write(Event {
            name: name.to_string(),
            event_type: Phase::Complete(start, Instant::now()),
        });
    }
    result
}

/// Begins a B/E-style event on the track for `worker_id`. Called by the
/// worker pool around a job's subprocess execution, which happens outside
/// the graph's critical section, hence this needing its own lock.
pub fn event_begin(worker_id: usize, kind: &str, label: &str) {
    let mut guard = TRACE.lock().unwrap();
    if let Some(t) = guard.as_mut() {
        let _ = t.write(Event {
            name: format!("{}: {}", kind, label),
            event_type: Phase::Begin(worker_id, Instant::now()),
        });
    }
}

pub fn event_end(worker_id: usize, kind: &str, label: Option<&str>) {
    let mut guard = TRACE.lock().unwrap();
    if let Some(t) = guard.as_mut() {
        let name = match label {
            Some(l) => format!("{}: {}", kind, l),
            None => kind.to_string(),
        };
        let _ = t.write(Event {
            name,
            event_type: Phase::End(worker_id, Instant::now()),
        });
    }
}

pub fn close() -> std::io::Result<()> {
    let mut guard = TRACE.lock().unwrap();
    if let Some(t) = guard.as_mut() {
        return t.close();
    }
    Ok(())
}
