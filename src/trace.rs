//! Chrome trace output.
//!
//! When opened, every `scope` call records a complete event; load the file
//! in chrome://tracing or Perfetto to see where a build spent its time.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Mutex;
use std::time::Instant;

static TRACE: Mutex<Option<Trace>> = Mutex::new(None);

struct Event {
    name: &'static str,
    start: Instant,
    end: Instant,
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
        write!(
            self.w,
            "{{ \"pid\": 0, \"name\": {:?}, \"ts\": {}, \"ph\": \"X\", \"dur\": {} }}",
            event.name,
            event.start.duration_since(self.start).as_micros(),
            event.end.duration_since(event.start).as_micros(),
        )
    }

    fn write(&mut self, event: &Event) -> std::io::Result<()> {
        self.write_event(event)?;
        writeln!(self.w, ",")
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.write_event(&Event {
            name: "main",
            start: self.start,
            end: Instant::now(),
        })?;
        writeln!(self.w, "]")?;
        self.w.flush()
    }
}

pub fn open(path: &str) -> std::io::Result<()> {
    let trace = Trace::new(path)?;
    if let Ok(mut global) = TRACE.lock() {
        *global = Some(trace);
    }
    Ok(())
}

/// Runs `f`, recording how long it took under `name` if tracing is on.
/// Scopes may nest.
pub fn scope<T>(name: &'static str, f: impl FnOnce() -> T) -> T {
    let enabled = matches!(TRACE.lock().as_deref(), Ok(Some(_)));
    if !enabled {
        return f();
    }
    let start = Instant::now();
    let result = f();
    let event = Event {
        name,
        start,
        end: Instant::now(),
    };
    if let Ok(mut global) = TRACE.lock() {
        if let Some(trace) = global.as_mut() {
            // A failed trace write shouldn't fail the build.
            let _ = trace.write(&event);
        }
    }
    result
}

pub fn close() -> std::io::Result<()> {
    if let Ok(mut global) = TRACE.lock() {
        if let Some(mut trace) = global.take() {
            return trace.close();
        }
    }
    Ok(())
}
