//! Request-trace sink.
//!
//! A process-wide append-only text log for watching the bridge work,
//! separate from the host's error log. Most deployments leave it disabled.
//! The sink owns its own lock, independent of the dispatch entry guard, so
//! trace lines from overlapping dispatches interleave whole-line.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;

#[derive(Debug)]
pub struct TraceSink {
    out: Option<Mutex<File>>,
}

impl TraceSink {
    /// A sink that discards everything without touching the filesystem.
    pub fn disabled() -> Self {
        TraceSink { out: None }
    }

    /// Open the trace file in append mode, creating it if absent.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(TraceSink {
            out: Some(Mutex::new(file)),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.out.is_some()
    }

    /// Append one UTC-timestamped line and flush. This is a diagnostic
    /// path: write errors are swallowed and a poisoned lock is recovered,
    /// so tracing can never fail a request.
    pub fn line(&self, args: fmt::Arguments<'_>) {
        let Some(out) = &self.out else {
            return;
        };
        let mut file = match out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S%.3fZ");
        let _ = writeln!(file, "[{}] {}", stamp, args);
        let _ = file.flush();
    }
}
