use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;
use tracing::warn;

use crate::trace::trace::ScanEvent;

/// JSONL sink for scanner decisions. A logger whose file could not be
/// opened swallows events; write failures are reported through `tracing`.
pub struct TraceLogger {
    sink: Option<Mutex<File>>,
}

impl TraceLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let sink = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| warn!(path = %path.display(), error = %e, "could not open trace file"))
            .ok()
            .map(Mutex::new);

        Self { sink }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn log(&self, event: &ScanEvent) {
        let Some(sink) = &self.sink else {
            return;
        };

        let mut line = match serde_json::to_vec(event) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to serialize scan event");
                return;
            }
        };
        line.push(b'\n');

        if let Err(e) = sink.lock().write_all(&line) {
            warn!(node = event.node, error = %e, "failed to write scan event");
        }
    }
}
