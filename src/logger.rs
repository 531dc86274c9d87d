use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use log::{Level, Log, Metadata, Record};
use parking_lot::Mutex;

const MAX_LOG_ENTRIES: usize = 1000;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub timestamp: Instant,
}

/// Thread-safe ring buffer for log entries.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    start: Instant,
}

impl LogBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_ENTRIES))),
            start: Instant::now(),
        }
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock();
        if entries.len() >= MAX_LOG_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Returns a snapshot of all entries.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Returns the newest `count` entries, oldest first.
    #[must_use]
    pub fn tail(&self, count: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(count);
        entries.iter().skip(skip).cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Formats an entry relative to when this buffer was created.
    #[must_use]
    pub fn format(&self, entry: &LogEntry) -> String {
        let elapsed = entry.timestamp.duration_since(self.start).as_secs_f64();
        format!(
            "[{elapsed:.3}s] [{}] {}: {}",
            entry.level, entry.target, entry.message
        )
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

struct CmdtreeLogger {
    buffer: LogBuffer,
    file: Option<Mutex<std::fs::File>>,
    filter: log::LevelFilter,
}

impl Log for CmdtreeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let entry = LogEntry {
            level: record.level(),
            target: record.target().to_string(),
            message: format!("{}", record.args()),
            timestamp: Instant::now(),
        };

        // Also write to file if configured
        if let Some(ref file) = self.file {
            let _ = writeln!(file.lock(), "{}", self.buffer.format(&entry));
        }

        self.buffer.push(entry);
    }

    fn flush(&self) {
        if let Some(ref file) = self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Initialize the global logger. Must be called once before any logging.
///
/// # Panics
///
/// Panics if called more than once.
pub fn init(buffer: LogBuffer, log_file: Option<std::fs::File>) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(log::LevelFilter::Info);

    let logger = CmdtreeLogger {
        buffer,
        file: log_file.map(Mutex::new),
        filter,
    };

    log::set_boxed_logger(Box::new(logger)).expect("logger already initialized");
    log::set_max_level(filter);
}
