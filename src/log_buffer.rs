//! Bounded, newest-first log of user-facing events.
//!
//! Every pushed line is also forwarded to the `log` facade so a console run shows it
//! as it happens.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Local};

/// Maximum number of retained lines.
pub const LOG_CAPACITY: usize = 1000;

/// Tag attached to a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Success,
    Error,
    Info,
}

/// One entry of the log stream.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub level: LogLevel,
    pub time: DateTime<Local>,
    pub text: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.time.format("%H:%M:%S"), self.text)
    }
}

/// Thread-safe log buffer holding at most `capacity` lines, newest at the front.
#[derive(Debug)]
pub struct LogBuffer {
    lines: Mutex<VecDeque<LogLine>>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(LOG_CAPACITY))),
            capacity,
        }
    }

    /// Appends a line at the front, dropping the oldest when full.
    pub fn push(&self, level: LogLevel, text: impl Into<String>) {
        let line = LogLine {
            level,
            time: Local::now(),
            text: text.into(),
        };

        match level {
            LogLevel::Error => log::warn!(target: "inscribe::events", "{}", line.text),
            _ => log::info!(target: "inscribe::events", "{}", line.text),
        }

        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.push_front(line);
        lines.truncate(self.capacity);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.push(LogLevel::Success, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.push(LogLevel::Error, text);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.push(LogLevel::Info, text);
    }

    /// Snapshot of the retained lines, newest first.
    pub fn lines(&self) -> Vec<LogLine> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
