//! Log sinks handed to test cases through their [`CaseContext`](crate::case::CaseContext).

use std::{cell::RefCell, rc::Rc};

use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Fire-and-forget logging used by test cases.
pub trait LogSink {
    fn log(&mut self, level: LogLevel, message: &str);

    fn debug(&mut self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    fn info(&mut self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn success(&mut self, message: &str) {
        self.log(LogLevel::Success, message);
    }

    fn error(&mut self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Routes debug/info through the `log` facade and prints success/error lines in color.
#[derive(Debug, Default)]
pub struct ConsoleLog;

impl LogSink for ConsoleLog {
    fn log(&mut self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => log::debug!("{message}"),
            LogLevel::Info => log::info!("{message}"),
            LogLevel::Success => println!("{}", message.green()),
            LogLevel::Error => {
                log::error!("{message}");
                eprintln!("{}", message.red());
            }
        }
    }
}

/// Keeps entries in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingLog {
    entries: Rc<RefCell<Vec<LogEntry>>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }
}

impl LogSink for RecordingLog {
    fn log(&mut self, level: LogLevel, message: &str) {
        self.entries.borrow_mut().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_clones_share_entries() {
        let handle = RecordingLog::new();
        let mut sink: Box<dyn LogSink> = Box::new(handle.clone());
        sink.debug("first");
        sink.success("second");

        let entries = handle.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, LogLevel::Debug);
        assert_eq!(entries[1].level, LogLevel::Success);
        assert_eq!(entries[1].message, "second");
    }
}
