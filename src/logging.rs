//! Request log: one JSON object per line, appended off the request path.
//!
//! Every entry is also emitted through `tracing`, so the console output and the
//! file never disagree. File writes go through `tracing_appender`'s non-blocking
//! worker; a request only pays for serializing the line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            component: component.into(),
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, ctx: serde_json::Value) -> Self {
        self.context = Some(ctx);
        self
    }

    fn trace(&self) {
        let component = self.component.as_str();
        let message = self.message.as_str();
        match (self.level, &self.context) {
            (LogLevel::Debug, Some(ctx)) => tracing::debug!(component, %ctx, "{message}"),
            (LogLevel::Debug, None) => tracing::debug!(component, "{message}"),
            (LogLevel::Info, Some(ctx)) => tracing::info!(component, %ctx, "{message}"),
            (LogLevel::Info, None) => tracing::info!(component, "{message}"),
            (LogLevel::Warn, Some(ctx)) => tracing::warn!(component, %ctx, "{message}"),
            (LogLevel::Warn, None) => tracing::warn!(component, "{message}"),
            (LogLevel::Error, Some(ctx)) => tracing::error!(component, %ctx, "{message}"),
            (LogLevel::Error, None) => tracing::error!(component, "{message}"),
        }
    }
}

/// Non-blocking file sink. The guard flushes and stops the worker when the last
/// handle is dropped.
struct FileSink {
    writer: NonBlocking,
    _guard: WorkerGuard,
}

/// Cloneable handle to the request log.
#[derive(Clone)]
pub struct SharedLogger(Option<Arc<FileSink>>);

impl SharedLogger {
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file_path = file_path.as_ref();
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let (writer, guard) = tracing_appender::non_blocking(file);

        Ok(Self(Some(Arc::new(FileSink {
            writer,
            _guard: guard,
        }))))
    }

    /// A logger that only emits through `tracing`, with no file.
    pub fn tracing_only() -> Self {
        Self(None)
    }

    pub fn log(&self, entry: LogEntry) {
        entry.trace();
        if let Some(sink) = &self.0 {
            if let Ok(mut line) = serde_json::to_string(&entry) {
                line.push('\n');
                // NonBlocking hands the line to the worker; a full queue drops it
                let mut writer = sink.writer.clone();
                let _ = writer.write_all(line.as_bytes());
            }
        }
    }

    pub fn info(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, component, message));
    }

    pub fn warn(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warn, component, message));
    }

    pub fn error(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Error, component, message));
    }

    pub fn debug(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Debug, component, message));
    }

    pub fn log_with_context(
        &self,
        level: LogLevel,
        component: impl Into<String>,
        message: impl Into<String>,
        context: serde_json::Value,
    ) {
        self.log(LogEntry::new(level, component, message).with_context(context));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_entries(path: &Path) -> Vec<LogEntry> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_entries_are_appended_as_jsonl() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("chat-proxy.log");

        let logger = SharedLogger::new(&path).unwrap();
        let clone = logger.clone();
        logger.info("proxy", "first");
        clone.log_with_context(
            LogLevel::Warn,
            "proxy",
            "second",
            serde_json::json!({"status": 503}),
        );
        // last handle gone: worker flushes
        drop(logger);
        drop(clone);

        let entries = read_entries(&path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].level, LogLevel::Warn);
        assert_eq!(entries[1].context.as_ref().unwrap()["status"], 503);
    }

    #[test]
    fn test_reopen_appends_without_reading_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chat-proxy.log");

        let logger = SharedLogger::new(&path).unwrap();
        logger.info("startup", "run one");
        drop(logger);

        let logger = SharedLogger::new(&path).unwrap();
        logger.info("startup", "run two");
        drop(logger);

        let messages: Vec<String> = read_entries(&path).into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["run one", "run two"]);
    }

    #[test]
    fn test_tracing_only_writes_nothing() {
        let logger = SharedLogger::tracing_only();
        logger.debug("test", "entry");
        assert!(logger.0.is_none());
    }
}
