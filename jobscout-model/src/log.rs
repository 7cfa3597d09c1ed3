use crate::ids::LogEntryId;

/// Display classification of a log entry.
///
/// Server-supplied categories outside the known set (for example `SCAN` or
/// `MATCH` from the backend's log stream) are carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogCategory {
    Info,
    Warning,
    Error,
    Success,
    Other(String),
}

impl LogCategory {
    /// Infers a category from an event's severity tag.
    pub fn infer(severity: &str) -> Self {
        match severity {
            "error" => LogCategory::Error,
            "warning" => LogCategory::Warning,
            "success" => LogCategory::Success,
            _ => LogCategory::Info,
        }
    }

    /// Uses an explicit label when one was supplied, otherwise infers from
    /// the severity tag. Empty labels count as absent.
    pub fn resolve(explicit: Option<&str>, severity: &str) -> Self {
        match explicit {
            Some(label) if !label.is_empty() => LogCategory::from_label(label),
            _ => LogCategory::infer(severity),
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "INFO" => LogCategory::Info,
            "WARNING" => LogCategory::Warning,
            "ERROR" => LogCategory::Error,
            "SUCCESS" => LogCategory::Success,
            other => LogCategory::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LogCategory::Info => "INFO",
            LogCategory::Warning => "WARNING",
            LogCategory::Error => "ERROR",
            LogCategory::Success => "SUCCESS",
            LogCategory::Other(label) => label,
        }
    }
}

impl std::fmt::Display for LogCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable line of the run's activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: LogEntryId,
    pub message: String,
    /// Severity tag, usually the originating event's `event_type`.
    pub severity: String,
    pub category: LogCategory,
    /// Local wall-clock time of reconciliation, `HH:MM:SS`.
    pub time: String,
}

impl LogEntry {
    pub fn new(
        message: impl Into<String>,
        severity: impl Into<String>,
        category: LogCategory,
        time: impl Into<String>,
    ) -> Self {
        LogEntry {
            id: LogEntryId::new(),
            message: message.into(),
            severity: severity.into(),
            category,
            time: time.into(),
        }
    }

    /// `[time] [category] message`, the export line format.
    pub fn export_line(&self) -> String {
        format!("[{}] [{}] {}", self.time, self.category, self.message)
    }
}
