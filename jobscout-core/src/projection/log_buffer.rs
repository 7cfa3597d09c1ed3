use std::collections::VecDeque;

use jobscout_model::LogEntry;

/// Default number of entries kept per run.
pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// Bounded activity log, newest entry first.
///
/// Entries are never mutated after [`append`](Self::append); once the buffer
/// is full the oldest entry is evicted from the tail.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl LogBuffer {
    /// A zero capacity is bumped to one so the newest entry is always kept.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest entry, if any.
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Entries newest-first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Serializes the buffer as `[time] [category] message` lines in buffer
    /// order (newest first), joined by `\n`.
    pub fn export(&self) -> String {
        self.entries
            .iter()
            .map(LogEntry::export_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobscout_model::LogCategory;

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(message, "info", LogCategory::Info, "10:00:00")
    }

    #[test]
    fn newest_first() {
        let mut buffer = LogBuffer::default();
        buffer.append(entry("a"));
        buffer.append(entry("b"));

        let messages: Vec<_> = buffer.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["b", "a"]);
        assert_eq!(buffer.latest().unwrap().message, "b");
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut buffer = LogBuffer::default();
        for i in 0..=DEFAULT_LOG_CAPACITY {
            buffer.append(entry(&i.to_string()));
        }

        assert_eq!(buffer.len(), DEFAULT_LOG_CAPACITY);
        assert!(buffer.iter().all(|e| e.message != "0"));

        let expected: Vec<String> = (1..=DEFAULT_LOG_CAPACITY)
            .rev()
            .map(|i| i.to_string())
            .collect();
        let actual: Vec<String> = buffer.iter().map(|e| e.message.clone()).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn clear_empties() {
        let mut buffer = LogBuffer::with_capacity(3);
        buffer.append(entry("a"));
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 3);
    }

    #[test]
    fn export_joins_lines_in_buffer_order() {
        let mut buffer = LogBuffer::default();
        buffer.append(LogEntry::new("first", "info", LogCategory::Info, "10:00:00"));
        buffer.append(LogEntry::new(
            "boom",
            "error",
            LogCategory::Error,
            "10:00:05",
        ));

        assert_eq!(
            buffer.export(),
            "[10:00:05] [ERROR] boom\n[10:00:00] [INFO] first"
        );
        assert_eq!(LogBuffer::default().export(), "");
    }
}
