//! Wall-clock abstraction for log timestamps.

use chrono::{DateTime, Local, NaiveTime};

/// Format of the time column in the activity log (24-hour clock).
pub const LOG_TIME_FORMAT: &str = "%H:%M:%S";

/// Trait for providing time in tests and production
pub trait TimeProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Current local time
    fn local_now(&self) -> DateTime<Local>;

    /// Current local time formatted for a log entry
    fn log_time(&self) -> String {
        self.local_now().format(LOG_TIME_FORMAT).to_string()
    }
}

/// Production time provider that uses real system time
#[derive(Clone, Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn local_now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Time provider pinned to one time of day, for deterministic tests.
#[derive(Clone, Debug)]
pub struct FixedTimeProvider {
    at: DateTime<Local>,
}

impl FixedTimeProvider {
    pub fn new(at: DateTime<Local>) -> Self {
        Self { at }
    }

    /// Today's date at `hour:min:sec` local time.
    pub fn at_time(hour: u32, min: u32, sec: u32) -> Option<Self> {
        let time = NaiveTime::from_hms_opt(hour, min, sec)?;
        let at = Local::now()
            .date_naive()
            .and_time(time)
            .and_local_timezone(Local)
            .earliest()?;
        Some(Self { at })
    }
}

impl TimeProvider for FixedTimeProvider {
    fn local_now(&self) -> DateTime<Local> {
        self.at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_provider_formats_24_hour() {
        let clock = FixedTimeProvider::at_time(21, 5, 9).unwrap();
        assert_eq!(clock.log_time(), "21:05:09");
    }

    #[test]
    fn system_provider_matches_format() {
        let stamp = SystemTimeProvider.log_time();
        assert_eq!(stamp.len(), 8);
        assert_eq!(stamp.as_bytes()[2], b':');
        assert_eq!(stamp.as_bytes()[5], b':');
    }
}
