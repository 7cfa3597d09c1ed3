/// Counter selector for [`Metrics::increment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricField {
    Scanned,
    Passed,
    Failed,
}

/// Pass/fail counters of one run. Only ever incremented; reset wholesale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Metrics {
    pub scanned: u64,
    pub passed: u64,
    pub failed: u64,
}

impl Metrics {
    pub fn increment(&mut self, field: MetricField) {
        let counter = match field {
            MetricField::Scanned => &mut self.scanned,
            MetricField::Passed => &mut self.passed,
            MetricField::Failed => &mut self.failed,
        };
        *counter = counter.saturating_add(1);
    }

    pub fn reset_all(&mut self) {
        *self = Metrics::default();
    }

    /// Records a posting that passed filtering.
    pub fn record_passed(&mut self) {
        self.increment(MetricField::Scanned);
        self.increment(MetricField::Passed);
    }

    /// Records a posting that was skipped by filtering.
    pub fn record_failed(&mut self) {
        self.increment(MetricField::Scanned);
        self.increment(MetricField::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanned_tracks_passed_plus_failed() {
        let mut metrics = Metrics::default();
        metrics.record_passed();
        metrics.record_failed();
        metrics.record_passed();

        assert_eq!(metrics.passed, 2);
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.scanned, metrics.passed + metrics.failed);
    }

    #[test]
    fn reset_zeroes_everything() {
        let mut metrics = Metrics::default();
        metrics.increment(MetricField::Failed);
        metrics.reset_all();
        assert_eq!(metrics, Metrics::default());
    }
}
