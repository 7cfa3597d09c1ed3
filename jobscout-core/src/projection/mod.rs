//! The derived, queryable state of the tracked run.
//!
//! A [`RunProjection`] is owned by exactly one session and is replaced
//! wholesale whenever a new run starts; nothing in it survives a reset.

pub mod log_buffer;
pub mod metrics;
pub mod regions;

pub use log_buffer::{DEFAULT_LOG_CAPACITY, LogBuffer};
pub use metrics::{MetricField, Metrics};
pub use regions::{RegionBucket, RegionMap};

use jobscout_model::{DEFAULT_REGIONS, FALLBACK_REGION};
use serde::Serialize;

use crate::strings;

/// Shape of a fresh projection: declared regions and log capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionLayout {
    pub regions: Vec<String>,
    pub fallback_region: String,
    pub log_capacity: usize,
}

impl Default for ProjectionLayout {
    fn default() -> Self {
        Self {
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            fallback_region: FALLBACK_REGION.to_string(),
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

/// Metrics, region listing, activity log and status line of one run.
#[derive(Debug, Clone)]
pub struct RunProjection {
    pub metrics: Metrics,
    pub regions: RegionMap,
    pub logs: LogBuffer,
    pub status_text: String,
}

impl Default for RunProjection {
    fn default() -> Self {
        Self::new(&ProjectionLayout::default())
    }
}

impl RunProjection {
    pub fn new(layout: &ProjectionLayout) -> Self {
        Self {
            metrics: Metrics::default(),
            regions: RegionMap::new(
                layout.regions.iter().cloned(),
                &layout.fallback_region,
            ),
            logs: LogBuffer::with_capacity(layout.log_capacity),
            status_text: strings::READY.to_string(),
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            status: self.status_text.clone(),
            metrics: self.metrics,
            regions: self
                .regions
                .iter()
                .map(|bucket| RegionCount {
                    region: bucket.name.clone(),
                    jobs: bucket.jobs.len(),
                })
                .collect(),
            outbound_saved: self
                .regions
                .iter()
                .flat_map(|bucket| bucket.jobs.iter())
                .filter(|job| job.outbound_saved)
                .count(),
            log_entries: self.logs.len(),
        }
    }
}

/// Job count of one region in a [`RunSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionCount {
    pub region: String,
    pub jobs: usize,
}

/// Point-in-time snapshot of a projection for consumers that only need
/// totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub status: String,
    pub metrics: Metrics,
    pub regions: Vec<RegionCount>,
    pub outbound_saved: usize,
    pub log_entries: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scanned={} passed={} failed={} saved={} logs={}",
            self.metrics.scanned,
            self.metrics.passed,
            self.metrics.failed,
            self.outbound_saved,
            self.log_entries
        )?;
        for count in &self.regions {
            write!(f, " {}={}", count.region, count.jobs)?;
        }
        Ok(())
    }
}
