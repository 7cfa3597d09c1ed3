use std::collections::VecDeque;

use jobscout_model::{DEFAULT_REGIONS, FALLBACK_REGION, JobEntry, resolve_region};

/// Postings admitted to one region, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionBucket {
    pub name: String,
    pub jobs: VecDeque<JobEntry>,
}

impl RegionBucket {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            jobs: VecDeque::new(),
        }
    }
}

/// Region-keyed listing of admitted postings.
///
/// Buckets keep their declaration order; regions first seen on the stream are
/// appended after the declared ones. Buckets are never removed.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMap {
    buckets: Vec<RegionBucket>,
    fallback: String,
}

impl Default for RegionMap {
    fn default() -> Self {
        Self::new(DEFAULT_REGIONS, FALLBACK_REGION)
    }
}

impl RegionMap {
    /// Declares the initial key set. The fallback region is appended when the
    /// declared list does not already contain it.
    pub fn new<I, S>(regions: I, fallback: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self {
            buckets: Vec::new(),
            fallback: fallback.to_string(),
        };
        for region in regions {
            let region: String = region.into();
            map.ensure(&region);
        }
        map.ensure(fallback);
        map
    }

    fn position(&self, region: &str) -> Option<usize> {
        self.buckets.iter().position(|b| b.name == region)
    }

    fn ensure(&mut self, region: &str) -> usize {
        match self.position(region) {
            Some(idx) => idx,
            None => {
                self.buckets.push(RegionBucket::new(region));
                self.buckets.len() - 1
            }
        }
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Inserts `entry` at the front of its region, creating the region when
    /// it was not declared. Returns the region the entry landed in.
    pub fn admit(&mut self, region: Option<&str>, entry: JobEntry) -> &str {
        let name = resolve_region(region, &self.fallback).to_string();
        let idx = self.ensure(&name);
        let bucket = &mut self.buckets[idx];
        bucket.jobs.push_front(entry);
        &bucket.name
    }

    /// Applies `mutator` to every entry whose URL equals `url`, across all
    /// regions. Returns the number of entries touched.
    pub fn amend<F>(&mut self, url: &str, mut mutator: F) -> usize
    where
        F: FnMut(&mut JobEntry),
    {
        let mut touched = 0;
        for job in self
            .buckets
            .iter_mut()
            .flat_map(|bucket| bucket.jobs.iter_mut())
            .filter(|job| job.url == url)
        {
            mutator(job);
            touched += 1;
        }
        touched
    }

    pub fn get(&self, region: &str) -> Option<&VecDeque<JobEntry>> {
        self.position(region).map(|idx| &self.buckets[idx].jobs)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionBucket> {
        self.buckets.iter()
    }

    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|b| b.name.as_str())
    }

    pub fn total_jobs(&self) -> usize {
        self.buckets.iter().map(|b| b.jobs.len()).sum()
    }

    /// Finds the first entry with `url`, searching regions in order.
    pub fn find(&self, url: &str) -> Option<&JobEntry> {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.jobs.iter())
            .find(|job| job.url == url)
    }
}
