use dashmap::DashSet;
use std::sync::Arc;

/// History event identifiers whose price lookup failed during this run.
///
/// Entries are never removed, so a failed lookup is not retried until restart.
/// Cloning shares the same underlying set with the running jobs.
#[derive(Clone, Default)]
pub struct PriceIgnoreSet {
    entries: Arc<DashSet<String>>,
}

impl PriceIgnoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, identifier: &str) {
        self.entries.insert(identifier.to_string());
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains(identifier)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}
