use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::models::Asset;

/// A pair waiting for its one-time hourly price backfill.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriceHistoryQuery {
    pub from_asset: Asset,
    pub to_asset: Asset,
}

/// Pending price history pairs, filled once and then only popped.
#[derive(Default)]
pub struct PriceQueryQueue {
    queries: Mutex<HashSet<PriceHistoryQuery>>,
    prepared: AtomicBool,
}

impl PriceQueryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared.load(Ordering::SeqCst)
    }

    pub fn mark_prepared(&self) {
        self.prepared.store(true, Ordering::SeqCst);
    }

    pub fn insert(&self, query: PriceHistoryQuery) -> bool {
        self.queries.lock().insert(query)
    }

    pub fn len(&self) -> usize {
        self.queries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.lock().is_empty()
    }

    /// Remove and return an arbitrary pending pair.
    pub fn pop(&self) -> Option<PriceHistoryQuery> {
        let mut queries = self.queries.lock();
        let query = queries.iter().next().cloned()?;
        queries.remove(&query);
        Some(query)
    }
}
