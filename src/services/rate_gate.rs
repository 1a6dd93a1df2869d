use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;

use crate::models::{EthAddress, ExchangeId, Timestamp};

/// Keys the task manager rate limits on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateKey {
    /// Global: the price source limits all history queries together.
    PriceHistory,
    XpubDerivation,
    EthAddress(EthAddress),
    Exchange(ExchangeId),
}

/// Minimum-interval gate keyed by resource.
///
/// Checking readiness never changes state. Only [`RateGate::record_attempt`]
/// moves a key's clock, and the task manager calls it right after a job for
/// that key has been submitted.
pub struct RateGate<K> {
    /// Timestamp of the last scheduled attempt per key. Missing keys count as epoch 0.
    last_attempts: Mutex<HashMap<K, Timestamp>>,
}

impl<K: Eq + Hash> RateGate<K> {
    pub fn new() -> Self {
        Self {
            last_attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn last_attempt(&self, key: &K) -> Timestamp {
        self.last_attempts.lock().get(key).copied().unwrap_or(0)
    }

    /// True iff more than `min_interval` seconds passed since the last attempt.
    pub fn is_ready(&self, key: &K, min_interval: i64, now: Timestamp) -> bool {
        now - self.last_attempt(key) > min_interval
    }

    /// Like [`RateGate::is_ready`] but measured from whichever is later: the
    /// last attempt or the end of the persisted checkpoint.
    pub fn is_ready_with_checkpoint(
        &self,
        key: &K,
        checkpoint_end: Timestamp,
        min_interval: i64,
        now: Timestamp,
    ) -> bool {
        now - self.last_attempt(key).max(checkpoint_end) > min_interval
    }

    pub fn record_attempt(&self, key: K, now: Timestamp) {
        self.last_attempts.lock().insert(key, now);
    }
}

impl<K: Eq + Hash> Default for RateGate<K> {
    fn default() -> Self {
        Self::new()
    }
}
