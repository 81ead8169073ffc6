//! Per-conversation reply throttle.
//!
//! Keeps the last accepted timestamp (wall-clock seconds) per conversation. A conversation
//! never seen before behaves as if its last message was at the epoch. Concurrent checks for
//! the same conversation are last-write-wins; the mutex only protects the map itself.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Current wall-clock time in whole seconds since the epoch.
pub fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Shared rate limiter. Clones share state.
#[derive(Clone)]
pub struct RateLimiter {
    min_interval: u64,
    evict_after: u64,
    last_accepted: Arc<Mutex<HashMap<i64, u64>>>,
}

impl RateLimiter {
    /// `evict_after_intervals` is floored at 1 so an evicted entry behaves exactly like an absent one.
    pub fn new(min_interval: u64, evict_after_intervals: u64) -> Self {
        let evict_after = min_interval.saturating_mul(evict_after_intervals.max(1));
        Self {
            min_interval,
            evict_after,
            last_accepted: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.min_seconds_between_messages,
            config.evict_after_intervals,
        )
    }

    pub fn min_interval(&self) -> u64 {
        self.min_interval
    }

    /// True (and `now` recorded) iff at least `min_interval` seconds passed since the last
    /// accepted message for `conversation_id`. A clock that moved backwards counts as zero elapsed.
    pub async fn allow(&self, conversation_id: i64, now: u64) -> bool {
        let mut map = self.last_accepted.lock().await;
        let last = map.get(&conversation_id).copied().unwrap_or(0);
        if now.saturating_sub(last) < self.min_interval {
            return false;
        }
        map.insert(conversation_id, now);
        true
    }

    /// Drop entries idle for at least the eviction age. Returns how many were removed.
    pub async fn sweep(&self, now: u64) -> usize {
        let mut map = self.last_accepted.lock().await;
        let before = map.len();
        let evict_after = self.evict_after;
        map.retain(|_, last| now.saturating_sub(*last) < evict_after);
        before - map.len()
    }

    /// Number of tracked conversations.
    pub async fn len(&self) -> usize {
        self.last_accepted.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
