//! Short-window submission cooldown
//!
//! [`Cooldown`] enforces a minimum interval between allowed actions for the
//! same key, independently of period quotas. State lives in process memory:
//! a restart re-opens every window. That is accepted; the cooldown guards
//! against double submissions, not against quota abuse.

use chrono::{DateTime, Utc};
use std::time::Duration;

#[cfg(feature = "ahash")]
use ahash::AHashMap as HashMap;
#[cfg(not(feature = "ahash"))]
use std::collections::HashMap;

// Configuration constants
const DEFAULT_CAPACITY: usize = 1000;
const CAPACITY_OVERHEAD_FACTOR: f64 = 1.3;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

/// Per-key minimum interval gate
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use quotagate::Cooldown;
///
/// let mut cooldown = Cooldown::new();
/// let t = Utc::now();
///
/// assert!(cooldown.allow("guest:abc", 30, t));
/// assert!(!cooldown.allow("guest:abc", 30, t + Duration::seconds(10)));
/// assert!(cooldown.allow("guest:abc", 30, t + Duration::seconds(31)));
/// ```
pub struct Cooldown {
    // Last allowed instant per key
    last_allowed: HashMap<String, DateTime<Utc>>,
    // Longest interval requested so far; entries older than this can never block
    max_interval: Duration,
    next_cleanup: Option<DateTime<Utc>>,
    cleanup_interval: Duration,
}

/// Builder for configuring a Cooldown
pub struct CooldownBuilder {
    capacity: usize,
    cleanup_interval: Duration,
}

impl Cooldown {
    /// Create a new Cooldown with default configuration
    ///
    /// Uses a default capacity of 1000 keys and cleanup interval of 60 seconds.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> CooldownBuilder {
        CooldownBuilder::default()
    }

    fn with_config(capacity: usize, cleanup_interval: Duration) -> Self {
        Cooldown {
            last_allowed: HashMap::with_capacity(
                (capacity as f64 * CAPACITY_OVERHEAD_FACTOR) as usize,
            ),
            max_interval: Duration::ZERO,
            next_cleanup: None,
            cleanup_interval,
        }
    }

    /// Allow `key` if at least `min_interval_seconds` passed since its last
    /// allowed action
    ///
    /// On `true`, `now` becomes the key's last allowed instant. A `now`
    /// earlier than the stored instant counts as not elapsed; the block
    /// lifts once the clock passes the stored instant plus the interval.
    pub fn allow(&mut self, key: &str, min_interval_seconds: u64, now: DateTime<Utc>) -> bool {
        self.maybe_clean_expired(now);

        let interval = Duration::from_secs(min_interval_seconds);
        self.max_interval = self.max_interval.max(interval);

        if self.remaining(key, interval, now).is_some() {
            return false;
        }

        self.last_allowed.insert(key.to_string(), now);
        true
    }

    /// Time left before `key` would be allowed again, or `None` if it would
    /// be allowed now
    pub fn retry_after(
        &self,
        key: &str,
        min_interval_seconds: u64,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        self.remaining(key, Duration::from_secs(min_interval_seconds), now)
    }

    pub fn len(&self) -> usize {
        self.last_allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_allowed.is_empty()
    }

    fn remaining(&self, key: &str, interval: Duration, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_allowed.get(key)?;
        let elapsed = (now - *last).to_std().unwrap_or(Duration::ZERO);

        if now >= *last && elapsed >= interval {
            None
        } else {
            Some(interval.saturating_sub(elapsed))
        }
    }

    fn maybe_clean_expired(&mut self, now: DateTime<Utc>) {
        let due = match self.next_cleanup {
            Some(at) => now >= at,
            None => true,
        };
        if !due {
            return;
        }

        let max_interval = self.max_interval;
        self.last_allowed.retain(|_, last| {
            // Future-dated entries are kept until the clock catches up
            match (now - *last).to_std() {
                Ok(elapsed) => elapsed < max_interval,
                Err(_) => true,
            }
        });

        let step = chrono::Duration::from_std(self.cleanup_interval)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_CLEANUP_INTERVAL_SECS as i64));
        self.next_cleanup = Some(now + step);
    }
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for CooldownBuilder {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        }
    }
}

impl CooldownBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expected number of distinct keys
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set how often stale keys are swept
    ///
    /// A key is stale once more than the longest interval ever requested has
    /// passed since it was last allowed.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn build(self) -> Cooldown {
        Cooldown::with_config(self.capacity, self.cleanup_interval)
    }
}
