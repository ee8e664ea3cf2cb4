//! Per-host request pacing
//!
//! Each host gets a "next free slot" instant. Acquiring reserves the slot
//! under a short lock and pushes it forward by `1 / rps`; the wait itself
//! happens outside the lock, so concurrent callers for the same host queue up
//! in reservation order while other hosts are untouched.

use crate::config::{RateLimitConfig, MIN_RATE_RPS};
use crate::CrawlError;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Per-host rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    /// Rate for hosts without an override; `None` means unlimited
    default_rps: Option<f64>,

    /// Host-specific rates, keyed by lowercase host
    host_rps: HashMap<String, f64>,

    /// Next free slot per host
    slots: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    /// Creates a limiter with the given default rate and no overrides
    pub fn new(default_rps: Option<f64>) -> Self {
        Self {
            default_rps,
            host_rps: HashMap::new(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// A limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Adds or replaces the rate for one host
    pub fn with_host_rate(mut self, host: &str, rps: f64) -> Self {
        self.host_rps.insert(host.to_lowercase(), rps);
        self
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        config
            .hosts
            .iter()
            .fold(Self::new(config.default_rps), |limiter, entry| {
                limiter.with_host_rate(&entry.host, entry.rps)
            })
    }

    /// The configured rate for `host`, if any
    pub fn rate_for(&self, host: &str) -> Option<f64> {
        self.host_rps
            .get(&host.to_lowercase())
            .copied()
            .or(self.default_rps)
    }

    /// Waits until a request to `host` fits within its rate budget
    ///
    /// Returns immediately when the host has no rate or a rate of zero.
    /// Negative, non-finite or vanishingly small rates (below
    /// [`MIN_RATE_RPS`]) are a misconfiguration and fail the call without
    /// waiting.
    pub async fn acquire(&self, host: &str) -> Result<(), CrawlError> {
        let interval = match self.min_interval(host)? {
            Some(interval) => interval,
            None => return Ok(()),
        };

        let slot = self.reserve(host, interval);
        let now = Instant::now();
        if slot > now {
            tracing::debug!(host, wait_ms = (slot - now).as_millis() as u64, "Rate limiting");
            tokio::time::sleep_until(slot).await;
        }

        Ok(())
    }

    fn min_interval(&self, host: &str) -> Result<Option<Duration>, CrawlError> {
        let rate = match self.rate_for(host) {
            Some(rate) => rate,
            None => return Ok(None),
        };

        let invalid = || CrawlError::InvalidRate {
            host: host.to_string(),
            rate,
        };

        if !rate.is_finite() || rate < 0.0 {
            return Err(invalid());
        }

        if rate == 0.0 {
            return Ok(None);
        }

        if rate < MIN_RATE_RPS {
            return Err(invalid());
        }

        Duration::try_from_secs_f64(1.0 / rate)
            .map(Some)
            .map_err(|_| invalid())
    }

    /// Claims the next slot for `host` and returns when it starts
    fn reserve(&self, host: &str, interval: Duration) -> Instant {
        let key = host.to_lowercase();
        let now = Instant::now();
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        let slot = slots
            .get(&key)
            .copied()
            .filter(|next| *next > now)
            .unwrap_or(now);
        slots.insert(key, slot + interval);

        slot
    }
}
