use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accumulated usage counters for one proxy
///
/// Counters only ever grow; resetting them is an administrative action done
/// directly against storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyStats {
    pub success_count: u64,
    pub failure_count: u64,
    pub total_latency_ms: u64,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ProxyStats {
    /// Adds one crawl outcome
    pub fn record(&mut self, success: bool, duration_ms: u64) {
        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.total_latency_ms = self.total_latency_ms.saturating_add(duration_ms);
        self.last_used_at = Some(Utc::now());
    }

    pub fn total_uses(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// Mean latency across all uses, 0 when unused
    pub fn average_latency_ms(&self) -> f64 {
        match self.total_uses() {
            0 => 0.0,
            n => self.total_latency_ms as f64 / n as f64,
        }
    }

    /// Fraction of successful uses, 0 when unused
    pub fn success_rate(&self) -> f64 {
        match self.total_uses() {
            0 => 0.0,
            n => self.success_count as f64 / n as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unused_stats() {
        let stats = ProxyStats::default();
        assert_eq!(stats.total_uses(), 0);
        assert_eq!(stats.average_latency_ms(), 0.0);
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_rates() {
        let mut stats = ProxyStats::default();
        stats.record(true, 100);
        stats.record(true, 200);
        stats.record(false, 300);

        assert_eq!(stats.total_uses(), 3);
        assert_eq!(stats.average_latency_ms(), 200.0);
        assert!((stats.success_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
    }
}
