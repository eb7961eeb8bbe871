use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Tunables for clustering, conflict detection and deferral expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Minimum Levenshtein similarity (0 to 100) for an employer to join a cluster.
    pub cluster_threshold: f64,
    /// Trigram similarity (0 to 1) above which another employer is a conflict.
    pub conflict_threshold: f64,
    pub conflict_limit: usize,
    /// Days a defer keeps an alias out of the queue. `None` means forever.
    pub defer_days: Option<u32>,
}

impl ResolutionConfig {
    pub fn defer_window(&self) -> Option<Duration> {
        self.defer_days.map(|days| Duration::days(i64::from(days)))
    }
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            cluster_threshold: 70.0,
            conflict_threshold: 0.8,
            conflict_limit: 5,
            defer_days: Some(30),
        }
    }
}
