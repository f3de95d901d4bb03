//! Command metrics and usage tracking

use crate::error::FailureKind;
use crate::traits::MetricsSink;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Reasons a message was dropped before any handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// Author on the ignore list, or the bot itself.
    Ignored,
    /// Dropped by the spam filter.
    Suppressed,
    /// Prefixed token that names no command.
    NotFound,
    /// Invoker tier too low.
    Permission,
    /// Cooldown still running.
    Cooldown,
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Successful invocations across all commands.
    pub total_invocations: u64,
    /// Successful invocations per canonical command.
    pub invocations: HashMap<String, u64>,
    /// Execution failures per kind.
    pub failures: HashMap<FailureKind, u64>,
    /// Pre-execution drops per kind.
    pub rejections: HashMap<RejectionKind, u64>,
}

impl MetricsSnapshot {
    /// The most invoked command; ties resolve alphabetically.
    pub fn most_used(&self) -> Option<&str> {
        self.invocations
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(name, _)| name.as_str())
    }

    /// Failures recorded for one kind.
    pub fn failures_of(&self, kind: FailureKind) -> u64 {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    /// Rejections recorded for one kind.
    pub fn rejections_of(&self, kind: RejectionKind) -> u64 {
        self.rejections.get(&kind).copied().unwrap_or(0)
    }
}

/// Thread-safe metrics manager
#[derive(Debug, Default)]
pub struct MetricsManager {
    invocations: DashMap<String, AtomicU64>,
    failures: DashMap<FailureKind, AtomicU64>,
    failures_by_command: DashMap<String, AtomicU64>,
    rejections: DashMap<RejectionKind, AtomicU64>,
    total_invocations: AtomicU64,
}

impl MetricsManager {
    /// Create a new metrics manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Failures recorded against one command.
    pub fn failures_for(&self, command: &str) -> u64 {
        self.failures_by_command
            .get(command)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }
}

fn bump<K: std::hash::Hash + Eq>(map: &DashMap<K, AtomicU64>, key: K) {
    map.entry(key)
        .or_insert_with(|| AtomicU64::new(0))
        .fetch_add(1, Ordering::Relaxed);
}

fn collect<K: std::hash::Hash + Eq + Clone>(map: &DashMap<K, AtomicU64>) -> HashMap<K, u64> {
    map.iter()
        .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
        .collect()
}

impl MetricsSink for MetricsManager {
    fn increment_invocation(&self, command: &str) {
        bump(&self.invocations, command.to_string());
        self.total_invocations.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self, command: &str, kind: FailureKind) {
        bump(&self.failures, kind);
        bump(&self.failures_by_command, command.to_string());
        debug!(command, %kind, "Recorded command failure");
    }

    fn record_rejection(&self, kind: RejectionKind) {
        bump(&self.rejections, kind);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_invocations: self.total_invocations.load(Ordering::Relaxed),
            invocations: collect(&self.invocations),
            failures: collect(&self.failures),
            rejections: collect(&self.rejections),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counts_and_most_used() {
        let metrics = MetricsManager::new();
        metrics.increment_invocation("status");
        metrics.increment_invocation("status");
        metrics.increment_invocation("brief");
        metrics.record_failure("weather", FailureKind::Timeout);
        metrics.record_rejection(RejectionKind::Cooldown);

        let snap = metrics.snapshot();
        assert_eq!(snap.total_invocations, 3);
        assert_eq!(snap.most_used(), Some("status"));
        assert_eq!(snap.failures_of(FailureKind::Timeout), 1);
        assert_eq!(snap.failures_of(FailureKind::UpstreamFailure), 0);
        assert_eq!(snap.rejections_of(RejectionKind::Cooldown), 1);
        assert_eq!(metrics.failures_for("weather"), 1);
    }

    #[test]
    fn test_most_used_tie_is_alphabetical() {
        let metrics = MetricsManager::new();
        metrics.increment_invocation("zulu");
        metrics.increment_invocation("alpha");
        assert_eq!(metrics.snapshot().most_used(), Some("alpha"));
        assert_eq!(MetricsSnapshot::default().most_used(), None);
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(MetricsManager::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        m.increment_invocation("status");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().invocations["status"], 800);
    }
}
