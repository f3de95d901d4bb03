//! Per-user flood and duplicate suppression.

use chrono::{DateTime, Duration, Utc};
use overlord_common::{normalize_text, saturating_seconds, UserId};
use overlord_config::SpamConfig;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use tracing::debug;

/// Outcome of the spam check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamVerdict {
    /// Continue processing.
    Admit,
    /// Drop silently.
    Suppress(SuppressReason),
}

/// Why a message was suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Identical text seen too often in the window.
    Repeated,
    /// Too many messages in the trailing second.
    Flood,
    /// Long text made of very few distinct characters.
    LowDiversity,
}

const LOW_DIVERSITY_MIN_LEN: usize = 20;
const LOW_DIVERSITY_MIN_DISTINCT: usize = 5;
const SWEEP_EVERY: u64 = 512;

#[derive(Debug, Clone, Copy)]
struct Entry {
    at: DateTime<Utc>,
    hash: u64,
}

/// Rolling window of recent messages per user.
///
/// Not internally synchronized: the dispatcher owns it behind its admission
/// lock. Expired entries are dropped lazily when a user posts, and every
/// few hundred calls idle users are swept.
#[derive(Debug, Default)]
pub struct SpamFilter {
    windows: HashMap<UserId, VecDeque<Entry>>,
    calls: u64,
}

impl SpamFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the message and decides whether it may proceed.
    pub fn admit(
        &mut self,
        user: &UserId,
        text: &str,
        at: DateTime<Utc>,
        policy: &SpamConfig,
    ) -> SpamVerdict {
        let window = saturating_seconds(policy.window_secs);

        self.calls += 1;
        if self.calls % SWEEP_EVERY == 0 {
            self.sweep(at, window);
        }

        let hash = text_hash(text);
        let entries = self.windows.entry(user.clone()).or_default();
        while entries.front().is_some_and(|e| at - e.at >= window) {
            entries.pop_front();
        }

        let repeats = entries.iter().filter(|e| e.hash == hash).count() + 1;
        let one_second_ago = at - Duration::seconds(1);
        let recent = entries.iter().filter(|e| e.at > one_second_ago).count() + 1;
        entries.push_back(Entry { at, hash });

        let verdict = if repeats > policy.max_repeats {
            SpamVerdict::Suppress(SuppressReason::Repeated)
        } else if recent > policy.max_messages_per_second {
            SpamVerdict::Suppress(SuppressReason::Flood)
        } else if policy.reject_low_diversity && is_low_diversity(text) {
            SpamVerdict::Suppress(SuppressReason::LowDiversity)
        } else {
            SpamVerdict::Admit
        };

        if let SpamVerdict::Suppress(reason) = verdict {
            debug!(user = %user, ?reason, "Suppressed message");
        }
        verdict
    }

    /// Number of users with a live window.
    pub fn tracked_users(&self) -> usize {
        self.windows.len()
    }

    fn sweep(&mut self, now: DateTime<Utc>, window: Duration) {
        self.windows.retain(|_, entries| {
            entries.retain(|e| now - e.at < window);
            !entries.is_empty()
        });
    }
}

fn text_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    normalize_text(text).hash(&mut hasher);
    hasher.finish()
}

fn is_low_diversity(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() <= LOW_DIVERSITY_MIN_LEN {
        return false;
    }
    trimmed.chars().collect::<HashSet<_>>().len() < LOW_DIVERSITY_MIN_DISTINCT
}
