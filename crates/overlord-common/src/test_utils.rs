//! Test utilities and shared fixtures for Overlord Bot.
//!
//! Enabled for other crates through the `testing` feature.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Once;

use crate::{ChatMessage, PermissionTier, UserId};

static INIT: Once = Once::new();

/// Initialize logging for tests. Safe to call multiple times.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(filter)
            .try_init();
    });
}

/// Fixed reference instant used by time-sensitive tests.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// `base_time()` shifted by a number of milliseconds.
pub fn at_millis(offset_ms: i64) -> DateTime<Utc> {
    base_time() + Duration::milliseconds(offset_ms)
}

/// `base_time()` shifted by a number of seconds.
pub fn at_secs(offset_secs: i64) -> DateTime<Utc> {
    base_time() + Duration::seconds(offset_secs)
}

/// Create a temporary directory for tests that automatically cleans up.
#[cfg(feature = "tempfile")]
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Chat-related fixtures.
pub mod chat_fixtures {
    use super::*;

    /// A message from a plain viewer.
    pub fn viewer_message(login: &str, text: &str) -> ChatMessage {
        message_with_tier(login, PermissionTier::Everyone, text)
    }

    /// A message from a subscriber.
    pub fn subscriber_message(login: &str, text: &str) -> ChatMessage {
        message_with_tier(login, PermissionTier::Subscriber, text)
    }

    /// A message from a moderator.
    pub fn moderator_message(login: &str, text: &str) -> ChatMessage {
        message_with_tier(login, PermissionTier::Moderator, text)
    }

    /// A message with an explicit tier, stamped at `base_time()`.
    pub fn message_with_tier(login: &str, tier: PermissionTier, text: &str) -> ChatMessage {
        ChatMessage {
            user_id: test_user_id(login),
            login: login.to_string(),
            display_name: login.to_string(),
            tier,
            text: text.to_string(),
            timestamp: base_time(),
        }
    }

    /// Deterministic user ID derived from a login.
    pub fn test_user_id(login: &str) -> UserId {
        UserId(format!("id-{login}"))
    }
}

/// Property-based testing strategies.
#[cfg(feature = "proptest")]
pub mod property_testing {
    use proptest::prelude::*;

    /// Words of 1-12 lowercase letters.
    pub fn word_strategy() -> impl Strategy<Value = String> {
        r"[a-z]{1,12}".prop_map(|s| s.to_string())
    }

    /// Sentences made of short words separated by arbitrary whitespace.
    pub fn sentence_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec((word_strategy(), r"[ \t\n]{1,3}"), 0..60).prop_map(|parts| {
            parts
                .into_iter()
                .map(|(word, gap)| format!("{word}{gap}"))
                .collect::<String>()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_multiple_calls() {
        init_test_logging();
        init_test_logging();
    }

    #[test]
    fn test_time_helpers() {
        assert_eq!(at_secs(30) - base_time(), Duration::seconds(30));
        assert_eq!(at_millis(1500) - base_time(), Duration::milliseconds(1500));
    }

    #[test]
    fn test_message_fixture() {
        let message = chat_fixtures::moderator_message("alice", "!addcom !hi hello");
        assert_eq!(message.tier, PermissionTier::Moderator);
        assert_eq!(message.user_id, UserId::new("id-alice"));
        assert_eq!(message.timestamp, base_time());
    }
}
