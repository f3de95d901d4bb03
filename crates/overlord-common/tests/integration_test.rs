//! Integration tests for overlord-common crate.

use chrono::{Duration, TimeZone, Utc};
use overlord_common::{
    format_timestamp, format_uptime, normalize_text, ChatMessage, PermissionTier, UserId,
};

#[test]
fn test_user_id_display() {
    let user_id = UserId::new("987654321");
    assert_eq!(format!("{}", user_id), "987654321");
}

#[test]
fn test_chat_message_builder() {
    let when = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let message = ChatMessage::new("42", "pilot", PermissionTier::Subscriber, "!status").at(when);

    assert_eq!(message.user_id, UserId::new("42"));
    assert_eq!(message.display_name, "pilot");
    assert_eq!(message.timestamp, when);
    assert_eq!(format_timestamp(message.timestamp), "2024-01-01 12:00:00 UTC");
}

#[test]
fn test_tier_serde_uses_lowercase_names() {
    let json = serde_json::to_string(&PermissionTier::Moderator).unwrap();
    assert_eq!(json, "\"moderator\"");
    let parsed: PermissionTier = serde_json::from_str("\"broadcaster\"").unwrap();
    assert_eq!(parsed, PermissionTier::Broadcaster);
}

#[test]
fn test_text_helpers() {
    assert_eq!(normalize_text("GG   gg"), "gg gg");
    assert_eq!(format_uptime(Duration::minutes(61)), "0d 1h 1m 0s");
}
