//! Common type definitions and newtype wrappers for domain modeling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::OverlordError;

/// A chat platform user ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Creates a user ID from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier attached to a single command invocation for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(pub Uuid);

impl InvocationId {
    /// Generates a fresh random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Permission tiers, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PermissionTier {
    /// Anyone in chat.
    #[default]
    Everyone,
    /// Channel subscribers.
    Subscriber,
    /// Channel moderators.
    Moderator,
    /// The channel owner.
    Broadcaster,
}

impl PermissionTier {
    /// Lowercase name used in configuration and chat replies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Everyone => "everyone",
            Self::Subscriber => "subscriber",
            Self::Moderator => "moderator",
            Self::Broadcaster => "broadcaster",
        }
    }

    /// Whether a user holding `self` may run something that requires `required`.
    pub fn satisfies(self, required: PermissionTier) -> bool {
        self >= required
    }
}

impl fmt::Display for PermissionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionTier {
    type Err = OverlordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "everyone" | "all" | "viewer" => Ok(Self::Everyone),
            "subscriber" | "sub" => Ok(Self::Subscriber),
            "moderator" | "mod" => Ok(Self::Moderator),
            "broadcaster" | "owner" => Ok(Self::Broadcaster),
            other => Err(OverlordError::validation(
                format!("unknown permission tier '{other}'"),
                Some("permission"),
            )),
        }
    }
}

/// A single inbound chat line, as delivered by a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Stable platform user ID.
    pub user_id: UserId,
    /// Login name (lowercase).
    pub login: String,
    /// Name shown in chat.
    pub display_name: String,
    /// Highest tier the author holds in the channel.
    pub tier: PermissionTier,
    /// Raw message text.
    pub text: String,
    /// When the message was received.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Creates a message stamped with the current time.
    pub fn new(
        user_id: impl Into<String>,
        login: impl Into<String>,
        tier: PermissionTier,
        text: impl Into<String>,
    ) -> Self {
        let login = login.into();
        Self {
            user_id: UserId(user_id.into()),
            display_name: login.clone(),
            login,
            tier,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Replaces the receive timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(PermissionTier::Everyone < PermissionTier::Subscriber);
        assert!(PermissionTier::Subscriber < PermissionTier::Moderator);
        assert!(PermissionTier::Moderator < PermissionTier::Broadcaster);
        assert!(PermissionTier::Broadcaster.satisfies(PermissionTier::Moderator));
        assert!(!PermissionTier::Subscriber.satisfies(PermissionTier::Moderator));
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!("MOD".parse::<PermissionTier>().unwrap(), PermissionTier::Moderator);
        assert_eq!("sub".parse::<PermissionTier>().unwrap(), PermissionTier::Subscriber);
        assert!("admin".parse::<PermissionTier>().is_err());
    }
}
