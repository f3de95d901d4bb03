//! Cooldown tracking for rate limiting command usage

use chrono::{DateTime, Duration, Utc};
use overlord_common::{saturating_seconds, UserId};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during cooldown operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CooldownError {
    /// The invoking user used this command too recently.
    #[error("User {user_id} is on cooldown for command '{command}' (remaining: {remaining_seconds}s)")]
    UserOnCooldown {
        /// Invoker.
        user_id: UserId,
        /// Canonical command name.
        command: String,
        /// Whole seconds until the command clears, rounded up.
        remaining_seconds: u64,
    },
    /// Anyone used this command too recently.
    #[error("Global cooldown active for command '{command}' (remaining: {remaining_seconds}s)")]
    GlobalOnCooldown {
        /// Canonical command name.
        command: String,
        /// Whole seconds until the command clears, rounded up.
        remaining_seconds: u64,
    },
}

impl CooldownError {
    /// Seconds until the blocking scope clears.
    pub fn remaining_seconds(&self) -> u64 {
        match self {
            Self::UserOnCooldown { remaining_seconds, .. }
            | Self::GlobalOnCooldown { remaining_seconds, .. } => *remaining_seconds,
        }
    }
}

/// Cooldown key for tracking different types of cooldowns
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CooldownKey {
    /// Per-user cooldown: (command_name, user_id)
    User(String, UserId),
    /// Global cooldown: command_name
    Global(String),
}

/// Cooldown durations for one command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CooldownPolicy {
    /// Per-user seconds; 0 disables the scope.
    pub user_secs: u64,
    /// Channel-wide seconds; 0 disables the scope.
    pub global_secs: u64,
}

#[derive(Debug, Clone, Copy)]
struct Stamp {
    at: DateTime<Utc>,
    secs: u64,
}

/// Last-invocation records for every (command, scope).
///
/// Not internally synchronized. The dispatcher keeps it behind the same lock
/// as the spam filter so check-and-stamp is one atomic step.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    stamps: HashMap<CooldownKey, Stamp>,
}

impl CooldownTracker {
    /// Create a new cooldown tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks both scopes and, only if both clear, stamps them with `now`.
    pub fn check_and_stamp(
        &mut self,
        command: &str,
        user_id: &UserId,
        policy: CooldownPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), CooldownError> {
        let global_key = CooldownKey::Global(command.to_string());
        let user_key = CooldownKey::User(command.to_string(), user_id.clone());

        if policy.global_secs > 0 {
            if let Some(remaining) = self.remaining(&global_key, policy.global_secs, now) {
                return Err(CooldownError::GlobalOnCooldown {
                    command: command.to_string(),
                    remaining_seconds: remaining,
                });
            }
        }
        if policy.user_secs > 0 {
            if let Some(remaining) = self.remaining(&user_key, policy.user_secs, now) {
                return Err(CooldownError::UserOnCooldown {
                    user_id: user_id.clone(),
                    command: command.to_string(),
                    remaining_seconds: remaining,
                });
            }
        }

        if policy.global_secs > 0 {
            self.stamps.insert(global_key, Stamp { at: now, secs: policy.global_secs });
        }
        if policy.user_secs > 0 {
            self.stamps.insert(user_key, Stamp { at: now, secs: policy.user_secs });
        }
        debug!(command, user = %user_id, "Cooldown stamped");
        Ok(())
    }

    /// When the scope was last admitted, if it is tracked.
    pub fn last_invoked(&self, key: &CooldownKey) -> Option<DateTime<Utc>> {
        self.stamps.get(key).map(|s| s.at)
    }

    /// Drops records whose cooldown has fully elapsed.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        self.stamps
            .retain(|_, stamp| now - stamp.at < seconds(stamp.secs));
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    /// Whether no records are held.
    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    fn remaining(&self, key: &CooldownKey, secs: u64, now: DateTime<Utc>) -> Option<u64> {
        let stamp = self.stamps.get(key)?;
        let elapsed = now - stamp.at;
        let required = seconds(secs);
        if elapsed >= required {
            return None;
        }
        let left_ms = required
            .checked_sub(&elapsed)
            .map_or(i64::MAX, |left| left.num_milliseconds())
            .max(0);
        Some(u64::try_from(left_ms).unwrap_or(0).div_ceil(1000))
    }
}

fn seconds(secs: u64) -> Duration {
    saturating_seconds(secs)
}
