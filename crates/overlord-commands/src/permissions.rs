//! Admission gate: permission check followed by cooldown check-and-stamp.

use crate::command::Command;
use crate::cooldown::{CooldownError, CooldownPolicy, CooldownTracker};
use chrono::{DateTime, Utc};
use overlord_common::{PermissionTier, UserId};
use thiserror::Error;
use tracing::debug;

/// Why the gate refused an invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateDenial {
    /// The invoker's tier is below the command's.
    #[error("'{command}' requires {required}, user has {actual}")]
    Permission {
        /// Canonical command name.
        command: String,
        /// Tier the command demands.
        required: PermissionTier,
        /// Tier the invoker holds.
        actual: PermissionTier,
    },
    /// A cooldown scope has not cleared.
    #[error(transparent)]
    Cooldown(#[from] CooldownError),
}

impl GateDenial {
    /// Short chat notice for the invoker.
    pub fn notice(&self, user: &str) -> String {
        match self {
            Self::Permission { .. } => {
                format!("Access denied, {user}. Your clearance level is insufficient.")
            }
            Self::Cooldown(err) => format!(
                "Patience, {user}. Your command frequency exceeds acceptable parameters. Retry in {}s.",
                err.remaining_seconds()
            ),
        }
    }
}

/// Checks whether a user of tier `actual` may invoke a command requiring `required`.
pub fn check_permission(
    command: &str,
    actual: PermissionTier,
    required: PermissionTier,
) -> Result<(), GateDenial> {
    if actual.satisfies(required) {
        Ok(())
    } else {
        Err(GateDenial::Permission {
            command: command.to_string(),
            required,
            actual,
        })
    }
}

/// Runs the full gate for one invocation.
///
/// A permission denial never touches cooldown state. A cooldown denial leaves
/// existing stamps as they were. On success both applicable scopes are
/// stamped with `now`.
pub fn admit_invocation(
    tracker: &mut CooldownTracker,
    command: &Command,
    user_id: &UserId,
    tier: PermissionTier,
    now: DateTime<Utc>,
) -> Result<(), GateDenial> {
    check_permission(&command.name, tier, command.permission)?;
    let policy = CooldownPolicy {
        user_secs: command.user_cooldown_secs,
        global_secs: command.global_cooldown_secs,
    };
    tracker
        .check_and_stamp(&command.name, user_id, policy, now)
        .map_err(|err| {
            debug!(command = %command.name, user = %user_id, "{}", err);
            GateDenial::from(err)
        })
}
