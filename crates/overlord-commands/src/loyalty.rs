//! Loyalty points and titles.

use crate::error::ServiceError;
use crate::store::{read_json, write_json_atomic};
use crate::traits::LoyaltyStore;
use async_trait::async_trait;
use dashmap::DashMap;
use overlord_common::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Loyalty levels, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoyaltyLevel {
    /// 0 points.
    Drone,
    /// 100 points.
    Subject,
    /// 500 points.
    Lieutenant,
    /// 1000 points.
    Advisor,
}

impl LoyaltyLevel {
    const LADDER: [(i64, Self); 4] = [
        (1000, Self::Advisor),
        (500, Self::Lieutenant),
        (100, Self::Subject),
        (0, Self::Drone),
    ];

    /// Level earned by a point total. Negative totals stay at the bottom.
    pub fn for_points(points: i64) -> Self {
        Self::LADDER
            .iter()
            .find(|(min, _)| points >= *min)
            .map_or(Self::Drone, |(_, level)| *level)
    }

    /// Title used in chat.
    pub fn title(self) -> &'static str {
        match self {
            Self::Drone => "Drone",
            Self::Subject => "Subject",
            Self::Lieutenant => "Lieutenant",
            Self::Advisor => "Advisor",
        }
    }
}

/// A user's standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyProfile {
    /// Owner.
    pub user_id: UserId,
    /// Accumulated points.
    pub points: i64,
    /// Title for the current level.
    pub title: String,
}

impl LoyaltyProfile {
    /// Builds the profile for a point total.
    pub fn new(user_id: UserId, points: i64) -> Self {
        Self {
            user_id,
            points,
            title: LoyaltyLevel::for_points(points).title().to_string(),
        }
    }
}

/// In-memory point ledger with JSON snapshots.
#[derive(Debug, Default)]
pub struct LoyaltyLedger {
    points: DashMap<UserId, i64>,
}

impl LoyaltyLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a snapshot; a missing file yields an empty ledger.
    pub fn load(path: &Path) -> Result<Self, ServiceError> {
        let stored: BTreeMap<String, i64> = read_json(path)?.unwrap_or_default();
        let ledger = Self::new();
        for (user, points) in stored {
            ledger.points.insert(UserId(user), points);
        }
        info!(path = %path.display(), users = ledger.points.len(), "Loaded loyalty ledger");
        Ok(ledger)
    }

    /// Writes a snapshot atomically.
    pub fn save(&self, path: &Path) -> Result<(), ServiceError> {
        let snapshot: BTreeMap<String, i64> = self
            .points
            .iter()
            .map(|e| (e.key().0.clone(), *e.value()))
            .collect();
        write_json_atomic(path, &snapshot)
    }

    /// Points for a user.
    pub fn points(&self, user_id: &UserId) -> i64 {
        self.points.get(user_id).map_or(0, |p| *p)
    }

    /// Number of users with a balance.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether nobody has points yet.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[async_trait]
impl LoyaltyStore for LoyaltyLedger {
    async fn increment_loyalty(&self, user_id: &UserId, delta: i64) -> Result<LoyaltyProfile, ServiceError> {
        let points = {
            let mut entry = self.points.entry(user_id.clone()).or_insert(0);
            *entry = entry.saturating_add(delta);
            *entry
        };
        Ok(LoyaltyProfile::new(user_id.clone(), points))
    }

    async fn profile(&self, user_id: &UserId) -> Result<LoyaltyProfile, ServiceError> {
        Ok(LoyaltyProfile::new(user_id.clone(), self.points(user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(LoyaltyLevel::for_points(-5), LoyaltyLevel::Drone);
        assert_eq!(LoyaltyLevel::for_points(0), LoyaltyLevel::Drone);
        assert_eq!(LoyaltyLevel::for_points(99), LoyaltyLevel::Drone);
        assert_eq!(LoyaltyLevel::for_points(100), LoyaltyLevel::Subject);
        assert_eq!(LoyaltyLevel::for_points(500), LoyaltyLevel::Lieutenant);
        assert_eq!(LoyaltyLevel::for_points(5000), LoyaltyLevel::Advisor);
    }

    #[tokio::test]
    async fn test_increment_updates_title() {
        let ledger = LoyaltyLedger::new();
        let user = UserId::new("u1");
        let profile = ledger.increment_loyalty(&user, 99).await.unwrap();
        assert_eq!(profile.title, "Drone");
        let profile = ledger.increment_loyalty(&user, 1).await.unwrap();
        assert_eq!(profile.points, 100);
        assert_eq!(profile.title, "Subject");
        assert_eq!(ledger.profile(&UserId::new("nobody")).await.unwrap().points, 0);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("loyalty.json");

        let ledger = LoyaltyLedger::new();
        ledger.increment_loyalty(&UserId::new("a"), 120).await.unwrap();
        ledger.increment_loyalty(&UserId::new("b"), 3).await.unwrap();
        ledger.save(&path).unwrap();

        let restored = LoyaltyLedger::load(&path).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.points(&UserId::new("a")), 120);
        assert!(LoyaltyLedger::load(&dir.path().join("missing.json")).unwrap().is_empty());
    }
}
