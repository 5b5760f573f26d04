use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A household's paid subscription to a streaming platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: Uuid,
    pub household_id: Uuid,
    pub platform: String,
    /// Monthly cost as stored, e.g. `15.99`
    pub monthly_cost: BigDecimal,
    pub active: bool,
    /// Only ever moves forward, see [`Subscription::record_usage`]
    pub last_watched_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(
        household_id: Uuid,
        platform: impl Into<String>,
        monthly_cost: BigDecimal,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            household_id,
            platform: platform.into(),
            monthly_cost,
            active: true,
            last_watched_at: at,
        }
    }

    /// Whole days since the platform was last used. Future timestamps count as zero.
    pub fn days_since_last_watch(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_watched_at).num_days().max(0)
    }

    pub fn cancel(&mut self) {
        self.active = false;
    }

    pub fn reactivate(&mut self) {
        self.active = true;
    }

    /// Records a watch on this platform. Returns whether `last_watched_at` advanced.
    pub fn record_usage(&mut self, at: DateTime<Utc>) -> bool {
        if at > self.last_watched_at {
            self.last_watched_at = at;
            true
        } else {
            false
        }
    }
}
