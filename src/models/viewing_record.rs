use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// What one member has watched of one title.
///
/// `fully_watched` is monotonic: once set, no progress update clears it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewingRecord {
    pub id: Uuid,
    pub member_id: Uuid,
    pub title_id: Uuid,
    /// Fraction watched, in `[0, 1]`
    pub progress: f64,
    pub fully_watched: bool,
    pub updated_at: DateTime<Utc>,
}

impl ViewingRecord {
    pub fn new(member_id: Uuid, title_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            title_id,
            progress: 0.0,
            fully_watched: false,
            updated_at: at,
        }
    }

    /// Sets progress, clamped to `[0, 1]`. Reaching 1.0 marks the record fully watched.
    pub fn update_progress(&mut self, progress: f64, at: DateTime<Utc>) -> AppResult<()> {
        if !progress.is_finite() {
            return Err(AppError::InvalidInput(format!(
                "progress must be a finite number, got {}",
                progress
            )));
        }

        self.progress = progress.clamp(0.0, 1.0);
        self.updated_at = at;

        if self.progress >= 1.0 {
            self.fully_watched = true;
        }

        Ok(())
    }

    pub fn mark_fully_watched(&mut self, at: DateTime<Utc>) {
        self.fully_watched = true;
        self.progress = 1.0;
        self.updated_at = at;
    }

    pub fn is_in_progress(&self) -> bool {
        self.progress > 0.0 && !self.fully_watched
    }
}
