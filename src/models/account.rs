use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AvailabilityObservation, Household, Subscription, Title, TitleType, ViewingRecord};

/// How long deleted accounts survive in backups
pub const BACKUP_RETENTION_DAYS: u32 = 30;

/// One viewing record with the names needed to read it outside the service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewingHistoryEntry {
    #[serde(flatten)]
    pub record: ViewingRecord,
    pub member_name: String,
    /// Missing only if the title was removed from the catalog
    pub title: Option<Title>,
    pub in_progress: bool,
}

/// Watch counts per content type across the household
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewingPreferences {
    pub movies: usize,
    pub series: usize,
    /// The more watched type. `None` on a tie, including when nothing was watched.
    pub preferred_type: Option<TitleType>,
}

impl ViewingPreferences {
    pub fn from_history(history: &[ViewingHistoryEntry]) -> Self {
        let count = |kind: TitleType| {
            history
                .iter()
                .filter(|e| e.title.as_ref().map(|t| t.title_type) == Some(kind))
                .count()
        };
        let movies = count(TitleType::Movie);
        let series = count(TitleType::Series);

        let preferred_type = match movies.cmp(&series) {
            std::cmp::Ordering::Greater => Some(TitleType::Movie),
            std::cmp::Ordering::Less => Some(TitleType::Series),
            std::cmp::Ordering::Equal => None,
        };

        Self {
            movies,
            series,
            preferred_type,
        }
    }
}

/// Everything stored about a household, in one document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HouseholdExport {
    pub household: Household,
    pub viewing_history: Vec<ViewingHistoryEntry>,
    pub preferences: ViewingPreferences,
    /// Cancelled subscriptions included
    pub subscriptions: Vec<Subscription>,
    /// Availability reports filed by the household's members
    pub availability_reports: Vec<AvailabilityObservation>,
    pub exported_at: DateTime<Utc>,
}

/// Confirmation that a household and all of its data were deleted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountDeletion {
    pub household_id: Uuid,
    pub members_removed: usize,
    pub deleted_at: DateTime<Utc>,
    pub permanent: bool,
    pub backup_retention_days: u32,
}
