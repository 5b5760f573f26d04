use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Confidence;

/// Platforms below this confidence are not presented as likely
pub const LIKELY_CONFIDENCE_THRESHOLD: f64 = 0.3;

/// A single crowd-sourced availability report. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityObservation {
    pub id: Uuid,
    pub title_id: Uuid,
    pub platform: String,
    pub available: bool,
    pub reported_at: DateTime<Utc>,
    /// Member who made the report
    pub reporter_id: Uuid,
}

impl AvailabilityObservation {
    pub fn new(
        title_id: Uuid,
        platform: impl Into<String>,
        available: bool,
        reporter_id: Uuid,
        reported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title_id,
            platform: platform.into(),
            available,
            reported_at,
            reporter_id,
        }
    }

    /// Recency key. Later reports sort higher; equal timestamps fall back to the id.
    pub fn recency_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.reported_at, self.id)
    }
}

/// Aggregated availability of one title on one platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Availability {
    pub platform: String,
    pub confidence: Confidence,
    /// Taken from the freshest observation, not a majority vote
    pub available: bool,
    pub observation_count: usize,
    pub last_reported_at: Option<DateTime<Utc>>,
}

/// Where a title can probably be watched. Crowd-sourced, never authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilitySummary {
    pub title_id: Uuid,
    pub platforms: Vec<Availability>,
    pub description: String,
    pub source: AvailabilitySource,
    /// Most recent report across all platforms
    pub last_verified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilitySource {
    CrowdSourced,
}

impl AvailabilitySummary {
    pub fn new(title_id: Uuid, platforms: Vec<Availability>) -> Self {
        let description = describe(&likely_platforms(&platforms));
        let last_verified_at = platforms.iter().filter_map(|p| p.last_reported_at).max();
        Self {
            title_id,
            platforms,
            description,
            source: AvailabilitySource::CrowdSourced,
            last_verified_at,
        }
    }

    /// Platforms currently reported as carrying the title with enough confidence
    pub fn likely_platforms(&self) -> Vec<&str> {
        likely_platforms(&self.platforms)
    }

    pub fn is_authoritative(&self) -> bool {
        false
    }
}

fn likely_platforms(platforms: &[Availability]) -> Vec<&str> {
    platforms
        .iter()
        .filter(|p| p.available && p.confidence.value >= LIKELY_CONFIDENCE_THRESHOLD)
        .map(|p| p.platform.as_str())
        .collect()
}

fn describe(likely: &[&str]) -> String {
    if likely.is_empty() {
        "Availability uncertain - no recent observations".to_string()
    } else {
        format!("Likely available on {}", likely.join(", "))
    }
}
