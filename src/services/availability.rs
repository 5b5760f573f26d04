use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    clock::Clock,
    db::{AvailabilityStore, TitleStore},
    error::{AppError, AppResult},
    models::{Availability, AvailabilityObservation, AvailabilitySummary, Confidence},
    services::confidence::calculate_confidence,
};

/// Aggregates crowd-sourced availability reports and accepts new ones
pub struct AvailabilityService {
    store: Arc<dyn AvailabilityStore>,
    titles: Arc<dyn TitleStore>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityService {
    pub fn new(
        store: Arc<dyn AvailabilityStore>,
        titles: Arc<dyn TitleStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            titles,
            clock,
        }
    }

    /// Per-platform availability facts for a title, ordered by platform name
    pub async fn for_title(&self, title_id: Uuid) -> AppResult<Vec<Availability>> {
        let observations = self.store.find_observations(title_id).await?;
        let availability = aggregate_by_platform(&observations, self.clock.now());

        tracing::debug!(
            title_id = %title_id,
            observation_count = observations.len(),
            platform_count = availability.len(),
            "Aggregated availability"
        );

        Ok(availability)
    }

    /// Availability facts plus a non-authoritative description
    pub async fn summary_for_title(&self, title_id: Uuid) -> AppResult<AvailabilitySummary> {
        let platforms = self.for_title(title_id).await?;
        Ok(AvailabilitySummary::new(title_id, platforms))
    }

    /// Appends a crowd report. Earlier reports are never edited; a correction is simply a
    /// newer report that outweighs them.
    pub async fn report_availability(
        &self,
        title_id: Uuid,
        platform: &str,
        available: bool,
        reporter_id: Uuid,
    ) -> AppResult<AvailabilityObservation> {
        let platform = normalize_platform(platform)?;
        if self.titles.find_title(title_id).await?.is_none() {
            return Err(AppError::NotFound(format!("title {}", title_id)));
        }

        let observation = AvailabilityObservation::new(
            title_id,
            platform,
            available,
            reporter_id,
            self.clock.now(),
        );

        self.store.save_observation(&observation).await?;

        tracing::info!(
            title_id = %title_id,
            platform = %observation.platform,
            available,
            reporter_id = %reporter_id,
            "Availability reported"
        );

        Ok(observation)
    }

    /// Decayed confidence for a title on a single platform
    pub async fn get_confidence(&self, title_id: Uuid, platform: &str) -> AppResult<Confidence> {
        let platform = normalize_platform(platform)?;
        let observations = self
            .store
            .find_platform_observations(title_id, platform)
            .await?;

        Ok(calculate_confidence(&observations, self.clock.now()))
    }
}

fn normalize_platform(platform: &str) -> AppResult<&str> {
    let trimmed = platform.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(
            "platform must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Groups observations by platform and derives one [`Availability`] per group.
///
/// `available` comes from the freshest observation in the group. Equal timestamps are
/// broken by the larger observation id, so the result never depends on input order.
pub fn aggregate_by_platform(
    observations: &[AvailabilityObservation],
    now: DateTime<Utc>,
) -> Vec<Availability> {
    let mut by_platform: BTreeMap<&str, Vec<&AvailabilityObservation>> = BTreeMap::new();
    for obs in observations {
        by_platform.entry(obs.platform.as_str()).or_default().push(obs);
    }

    by_platform
        .into_iter()
        .map(|(platform, group)| {
            let freshest = group.iter().max_by_key(|o| o.recency_key());
            if let Some(winner) = freshest {
                let conflicting = group.iter().any(|o| {
                    o.reported_at == winner.reported_at && o.available != winner.available
                });
                if conflicting {
                    tracing::warn!(
                        title_id = %winner.title_id,
                        platform,
                        reported_at = %winner.reported_at,
                        "Conflicting reports share a timestamp, using the larger observation id"
                    );
                }
            }

            Availability {
                platform: platform.to_string(),
                confidence: calculate_confidence(group.iter().copied(), now),
                available: freshest.map(|o| o.available).unwrap_or(false),
                observation_count: group.len(),
                last_reported_at: freshest.map(|o| o.reported_at),
            }
        })
        .collect()
}
