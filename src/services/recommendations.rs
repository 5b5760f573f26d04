use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{
    clock::Clock,
    db::{AvailabilityStore, TitleStore},
    error::AppResult,
    models::{AvailabilityObservation, Confidence, Household, Recommendation, Title},
    services::confidence::calculate_confidence,
};

/// Upper bound on recommendations returned per household
pub const MAX_RECOMMENDATIONS: usize = 10;
/// Households are expected to see at least this many when enough titles are unwatched.
/// Not enforced beyond the size of the candidate set.
pub const MIN_RECOMMENDATIONS: usize = 3;

const BASE_SCORE: f64 = 0.5;
const AVAILABILITY_THRESHOLD: f64 = 0.7;
const AVAILABILITY_BOOST: f64 = 0.2;
const SERIES_BOOST: f64 = 0.1;

pub const REASON_AVAILABLE: &str = "Available on streaming services you subscribe to";
pub const REASON_SERIES: &str = "Series with multiple episodes";
pub const REASON_FALLBACK: &str = "Popular title in your preferred genres";

/// Deterministic, rule-based recommender.
///
/// Every candidate starts at a base score and earns fixed boosts, each boost paired with a
/// human-readable reason. Titles fully watched by any member are never candidates.
pub struct RecommendationEngine {
    titles: Arc<dyn TitleStore>,
    availability: Arc<dyn AvailabilityStore>,
    clock: Arc<dyn Clock>,
}

impl RecommendationEngine {
    pub fn new(
        titles: Arc<dyn TitleStore>,
        availability: Arc<dyn AvailabilityStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            titles,
            availability,
            clock,
        }
    }

    /// Ranked recommendations for a household, at most [`MAX_RECOMMENDATIONS`].
    ///
    /// An absent household or one with nothing left to watch yields an empty list.
    /// Equal scores keep the candidate order (title name, then id).
    pub async fn for_household(&self, household: Option<&Household>) -> AppResult<Vec<Recommendation>> {
        let Some(household) = household else {
            tracing::debug!("No household supplied, returning no recommendations");
            return Ok(Vec::new());
        };

        let candidates = self.titles.find_unwatched_titles(household.id).await?;
        if candidates.is_empty() {
            tracing::info!(household_id = %household.id, "No unwatched titles to recommend");
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let candidate_count = candidates.len();
        let mut recommendations = Vec::with_capacity(candidate_count);

        for title in candidates {
            let observations = self.availability.find_observations(title.id).await?;
            recommendations.push(score_title(title, &observations, now));
        }

        // Stable sort: ties stay in retrieval order
        recommendations.sort_by(|a, b| b.score.total_cmp(&a.score));
        recommendations.truncate(MAX_RECOMMENDATIONS);

        if recommendations.len() < MIN_RECOMMENDATIONS {
            tracing::debug!(
                household_id = %household.id,
                count = recommendations.len(),
                "Fewer recommendations than the expected minimum"
            );
        }

        tracing::info!(
            household_id = %household.id,
            candidates = candidate_count,
            returned = recommendations.len(),
            "Generated recommendations"
        );

        Ok(recommendations)
    }
}

/// Scores one candidate title against its availability observations
pub fn score_title(
    title: Title,
    observations: &[AvailabilityObservation],
    now: DateTime<Utc>,
) -> Recommendation {
    let mut score = BASE_SCORE;
    let mut reasons = Vec::new();

    if calculate_confidence(observations, now).value > AVAILABILITY_THRESHOLD {
        score += AVAILABILITY_BOOST;
        reasons.push(REASON_AVAILABLE.to_string());
    }

    if title.is_series() {
        score += SERIES_BOOST;
        reasons.push(REASON_SERIES.to_string());
    }

    if reasons.is_empty() {
        reasons.push(REASON_FALLBACK.to_string());
    }

    Recommendation {
        title,
        score,
        confidence: volume_confidence(observations.len()),
        reasons,
    }
}

/// Confidence from how much evidence exists, independent of what it says
pub fn volume_confidence(observation_count: usize) -> Confidence {
    let value = match observation_count {
        0 => 0.3,
        1..=2 => 0.5,
        3..=5 => 0.7,
        _ => 0.9,
    };
    Confidence::new(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::FixedClock,
        db::{MockAvailabilityStore, MockTitleStore},
        error::AppError,
        models::{ConfidenceLabel, TitleType},
    };
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    }

    fn observations(title: &Title, available: bool, count: usize) -> Vec<AvailabilityObservation> {
        (0..count)
            .map(|i| {
                AvailabilityObservation::new(
                    title.id,
                    "Netflix",
                    available,
                    Uuid::new_v4(),
                    now() - Duration::days(i as i64),
                )
            })
            .collect()
    }

    fn engine(titles: MockTitleStore, availability: MockAvailabilityStore) -> RecommendationEngine {
        RecommendationEngine::new(
            Arc::new(titles),
            Arc::new(availability),
            Arc::new(FixedClock(now())),
        )
    }

    #[test]
    fn test_movie_without_evidence_gets_fallback_reason() {
        let title = Title::new("m", "Movie", TitleType::Movie);
        let rec = score_title(title, &[], now());

        assert_eq!(rec.score, 0.5);
        assert_eq!(rec.reasons, vec![REASON_FALLBACK]);
        assert_eq!(rec.confidence.value, 0.3);
        assert_eq!(rec.confidence.label, ConfidenceLabel::Low);
    }

    #[test]
    fn test_available_series_collects_both_reasons() {
        let title = Title::new("s", "Series", TitleType::Series);
        let obs = observations(&title, true, 3);
        let rec = score_title(title, &obs, now());

        assert!((rec.score - 0.8).abs() < 1e-12);
        assert_eq!(rec.reasons, vec![REASON_AVAILABLE, REASON_SERIES]);
        assert_eq!(rec.confidence.value, 0.7);
    }

    #[test]
    fn test_negative_reports_raise_confidence_but_not_score() {
        let title = Title::new("m", "Movie", TitleType::Movie);
        let obs = observations(&title, false, 6);
        let rec = score_title(title, &obs, now());

        assert_eq!(rec.score, 0.5);
        assert_eq!(rec.reasons, vec![REASON_FALLBACK]);
        assert_eq!(rec.confidence.label, ConfidenceLabel::High);
    }

    #[test]
    fn test_volume_confidence_steps() {
        assert_eq!(volume_confidence(0).value, 0.3);
        assert_eq!(volume_confidence(1).value, 0.5);
        assert_eq!(volume_confidence(2).value, 0.5);
        assert_eq!(volume_confidence(3).value, 0.7);
        assert_eq!(volume_confidence(5).value, 0.7);
        assert_eq!(volume_confidence(6).value, 0.9);
        assert_eq!(volume_confidence(6).label, ConfidenceLabel::High);
    }

    #[tokio::test]
    async fn test_absent_household_returns_empty_without_storage() {
        let mut titles = MockTitleStore::new();
        titles.expect_find_unwatched_titles().never();
        let engine = engine(titles, MockAvailabilityStore::new());

        assert!(engine.for_household(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ranking_cap_and_stable_ties() {
        let household = Household::new("Home", "Alice");
        let mut candidates: Vec<Title> = (0..12)
            .map(|i| Title::new(format!("m{i}"), format!("Movie {i:02}"), TitleType::Movie))
            .collect();
        let series = Title::new("s", "Zeta Series", TitleType::Series);
        candidates.push(series.clone());

        let mut titles = MockTitleStore::new();
        let returned = candidates.clone();
        titles
            .expect_find_unwatched_titles()
            .returning(move |_| Ok(returned.clone()));

        let mut availability = MockAvailabilityStore::new();
        availability
            .expect_find_observations()
            .returning(|_| Ok(Vec::new()));

        let recs = engine(titles, availability)
            .for_household(Some(&household))
            .await
            .unwrap();

        assert_eq!(recs.len(), MAX_RECOMMENDATIONS);
        assert_eq!(recs[0].title, series);

        let tied: Vec<_> = recs[1..].iter().map(|r| r.title.name.clone()).collect();
        let expected: Vec<_> = candidates[..9].iter().map(|t| t.name.clone()).collect();
        assert_eq!(tied, expected);
        assert!(recs.iter().all(|r| !r.reasons.is_empty()));
    }

    #[tokio::test]
    async fn test_availability_failure_aborts_computation() {
        let household = Household::new("Home", "Alice");
        let title = Title::new("m", "Movie", TitleType::Movie);

        let mut titles = MockTitleStore::new();
        titles
            .expect_find_unwatched_titles()
            .returning(move |_| Ok(vec![title.clone()]));

        let mut availability = MockAvailabilityStore::new();
        availability
            .expect_find_observations()
            .returning(|_| Err(AppError::StorageUnavailable(sqlx::Error::PoolTimedOut)));

        let result = engine(titles, availability)
            .for_household(Some(&household))
            .await;
        assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
    }
}
