//! End-to-end flows through the engines over the in-memory store.

use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use household_insights::{
    clock::{Clock, FixedClock},
    db::{AvailabilityStore, HouseholdStore, MemoryStore, SubscriptionStore, TitleStore},
    error::AppError,
    models::{
        AvailabilityObservation, ConfidenceLabel, Household, Money, Subscription,
        SubscriptionAction, Title, TitleType, ValueRating,
    },
    services::{
        recommendations::{MAX_RECOMMENDATIONS, REASON_SERIES},
        HouseholdService, RecommendationEngine, SubscriptionIntelligence,
    },
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(now()))
}

fn engine(store: &MemoryStore) -> RecommendationEngine {
    let store = Arc::new(store.clone());
    RecommendationEngine::new(store.clone(), store, clock())
}

fn intelligence(store: &MemoryStore) -> SubscriptionIntelligence {
    let store = Arc::new(store.clone());
    SubscriptionIntelligence::new(store.clone(), store, clock())
}

fn households(store: &MemoryStore) -> HouseholdService {
    let store = Arc::new(store.clone());
    HouseholdService::new(store.clone(), store.clone(), store.clone(), store, clock())
}

async fn seed_household(store: &MemoryStore) -> Household {
    let household = Household::new("The Smiths", "Alice");
    store.create_household(&household).await.unwrap();
    household
}

#[tokio::test]
async fn scenario_watched_title_excluded_and_series_recommended() {
    let store = MemoryStore::new();
    let household = seed_household(&store).await;
    let watched = Title::new("tt-1", "Arrival", TitleType::Movie);
    let series = Title::new("tt-2", "Severance", TitleType::Series);
    store.save_title(&watched).await.unwrap();
    store.save_title(&series).await.unwrap();

    for days_ago in 0..6 {
        let observation = AvailabilityObservation::new(
            series.id,
            "Apple TV+",
            true,
            household.members[0].id,
            now() - Duration::days(days_ago),
        );
        store.save_observation(&observation).await.unwrap();
    }

    households(&store)
        .record_viewing(household.members[0].id, watched.id, 1.0, true)
        .await
        .unwrap();

    let recommendations = engine(&store)
        .for_household(Some(&household))
        .await
        .unwrap();

    assert_eq!(recommendations.len(), 1);
    let only = &recommendations[0];
    assert_eq!(only.title.id, series.id);
    assert_eq!(only.confidence.label, ConfidenceLabel::High);
    assert!(only.reasons.iter().any(|r| r == REASON_SERIES));
    assert!((only.score - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn scenario_idle_subscription_is_cancellable() {
    let store = MemoryStore::new();
    let household = seed_household(&store).await;
    let idle = Subscription::new(
        household.id,
        "Netflix",
        BigDecimal::from_str("15.99").unwrap(),
        now() - Duration::days(90),
    );
    store.save_subscription(&idle).await.unwrap();

    let result = intelligence(&store)
        .for_household(Some(&household))
        .await
        .unwrap();

    assert_eq!(result.assessments.len(), 1);
    assert_eq!(result.assessments[0].value_rating(), ValueRating::Low);
    assert_eq!(result.recommendations[0].action, SubscriptionAction::Cancel);
    assert_eq!(result.potential_savings, Money::from_cents(1599));
    assert_eq!(result.potential_savings.to_string(), "$15.99");
}

#[tokio::test]
async fn scenario_no_subscriptions_yields_nothing_to_save() {
    let store = MemoryStore::new();
    let household = seed_household(&store).await;

    let result = intelligence(&store)
        .for_household(Some(&household))
        .await
        .unwrap();

    assert_eq!(result.potential_savings, Money::ZERO);
    assert!(result.recommendations.is_empty());
    assert_eq!(result.optimization_target, "user_value");
}

#[tokio::test]
async fn recommendations_never_exceed_cap_and_always_explain() {
    let store = MemoryStore::new();
    let household = seed_household(&store).await;
    for i in 0..25 {
        let kind = if i % 4 == 0 { TitleType::Series } else { TitleType::Movie };
        store
            .save_title(&Title::new(format!("tt-{i}"), format!("Title {i:02}"), kind))
            .await
            .unwrap();
    }

    let recommendations = engine(&store)
        .for_household(Some(&household))
        .await
        .unwrap();

    assert_eq!(recommendations.len(), MAX_RECOMMENDATIONS);
    assert!(recommendations.iter().all(|r| !r.reasons.is_empty()));
    assert!(recommendations
        .windows(2)
        .all(|pair| pair[0].score >= pair[1].score));
}

#[tokio::test]
async fn fully_watched_stays_watched_after_lower_progress() {
    let store = MemoryStore::new();
    let household = seed_household(&store).await;
    let title = Title::new("tt-1", "Arrival", TitleType::Movie);
    store.save_title(&title).await.unwrap();
    let service = households(&store);
    let member = household.members[0].id;

    service.record_viewing(member, title.id, 1.0, false).await.unwrap();
    let record = service.record_viewing(member, title.id, 0.2, false).await.unwrap();

    assert!(record.fully_watched);
    assert!(engine(&store)
        .for_household(Some(&household))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn last_member_removal_leaves_household_unchanged() {
    let store = MemoryStore::new();
    let household = seed_household(&store).await;

    let err = households(&store)
        .remove_member(household.id, household.members[0].id)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::MembershipConstraint(_)));
    assert_eq!(
        store.find_household(household.id).await.unwrap(),
        Some(household)
    );
}

#[tokio::test]
async fn unknown_member_removal_is_not_found() {
    let store = MemoryStore::new();
    let household = seed_household(&store).await;

    let err = households(&store)
        .remove_member(household.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
