use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{
    clock::Clock,
    db::{SubscriptionStore, ViewingStore},
    error::AppResult,
    models::{
        Assessment, Household, Intelligence, Money, Subscription, SubscriptionAction,
        SubscriptionRecommendation, ValueRating,
    },
};

/// Platform watches per month treated as full usage
pub const FULL_USAGE_WATCHES: f64 = 30.0;

/// Value-based subscription guidance.
///
/// Recommends cancelling when a subscription costs money without being used. It never
/// recommends anything to drive engagement.
pub struct SubscriptionIntelligence {
    subscriptions: Arc<dyn SubscriptionStore>,
    viewing: Arc<dyn ViewingStore>,
    clock: Arc<dyn Clock>,
}

impl SubscriptionIntelligence {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        viewing: Arc<dyn ViewingStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscriptions,
            viewing,
            clock,
        }
    }

    pub async fn for_household(&self, household: Option<&Household>) -> AppResult<Intelligence> {
        let Some(household) = household else {
            return Ok(Intelligence::neutral());
        };

        let subscriptions = self
            .subscriptions
            .find_active_subscriptions(household.id)
            .await?;
        let now = self.clock.now();

        let mut assessments = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let platform_watches = self
                .viewing
                .count_household_watches_on_platform(household.id, &subscription.platform)
                .await?;
            assessments.push(assess(subscription, platform_watches, now));
        }

        let potential_savings: Money = assessments
            .iter()
            .filter(|a| a.should_cancel())
            .map(|a| a.cost)
            .sum();
        let recommendations = assessments.iter().map(recommend).collect::<Vec<_>>();

        tracing::info!(
            household_id = %household.id,
            subscriptions = assessments.len(),
            potential_savings = %potential_savings,
            "Generated subscription intelligence"
        );

        Ok(Intelligence::new(
            assessments,
            potential_savings,
            recommendations,
        ))
    }
}

/// Assesses one subscription from its platform watch count and last use
pub fn assess(subscription: Subscription, platform_watches: u32, now: DateTime<Utc>) -> Assessment {
    let usage_percentage = (f64::from(platform_watches) / FULL_USAGE_WATCHES).min(1.0);
    let days_since_use = subscription.days_since_last_watch(now);

    let mut pros = Vec::new();
    if days_since_use < 7 {
        pros.push("Recently used".to_string());
    }
    if usage_percentage > 0.5 {
        pros.push("Good content consumption".to_string());
    }
    if platform_watches > 10 {
        pros.push("High engagement with platform content".to_string());
    }

    let mut cons = Vec::new();
    if days_since_use > 30 {
        cons.push("Not used in over a month".to_string());
    }
    if days_since_use > 60 {
        cons.push("Consider canceling - inactive for 60+ days".to_string());
    }
    if usage_percentage < 0.1 {
        cons.push("Very low utilization of subscription".to_string());
    }

    let (cost, cost_anomaly) = match Money::try_from(&subscription.monthly_cost) {
        Ok(cost) => (cost, false),
        Err(e) => {
            tracing::warn!(
                subscription_id = %subscription.id,
                platform = %subscription.platform,
                error = %e,
                "Unconvertible monthly cost, counting it as zero"
            );
            (Money::ZERO, true)
        }
    };

    Assessment {
        subscription,
        platform_watches,
        usage_percentage,
        days_since_use,
        pros,
        cons,
        cost,
        cost_anomaly,
    }
}

/// Derives the recommended action from an assessment's value rating
pub fn recommend(assessment: &Assessment) -> SubscriptionRecommendation {
    let value_assessment = assessment.value_rating();
    let (action, benefit, user_benefit_reason) = match value_assessment {
        ValueRating::Low => (
            SubscriptionAction::Cancel,
            "Save money on unused service",
            "You haven't used this service in a while",
        ),
        ValueRating::Medium => (
            SubscriptionAction::Keep,
            "Some content available",
            "Could be used more frequently",
        ),
        ValueRating::High => (
            SubscriptionAction::Keep,
            "Good value for content consumed",
            "Active usage of platform content",
        ),
    };

    SubscriptionRecommendation {
        subscription_id: assessment.subscription.id,
        platform: assessment.subscription.platform.clone(),
        action,
        value_assessment,
        cost: assessment.cost,
        benefit: benefit.to_string(),
        user_benefit_reason: user_benefit_reason.to_string(),
    }
}
