use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Money, Subscription};

/// Days without use after which a subscription counts as underutilized
pub const UNDERUTILIZED_DAYS: i64 = 30;
/// Days without use after which cancellation is considered
pub const CANCEL_DAYS: i64 = 60;
/// Usage share below which cancellation is considered
pub const CANCEL_USAGE: f64 = 0.1;
/// Usage share below which a subscription counts as underutilized
pub const UNDERUTILIZED_USAGE: f64 = 0.3;

/// What the intelligence optimizes for. Never engagement.
pub const OPTIMIZATION_TARGET: &str = "user_value";
pub const SUCCESS_METRICS: [&str; 2] = ["potential_savings", "content_match"];

/// `true` when a subscription has gone unused for over 60 days and sees under 10% usage
pub fn should_cancel(days_since_use: i64, usage_percentage: f64) -> bool {
    days_since_use > CANCEL_DAYS && usage_percentage < CANCEL_USAGE
}

pub fn underutilized(days_since_use: i64, usage_percentage: f64) -> bool {
    days_since_use > UNDERUTILIZED_DAYS || usage_percentage < UNDERUTILIZED_USAGE
}

/// Categorical verdict on whether a subscription's cost is justified
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValueRating {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionAction {
    Cancel,
    Keep,
}

/// Value assessment of one active subscription
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assessment {
    pub subscription: Subscription,
    pub platform_watches: u32,
    /// Share of "full usage", in `[0, 1]`
    pub usage_percentage: f64,
    pub days_since_use: i64,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    /// Monthly cost used for aggregation
    pub cost: Money,
    /// Set when the stored cost could not be converted and was counted as zero
    pub cost_anomaly: bool,
}

impl Assessment {
    pub fn should_cancel(&self) -> bool {
        should_cancel(self.days_since_use, self.usage_percentage)
    }

    pub fn underutilized(&self) -> bool {
        underutilized(self.days_since_use, self.usage_percentage)
    }

    pub fn value_rating(&self) -> ValueRating {
        if self.should_cancel() {
            ValueRating::Low
        } else if self.underutilized() {
            ValueRating::Medium
        } else {
            ValueRating::High
        }
    }
}

/// Recommended action for a subscription, driven by cost and disuse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionRecommendation {
    pub subscription_id: Uuid,
    pub platform: String,
    pub action: SubscriptionAction,
    pub value_assessment: ValueRating,
    pub cost: Money,
    pub benefit: String,
    pub user_benefit_reason: String,
}

/// Subscription guidance for one household
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intelligence {
    pub assessments: Vec<Assessment>,
    pub potential_savings: Money,
    pub recommendations: Vec<SubscriptionRecommendation>,
    pub optimization_target: String,
    pub success_metrics: Vec<String>,
}

impl Intelligence {
    /// Result for "no household": no assessments, same value-first targets
    pub fn neutral() -> Self {
        Self::new(Vec::new(), Money::ZERO, Vec::new())
    }

    pub fn new(
        assessments: Vec<Assessment>,
        potential_savings: Money,
        recommendations: Vec<SubscriptionRecommendation>,
    ) -> Self {
        Self {
            assessments,
            potential_savings,
            recommendations,
            optimization_target: OPTIMIZATION_TARGET.to_string(),
            success_metrics: SUCCESS_METRICS.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn cancel_recommendations(&self) -> impl Iterator<Item = &SubscriptionRecommendation> {
        self.recommendations
            .iter()
            .filter(|r| r.action == SubscriptionAction::Cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_cancel_boundaries() {
        assert!(should_cancel(61, 0.05));
        assert!(!should_cancel(61, 0.5));
        assert!(!should_cancel(60, 0.0));
        assert!(!should_cancel(90, 0.1));
    }

    #[test]
    fn test_underutilized_either_condition() {
        assert!(underutilized(31, 0.9));
        assert!(underutilized(0, 0.29));
        assert!(!underutilized(30, 0.3));
    }

    #[test]
    fn test_neutral_intelligence() {
        let intelligence = Intelligence::neutral();
        assert!(intelligence.assessments.is_empty());
        assert!(intelligence.recommendations.is_empty());
        assert_eq!(intelligence.potential_savings, Money::ZERO);
        assert_eq!(intelligence.optimization_target, "user_value");
        assert_eq!(
            intelligence.success_metrics,
            vec!["potential_savings", "content_match"]
        );
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&SubscriptionAction::Cancel).unwrap(),
            "\"cancel\""
        );
        assert_eq!(serde_json::to_string(&ValueRating::Medium).unwrap(), "\"medium\"");
    }
}
