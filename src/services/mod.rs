pub mod account;
pub mod availability;
pub mod confidence;
pub mod households;
pub mod recommendations;
pub mod subscription_intelligence;
pub mod titles;

pub use account::AccountService;
pub use availability::AvailabilityService;
pub use households::HouseholdService;
pub use recommendations::RecommendationEngine;
pub use subscription_intelligence::SubscriptionIntelligence;
pub use titles::TitleService;
