//! Storage collaborator contracts.
//!
//! The engines only ever see these narrow async traits. Two implementations exist: a
//! PostgreSQL store for deployment and an in-memory store for tests and local runs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{AvailabilityObservation, Household, Member, Subscription, Title, ViewingRecord},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{create_pool, PgStore};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TitleStore: Send + Sync {
    /// Titles no member of the household has fully watched, ordered by name then id
    async fn find_unwatched_titles(&self, household_id: Uuid) -> AppResult<Vec<Title>>;

    async fn find_title(&self, title_id: Uuid) -> AppResult<Option<Title>>;

    /// Upserts by id. Another title with the same external id is a `Conflict`.
    async fn save_title(&self, title: &Title) -> AppResult<()>;
}

/// Append-only log of crowd reports
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// All observations for a title, freshest first
    async fn find_observations(&self, title_id: Uuid) -> AppResult<Vec<AvailabilityObservation>>;

    /// Observations for a title on one platform, freshest first
    async fn find_platform_observations(
        &self,
        title_id: Uuid,
        platform: &str,
    ) -> AppResult<Vec<AvailabilityObservation>>;

    /// Reports filed by any current member of the household, freshest first
    async fn find_household_reports(
        &self,
        household_id: Uuid,
    ) -> AppResult<Vec<AvailabilityObservation>>;

    /// Appends an observation for an existing title. Existing observations are never
    /// touched.
    async fn save_observation(&self, observation: &AvailabilityObservation) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Active subscriptions of a household, ordered by platform
    async fn find_active_subscriptions(&self, household_id: Uuid) -> AppResult<Vec<Subscription>>;

    /// Every subscription of a household, cancelled ones included, ordered by platform
    async fn find_household_subscriptions(&self, household_id: Uuid) -> AppResult<Vec<Subscription>>;

    async fn find_subscription(&self, subscription_id: Uuid) -> AppResult<Option<Subscription>>;

    /// Upserts by id. A second subscription to the same platform is a `Conflict`.
    async fn save_subscription(&self, subscription: &Subscription) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ViewingStore: Send + Sync {
    /// Viewing records of household members on titles reported on `platform`
    async fn count_household_watches_on_platform(
        &self,
        household_id: Uuid,
        platform: &str,
    ) -> AppResult<u32>;

    async fn find_viewing_record(
        &self,
        member_id: Uuid,
        title_id: Uuid,
    ) -> AppResult<Option<ViewingRecord>>;

    /// Viewing records of every member of the household, most recently updated first
    async fn find_household_viewing_records(
        &self,
        household_id: Uuid,
    ) -> AppResult<Vec<ViewingRecord>>;

    /// Upserts by (member, title). A stored `fully_watched = true` is kept.
    async fn save_viewing_record(&self, record: &ViewingRecord) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HouseholdStore: Send + Sync {
    /// Inserts a new household with its founding members. An existing id is a `Conflict`.
    async fn create_household(&self, household: &Household) -> AppResult<()>;

    /// Household together with its members
    async fn find_household(&self, household_id: Uuid) -> AppResult<Option<Household>>;

    async fn find_member(&self, member_id: Uuid) -> AppResult<Option<Member>>;

    /// Inserts one member into an existing household. Other members are left alone.
    async fn insert_member(&self, member: &Member) -> AppResult<()>;

    /// Deletes one member together with their viewing records.
    ///
    /// The membership check and the delete happen atomically: of two concurrent removals
    /// from a two-member household, exactly one fails with `MembershipConstraint`.
    async fn delete_member(&self, household_id: Uuid, member_id: Uuid) -> AppResult<Member>;

    /// Deletes a household with its members, their viewing records, their availability
    /// reports and the household's subscriptions. Returns false if it did not exist.
    async fn delete_household(&self, household_id: Uuid) -> AppResult<bool>;
}
