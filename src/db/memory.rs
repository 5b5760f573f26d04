use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AvailabilityStore, HouseholdStore, SubscriptionStore, TitleStore, ViewingStore};
use crate::{
    error::{AppError, AppResult},
    models::{AvailabilityObservation, Household, Member, Subscription, Title, ViewingRecord},
};

/// In-memory storage.
///
/// Explicitly constructed and injected, never global. Every collection sits behind one
/// reader/writer lock, so a write is atomic with respect to all reads. Writes enforce the
/// same references and uniqueness rules as the PostgreSQL schema and fail the same way.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    titles: HashMap<Uuid, Title>,
    households: HashMap<Uuid, Household>,
    subscriptions: HashMap<Uuid, Subscription>,
    viewing_records: HashMap<(Uuid, Uuid), ViewingRecord>,
    observations: Vec<AvailabilityObservation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStoreInner {
    fn household_member_ids(&self, household_id: Uuid) -> HashSet<Uuid> {
        self.households
            .get(&household_id)
            .map(|h| h.member_ids().into_iter().collect())
            .unwrap_or_default()
    }

    fn has_member(&self, member_id: Uuid) -> bool {
        self.households.values().any(|h| h.has_member(member_id))
    }

    fn sorted_observations<F>(&self, filter: F) -> Vec<AvailabilityObservation>
    where
        F: Fn(&AvailabilityObservation) -> bool,
    {
        let mut found: Vec<_> = self
            .observations
            .iter()
            .filter(|o| filter(o))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.recency_key().cmp(&a.recency_key()));
        found
    }
}

#[async_trait]
impl TitleStore for MemoryStore {
    async fn find_unwatched_titles(&self, household_id: Uuid) -> AppResult<Vec<Title>> {
        let inner = self.inner.read().await;
        let members = inner.household_member_ids(household_id);

        let fully_watched: HashSet<Uuid> = inner
            .viewing_records
            .values()
            .filter(|r| r.fully_watched && members.contains(&r.member_id))
            .map(|r| r.title_id)
            .collect();

        let mut titles: Vec<Title> = inner
            .titles
            .values()
            .filter(|t| !fully_watched.contains(&t.id))
            .cloned()
            .collect();
        titles.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(titles)
    }

    async fn find_title(&self, title_id: Uuid) -> AppResult<Option<Title>> {
        Ok(self.inner.read().await.titles.get(&title_id).cloned())
    }

    async fn save_title(&self, title: &Title) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let taken = inner
            .titles
            .values()
            .any(|t| t.external_id == title.external_id && t.id != title.id);
        if taken {
            return Err(AppError::Conflict(format!(
                "external id '{}' already belongs to another title",
                title.external_id
            )));
        }

        inner.titles.insert(title.id, title.clone());
        Ok(())
    }
}

#[async_trait]
impl AvailabilityStore for MemoryStore {
    async fn find_observations(&self, title_id: Uuid) -> AppResult<Vec<AvailabilityObservation>> {
        let inner = self.inner.read().await;
        Ok(inner.sorted_observations(|o| o.title_id == title_id))
    }

    async fn find_platform_observations(
        &self,
        title_id: Uuid,
        platform: &str,
    ) -> AppResult<Vec<AvailabilityObservation>> {
        let inner = self.inner.read().await;
        Ok(inner.sorted_observations(|o| o.title_id == title_id && o.platform == platform))
    }

    async fn find_household_reports(
        &self,
        household_id: Uuid,
    ) -> AppResult<Vec<AvailabilityObservation>> {
        let inner = self.inner.read().await;
        let members = inner.household_member_ids(household_id);
        Ok(inner.sorted_observations(|o| members.contains(&o.reporter_id)))
    }

    async fn save_observation(&self, observation: &AvailabilityObservation) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.titles.contains_key(&observation.title_id) {
            return Err(AppError::NotFound(format!("title {}", observation.title_id)));
        }

        inner.observations.push(observation.clone());
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn find_active_subscriptions(&self, household_id: Uuid) -> AppResult<Vec<Subscription>> {
        let inner = self.inner.read().await;
        let mut active: Vec<Subscription> = inner
            .subscriptions
            .values()
            .filter(|s| s.household_id == household_id && s.active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.platform.cmp(&b.platform).then(a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn find_household_subscriptions(&self, household_id: Uuid) -> AppResult<Vec<Subscription>> {
        let inner = self.inner.read().await;
        let mut all: Vec<Subscription> = inner
            .subscriptions
            .values()
            .filter(|s| s.household_id == household_id)
            .cloned()
            .collect();
        all.sort_by(|a, b| a.platform.cmp(&b.platform).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn find_subscription(&self, subscription_id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self
            .inner
            .read()
            .await
            .subscriptions
            .get(&subscription_id)
            .cloned())
    }

    async fn save_subscription(&self, subscription: &Subscription) -> AppResult<()> {
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner.subscriptions.get_mut(&subscription.id) {
            existing.monthly_cost = subscription.monthly_cost.clone();
            existing.active = subscription.active;
            existing.last_watched_at = existing.last_watched_at.max(subscription.last_watched_at);
            return Ok(());
        }

        if !inner.households.contains_key(&subscription.household_id) {
            return Err(AppError::NotFound(format!(
                "household {}",
                subscription.household_id
            )));
        }
        let duplicate = inner.subscriptions.values().any(|s| {
            s.household_id == subscription.household_id && s.platform == subscription.platform
        });
        if duplicate {
            return Err(AppError::Conflict(format!(
                "household {} already subscribes to {}",
                subscription.household_id, subscription.platform
            )));
        }

        inner
            .subscriptions
            .insert(subscription.id, subscription.clone());
        Ok(())
    }
}

#[async_trait]
impl ViewingStore for MemoryStore {
    async fn count_household_watches_on_platform(
        &self,
        household_id: Uuid,
        platform: &str,
    ) -> AppResult<u32> {
        let inner = self.inner.read().await;
        let members = inner.household_member_ids(household_id);

        let on_platform: HashSet<Uuid> = inner
            .observations
            .iter()
            .filter(|o| o.platform == platform)
            .map(|o| o.title_id)
            .collect();

        let count = inner
            .viewing_records
            .values()
            .filter(|r| members.contains(&r.member_id) && on_platform.contains(&r.title_id))
            .count();

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn find_viewing_record(
        &self,
        member_id: Uuid,
        title_id: Uuid,
    ) -> AppResult<Option<ViewingRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .viewing_records
            .get(&(member_id, title_id))
            .cloned())
    }

    async fn find_household_viewing_records(
        &self,
        household_id: Uuid,
    ) -> AppResult<Vec<ViewingRecord>> {
        let inner = self.inner.read().await;
        let members = inner.household_member_ids(household_id);

        let mut records: Vec<ViewingRecord> = inner
            .viewing_records
            .values()
            .filter(|r| members.contains(&r.member_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn save_viewing_record(&self, record: &ViewingRecord) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.has_member(record.member_id) {
            return Err(AppError::NotFound(format!("member {}", record.member_id)));
        }
        if !inner.titles.contains_key(&record.title_id) {
            return Err(AppError::NotFound(format!("title {}", record.title_id)));
        }

        let key = (record.member_id, record.title_id);
        let mut stored = record.clone();
        if let Some(existing) = inner.viewing_records.get(&key) {
            stored.id = existing.id;
            stored.fully_watched |= existing.fully_watched;
        }
        inner.viewing_records.insert(key, stored);
        Ok(())
    }
}

#[async_trait]
impl HouseholdStore for MemoryStore {
    async fn create_household(&self, household: &Household) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if inner.households.contains_key(&household.id) {
            return Err(AppError::Conflict(format!(
                "household {} already exists",
                household.id
            )));
        }

        inner.households.insert(household.id, household.clone());
        Ok(())
    }

    async fn find_household(&self, household_id: Uuid) -> AppResult<Option<Household>> {
        Ok(self.inner.read().await.households.get(&household_id).cloned())
    }

    async fn find_member(&self, member_id: Uuid) -> AppResult<Option<Member>> {
        let inner = self.inner.read().await;
        Ok(inner
            .households
            .values()
            .flat_map(|h| h.members.iter())
            .find(|m| m.id == member_id)
            .cloned())
    }

    async fn insert_member(&self, member: &Member) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if inner.has_member(member.id) {
            return Err(AppError::Conflict(format!("member {} already exists", member.id)));
        }

        inner
            .households
            .get_mut(&member.household_id)
            .ok_or_else(|| AppError::NotFound(format!("household {}", member.household_id)))?
            .add_member(member.clone())
    }

    async fn delete_member(&self, household_id: Uuid, member_id: Uuid) -> AppResult<Member> {
        let mut inner = self.inner.write().await;
        let household = inner
            .households
            .get_mut(&household_id)
            .ok_or_else(|| AppError::NotFound(format!("household {}", household_id)))?;

        let removed = household.remove_member(member_id)?;
        inner.viewing_records.retain(|(member, _), _| *member != member_id);
        Ok(removed)
    }

    async fn delete_household(&self, household_id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(household) = inner.households.remove(&household_id) else {
            return Ok(false);
        };

        let members: HashSet<Uuid> = household.member_ids().into_iter().collect();
        inner
            .viewing_records
            .retain(|(member, _), _| !members.contains(member));
        inner
            .observations
            .retain(|o| !members.contains(&o.reporter_id));
        inner
            .subscriptions
            .retain(|_, s| s.household_id != household_id);
        Ok(true)
    }
}
