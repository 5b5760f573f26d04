use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    clock::Clock,
    db::{HouseholdStore, SubscriptionStore, TitleStore, ViewingStore},
    error::{AppError, AppResult},
    models::{Household, Member, Money, Subscription, ViewingRecord},
};

/// Largest monthly cost the schema's `NUMERIC(8, 2)` column holds, in cents
const MAX_MONTHLY_COST_CENTS: i64 = 99_999_999;

/// Write paths around households: membership, viewing progress and subscription lifecycle
pub struct HouseholdService {
    households: Arc<dyn HouseholdStore>,
    titles: Arc<dyn TitleStore>,
    viewing: Arc<dyn ViewingStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    clock: Arc<dyn Clock>,
}

impl HouseholdService {
    pub fn new(
        households: Arc<dyn HouseholdStore>,
        titles: Arc<dyn TitleStore>,
        viewing: Arc<dyn ViewingStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            households,
            titles,
            viewing,
            subscriptions,
            clock,
        }
    }

    /// Creates a household with its founding member
    pub async fn create_household(&self, name: &str, founding_member: &str) -> AppResult<Household> {
        let name = required("household name", name)?;
        let founding_member = required("member name", founding_member)?;

        let household = Household::founded_at(name, founding_member, self.clock.now());
        self.households.create_household(&household).await?;

        tracing::info!(household_id = %household.id, "Household created");
        Ok(household)
    }

    pub async fn find_household(&self, household_id: Uuid) -> AppResult<Option<Household>> {
        self.households.find_household(household_id).await
    }

    /// Adds one member. Concurrent additions to the same household never overwrite each
    /// other because only the new member row is written.
    pub async fn add_member(&self, household_id: Uuid, name: &str) -> AppResult<Member> {
        let name = required("member name", name)?;

        let member = Member::new(household_id, name, self.clock.now());
        self.households.insert_member(&member).await?;

        tracing::info!(household_id = %household_id, member_id = %member.id, "Member added");
        Ok(member)
    }

    /// Removes a member. The last member of a household can never be removed.
    pub async fn remove_member(&self, household_id: Uuid, member_id: Uuid) -> AppResult<()> {
        if let Err(e) = self.households.delete_member(household_id, member_id).await {
            tracing::warn!(
                household_id = %household_id,
                member_id = %member_id,
                error = %e,
                "Member removal rejected"
            );
            return Err(e);
        }

        tracing::info!(household_id = %household_id, member_id = %member_id, "Member removed");
        Ok(())
    }

    /// Records viewing progress for a member. A record that was ever fully watched stays so.
    pub async fn record_viewing(
        &self,
        member_id: Uuid,
        title_id: Uuid,
        progress: f64,
        fully_watched: bool,
    ) -> AppResult<ViewingRecord> {
        if self.households.find_member(member_id).await?.is_none() {
            return Err(AppError::NotFound(format!("member {}", member_id)));
        }
        if self.titles.find_title(title_id).await?.is_none() {
            return Err(AppError::NotFound(format!("title {}", title_id)));
        }

        let now = self.clock.now();
        let mut record = self
            .viewing
            .find_viewing_record(member_id, title_id)
            .await?
            .unwrap_or_else(|| ViewingRecord::new(member_id, title_id, now));

        record.update_progress(progress, now)?;
        if fully_watched {
            record.mark_fully_watched(now);
        }

        self.viewing.save_viewing_record(&record).await?;

        tracing::info!(
            member_id = %member_id,
            title_id = %title_id,
            progress = record.progress,
            fully_watched = record.fully_watched,
            "Viewing recorded"
        );
        Ok(record)
    }

    /// Starts a subscription. The cost is stored rounded to whole cents and a missing
    /// `last_watched_at` counts as watched now.
    pub async fn add_subscription(
        &self,
        household_id: Uuid,
        platform: &str,
        monthly_cost: &BigDecimal,
        last_watched_at: Option<DateTime<Utc>>,
    ) -> AppResult<Subscription> {
        let platform = required("platform", platform)?;
        let cost = Money::try_from(monthly_cost)?;
        if cost.cents() > MAX_MONTHLY_COST_CENTS {
            return Err(AppError::InvalidInput(format!(
                "monthly cost too large: {}",
                monthly_cost
            )));
        }
        self.require_household(household_id).await?;

        let now = self.clock.now();
        let subscription = Subscription::new(
            household_id,
            platform,
            BigDecimal::from(cost),
            last_watched_at.unwrap_or(now),
        );
        self.subscriptions.save_subscription(&subscription).await?;

        tracing::info!(
            household_id = %household_id,
            subscription_id = %subscription.id,
            platform = %subscription.platform,
            "Subscription added"
        );
        Ok(subscription)
    }

    pub async fn cancel_subscription(&self, subscription_id: Uuid) -> AppResult<Subscription> {
        self.update_subscription(subscription_id, |s, _| s.cancel())
            .await
    }

    pub async fn reactivate_subscription(&self, subscription_id: Uuid) -> AppResult<Subscription> {
        self.update_subscription(subscription_id, |s, _| s.reactivate())
            .await
    }

    /// Marks the subscription's platform as used now
    pub async fn record_subscription_usage(&self, subscription_id: Uuid) -> AppResult<Subscription> {
        self.update_subscription(subscription_id, |s, now| {
            s.record_usage(now);
        })
        .await
    }

    async fn update_subscription<F>(&self, subscription_id: Uuid, change: F) -> AppResult<Subscription>
    where
        F: FnOnce(&mut Subscription, DateTime<Utc>) + Send,
    {
        let mut subscription = self
            .subscriptions
            .find_subscription(subscription_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("subscription {}", subscription_id)))?;

        change(&mut subscription, self.clock.now());
        self.subscriptions.save_subscription(&subscription).await?;

        tracing::info!(
            subscription_id = %subscription_id,
            active = subscription.active,
            "Subscription updated"
        );
        Ok(subscription)
    }

    async fn require_household(&self, household_id: Uuid) -> AppResult<Household> {
        self.households
            .find_household(household_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("household {}", household_id)))
    }
}

fn required<'a>(field: &str, value: &'a str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::FixedClock,
        db::{MemoryStore, MockHouseholdStore},
        models::{Title, TitleType},
    };
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::str::FromStr;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    }

    fn service(store: &MemoryStore) -> HouseholdService {
        let store = Arc::new(store.clone());
        HouseholdService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            Arc::new(FixedClock(now())),
        )
    }

    fn with_households(households: Arc<dyn HouseholdStore>, store: &MemoryStore) -> HouseholdService {
        let store = Arc::new(store.clone());
        HouseholdService::new(
            households,
            store.clone(),
            store.clone(),
            store,
            Arc::new(FixedClock(now())),
        )
    }

    async fn seed(store: &MemoryStore) -> Household {
        let household = Household::new("Home", "Alice");
        store.create_household(&household).await.unwrap();
        household
    }

    /// Hands control back to the scheduler before every membership call, so concurrent
    /// requests interleave between their reads and writes.
    struct YieldingStore(MemoryStore);

    #[async_trait]
    impl HouseholdStore for YieldingStore {
        async fn create_household(&self, household: &Household) -> AppResult<()> {
            tokio::task::yield_now().await;
            self.0.create_household(household).await
        }

        async fn find_household(&self, household_id: Uuid) -> AppResult<Option<Household>> {
            tokio::task::yield_now().await;
            self.0.find_household(household_id).await
        }

        async fn find_member(&self, member_id: Uuid) -> AppResult<Option<Member>> {
            tokio::task::yield_now().await;
            self.0.find_member(member_id).await
        }

        async fn insert_member(&self, member: &Member) -> AppResult<()> {
            tokio::task::yield_now().await;
            self.0.insert_member(member).await
        }

        async fn delete_member(&self, household_id: Uuid, member_id: Uuid) -> AppResult<Member> {
            tokio::task::yield_now().await;
            self.0.delete_member(household_id, member_id).await
        }

        async fn delete_household(&self, household_id: Uuid) -> AppResult<bool> {
            tokio::task::yield_now().await;
            self.0.delete_household(household_id).await
        }
    }

    #[tokio::test]
    async fn test_create_household() {
        let store = MemoryStore::new();
        let service = service(&store);

        let household = service.create_household(" The Smiths ", "Alice").await.unwrap();
        assert_eq!(household.name, "The Smiths");
        assert_eq!(household.created_at, now());
        assert_eq!(household.members[0].created_at, now());
        assert_eq!(
            store.find_household(household.id).await.unwrap(),
            Some(household)
        );

        let err = service.create_household("Empty", "  ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_add_and_remove_members() {
        let store = MemoryStore::new();
        let household = seed(&store).await;
        let service = service(&store);

        let bob = service.add_member(household.id, " Bob ").await.unwrap();
        assert_eq!(bob.name, "Bob");
        assert_eq!(bob.created_at, now());

        service.remove_member(household.id, bob.id).await.unwrap();
        let stored = store.find_household(household.id).await.unwrap().unwrap();
        assert_eq!(stored.members.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_additions_are_all_kept() {
        let store = MemoryStore::new();
        let household = seed(&store).await;
        let service = with_households(Arc::new(YieldingStore(store.clone())), &store);

        let (bob, carol) = tokio::join!(
            service.add_member(household.id, "Bob"),
            service.add_member(household.id, "Carol"),
        );
        let (bob, carol) = (bob.unwrap(), carol.unwrap());

        let stored = store.find_household(household.id).await.unwrap().unwrap();
        assert_eq!(stored.members.len(), 3);
        assert!(stored.has_member(bob.id));
        assert!(stored.has_member(carol.id));
    }

    #[tokio::test]
    async fn test_concurrent_removals_never_empty_the_household() {
        let store = MemoryStore::new();
        let household = seed(&store).await;
        let bob = Member::new(household.id, "Bob", now());
        store.insert_member(&bob).await.unwrap();
        let service = with_households(Arc::new(YieldingStore(store.clone())), &store);

        let (alice_gone, bob_gone) = tokio::join!(
            service.remove_member(household.id, household.members[0].id),
            service.remove_member(household.id, bob.id),
        );

        let rejected = [alice_gone, bob_gone]
            .into_iter()
            .filter_map(Result::err)
            .collect::<Vec<_>>();
        assert_eq!(rejected.len(), 1);
        assert!(matches!(rejected[0], AppError::MembershipConstraint(_)));

        let stored = store.find_household(household.id).await.unwrap().unwrap();
        assert_eq!(stored.members.len(), 1);
    }

    #[tokio::test]
    async fn test_last_member_cannot_be_removed() {
        let store = MemoryStore::new();
        let household = seed(&store).await;
        let service = service(&store);

        let err = service
            .remove_member(household.id, household.members[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MembershipConstraint(_)));

        let stored = store.find_household(household.id).await.unwrap().unwrap();
        assert_eq!(stored, household);
    }

    #[tokio::test]
    async fn test_add_member_is_a_single_insert() {
        let household_id = Uuid::new_v4();

        let mut households = MockHouseholdStore::new();
        households.expect_find_household().never();
        households
            .expect_insert_member()
            .withf(move |m| m.household_id == household_id && m.name == "Bob")
            .times(1)
            .returning(|_| Ok(()));

        let service = with_households(Arc::new(households), &MemoryStore::new());
        let bob = service.add_member(household_id, "Bob").await.unwrap();
        assert_eq!(bob.household_id, household_id);
    }

    #[tokio::test]
    async fn test_membership_rejection_from_store_is_returned() {
        let mut households = MockHouseholdStore::new();
        households
            .expect_delete_member()
            .times(1)
            .returning(|_, _| {
                Err(AppError::MembershipConstraint(
                    "household must have at least one member".to_string(),
                ))
            });

        let service = with_households(Arc::new(households), &MemoryStore::new());
        let err = service
            .remove_member(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MembershipConstraint(_)));
    }

    #[tokio::test]
    async fn test_unknown_household_is_not_found() {
        let service = service(&MemoryStore::new());
        let err = service.add_member(Uuid::new_v4(), "Bob").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service
            .add_subscription(Uuid::new_v4(), "Netflix", &BigDecimal::from(10), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_record_viewing_keeps_fully_watched() {
        let store = MemoryStore::new();
        let household = seed(&store).await;
        let title = Title::new("tt-1", "Arrival", TitleType::Movie);
        store.save_title(&title).await.unwrap();
        let service = service(&store);
        let member = household.members[0].id;

        let first = service.record_viewing(member, title.id, 0.3, false).await.unwrap();
        assert!(!first.fully_watched);

        let done = service.record_viewing(member, title.id, 1.0, false).await.unwrap();
        assert!(done.fully_watched);

        let rewatch = service.record_viewing(member, title.id, 0.1, false).await.unwrap();
        assert!(rewatch.fully_watched);
        assert_eq!(rewatch.id, first.id);
    }

    #[tokio::test]
    async fn test_record_viewing_requires_known_member_and_title() {
        let store = MemoryStore::new();
        let household = seed(&store).await;
        let title = Title::new("tt-1", "Arrival", TitleType::Movie);
        store.save_title(&title).await.unwrap();
        let service = service(&store);

        let err = service
            .record_viewing(Uuid::new_v4(), title.id, 0.5, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service
            .record_viewing(household.members[0].id, Uuid::new_v4(), 0.5, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_add_subscription_validates_cost_and_platform() {
        let store = MemoryStore::new();
        let household = seed(&store).await;
        let service = service(&store);

        let sub = service
            .add_subscription(household.id, " Netflix ", &BigDecimal::from_str("15.994").unwrap(), None)
            .await
            .unwrap();
        assert_eq!(sub.platform, "Netflix");
        assert_eq!(sub.monthly_cost, BigDecimal::from_str("15.99").unwrap());
        assert_eq!(sub.last_watched_at, now());
        assert!(sub.active);

        for (platform, cost) in [(" ", "9.99"), ("Hulu", "-1"), ("Hulu", "1000000")] {
            let err = service
                .add_subscription(household.id, platform, &BigDecimal::from_str(cost).unwrap(), None)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "{platform} {cost}");
        }

        let err = service
            .add_subscription(household.id, "Netflix", &BigDecimal::from(8), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_subscription_lifecycle() {
        let store = MemoryStore::new();
        let household = seed(&store).await;
        let service = service(&store);
        let sub = service
            .add_subscription(
                household.id,
                "Netflix",
                &BigDecimal::from(15),
                Some(now() - Duration::days(40)),
            )
            .await
            .unwrap();

        let cancelled = service.cancel_subscription(sub.id).await.unwrap();
        assert!(!cancelled.active);
        assert!(store
            .find_active_subscriptions(sub.household_id)
            .await
            .unwrap()
            .is_empty());

        let reactivated = service.reactivate_subscription(sub.id).await.unwrap();
        assert!(reactivated.active);
        assert_eq!(reactivated.last_watched_at, sub.last_watched_at);

        let used = service.record_subscription_usage(sub.id).await.unwrap();
        assert_eq!(used.last_watched_at, now());

        let err = service.cancel_subscription(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
