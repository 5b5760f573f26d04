use std::sync::Arc;

use crate::{
    clock::{Clock, SystemClock},
    db::{AvailabilityStore, HouseholdStore, MemoryStore, SubscriptionStore, TitleStore, ViewingStore},
    services::{
        AccountService, AvailabilityService, HouseholdService, RecommendationEngine,
        SubscriptionIntelligence, TitleService,
    },
};

/// Services shared by every handler
pub struct AppState {
    pub recommendations: RecommendationEngine,
    pub availability: AvailabilityService,
    pub intelligence: SubscriptionIntelligence,
    pub households: HouseholdService,
    pub titles: TitleService,
    pub accounts: AccountService,
}

impl AppState {
    /// Wires all services onto one store that implements every storage contract
    pub fn new<S>(store: S, clock: Arc<dyn Clock>) -> Self
    where
        S: TitleStore + AvailabilityStore + SubscriptionStore + ViewingStore + HouseholdStore + 'static,
    {
        let store = Arc::new(store);
        let titles: Arc<dyn TitleStore> = store.clone();
        let availability: Arc<dyn AvailabilityStore> = store.clone();
        let subscriptions: Arc<dyn SubscriptionStore> = store.clone();
        let viewing: Arc<dyn ViewingStore> = store.clone();
        let households: Arc<dyn HouseholdStore> = store;

        Self {
            recommendations: RecommendationEngine::new(
                titles.clone(),
                availability.clone(),
                clock.clone(),
            ),
            availability: AvailabilityService::new(
                availability.clone(),
                titles.clone(),
                clock.clone(),
            ),
            intelligence: SubscriptionIntelligence::new(
                subscriptions.clone(),
                viewing.clone(),
                clock.clone(),
            ),
            households: HouseholdService::new(
                households.clone(),
                titles.clone(),
                viewing.clone(),
                subscriptions.clone(),
                clock.clone(),
            ),
            titles: TitleService::new(titles.clone()),
            accounts: AccountService::new(
                households,
                titles,
                viewing,
                subscriptions,
                availability,
                clock,
            ),
        }
    }

    /// In-memory state on the wall clock, for local runs without a database
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new(), Arc::new(SystemClock))
    }
}
