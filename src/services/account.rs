use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    clock::Clock,
    db::{AvailabilityStore, HouseholdStore, SubscriptionStore, TitleStore, ViewingStore},
    error::{AppError, AppResult},
    models::{
        AccountDeletion, HouseholdExport, Title, ViewingHistoryEntry, ViewingPreferences,
        BACKUP_RETENTION_DAYS,
    },
};

/// Data export and account deletion for a whole household
pub struct AccountService {
    households: Arc<dyn HouseholdStore>,
    titles: Arc<dyn TitleStore>,
    viewing: Arc<dyn ViewingStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    availability: Arc<dyn AvailabilityStore>,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    pub fn new(
        households: Arc<dyn HouseholdStore>,
        titles: Arc<dyn TitleStore>,
        viewing: Arc<dyn ViewingStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        availability: Arc<dyn AvailabilityStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            households,
            titles,
            viewing,
            subscriptions,
            availability,
            clock,
        }
    }

    /// Collects everything stored about a household
    pub async fn export(&self, household_id: Uuid) -> AppResult<HouseholdExport> {
        let household = self
            .households
            .find_household(household_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("household {}", household_id)))?;

        let records = self.viewing.find_household_viewing_records(household_id).await?;

        let mut titles: HashMap<Uuid, Option<Title>> = HashMap::new();
        for record in &records {
            if !titles.contains_key(&record.title_id) {
                let title = self.titles.find_title(record.title_id).await?;
                titles.insert(record.title_id, title);
            }
        }

        let member_names: HashMap<Uuid, &str> = household
            .members
            .iter()
            .map(|m| (m.id, m.name.as_str()))
            .collect();

        let viewing_history: Vec<ViewingHistoryEntry> = records
            .into_iter()
            .map(|record| ViewingHistoryEntry {
                member_name: member_names
                    .get(&record.member_id)
                    .map(|name| name.to_string())
                    .unwrap_or_default(),
                title: titles.get(&record.title_id).cloned().flatten(),
                in_progress: record.is_in_progress(),
                record,
            })
            .collect();

        let subscriptions = self
            .subscriptions
            .find_household_subscriptions(household_id)
            .await?;
        let availability_reports = self.availability.find_household_reports(household_id).await?;

        tracing::info!(
            household_id = %household_id,
            viewing_records = viewing_history.len(),
            subscriptions = subscriptions.len(),
            reports = availability_reports.len(),
            "Household data exported"
        );

        Ok(HouseholdExport {
            preferences: ViewingPreferences::from_history(&viewing_history),
            household,
            viewing_history,
            subscriptions,
            availability_reports,
            exported_at: self.clock.now(),
        })
    }

    /// Permanently deletes a household with its members, viewing history, subscriptions
    /// and availability reports. Nothing is touched unless `confirmed` is set.
    pub async fn delete(&self, household_id: Uuid, confirmed: bool) -> AppResult<AccountDeletion> {
        if !confirmed {
            return Err(AppError::InvalidInput(
                "account deletion is permanent and cannot be undone; repeat with confirm=true"
                    .to_string(),
            ));
        }

        let household = self
            .households
            .find_household(household_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("household {}", household_id)))?;

        if !self.households.delete_household(household_id).await? {
            return Err(AppError::NotFound(format!("household {}", household_id)));
        }

        tracing::warn!(
            household_id = %household_id,
            members = household.members.len(),
            "Household account deleted"
        );

        Ok(AccountDeletion {
            household_id,
            members_removed: household.members.len(),
            deleted_at: self.clock.now(),
            permanent: true,
            backup_retention_days: BACKUP_RETENTION_DAYS,
        })
    }
}
