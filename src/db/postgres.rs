use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use super::{AvailabilityStore, HouseholdStore, SubscriptionStore, TitleStore, ViewingStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        AvailabilityObservation, Household, Member, Subscription, Title, TitleType, ViewingRecord,
    },
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// PostgreSQL-backed storage
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

#[derive(FromRow)]
struct TitleRow {
    id: Uuid,
    external_id: String,
    name: String,
    title_type: String,
}

impl TryFrom<TitleRow> for Title {
    type Error = AppError;

    fn try_from(row: TitleRow) -> AppResult<Self> {
        let title_type: TitleType = row.title_type.parse().map_err(|_| {
            AppError::Internal(format!(
                "title {} has unknown type '{}'",
                row.id, row.title_type
            ))
        })?;

        Ok(Title {
            id: row.id,
            external_id: row.external_id,
            name: row.name,
            title_type,
        })
    }
}

#[derive(FromRow)]
struct ObservationRow {
    id: Uuid,
    title_id: Uuid,
    platform: String,
    available: bool,
    reported_at: DateTime<Utc>,
    reporter_id: Uuid,
}

impl From<ObservationRow> for AvailabilityObservation {
    fn from(row: ObservationRow) -> Self {
        AvailabilityObservation {
            id: row.id,
            title_id: row.title_id,
            platform: row.platform,
            available: row.available,
            reported_at: row.reported_at,
            reporter_id: row.reporter_id,
        }
    }
}

#[derive(FromRow)]
struct SubscriptionRow {
    id: Uuid,
    household_id: Uuid,
    platform: String,
    monthly_cost: BigDecimal,
    active: bool,
    last_watched_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            id: row.id,
            household_id: row.household_id,
            platform: row.platform,
            monthly_cost: row.monthly_cost,
            active: row.active,
            last_watched_at: row.last_watched_at,
        }
    }
}

#[derive(FromRow)]
struct ViewingRecordRow {
    id: Uuid,
    member_id: Uuid,
    title_id: Uuid,
    progress: f64,
    fully_watched: bool,
    updated_at: DateTime<Utc>,
}

impl From<ViewingRecordRow> for ViewingRecord {
    fn from(row: ViewingRecordRow) -> Self {
        ViewingRecord {
            id: row.id,
            member_id: row.member_id,
            title_id: row.title_id,
            progress: row.progress,
            fully_watched: row.fully_watched,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct HouseholdRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MemberRow {
    id: Uuid,
    household_id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Member {
            id: row.id,
            household_id: row.household_id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl TitleStore for PgStore {
    async fn find_unwatched_titles(&self, household_id: Uuid) -> AppResult<Vec<Title>> {
        let rows = sqlx::query_as::<_, TitleRow>(
            r#"
            SELECT t.id, t.external_id, t.name, t.title_type
            FROM titles t
            WHERE t.id NOT IN (
                SELECT DISTINCT vr.title_id
                FROM viewing_records vr
                JOIN members m ON vr.member_id = m.id
                WHERE m.household_id = $1 AND vr.fully_watched = true
            )
            ORDER BY t.name ASC, t.id ASC
            "#,
        )
        .bind(household_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Title::try_from).collect()
    }

    async fn find_title(&self, title_id: Uuid) -> AppResult<Option<Title>> {
        let row = sqlx::query_as::<_, TitleRow>(
            "SELECT id, external_id, name, title_type FROM titles WHERE id = $1",
        )
        .bind(title_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Title::try_from).transpose()
    }

    async fn save_title(&self, title: &Title) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO titles (id, external_id, name, title_type)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                external_id = EXCLUDED.external_id,
                name = EXCLUDED.name,
                title_type = EXCLUDED.title_type
            "#,
        )
        .bind(title.id)
        .bind(&title.external_id)
        .bind(&title.name)
        .bind(title.title_type.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AvailabilityStore for PgStore {
    async fn find_observations(&self, title_id: Uuid) -> AppResult<Vec<AvailabilityObservation>> {
        let rows = sqlx::query_as::<_, ObservationRow>(
            r#"
            SELECT id, title_id, platform, available, reported_at, reporter_id
            FROM availability_observations
            WHERE title_id = $1
            ORDER BY reported_at DESC, id DESC
            "#,
        )
        .bind(title_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AvailabilityObservation::from).collect())
    }

    async fn find_platform_observations(
        &self,
        title_id: Uuid,
        platform: &str,
    ) -> AppResult<Vec<AvailabilityObservation>> {
        let rows = sqlx::query_as::<_, ObservationRow>(
            r#"
            SELECT id, title_id, platform, available, reported_at, reporter_id
            FROM availability_observations
            WHERE title_id = $1 AND platform = $2
            ORDER BY reported_at DESC, id DESC
            "#,
        )
        .bind(title_id)
        .bind(platform)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AvailabilityObservation::from).collect())
    }

    async fn find_household_reports(
        &self,
        household_id: Uuid,
    ) -> AppResult<Vec<AvailabilityObservation>> {
        let rows = sqlx::query_as::<_, ObservationRow>(
            r#"
            SELECT ao.id, ao.title_id, ao.platform, ao.available, ao.reported_at, ao.reporter_id
            FROM availability_observations ao
            JOIN members m ON ao.reporter_id = m.id
            WHERE m.household_id = $1
            ORDER BY ao.reported_at DESC, ao.id DESC
            "#,
        )
        .bind(household_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AvailabilityObservation::from).collect())
    }

    async fn save_observation(&self, observation: &AvailabilityObservation) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO availability_observations
                (id, title_id, platform, available, reported_at, reporter_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(observation.id)
        .bind(observation.title_id)
        .bind(&observation.platform)
        .bind(observation.available)
        .bind(observation.reported_at)
        .bind(observation.reporter_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn find_active_subscriptions(&self, household_id: Uuid) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, household_id, platform, monthly_cost, active, last_watched_at
            FROM subscriptions
            WHERE household_id = $1 AND active = true
            ORDER BY platform ASC, id ASC
            "#,
        )
        .bind(household_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    async fn find_household_subscriptions(&self, household_id: Uuid) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, household_id, platform, monthly_cost, active, last_watched_at
            FROM subscriptions
            WHERE household_id = $1
            ORDER BY platform ASC, id ASC
            "#,
        )
        .bind(household_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    async fn find_subscription(&self, subscription_id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, household_id, platform, monthly_cost, active, last_watched_at
            FROM subscriptions
            WHERE id = $1
            "#,
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Subscription::from))
    }

    async fn save_subscription(&self, subscription: &Subscription) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions
                (id, household_id, platform, monthly_cost, active, last_watched_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                monthly_cost = EXCLUDED.monthly_cost,
                active = EXCLUDED.active,
                last_watched_at = GREATEST(subscriptions.last_watched_at, EXCLUDED.last_watched_at)
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.household_id)
        .bind(&subscription.platform)
        .bind(&subscription.monthly_cost)
        .bind(subscription.active)
        .bind(subscription.last_watched_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ViewingStore for PgStore {
    async fn count_household_watches_on_platform(
        &self,
        household_id: Uuid,
        platform: &str,
    ) -> AppResult<u32> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT vr.id)
            FROM viewing_records vr
            JOIN members m ON vr.member_id = m.id
            JOIN availability_observations ao ON vr.title_id = ao.title_id
            WHERE m.household_id = $1 AND ao.platform = $2
            "#,
        )
        .bind(household_id)
        .bind(platform)
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn find_viewing_record(
        &self,
        member_id: Uuid,
        title_id: Uuid,
    ) -> AppResult<Option<ViewingRecord>> {
        let row = sqlx::query_as::<_, ViewingRecordRow>(
            r#"
            SELECT id, member_id, title_id, progress, fully_watched, updated_at
            FROM viewing_records
            WHERE member_id = $1 AND title_id = $2
            "#,
        )
        .bind(member_id)
        .bind(title_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ViewingRecord::from))
    }

    async fn find_household_viewing_records(
        &self,
        household_id: Uuid,
    ) -> AppResult<Vec<ViewingRecord>> {
        let rows = sqlx::query_as::<_, ViewingRecordRow>(
            r#"
            SELECT vr.id, vr.member_id, vr.title_id, vr.progress, vr.fully_watched, vr.updated_at
            FROM viewing_records vr
            JOIN members m ON vr.member_id = m.id
            WHERE m.household_id = $1
            ORDER BY vr.updated_at DESC, vr.id DESC
            "#,
        )
        .bind(household_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ViewingRecord::from).collect())
    }

    async fn save_viewing_record(&self, record: &ViewingRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO viewing_records (id, member_id, title_id, progress, fully_watched, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (member_id, title_id) DO UPDATE SET
                progress = EXCLUDED.progress,
                fully_watched = viewing_records.fully_watched OR EXCLUDED.fully_watched,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.id)
        .bind(record.member_id)
        .bind(record.title_id)
        .bind(record.progress)
        .bind(record.fully_watched)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl HouseholdStore for PgStore {
    async fn create_household(&self, household: &Household) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO households (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(household.id)
            .bind(&household.name)
            .bind(household.created_at)
            .execute(&mut *tx)
            .await?;

        for member in &household.members {
            sqlx::query(
                "INSERT INTO members (id, household_id, name, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(member.id)
            .bind(household.id)
            .bind(&member.name)
            .bind(member.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn find_household(&self, household_id: Uuid) -> AppResult<Option<Household>> {
        let Some(row) = sqlx::query_as::<_, HouseholdRow>(
            "SELECT id, name, created_at FROM households WHERE id = $1",
        )
        .bind(household_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let members = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT id, household_id, name, created_at
            FROM members
            WHERE household_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(household_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Household {
            id: row.id,
            name: row.name,
            members: members.into_iter().map(Member::from).collect(),
            created_at: row.created_at,
        }))
    }

    async fn find_member(&self, member_id: Uuid) -> AppResult<Option<Member>> {
        let row = sqlx::query_as::<_, MemberRow>(
            "SELECT id, household_id, name, created_at FROM members WHERE id = $1",
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Member::from))
    }

    async fn insert_member(&self, member: &Member) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO members (id, household_id, name, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(member.id)
        .bind(member.household_id)
        .bind(&member.name)
        .bind(member.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_member(&self, household_id: Uuid, member_id: Uuid) -> AppResult<Member> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent removals from the same household
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM households WHERE id = $1 FOR UPDATE")
                .bind(household_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("household {}", household_id)));
        }

        let member_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM members WHERE household_id = $1")
                .bind(household_id)
                .fetch_all(&mut *tx)
                .await?;

        if !member_ids.contains(&member_id) {
            return Err(AppError::NotFound(format!(
                "member {} in household {}",
                member_id, household_id
            )));
        }
        if member_ids.len() <= 1 {
            return Err(AppError::MembershipConstraint(
                "household must have at least one member".to_string(),
            ));
        }

        let removed = sqlx::query_as::<_, MemberRow>(
            r#"
            DELETE FROM members
            WHERE id = $1
            RETURNING id, household_id, name, created_at
            "#,
        )
        .bind(member_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Member::from(removed))
    }

    async fn delete_household(&self, household_id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Reports carry no foreign key to members, so they do not cascade
        sqlx::query(
            r#"
            DELETE FROM availability_observations
            WHERE reporter_id IN (SELECT id FROM members WHERE household_id = $1)
            "#,
        )
        .bind(household_id)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM households WHERE id = $1")
            .bind(household_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(deleted > 0)
    }
}
