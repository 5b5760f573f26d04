use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::AppState;
use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{
        AccountDeletion, AvailabilityObservation, AvailabilitySummary, Confidence, Household,
        HouseholdExport, Intelligence, Member, Recommendation, Subscription, Title, TitleType,
        ViewingRecord,
    },
};

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct CreateHouseholdRequest {
    pub name: String,
    pub founding_member: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTitleRequest {
    pub external_id: String,
    pub name: String,
    pub title_type: TitleType,
}

#[derive(Debug, Deserialize)]
pub struct AddSubscriptionRequest {
    pub platform: String,
    /// Decimal amount, accepted as a JSON string or number
    pub monthly_cost: BigDecimal,
    pub last_watched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordViewingRequest {
    pub member_id: String,
    pub title_id: String,
    pub progress: f64,
    #[serde(default)]
    pub fully_watched: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReportAvailabilityRequest {
    pub platform: String,
    pub available: bool,
    pub reporter_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfidenceQuery {
    pub platform: String,
}

#[derive(Debug, Serialize)]
pub struct ConfidenceResponse {
    pub title_id: Uuid,
    pub platform: String,
    #[serde(flatten)]
    pub confidence: Confidence,
    pub percent: u8,
}

fn parse_id(kind: &str, raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidInput(format!("malformed {} id: {:?}", kind, raw)))
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

pub async fn create_household(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateHouseholdRequest>,
) -> AppResult<(StatusCode, Json<Household>)> {
    let household = state
        .households
        .create_household(&request.name, &request.founding_member)
        .await?;
    Ok((StatusCode::CREATED, Json(household)))
}

/// Everything stored about a household
pub async fn export_household(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(household_id): Path<String>,
) -> AppResult<Json<HouseholdExport>> {
    let household_id = parse_id("household", &household_id)?;
    tracing::info!(request_id = %request_id, household_id = %household_id, "Processing data export");

    Ok(Json(state.accounts.export(household_id).await?))
}

/// Deletes the household and all of its data. Requires `?confirm=true`.
pub async fn delete_household(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(household_id): Path<String>,
    Query(query): Query<DeleteAccountQuery>,
) -> AppResult<Json<AccountDeletion>> {
    let household_id = parse_id("household", &household_id)?;
    tracing::info!(request_id = %request_id, household_id = %household_id, "Processing account deletion");

    Ok(Json(state.accounts.delete(household_id, query.confirm).await?))
}

/// Ranked recommendations. An unknown household gets an empty list.
pub async fn get_recommendations(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(household_id): Path<String>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let household_id = parse_id("household", &household_id)?;
    tracing::info!(request_id = %request_id, household_id = %household_id, "Processing recommendation request");

    let household = state.households.find_household(household_id).await?;
    let recommendations = state
        .recommendations
        .for_household(household.as_ref())
        .await?;

    Ok(Json(recommendations))
}

/// Subscription value analysis. An unknown household gets the neutral result.
pub async fn get_intelligence(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(household_id): Path<String>,
) -> AppResult<Json<Intelligence>> {
    let household_id = parse_id("household", &household_id)?;
    tracing::info!(request_id = %request_id, household_id = %household_id, "Processing intelligence request");

    let household = state.households.find_household(household_id).await?;
    let intelligence = state
        .intelligence
        .for_household(household.as_ref())
        .await?;

    Ok(Json(intelligence))
}

pub async fn add_member(
    State(state): State<Arc<AppState>>,
    Path(household_id): Path<String>,
    Json(request): Json<AddMemberRequest>,
) -> AppResult<(StatusCode, Json<Member>)> {
    let household_id = parse_id("household", &household_id)?;
    let member = state.households.add_member(household_id, &request.name).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Path((household_id, member_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    let household_id = parse_id("household", &household_id)?;
    let member_id = parse_id("member", &member_id)?;
    state.households.remove_member(household_id, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn record_viewing(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecordViewingRequest>,
) -> AppResult<Json<ViewingRecord>> {
    let member_id = parse_id("member", &request.member_id)?;
    let title_id = parse_id("title", &request.title_id)?;

    let record = state
        .households
        .record_viewing(member_id, title_id, request.progress, request.fully_watched)
        .await?;

    Ok(Json(record))
}

pub async fn create_title(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTitleRequest>,
) -> AppResult<(StatusCode, Json<Title>)> {
    let title = state
        .titles
        .create_title(&request.external_id, &request.name, request.title_type)
        .await?;
    Ok((StatusCode::CREATED, Json(title)))
}

pub async fn get_title(
    State(state): State<Arc<AppState>>,
    Path(title_id): Path<String>,
) -> AppResult<Json<Title>> {
    let title_id = parse_id("title", &title_id)?;
    Ok(Json(state.titles.get_title(title_id).await?))
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(title_id): Path<String>,
) -> AppResult<Json<AvailabilitySummary>> {
    let title_id = parse_id("title", &title_id)?;
    let summary = state.availability.summary_for_title(title_id).await?;
    Ok(Json(summary))
}

pub async fn report_availability(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(title_id): Path<String>,
    Json(request): Json<ReportAvailabilityRequest>,
) -> AppResult<(StatusCode, Json<AvailabilityObservation>)> {
    let title_id = parse_id("title", &title_id)?;
    let reporter_id = parse_id("reporter", &request.reporter_id)?;
    tracing::info!(request_id = %request_id, title_id = %title_id, "Processing availability report");

    let observation = state
        .availability
        .report_availability(title_id, &request.platform, request.available, reporter_id)
        .await?;

    Ok((StatusCode::CREATED, Json(observation)))
}

pub async fn get_confidence(
    State(state): State<Arc<AppState>>,
    Path(title_id): Path<String>,
    Query(query): Query<ConfidenceQuery>,
) -> AppResult<Json<ConfidenceResponse>> {
    let title_id = parse_id("title", &title_id)?;
    let confidence = state
        .availability
        .get_confidence(title_id, &query.platform)
        .await?;

    Ok(Json(ConfidenceResponse {
        title_id,
        platform: query.platform.trim().to_string(),
        percent: confidence.percent(),
        confidence,
    }))
}

pub async fn add_subscription(
    State(state): State<Arc<AppState>>,
    Path(household_id): Path<String>,
    Json(request): Json<AddSubscriptionRequest>,
) -> AppResult<(StatusCode, Json<Subscription>)> {
    let household_id = parse_id("household", &household_id)?;
    let subscription = state
        .households
        .add_subscription(
            household_id,
            &request.platform,
            &request.monthly_cost,
            request.last_watched_at,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    Path(subscription_id): Path<String>,
) -> AppResult<Json<Subscription>> {
    let subscription_id = parse_id("subscription", &subscription_id)?;
    Ok(Json(state.households.cancel_subscription(subscription_id).await?))
}

pub async fn reactivate_subscription(
    State(state): State<Arc<AppState>>,
    Path(subscription_id): Path<String>,
) -> AppResult<Json<Subscription>> {
    let subscription_id = parse_id("subscription", &subscription_id)?;
    Ok(Json(state.households.reactivate_subscription(subscription_id).await?))
}

pub async fn record_subscription_usage(
    State(state): State<Arc<AppState>>,
    Path(subscription_id): Path<String>,
) -> AppResult<Json<Subscription>> {
    let subscription_id = parse_id("subscription", &subscription_id)?;
    Ok(Json(
        state
            .households
            .record_subscription_usage(subscription_id)
            .await?,
    ))
}
