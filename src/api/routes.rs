use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::{handlers, AppState};
use crate::middleware::{make_span_with_request_id, propagate_request_id};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(propagate_request_id))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
        .with_state(Arc::new(state))
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Households
        .route("/households", post(handlers::create_household))
        .route(
            "/households/:household_id",
            delete(handlers::delete_household),
        )
        .route(
            "/households/:household_id/export",
            get(handlers::export_household),
        )
        .route(
            "/households/:household_id/recommendations",
            get(handlers::get_recommendations),
        )
        .route(
            "/households/:household_id/intelligence",
            get(handlers::get_intelligence),
        )
        .route("/households/:household_id/members", post(handlers::add_member))
        .route(
            "/households/:household_id/members/:member_id",
            delete(handlers::remove_member),
        )
        .route(
            "/households/:household_id/subscriptions",
            post(handlers::add_subscription),
        )
        // Viewing
        .route("/viewing", post(handlers::record_viewing))
        // Titles and availability
        .route("/titles", post(handlers::create_title))
        .route("/titles/:title_id", get(handlers::get_title))
        .route(
            "/titles/:title_id/availability",
            get(handlers::get_availability).post(handlers::report_availability),
        )
        .route("/titles/:title_id/confidence", get(handlers::get_confidence))
        // Subscriptions
        .route(
            "/subscriptions/:subscription_id/cancel",
            post(handlers::cancel_subscription),
        )
        .route(
            "/subscriptions/:subscription_id/reactivate",
            post(handlers::reactivate_subscription),
        )
        .route(
            "/subscriptions/:subscription_id/usage",
            post(handlers::record_subscription_usage),
        )
}
