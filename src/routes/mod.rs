use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::CatalogCache,
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{
        party::PartyRoomManager, providers::CatalogProvider,
        recommendations::RecommendationEngine, reviews::ReviewService,
    },
};

pub mod catalog;
pub mod media;
pub mod party;
pub mod recommendations;
pub mod reviews;

/// Shared application state injected into every handler
///
/// All collaborators are explicit dependencies constructed once at startup;
/// nothing lives in process-wide globals.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub cache: CatalogCache,
    pub catalog: Arc<dyn CatalogProvider>,
    pub reviews: Arc<ReviewService>,
    pub recommendations: Arc<RecommendationEngine>,
    pub party: Arc<PartyRoomManager>,
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/media", post(media::create).get(media::list))
        .route("/media/catalog/add", post(media::add_from_catalog))
        .route("/media/:id", put(media::update).delete(media::remove))
        .route("/media/:id/rating-review", put(media::update_rating_review))
        .route("/media/:id/generate-review", post(reviews::generate_for_media))
        .route("/stats", get(media::stats))
        .route("/catalog/search", get(catalog::search))
        .route("/catalog/popular", get(catalog::popular))
        .route("/catalog/top-rated", get(catalog::top_rated))
        .route("/catalog/highly-rated", get(catalog::highly_rated))
        .route("/catalog/cache", delete(catalog::clear_cache))
        .route("/recommendations", get(recommendations::recommend))
        .route("/recommendations/fallback", get(recommendations::fallback))
        .route("/reviews/preview", post(reviews::preview))
        .route("/reviews/status", get(reviews::status))
        .route("/party/create", post(party::create))
        .route("/party/join", post(party::join))
        .route("/party/leave", post(party::leave))
        .route("/party/end", post(party::end))
        .route("/party/:code", get(party::get_room))
        .route("/party/sync", post(party::sync))
        .route("/party/start", post(party::start))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
