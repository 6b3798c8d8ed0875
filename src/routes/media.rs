use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    models::MediaItem,
    services::library::{self, CatalogAdd, CollectionStats, MediaDraft, MediaFilter, MediaPatch},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RatingReviewUpdate {
    pub rating: Option<f64>,
    pub review: Option<String>,
}

/// Handler for manually creating a tracked item
pub async fn create(
    State(state): State<AppState>,
    Json(draft): Json<MediaDraft>,
) -> AppResult<(StatusCode, Json<MediaItem>)> {
    let item = library::create_media(&state.db, state.catalog.as_ref(), draft).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Handler for adding an item by catalog id
pub async fn add_from_catalog(
    State(state): State<AppState>,
    Json(request): Json<CatalogAdd>,
) -> AppResult<(StatusCode, Json<MediaItem>)> {
    let item = library::add_from_catalog(&state.db, state.catalog.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Handler for listing the collection with filters
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<MediaFilter>,
) -> AppResult<Json<Vec<MediaItem>>> {
    let items = library::list_media(&state.db, &filter).await?;
    Ok(Json(items))
}

/// Handler for partially updating an item
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<MediaPatch>,
) -> AppResult<Json<MediaItem>> {
    let item = library::update_media(&state.db, id, patch).await?;
    Ok(Json(item))
}

/// Handler for updating rating and review text
pub async fn update_rating_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<RatingReviewUpdate>,
) -> AppResult<Json<MediaItem>> {
    let item =
        library::update_rating_review(&state.db, id, update.rating, update.review).await?;
    Ok(Json(item))
}

/// Handler for deleting an item
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    library::delete_media(&state.db, id).await?;
    Ok(Json(json!({ "message": "Media item deleted successfully" })))
}

/// Handler for collection statistics
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<CollectionStats>> {
    let stats = library::collection_stats(&state.db).await?;
    Ok(Json(stats))
}
