use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, WatchStatus},
    services::providers::tmdb::{MIN_GOOD_RATING, MIN_TOP_RATING},
};

use super::AppState;

/// A catalog entry annotated with the caller's collection state
#[derive(Debug, Serialize)]
pub struct EnhancedEntry {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub already_added: bool,
    pub existing_status: Option<WatchStatus>,
}

#[derive(Debug, Serialize)]
pub struct CatalogListResponse {
    pub results: Vec<EnhancedEntry>,
    pub total_results: usize,
    pub min_rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_kind")]
    pub kind: String,
    pub limit: Option<usize>,
}

fn default_kind() -> String {
    "all".to_string()
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<EnhancedEntry>,
    pub query: String,
    pub page: u32,
    pub total_results: usize,
}

/// Handler for catalog text search
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    if params.q.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Search query cannot be empty".to_string(),
        ));
    }

    // Provider failures degrade to an empty result list
    let entries = state
        .catalog
        .search(&params.q, params.page)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(query = %params.q, error = %e, "Catalog search failed");
            Vec::new()
        });

    let results = enhance_entries(&state.db, entries).await?;
    Ok(Json(SearchResponse {
        total_results: results.len(),
        results,
        query: params.q,
        page: params.page,
    }))
}

/// Handler for popular content (vote average 7.0+)
pub async fn popular(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<CatalogListResponse>> {
    let limit = params.limit.unwrap_or(6);
    let per_catalog = (limit / 2).max(1);
    let mut entries = Vec::new();

    if matches!(params.kind.as_str(), "all" | "movies") {
        entries.extend(swallow(state.catalog.popular_movies(per_catalog).await));
    }
    if matches!(params.kind.as_str(), "all" | "tv") {
        entries.extend(swallow(state.catalog.popular_shows(per_catalog).await));
    }
    entries.truncate(limit);

    let results = enhance_entries(&state.db, entries).await?;
    Ok(Json(CatalogListResponse {
        total_results: results.len(),
        results,
        min_rating: Some(MIN_GOOD_RATING),
    }))
}

/// Handler for top-rated content (vote average 8.0+)
pub async fn top_rated(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<CatalogListResponse>> {
    let limit = params.limit.unwrap_or(3);
    let mut entries = Vec::new();

    if matches!(params.kind.as_str(), "all" | "movies") {
        entries.extend(swallow(state.catalog.top_rated_movies(limit).await));
    }
    if matches!(params.kind.as_str(), "all" | "tv") {
        entries.extend(swallow(state.catalog.top_rated_shows(limit).await));
    }
    entries.truncate(limit);

    let results = enhance_entries(&state.db, entries).await?;
    Ok(Json(CatalogListResponse {
        total_results: results.len(),
        results,
        min_rating: Some(MIN_TOP_RATING),
    }))
}

/// Handler for highly rated discovery results
pub async fn highly_rated(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<CatalogListResponse>> {
    let limit = params.limit.unwrap_or(3);
    let entries = swallow(state.catalog.highly_rated_movies(limit).await);

    let results = enhance_entries(&state.db, entries).await?;
    Ok(Json(CatalogListResponse {
        total_results: results.len(),
        results,
        min_rating: Some(MIN_TOP_RATING),
    }))
}

/// Handler for clearing the catalog lookup cache
pub async fn clear_cache(State(state): State<AppState>) -> Json<Value> {
    state.cache.clear().await;
    Json(json!({ "message": "Catalog cache cleared successfully" }))
}

fn swallow(result: AppResult<Vec<CatalogEntry>>) -> Vec<CatalogEntry> {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Catalog list lookup failed");
        Vec::new()
    })
}

/// Annotates entries with whether they are already in the collection
pub(crate) async fn enhance_entries(
    pool: &SqlitePool,
    entries: Vec<CatalogEntry>,
) -> AppResult<Vec<EnhancedEntry>> {
    let rows: Vec<(i64, WatchStatus)> =
        sqlx::query_as("SELECT tmdb_id, status FROM media_items WHERE tmdb_id IS NOT NULL")
            .fetch_all(pool)
            .await?;
    let index: HashMap<i64, WatchStatus> = rows.into_iter().collect();

    Ok(entries
        .into_iter()
        .map(|entry| {
            let existing_status = index.get(&entry.id).copied();
            EnhancedEntry {
                already_added: existing_status.is_some(),
                existing_status,
                entry,
            }
        })
        .collect())
}
