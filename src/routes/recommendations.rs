use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::WatchStatus,
    services::{
        library::{self, MediaFilter},
        recommendations::{Recommendation, DEFAULT_MAX_RESULTS},
    },
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

/// A recommendation annotated with the caller's collection state
#[derive(Debug, Serialize)]
pub struct EnhancedRecommendation {
    #[serde(flatten)]
    pub recommendation: Recommendation,
    pub already_added: bool,
    pub existing_status: Option<WatchStatus>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<EnhancedRecommendation>,
    pub based_on: Vec<String>,
    pub message: String,
}

/// Handler for genre-based recommendations
pub async fn recommend(
    State(state): State<AppState>,
    Query(params): Query<RecommendQuery>,
) -> AppResult<Json<RecommendationsResponse>> {
    let collection = library::list_media(&state.db, &MediaFilter::default()).await?;
    let set = state
        .recommendations
        .recommend(&collection, params.max_results)
        .await;

    let index: HashMap<i64, WatchStatus> = collection
        .iter()
        .filter_map(|item| item.tmdb_id.map(|id| (id, item.status)))
        .collect();

    let recommendations = set
        .recommendations
        .into_iter()
        .map(|recommendation| {
            let existing_status = index.get(&recommendation.entry.id).copied();
            EnhancedRecommendation {
                already_added: existing_status.is_some(),
                existing_status,
                recommendation,
            }
        })
        .collect();

    Ok(Json(RecommendationsResponse {
        recommendations,
        based_on: set.based_on,
        message: set.message,
    }))
}

/// Handler for the critically-acclaimed fallback list
pub async fn fallback(
    State(state): State<AppState>,
    Query(params): Query<RecommendQuery>,
) -> AppResult<Json<RecommendationsResponse>> {
    let entries = state
        .catalog
        .highly_rated_movies(params.max_results)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Acclaimed fallback fetch failed");
            Vec::new()
        });

    let recommendations = entries
        .into_iter()
        .map(|entry| EnhancedRecommendation {
            recommendation: Recommendation {
                entry,
                recommendation_reason: "Critically acclaimed".to_string(),
            },
            already_added: false,
            existing_status: None,
        })
        .collect();

    Ok(Json(RecommendationsResponse {
        recommendations,
        based_on: vec!["Critically acclaimed content".to_string()],
        message: "Here are some highly rated movies to get you started".to_string(),
    }))
}
