use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    services::{
        library,
        reviews::{ReviewLength, ReviewRequest},
    },
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewGenerationRequest {
    #[serde(default)]
    pub user_notes: String,
    pub rating: Option<f64>,
    #[serde(default)]
    pub length: ReviewLength,
}

#[derive(Debug, Serialize)]
pub struct ReviewGenerationResponse {
    pub review: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewPreviewRequest {
    pub title: String,
    #[serde(default)]
    pub user_notes: String,
    pub rating: Option<f64>,
    #[serde(default)]
    pub length: ReviewLength,
}

#[derive(Debug, Serialize)]
pub struct ReviewPreviewResponse {
    pub title: String,
    pub rating: Option<f64>,
    pub user_notes: String,
    pub review: String,
}

/// Handler for generating a review for a tracked item.
///
/// The prose is returned without being persisted; saving it is the client's
/// call via the rating-review endpoint.
pub async fn generate_for_media(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ReviewGenerationRequest>,
) -> AppResult<Json<ReviewGenerationResponse>> {
    let item = library::get_media(&state.db, id).await?;

    let review = state
        .reviews
        .generate(&ReviewRequest {
            title: item.title,
            notes: request.user_notes,
            rating: request.rating,
            length: request.length,
        })
        .await;

    Ok(Json(ReviewGenerationResponse { review }))
}

/// Handler for generating a review from an arbitrary title
pub async fn preview(
    State(state): State<AppState>,
    Json(request): Json<ReviewPreviewRequest>,
) -> AppResult<Json<ReviewPreviewResponse>> {
    if request.title.trim().is_empty() {
        return Err(AppError::InvalidInput("Title is required".to_string()));
    }

    let review = state
        .reviews
        .generate(&ReviewRequest {
            title: request.title.clone(),
            notes: request.user_notes.clone(),
            rating: request.rating,
            length: request.length,
        })
        .await;

    Ok(Json(ReviewPreviewResponse {
        title: request.title,
        rating: request.rating,
        user_notes: request.user_notes,
        review,
    }))
}

/// Handler reporting review-generation configuration state
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "configured": state.reviews.is_configured(),
        "provider": "ai21-j2-ultra",
        "fallback_system": true,
        "lengths": ["short", "medium", "long"],
    }))
}
