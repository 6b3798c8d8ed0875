use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;

use moviemate_api::db::{migrations, CatalogCache};
use moviemate_api::error::{AppError, AppResult};
use moviemate_api::models::{CatalogDetails, CatalogEntry};
use moviemate_api::routes::{create_router, AppState};
use moviemate_api::services::party::PartyRoomManager;
use moviemate_api::services::providers::CatalogProvider;
use moviemate_api::services::recommendations::RecommendationEngine;
use moviemate_api::services::reviews::{ReviewProvider, ReviewRequest, ReviewService};

fn entry(id: i64, title: &str, media_type: &str) -> CatalogEntry {
    CatalogEntry {
        id,
        title: title.to_string(),
        release_date: None,
        overview: None,
        poster_path: None,
        media_type: media_type.to_string(),
        vote_average: Some(8.0),
        is_tv_show: media_type == "tv",
        popularity: 50.0,
    }
}

/// Deterministic catalog double; discovery ids are derived from the genre id
struct StubCatalog;

#[async_trait::async_trait]
impl CatalogProvider for StubCatalog {
    async fn search(&self, _query: &str, _page: u32) -> AppResult<Vec<CatalogEntry>> {
        Ok(vec![entry(603, "The Matrix", "movie")])
    }

    async fn details(&self, tmdb_id: i64, is_tv: bool) -> AppResult<CatalogDetails> {
        Ok(CatalogDetails {
            title: format!("Title {}", tmdb_id),
            director: "Not specified".to_string(),
            genre: "Action, Science Fiction".to_string(),
            overview: Some("Synopsis".to_string()),
            poster_path: None,
            release_date: Some("2020-01-01".to_string()),
            total_episodes: if is_tv { Some(8) } else { None },
            number_of_seasons: if is_tv { Some(1) } else { None },
            total_minutes: Some(if is_tv { 160 } else { 120 }),
        })
    }

    async fn discover_movies_by_genre(
        &self,
        genre_id: i64,
        _page: u32,
    ) -> AppResult<Vec<CatalogEntry>> {
        Ok(vec![entry(1000 + genre_id, "Discovered Movie", "movie")])
    }

    async fn discover_shows_by_genre(
        &self,
        genre_id: i64,
        _page: u32,
    ) -> AppResult<Vec<CatalogEntry>> {
        Ok(vec![entry(2000 + genre_id, "Discovered Show", "tv")])
    }

    async fn popular_movies(&self, _limit: usize) -> AppResult<Vec<CatalogEntry>> {
        Ok(vec![entry(11, "Popular Movie", "movie")])
    }

    async fn popular_shows(&self, _limit: usize) -> AppResult<Vec<CatalogEntry>> {
        Ok(vec![entry(12, "Popular Show", "tv")])
    }

    async fn top_rated_movies(&self, _limit: usize) -> AppResult<Vec<CatalogEntry>> {
        Ok(vec![entry(21, "Top Movie", "movie")])
    }

    async fn top_rated_shows(&self, _limit: usize) -> AppResult<Vec<CatalogEntry>> {
        Ok(vec![entry(22, "Top Show", "tv")])
    }

    async fn highly_rated_movies(&self, _limit: usize) -> AppResult<Vec<CatalogEntry>> {
        Ok(vec![entry(31, "Acclaimed Movie", "movie")])
    }
}

/// Review provider double that is never configured, forcing the fallback
struct NullReviewProvider;

#[async_trait::async_trait]
impl ReviewProvider for NullReviewProvider {
    fn is_configured(&self) -> bool {
        false
    }

    async fn generate(&self, _request: &ReviewRequest) -> AppResult<String> {
        Err(AppError::Upstream("not configured".to_string()))
    }
}

async fn create_test_server() -> TestServer {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrations::run(&pool).await.unwrap();

    let catalog: Arc<dyn CatalogProvider> = Arc::new(StubCatalog);
    let state = AppState {
        db: pool.clone(),
        cache: CatalogCache::new(),
        catalog: catalog.clone(),
        reviews: Arc::new(ReviewService::new(Arc::new(NullReviewProvider))),
        recommendations: Arc::new(RecommendationEngine::new(catalog)),
        party: Arc::new(PartyRoomManager::new(pool)),
    };

    TestServer::new(create_router(state)).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server().await;
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_create_media_requires_platform() {
    let server = create_test_server().await;

    let response = server
        .post("/media")
        .json(&json!({ "title": "Dune" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_and_list_media() {
    let server = create_test_server().await;

    let response = server
        .post("/media")
        .json(&json!({
            "title": "Dune",
            "platform": "Netflix",
            "genre": "Science Fiction"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = response.json();
    assert_eq!(created["title"], "Dune");
    assert_eq!(created["status"], "wishlist");
    assert_eq!(created["episodes_watched"], 0);
    assert_eq!(created["minutes_watched"], 0);

    let response = server.get("/media").await;
    response.assert_status_ok();
    let items: Vec<serde_json::Value> = response.json();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Dune");
}

#[tokio::test]
async fn test_list_media_filters_by_status() {
    let server = create_test_server().await;

    server
        .post("/media")
        .json(&json!({ "title": "Dune", "platform": "Netflix", "status": "completed" }))
        .await;
    server
        .post("/media")
        .json(&json!({ "title": "Arrival", "platform": "Prime" }))
        .await;

    let response = server
        .get("/media")
        .add_query_param("status", "completed")
        .await;
    response.assert_status_ok();
    let items: Vec<serde_json::Value> = response.json();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Dune");
}

#[tokio::test]
async fn test_rating_validation() {
    let server = create_test_server().await;

    let response = server
        .post("/media")
        .json(&json!({ "title": "Dune", "platform": "Netflix" }))
        .await;
    let created: serde_json::Value = response.json();
    let id = created["id"].as_i64().unwrap();

    // Out of range fails and nothing is stored
    let response = server
        .put(&format!("/media/{}/rating-review", id))
        .json(&json!({ "rating": 11.0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // In range is stored unchanged
    let response = server
        .put(&format!("/media/{}/rating-review", id))
        .json(&json!({ "rating": 7.5, "review": "Great." }))
        .await;
    response.assert_status_ok();
    let updated: serde_json::Value = response.json();
    assert_eq!(updated["rating"], 7.5);
    assert_eq!(updated["review"], "Great.");

    let response = server.get("/media").await;
    let items: Vec<serde_json::Value> = response.json();
    assert_eq!(items[0]["rating"], 7.5);
}

#[tokio::test]
async fn test_episode_progress_drives_status() {
    let server = create_test_server().await;

    let response = server
        .post("/media")
        .json(&json!({
            "title": "Severance",
            "platform": "Apple TV+",
            "is_tv_show": true,
            "total_episodes": 8
        }))
        .await;
    let created: serde_json::Value = response.json();
    let id = created["id"].as_i64().unwrap();

    // Watching everything completes the show and derives minutes
    let response = server
        .put(&format!("/media/{}", id))
        .json(&json!({ "episodes_watched": 8 }))
        .await;
    response.assert_status_ok();
    let updated: serde_json::Value = response.json();
    assert_eq!(updated["status"], "completed");
    assert_eq!(updated["minutes_watched"], 160);

    // Resetting to zero goes back to wishlist
    let response = server
        .put(&format!("/media/{}", id))
        .json(&json!({ "episodes_watched": 0 }))
        .await;
    let updated: serde_json::Value = response.json();
    assert_eq!(updated["status"], "wishlist");
    assert_eq!(updated["minutes_watched"], 0);

    // Partial progress is watching
    let response = server
        .put(&format!("/media/{}", id))
        .json(&json!({ "episodes_watched": 3 }))
        .await;
    let updated: serde_json::Value = response.json();
    assert_eq!(updated["status"], "watching");
    assert_eq!(updated["minutes_watched"], 60);
}

#[tokio::test]
async fn test_add_from_catalog_and_duplicate_rejection() {
    let server = create_test_server().await;

    let response = server
        .post("/media/catalog/add")
        .json(&json!({ "tmdb_id": 603, "platform": "Netflix" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = response.json();
    assert_eq!(created["tmdb_id"], 603);
    assert_eq!(created["title"], "Title 603");

    let response = server
        .post("/media/catalog/add")
        .json(&json!({ "tmdb_id": 603, "platform": "Prime" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_add_from_catalog_requires_platform() {
    let server = create_test_server().await;

    let response = server
        .post("/media/catalog/add")
        .json(&json!({ "tmdb_id": 603 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_media() {
    let server = create_test_server().await;

    let response = server
        .post("/media")
        .json(&json!({ "title": "Dune", "platform": "Netflix" }))
        .await;
    let created: serde_json::Value = response.json();
    let id = created["id"].as_i64().unwrap();

    let response = server.delete(&format!("/media/{}", id)).await;
    response.assert_status_ok();

    let response = server.delete(&format!("/media/{}", id)).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_aggregation() {
    let server = create_test_server().await;

    server
        .post("/media")
        .json(&json!({
            "title": "Dune",
            "platform": "Netflix",
            "status": "completed",
            "minutes_watched": 155
        }))
        .await;
    server
        .post("/media")
        .json(&json!({ "title": "Arrival", "platform": "Prime", "minutes_watched": 45 }))
        .await;

    let response = server.get("/stats").await;
    response.assert_status_ok();
    let stats: serde_json::Value = response.json();
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["wishlist"], 1);
    assert_eq!(stats["total_minutes_watched"], 200);
}

#[tokio::test]
async fn test_catalog_search_rejects_empty_query() {
    let server = create_test_server().await;

    let response = server.get("/catalog/search").add_query_param("q", "  ").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_search_marks_owned_titles() {
    let server = create_test_server().await;

    let response = server
        .get("/catalog/search")
        .add_query_param("q", "matrix")
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["results"][0]["already_added"], false);

    server
        .post("/media/catalog/add")
        .json(&json!({ "tmdb_id": 603, "platform": "Netflix" }))
        .await;

    let response = server
        .get("/catalog/search")
        .add_query_param("q", "matrix")
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["results"][0]["already_added"], true);
    assert_eq!(body["results"][0]["existing_status"], "wishlist");
}

#[tokio::test]
async fn test_recommendations_empty_collection_message() {
    let server = create_test_server().await;

    let response = server.get("/recommendations").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["recommendations"].as_array().unwrap().is_empty());
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Add some movies"));
}

#[tokio::test]
async fn test_recommendations_from_genres() {
    let server = create_test_server().await;

    server
        .post("/media/catalog/add")
        .json(&json!({ "tmdb_id": 603, "platform": "Netflix" }))
        .await;

    let response = server.get("/recommendations").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();

    let recommendations = body["recommendations"].as_array().unwrap();
    assert!(!recommendations.is_empty());
    for recommendation in recommendations {
        // Never suggest something already owned
        assert_ne!(recommendation["id"], 603);
        assert_eq!(recommendation["already_added"], false);
    }
    assert!(!body["based_on"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_recommendations_fallback_endpoint() {
    let server = create_test_server().await;

    let response = server.get("/recommendations/fallback").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations[0]["title"], "Acclaimed Movie");
    assert_eq!(
        recommendations[0]["recommendation_reason"],
        "Critically acclaimed"
    );
}

#[tokio::test]
async fn test_catalog_popular_and_top_rated() {
    let server = create_test_server().await;

    let response = server.get("/catalog/popular").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["min_rating"], 7.0);
    assert!(!body["results"].as_array().unwrap().is_empty());

    let response = server
        .get("/catalog/top-rated")
        .add_query_param("kind", "movies")
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["min_rating"], 8.0);
    assert_eq!(body["results"][0]["title"], "Top Movie");
}

#[tokio::test]
async fn test_clear_catalog_cache() {
    let server = create_test_server().await;
    let response = server.delete("/catalog/cache").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_generate_review_for_media_uses_fallback() {
    let server = create_test_server().await;

    let response = server
        .post("/media")
        .json(&json!({ "title": "Dune", "platform": "Netflix" }))
        .await;
    let created: serde_json::Value = response.json();
    let id = created["id"].as_i64().unwrap();

    let response = server
        .post(&format!("/media/{}/generate-review", id))
        .json(&json!({ "user_notes": "stunning visuals", "rating": 8.5 }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let review = body["review"].as_str().unwrap();
    assert!(!review.is_empty());
    assert!(review.contains("stunning visuals"));
}

#[tokio::test]
async fn test_generate_review_unknown_media_not_found() {
    let server = create_test_server().await;

    let response = server
        .post("/media/999/generate-review")
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_preview_and_status() {
    let server = create_test_server().await;

    let response = server
        .post("/reviews/preview")
        .json(&json!({ "title": "Inception", "length": "short" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(!body["review"].as_str().unwrap().is_empty());

    let response = server.post("/reviews/preview").json(&json!({ "title": "" })).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server.get("/reviews/status").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["configured"], false);
}

#[tokio::test]
async fn test_party_room_lifecycle() {
    let server = create_test_server().await;

    // Host creates the room
    let response = server
        .post("/party/create")
        .json(&json!({
            "media_id": 5,
            "media_title": "Dune",
            "host_id": "h1"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let room: serde_json::Value = response.json();
    let code = room["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);
    assert_eq!(room["is_active"], true);
    let members = room["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["id"], "h1");
    assert_eq!(members[0]["is_host"], true);

    // A member joins and shows up exactly once
    let response = server
        .post("/party/join")
        .json(&json!({ "room_code": code, "user_id": "u1", "user_name": "Alice" }))
        .await;
    response.assert_status_ok();

    let response = server.get(&format!("/party/{}", code)).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let members = body["room"]["members"].as_array().unwrap();
    let alice_count = members.iter().filter(|m| m["id"] == "u1").count();
    assert_eq!(alice_count, 1);

    // Duplicate join conflicts and membership is unchanged
    let response = server
        .post("/party/join")
        .json(&json!({ "room_code": code, "user_id": "u1", "user_name": "Alice" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let response = server.get(&format!("/party/{}", code)).await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["room"]["members"].as_array().unwrap().len(), 2);

    // Playback sync acknowledges on the active room
    let response = server
        .post("/party/sync")
        .json(&json!({ "room_code": code, "action": "seek", "timestamp_ms": 90000 }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["action"], "seek");
    assert_eq!(body["timestamp_ms"], 90000);

    // Start acknowledges the session
    let response = server
        .post("/party/start")
        .json(&json!({ "room_code": code }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["media_title"], "Dune");
}

#[tokio::test]
async fn test_party_non_host_leave_keeps_room_active() {
    let server = create_test_server().await;

    let response = server
        .post("/party/create")
        .json(&json!({ "media_id": 5, "media_title": "Dune", "host_id": "h1" }))
        .await;
    let room: serde_json::Value = response.json();
    let code = room["code"].as_str().unwrap().to_string();

    server
        .post("/party/join")
        .json(&json!({ "room_code": code, "user_id": "u1", "user_name": "Alice" }))
        .await;

    let response = server
        .post("/party/leave")
        .json(&json!({ "room_code": code, "user_id": "u1" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["room_ended"], false);
    assert_eq!(body["members"].as_array().unwrap().len(), 1);

    // Room is still visible and joinable
    let response = server.get(&format!("/party/{}", code)).await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_party_host_leave_ends_room() {
    let server = create_test_server().await;

    let response = server
        .post("/party/create")
        .json(&json!({ "media_id": 5, "media_title": "Dune", "host_id": "h1" }))
        .await;
    let room: serde_json::Value = response.json();
    let code = room["code"].as_str().unwrap().to_string();

    server
        .post("/party/join")
        .json(&json!({ "room_code": code, "user_id": "u1", "user_name": "Alice" }))
        .await;

    let response = server
        .post("/party/leave")
        .json(&json!({ "room_code": code, "user_id": "h1" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["room_ended"], true);

    // Terminal: lookups and further joins fail
    let response = server.get(&format!("/party/{}", code)).await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .post("/party/join")
        .json(&json!({ "room_code": code, "user_id": "u2", "user_name": "Bob" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_party_end_room() {
    let server = create_test_server().await;

    let response = server
        .post("/party/create")
        .json(&json!({ "media_id": 5, "media_title": "Dune", "host_id": "h1" }))
        .await;
    let room: serde_json::Value = response.json();
    let code = room["code"].as_str().unwrap().to_string();

    let response = server
        .post("/party/end")
        .json(&json!({ "room_code": code }))
        .await;
    response.assert_status_ok();

    let response = server.get(&format!("/party/{}", code)).await;
    response.assert_status(StatusCode::NOT_FOUND);

    // Ending an unknown room is a 404
    let response = server
        .post("/party/end")
        .json(&json!({ "room_code": "ZZZZZZ" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_party_join_embeds_media_when_tracked() {
    let server = create_test_server().await;

    let response = server
        .post("/media")
        .json(&json!({ "title": "Dune", "platform": "Netflix" }))
        .await;
    let created: serde_json::Value = response.json();
    let media_id = created["id"].as_i64().unwrap();

    let response = server
        .post("/party/create")
        .json(&json!({ "media_id": media_id, "media_title": "Dune", "host_id": "h1" }))
        .await;
    let room: serde_json::Value = response.json();
    let code = room["code"].as_str().unwrap().to_string();

    let response = server
        .post("/party/join")
        .json(&json!({ "room_code": code, "user_id": "u1", "user_name": "Alice" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["media"]["title"], "Dune");
}
