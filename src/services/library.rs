/// The user's media collection: CRUD, progress tracking, and stats
///
/// Watch-time bookkeeping follows the episode heuristic: a TV episode counts
/// as a fixed 20 minutes, and episode progress drives the watch status
/// (0 → wishlist, everything watched → completed, otherwise watching).
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    error::{AppError, AppResult},
    models::{MediaItem, WatchStatus, EPISODE_DURATION_MINUTES},
    services::providers::CatalogProvider,
};

/// Input for manually creating a tracked item
#[derive(Debug, Clone, Deserialize)]
pub struct MediaDraft {
    pub title: String,
    #[serde(default)]
    pub director: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default = "default_status")]
    pub status: WatchStatus,
    #[serde(default)]
    pub is_tv_show: bool,
    #[serde(default)]
    pub episodes_watched: i64,
    #[serde(default)]
    pub total_episodes: Option<i64>,
    #[serde(default)]
    pub minutes_watched: i64,
    #[serde(default)]
    pub total_minutes: Option<i64>,
    #[serde(default)]
    pub tmdb_id: Option<i64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

fn default_status() -> WatchStatus {
    WatchStatus::Wishlist
}

/// Input for adding an item straight from the catalog
#[derive(Debug, Deserialize)]
pub struct CatalogAdd {
    pub tmdb_id: i64,
    #[serde(default)]
    pub platform: String,
    #[serde(default = "default_status")]
    pub status: WatchStatus,
    #[serde(default)]
    pub is_tv_show: bool,
}

/// Partial update of a tracked item
#[derive(Debug, Default, Deserialize)]
pub struct MediaPatch {
    pub rating: Option<f64>,
    pub review: Option<String>,
    pub episodes_watched: Option<i64>,
    pub minutes_watched: Option<i64>,
    pub total_minutes: Option<i64>,
    pub status: Option<WatchStatus>,
}

/// Collection list filters
#[derive(Debug, Default, Deserialize)]
pub struct MediaFilter {
    pub genre: Option<String>,
    pub platform: Option<String>,
    pub status: Option<WatchStatus>,
}

/// Aggregated collection statistics
#[derive(Debug, Serialize)]
pub struct CollectionStats {
    pub total: i64,
    pub completed: i64,
    pub watching: i64,
    pub wishlist: i64,
    pub average_rating: f64,
    pub total_minutes_watched: i64,
}

/// Rejects ratings outside the tracked scale
pub fn validate_rating(rating: f64) -> AppResult<()> {
    if !(0.0..=10.0).contains(&rating) {
        return Err(AppError::InvalidInput(
            "Rating must be between 0 and 10".to_string(),
        ));
    }
    Ok(())
}

/// Applies an episode-count change, deriving watch time and status.
///
/// For TV items, minutes are recomputed from the fixed per-episode duration
/// and the status transitions with progress whenever the total episode count
/// is known. Movie rows only have their counter set.
pub fn apply_episode_progress(item: &mut MediaItem, episodes: i64) {
    let episodes = episodes.max(0);
    item.episodes_watched = episodes;

    if !item.is_tv_show {
        return;
    }

    item.minutes_watched = episodes * EPISODE_DURATION_MINUTES;

    if let Some(total) = item.total_episodes {
        item.status = if episodes == 0 {
            WatchStatus::Wishlist
        } else if episodes >= total {
            WatchStatus::Completed
        } else {
            WatchStatus::Watching
        };
    }
}

/// Creates a tracked item, enriching it from the catalog when an external id
/// is supplied. A failed details lookup keeps the submitted fields.
pub async fn create_media(
    pool: &SqlitePool,
    catalog: &dyn CatalogProvider,
    mut draft: MediaDraft,
) -> AppResult<MediaItem> {
    if draft.platform.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Please specify a platform where you watch this content".to_string(),
        ));
    }

    if let Some(tmdb_id) = draft.tmdb_id {
        match catalog.details(tmdb_id, draft.is_tv_show).await {
            Ok(details) => {
                draft.title = details.title;
                draft.director = details.director;
                draft.genre = details.genre;
                draft.poster_path = details.poster_path;
                draft.overview = details.overview;
                draft.release_date = details.release_date;
                if draft.total_minutes.is_none() {
                    draft.total_minutes = details.total_minutes;
                }
                if draft.total_episodes.is_none() {
                    draft.total_episodes = details.total_episodes;
                }
            }
            Err(e) => {
                tracing::warn!(
                    tmdb_id,
                    error = %e,
                    "Catalog details unavailable, keeping submitted fields"
                );
            }
        }
    }

    insert_draft(pool, draft).await
}

/// Adds an item by its catalog id
pub async fn add_from_catalog(
    pool: &SqlitePool,
    catalog: &dyn CatalogProvider,
    request: CatalogAdd,
) -> AppResult<MediaItem> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM media_items WHERE tmdb_id = ?")
        .bind(request.tmdb_id)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::AlreadyExists(
            "Title already exists in your collection".to_string(),
        ));
    }

    if request.platform.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Please specify a platform (Netflix, Prime, Disney+, etc.)".to_string(),
        ));
    }

    let details = catalog.details(request.tmdb_id, request.is_tv_show).await?;

    insert_draft(
        pool,
        MediaDraft {
            title: details.title,
            director: details.director,
            genre: details.genre,
            platform: request.platform,
            status: request.status,
            is_tv_show: request.is_tv_show,
            episodes_watched: 0,
            total_episodes: details.total_episodes,
            minutes_watched: 0,
            total_minutes: details.total_minutes,
            tmdb_id: Some(request.tmdb_id),
            poster_path: details.poster_path,
            release_date: details.release_date,
            overview: details.overview,
        },
    )
    .await
}

async fn insert_draft(pool: &SqlitePool, draft: MediaDraft) -> AppResult<MediaItem> {
    let result = sqlx::query(
        "INSERT INTO media_items \
         (tmdb_id, title, director, genre, platform, status, episodes_watched, \
          total_episodes, minutes_watched, total_minutes, is_tv_show, poster_path, \
          release_date, overview, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(draft.tmdb_id)
    .bind(&draft.title)
    .bind(&draft.director)
    .bind(&draft.genre)
    .bind(&draft.platform)
    .bind(draft.status)
    .bind(draft.episodes_watched.max(0))
    .bind(draft.total_episodes)
    .bind(draft.minutes_watched.max(0))
    .bind(draft.total_minutes)
    .bind(draft.is_tv_show)
    .bind(&draft.poster_path)
    .bind(&draft.release_date)
    .bind(&draft.overview)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    get_media(pool, result.last_insert_rowid()).await
}

/// Lists the collection with optional substring/status filters
pub async fn list_media(pool: &SqlitePool, filter: &MediaFilter) -> AppResult<Vec<MediaItem>> {
    let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new("SELECT * FROM media_items WHERE 1 = 1");

    if let Some(genre) = &filter.genre {
        builder.push(" AND genre LIKE ");
        builder.push_bind(format!("%{}%", genre));
    }
    if let Some(platform) = &filter.platform {
        builder.push(" AND platform LIKE ");
        builder.push_bind(format!("%{}%", platform));
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    builder.push(" ORDER BY id");

    let items = builder
        .build_query_as::<MediaItem>()
        .fetch_all(pool)
        .await?;
    Ok(items)
}

pub async fn get_media(pool: &SqlitePool, id: i64) -> AppResult<MediaItem> {
    sqlx::query_as::<_, MediaItem>("SELECT * FROM media_items WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Media item not found".to_string()))
}

/// Applies a partial update and persists the derived fields
pub async fn update_media(pool: &SqlitePool, id: i64, patch: MediaPatch) -> AppResult<MediaItem> {
    let mut item = get_media(pool, id).await?;

    if let Some(rating) = patch.rating {
        validate_rating(rating)?;
        item.rating = Some(rating);
    }
    if let Some(review) = patch.review {
        item.review = Some(review);
    }
    if let Some(minutes) = patch.minutes_watched {
        item.minutes_watched = minutes.max(0);
    }
    if let Some(total) = patch.total_minutes {
        item.total_minutes = Some(total);
    }
    if let Some(status) = patch.status {
        item.status = status;
    }
    // Episode progress last: for TV items it derives minutes and status
    if let Some(episodes) = patch.episodes_watched {
        apply_episode_progress(&mut item, episodes);
    }

    sqlx::query(
        "UPDATE media_items SET rating = ?, review = ?, episodes_watched = ?, \
         minutes_watched = ?, total_minutes = ?, status = ? WHERE id = ?",
    )
    .bind(item.rating)
    .bind(&item.review)
    .bind(item.episodes_watched)
    .bind(item.minutes_watched)
    .bind(item.total_minutes)
    .bind(item.status)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(item)
}

/// Updates the rating and/or review text of an item
pub async fn update_rating_review(
    pool: &SqlitePool,
    id: i64,
    rating: Option<f64>,
    review: Option<String>,
) -> AppResult<MediaItem> {
    let mut item = get_media(pool, id).await?;

    if let Some(rating) = rating {
        validate_rating(rating)?;
        item.rating = Some(rating);
    }
    if let Some(review) = review {
        item.review = Some(review);
    }

    sqlx::query("UPDATE media_items SET rating = ?, review = ? WHERE id = ?")
        .bind(item.rating)
        .bind(&item.review)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(item)
}

/// Deletes an item; party rooms referencing it are left untouched
pub async fn delete_media(pool: &SqlitePool, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM media_items WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Media item not found".to_string()));
    }
    Ok(())
}

/// Aggregates counts, average rating, and total watch time
pub async fn collection_stats(pool: &SqlitePool) -> AppResult<CollectionStats> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media_items")
        .fetch_one(pool)
        .await?;
    let completed = count_by_status(pool, WatchStatus::Completed).await?;
    let watching = count_by_status(pool, WatchStatus::Watching).await?;
    let wishlist = count_by_status(pool, WatchStatus::Wishlist).await?;

    let average: Option<f64> =
        sqlx::query_scalar("SELECT AVG(rating) FROM media_items WHERE rating IS NOT NULL")
            .fetch_one(pool)
            .await?;
    let average_rating = (average.unwrap_or(0.0) * 10.0).round() / 10.0;

    let total_minutes_watched: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(minutes_watched), 0) FROM media_items")
            .fetch_one(pool)
            .await?;

    Ok(CollectionStats {
        total,
        completed,
        watching,
        wishlist,
        average_rating,
        total_minutes_watched,
    })
}

async fn count_by_status(pool: &SqlitePool, status: WatchStatus) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media_items WHERE status = ?")
        .bind(status)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
