/// Catalog data provider abstraction
///
/// The catalog collaborator is pluggable behind a trait so handlers and the
/// recommendation engine never talk to a concrete API client directly. The
/// only shipped implementation is TMDB.
use crate::{
    error::AppResult,
    models::{CatalogDetails, CatalogEntry},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Trait for movie/show catalog providers
///
/// List calls degrade to empty results upstream of the caller wherever a
/// fallback exists; `details` is the one lookup with no fallback and fails
/// with NotFound instead.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Search movies and shows by free text
    async fn search(&self, query: &str, page: u32) -> AppResult<Vec<CatalogEntry>>;

    /// Fetch full details for a single title
    async fn details(&self, tmdb_id: i64, is_tv: bool) -> AppResult<CatalogDetails>;

    /// Popularity-sorted genre discovery, movie catalog
    async fn discover_movies_by_genre(&self, genre_id: i64, page: u32)
        -> AppResult<Vec<CatalogEntry>>;

    /// Popularity-sorted genre discovery, show catalog
    async fn discover_shows_by_genre(&self, genre_id: i64, page: u32)
        -> AppResult<Vec<CatalogEntry>>;

    /// Popular movies with a vote average of at least 7.0
    async fn popular_movies(&self, limit: usize) -> AppResult<Vec<CatalogEntry>>;

    /// Popular shows with a vote average of at least 7.0
    async fn popular_shows(&self, limit: usize) -> AppResult<Vec<CatalogEntry>>;

    /// Top-rated movies with a vote average of at least 8.0
    async fn top_rated_movies(&self, limit: usize) -> AppResult<Vec<CatalogEntry>>;

    /// Top-rated shows with a vote average of at least 8.0
    async fn top_rated_shows(&self, limit: usize) -> AppResult<Vec<CatalogEntry>>;

    /// Highly rated movies from discovery, vote average 8.0+ with enough votes
    async fn highly_rated_movies(&self, limit: usize) -> AppResult<Vec<CatalogEntry>>;
}

/// Maps a genre name to its TMDB genre ID
pub fn tmdb_genre_id(name: &str) -> Option<i64> {
    match name {
        "Action" => Some(28),
        "Adventure" => Some(12),
        "Animation" => Some(16),
        "Comedy" => Some(35),
        "Crime" => Some(80),
        "Documentary" => Some(99),
        "Drama" => Some(18),
        "Family" => Some(10751),
        "Fantasy" => Some(14),
        "History" => Some(36),
        "Horror" => Some(27),
        "Music" => Some(10402),
        "Mystery" => Some(9648),
        "Romance" => Some(10749),
        "Science Fiction" => Some(878),
        "TV Movie" => Some(10770),
        "Thriller" => Some(53),
        "War" => Some(10752),
        "Western" => Some(37),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tmdb_genre_id_known() {
        assert_eq!(tmdb_genre_id("Action"), Some(28));
        assert_eq!(tmdb_genre_id("Science Fiction"), Some(878));
        assert_eq!(tmdb_genre_id("Western"), Some(37));
    }

    #[test]
    fn test_tmdb_genre_id_unknown() {
        assert_eq!(tmdb_genre_id("Telenovela"), None);
        assert_eq!(tmdb_genre_id("Not specified"), None);
    }
}
