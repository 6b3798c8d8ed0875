/// TMDB catalog provider
///
/// Single provider for text search, per-title details, and genre-based
/// discovery. Supports both v3 (api key query param) and v4 (bearer token)
/// auth; with neither configured, list lookups degrade to empty results and
/// detail lookups fail as not found.
///
/// Every lookup is cached by call signature with a fixed TTL.
use std::cmp::Ordering;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

use crate::{
    cached,
    config::Config,
    db::{CacheKey, CatalogCache},
    error::{AppError, AppResult},
    models::{CatalogDetails, CatalogEntry, TmdbDetails, TmdbListItem, TmdbPage,
        EPISODE_DURATION_MINUTES},
    services::providers::CatalogProvider,
};

/// Search responses are truncated for faster client rendering
pub const MAX_SEARCH_RESULTS: usize = 3;
/// Minimum vote average for the popular lists
pub const MIN_GOOD_RATING: f64 = 7.0;
/// Minimum vote average for the top-rated and highly-rated lists
pub const MIN_TOP_RATING: f64 = 8.0;

const CATALOG_TIMEOUT: Duration = Duration::from_secs(10);
/// Movie runtime assumed when TMDB reports none
const DEFAULT_MOVIE_MINUTES: i64 = 120;
/// Episodes assumed per season when TMDB reports no episode count
const ESTIMATED_EPISODES_PER_SEASON: i64 = 10;

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    access_token: Option<String>,
    api_url: String,
    image_base_url: String,
    cache: CatalogCache,
}

impl TmdbProvider {
    pub fn new(config: &Config, cache: CatalogCache) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(CATALOG_TIMEOUT).build()?;

        if config.tmdb_api_key.is_none() && config.tmdb_access_token.is_none() {
            tracing::warn!("No TMDB credentials configured; catalog lookups will be empty");
        }

        Ok(Self {
            http_client,
            api_key: config.tmdb_api_key.clone(),
            access_token: config.tmdb_access_token.clone(),
            api_url: config.tmdb_api_url.clone(),
            image_base_url: config.tmdb_image_base_url.clone(),
            cache,
        })
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some() || self.access_token.is_some()
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);

        let mut request = self.http_client.get(&url).query(params);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }

        let response = request.send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound("Title not found in catalog".to_string()));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                path = %path,
                status = %status,
                body = %body,
                "TMDB request failed"
            );
            return Err(AppError::Upstream(format!(
                "TMDB returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    /// Maps a raw list item to a client entry, absolutizing the poster path
    fn to_entry(&self, item: TmdbListItem, default_media_type: &str) -> CatalogEntry {
        let media_type = item
            .media_type
            .clone()
            .unwrap_or_else(|| default_media_type.to_string());

        CatalogEntry {
            id: item.id,
            title: item.display_title(),
            release_date: item.display_date(),
            overview: item.overview.clone(),
            poster_path: item
                .poster_path
                .as_deref()
                .map(|p| format!("{}{}", self.image_base_url, p)),
            is_tv_show: media_type == "tv",
            vote_average: item.vote_average,
            popularity: item.popularity.unwrap_or(0.0),
            media_type,
        }
    }

    /// Builds full details from a raw response, estimating total watch time
    fn build_details(&self, details: TmdbDetails, is_tv: bool) -> AppResult<CatalogDetails> {
        let title = details
            .title
            .clone()
            .or_else(|| details.name.clone())
            .ok_or_else(|| AppError::NotFound("Title not found in catalog".to_string()))?;

        let director = if is_tv {
            let creators: Vec<String> = details
                .created_by
                .iter()
                .take(2)
                .map(|c| c.name.clone())
                .collect();
            if creators.is_empty() {
                "Not specified".to_string()
            } else {
                creators.join(", ")
            }
        } else {
            "Not specified".to_string()
        };

        let genres: Vec<String> = details
            .genres
            .iter()
            .take(3)
            .map(|g| g.name.clone())
            .collect();
        let genre = if genres.is_empty() {
            "Not specified".to_string()
        } else {
            genres.join(", ")
        };

        let total_minutes = if is_tv {
            let episodes = details
                .number_of_episodes
                .unwrap_or_else(|| details.number_of_seasons.unwrap_or(1) * ESTIMATED_EPISODES_PER_SEASON);
            Some(episodes * EPISODE_DURATION_MINUTES)
        } else {
            Some(details.runtime.unwrap_or(DEFAULT_MOVIE_MINUTES))
        };

        Ok(CatalogDetails {
            title,
            director,
            genre,
            overview: details.overview,
            poster_path: details
                .poster_path
                .as_deref()
                .map(|p| format!("{}{}", self.image_base_url, p)),
            release_date: details.release_date.or(details.first_air_date),
            total_episodes: if is_tv { details.number_of_episodes } else { None },
            number_of_seasons: if is_tv { details.number_of_seasons } else { None },
            total_minutes,
        })
    }

    /// Shared shape of the popular/top-rated list endpoints
    async fn rated_list(
        &self,
        path: &str,
        default_media_type: &str,
        min_rating: f64,
        limit: usize,
    ) -> AppResult<Vec<CatalogEntry>> {
        let page: TmdbPage = self
            .get_json(path, &[("page", "1".to_string())])
            .await?;

        let mut entries: Vec<CatalogEntry> = page
            .results
            .into_iter()
            .filter(|item| item.vote_average.unwrap_or(0.0) >= min_rating)
            .map(|item| self.to_entry(item, default_media_type))
            .collect();

        entries.sort_by(|a, b| {
            b.vote_average
                .partial_cmp(&a.vote_average)
                .unwrap_or(Ordering::Equal)
        });
        entries.truncate(limit);

        Ok(entries)
    }

    async fn discover(
        &self,
        media_type: &str,
        genre_id: i64,
        page: u32,
    ) -> AppResult<Vec<CatalogEntry>> {
        let path = format!("/discover/{}", media_type);
        let response: TmdbPage = self
            .get_json(
                &path,
                &[
                    ("with_genres", genre_id.to_string()),
                    ("page", page.to_string()),
                    ("sort_by", "popularity.desc".to_string()),
                    ("include_adult", "false".to_string()),
                ],
            )
            .await?;

        Ok(response
            .results
            .into_iter()
            .map(|item| self.to_entry(item, media_type))
            .collect())
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn search(&self, query: &str, page: u32) -> AppResult<Vec<CatalogEntry>> {
        if !self.has_credentials() {
            tracing::warn!("TMDB credentials missing; returning empty search results");
            return Ok(Vec::new());
        }

        let key = CacheKey::Search {
            query: query.to_string(),
            page,
        };

        cached!(self.cache, key, async move {
            let response: TmdbPage = self
                .get_json(
                    "/search/multi",
                    &[
                        ("query", query.to_string()),
                        ("page", page.to_string()),
                        ("include_adult", "false".to_string()),
                    ],
                )
                .await?;

            let mut entries: Vec<CatalogEntry> = response
                .results
                .into_iter()
                .filter(|item| {
                    matches!(item.media_type.as_deref(), Some("movie") | Some("tv"))
                })
                .map(|item| self.to_entry(item, "movie"))
                .collect();

            entries.sort_by(|a, b| {
                (b.popularity, b.vote_average.unwrap_or(0.0))
                    .partial_cmp(&(a.popularity, a.vote_average.unwrap_or(0.0)))
                    .unwrap_or(Ordering::Equal)
            });
            entries.truncate(MAX_SEARCH_RESULTS);

            tracing::info!(
                query = %query,
                results = entries.len(),
                provider = "tmdb",
                "Catalog search completed"
            );

            Ok::<Vec<CatalogEntry>, AppError>(entries)
        })
    }

    async fn details(&self, tmdb_id: i64, is_tv: bool) -> AppResult<CatalogDetails> {
        if !self.has_credentials() {
            return Err(AppError::NotFound("Title not found in catalog".to_string()));
        }

        let key = CacheKey::Details { tmdb_id, is_tv };

        cached!(self.cache, key, async move {
            let media_type = if is_tv { "tv" } else { "movie" };
            let path = format!("/{}/{}", media_type, tmdb_id);
            let raw: TmdbDetails = self.get_json(&path, &[]).await?;
            self.build_details(raw, is_tv)
        })
    }

    async fn discover_movies_by_genre(
        &self,
        genre_id: i64,
        page: u32,
    ) -> AppResult<Vec<CatalogEntry>> {
        if !self.has_credentials() {
            return Ok(Vec::new());
        }

        let key = CacheKey::DiscoverMovies { genre_id, page };
        cached!(self.cache, key, self.discover("movie", genre_id, page))
    }

    async fn discover_shows_by_genre(
        &self,
        genre_id: i64,
        page: u32,
    ) -> AppResult<Vec<CatalogEntry>> {
        if !self.has_credentials() {
            return Ok(Vec::new());
        }

        let key = CacheKey::DiscoverShows { genre_id, page };
        cached!(self.cache, key, self.discover("tv", genre_id, page))
    }

    async fn popular_movies(&self, limit: usize) -> AppResult<Vec<CatalogEntry>> {
        if !self.has_credentials() {
            return Ok(Vec::new());
        }

        let key = CacheKey::PopularMovies { limit };
        cached!(
            self.cache,
            key,
            self.rated_list("/movie/popular", "movie", MIN_GOOD_RATING, limit)
        )
    }

    async fn popular_shows(&self, limit: usize) -> AppResult<Vec<CatalogEntry>> {
        if !self.has_credentials() {
            return Ok(Vec::new());
        }

        let key = CacheKey::PopularShows { limit };
        cached!(
            self.cache,
            key,
            self.rated_list("/tv/popular", "tv", MIN_GOOD_RATING, limit)
        )
    }

    async fn top_rated_movies(&self, limit: usize) -> AppResult<Vec<CatalogEntry>> {
        if !self.has_credentials() {
            return Ok(Vec::new());
        }

        let key = CacheKey::TopRatedMovies { limit };
        cached!(
            self.cache,
            key,
            self.rated_list("/movie/top_rated", "movie", MIN_TOP_RATING, limit)
        )
    }

    async fn top_rated_shows(&self, limit: usize) -> AppResult<Vec<CatalogEntry>> {
        if !self.has_credentials() {
            return Ok(Vec::new());
        }

        let key = CacheKey::TopRatedShows { limit };
        cached!(
            self.cache,
            key,
            self.rated_list("/tv/top_rated", "tv", MIN_TOP_RATING, limit)
        )
    }

    async fn highly_rated_movies(&self, limit: usize) -> AppResult<Vec<CatalogEntry>> {
        if !self.has_credentials() {
            return Ok(Vec::new());
        }

        let key = CacheKey::HighlyRatedMovies { limit };
        cached!(self.cache, key, async move {
            let response: TmdbPage = self
                .get_json(
                    "/discover/movie",
                    &[
                        ("page", "1".to_string()),
                        ("sort_by", "vote_average.desc".to_string()),
                        ("vote_average.gte", MIN_TOP_RATING.to_string()),
                        ("vote_count.gte", "1000".to_string()),
                        ("include_adult", "false".to_string()),
                    ],
                )
                .await?;

            let mut entries: Vec<CatalogEntry> = response
                .results
                .into_iter()
                .map(|item| self.to_entry(item, "movie"))
                .collect();
            entries.truncate(limit);

            Ok::<Vec<CatalogEntry>, AppError>(entries)
        })
    }
}
