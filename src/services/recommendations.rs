/// Genre-histogram recommendation engine
///
/// Aggregates the user's collection into a genre frequency histogram, sources
/// popular catalog entries for the top genres, and pads any shortfall with a
/// critically-acclaimed fallback list. Catalog failures inside a genre pass
/// degrade to zero results for that pass; the engine itself never fails.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::{
    models::{CatalogEntry, MediaItem},
    services::providers::{tmdb_genre_id, CatalogProvider},
};

pub const DEFAULT_MAX_RESULTS: usize = 10;
const TOP_GENRE_COUNT: usize = 3;
const BASED_ON_GENRE_COUNT: usize = 2;

/// One recommended catalog entry with the reason it was chosen
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub recommendation_reason: String,
}

/// Engine output: suggestions plus the genres that drove them
#[derive(Debug, Serialize)]
pub struct RecommendationSet {
    pub recommendations: Vec<Recommendation>,
    pub based_on: Vec<String>,
    pub message: String,
}

pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogProvider>,
}

impl RecommendationEngine {
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { catalog }
    }

    /// Produces up to `max_results` suggestions not already in the collection
    pub async fn recommend(
        &self,
        collection: &[MediaItem],
        max_results: usize,
    ) -> RecommendationSet {
        if collection.is_empty() {
            return RecommendationSet {
                recommendations: Vec::new(),
                based_on: Vec::new(),
                message: "Add some movies to your collection to get personalized recommendations"
                    .to_string(),
            };
        }

        let histogram = genre_histogram(collection);
        let top = top_genres(&histogram, TOP_GENRE_COUNT);

        let owned: HashSet<i64> = collection.iter().filter_map(|item| item.tmdb_id).collect();
        let mut staged: HashSet<i64> = HashSet::new();
        let mut recommendations: Vec<Recommendation> = Vec::new();

        'genres: for (genre, _count) in &top {
            let Some(genre_id) = tmdb_genre_id(genre) else {
                continue;
            };

            let movies = self
                .catalog
                .discover_movies_by_genre(genre_id, 1)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(genre = %genre, error = %e, "Movie discovery failed");
                    Vec::new()
                });
            let shows = self
                .catalog
                .discover_shows_by_genre(genre_id, 1)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(genre = %genre, error = %e, "Show discovery failed");
                    Vec::new()
                });

            for entry in movies.into_iter().chain(shows) {
                if owned.contains(&entry.id) || !staged.insert(entry.id) {
                    continue;
                }

                let recommendation_reason = format!("Popular {} {}", genre, entry.media_type);
                recommendations.push(Recommendation {
                    entry,
                    recommendation_reason,
                });

                if recommendations.len() >= max_results {
                    break 'genres;
                }
            }
        }

        if recommendations.len() < max_results {
            self.pad_with_acclaimed(&owned, &mut staged, &mut recommendations, max_results)
                .await;
        }

        let message = format!(
            "Found {} recommendations based on your favorite genres",
            recommendations.len()
        );

        RecommendationSet {
            recommendations,
            based_on: based_on(&histogram),
            message,
        }
    }

    /// Fills remaining slots from the critically-acclaimed fallback list
    async fn pad_with_acclaimed(
        &self,
        owned: &HashSet<i64>,
        staged: &mut HashSet<i64>,
        recommendations: &mut Vec<Recommendation>,
        max_results: usize,
    ) {
        let remaining = max_results - recommendations.len();
        let acclaimed = self
            .catalog
            .highly_rated_movies(remaining)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Acclaimed fallback fetch failed");
                Vec::new()
            });

        for entry in acclaimed {
            if owned.contains(&entry.id) || !staged.insert(entry.id) {
                continue;
            }

            recommendations.push(Recommendation {
                entry,
                recommendation_reason: "Critically acclaimed".to_string(),
            });

            if recommendations.len() >= max_results {
                break;
            }
        }
    }
}

/// Counts genre occurrences across the collection.
///
/// Each item contributes once per genre token; nothing is normalized per
/// item. Empty tokens and the "Not specified" placeholder are skipped.
pub fn genre_histogram(collection: &[MediaItem]) -> HashMap<String, usize> {
    let mut histogram = HashMap::new();

    for item in collection {
        if item.genre.is_empty() || item.genre == "Not specified" {
            continue;
        }
        for token in item.genre.split(',') {
            let genre = token.trim();
            if genre.is_empty() {
                continue;
            }
            *histogram.entry(genre.to_string()).or_insert(0) += 1;
        }
    }

    histogram
}

/// Top `n` genres by descending count; ties land in arbitrary order
pub fn top_genres(histogram: &HashMap<String, usize>, n: usize) -> Vec<(String, usize)> {
    let mut genres: Vec<(String, usize)> = histogram
        .iter()
        .map(|(genre, count)| (genre.clone(), *count))
        .collect();
    genres.sort_by(|a, b| b.1.cmp(&a.1));
    genres.truncate(n);
    genres
}

/// Summarizes the top 1–2 genres driving the recommendations
fn based_on(histogram: &HashMap<String, usize>) -> Vec<String> {
    let top = top_genres(histogram, BASED_ON_GENRE_COUNT);

    let reasons: Vec<String> = top
        .iter()
        .map(|(genre, count)| {
            if *count == 1 {
                format!("Your interest in {}", genre)
            } else {
                format!("Your {} {} movies", count, genre)
            }
        })
        .collect();

    if reasons.is_empty() {
        vec!["Your movie collection preferences".to_string()]
    } else {
        reasons
    }
}
