/// AI review generation with a templated fallback
///
/// The generation collaborator sits behind [`ReviewProvider`]; the shipped
/// implementation targets the AI21 completion API. [`ReviewService`] wraps a
/// provider and guarantees prose comes back even when the provider is
/// unconfigured, errors, times out, or returns an empty payload: those all
/// degrade to the rating-tiered, notes-aware template fallback.
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::Ai21Response,
};

const REVIEW_TIMEOUT: Duration = Duration::from_secs(30);
const AI21_MODEL: &str = "j2-ultra";

/// Requested review length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl ReviewLength {
    fn max_tokens(self) -> u32 {
        match self {
            ReviewLength::Short => 100,
            ReviewLength::Medium => 200,
            ReviewLength::Long => 300,
        }
    }
}

/// Everything a provider needs to write one review
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub title: String,
    pub notes: String,
    pub rating: Option<f64>,
    pub length: ReviewLength,
}

/// Trait for review-generation providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ReviewProvider: Send + Sync {
    /// Whether the provider has credentials and can be called at all
    fn is_configured(&self) -> bool;

    /// Generate review prose for the request
    async fn generate(&self, request: &ReviewRequest) -> AppResult<String>;
}

// ============================================================================
// AI21 provider
// ============================================================================

/// Sentiment phrasing for the nearest rating tier, folded into the prompt
const RATING_SENTIMENTS: &[(f64, &str)] = &[
    (9.0, "an outstanding masterpiece that exceeds expectations"),
    (8.0, "an excellent film with remarkable qualities"),
    (7.0, "a very good movie with strong elements"),
    (6.0, "a decent film with some notable aspects"),
    (5.0, "a mediocre film with mixed qualities"),
    (4.0, "a below-average film with significant flaws"),
    (3.0, "a poor film with major issues"),
    (2.0, "a very disappointing film"),
    (1.0, "an exceptionally bad film"),
];

pub struct Ai21Provider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
}

impl Ai21Provider {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(REVIEW_TIMEOUT).build()?;

        if config.ai21_api_key.is_none() {
            tracing::warn!("No AI21 API key configured; reviews fall back to templates");
        }

        Ok(Self {
            http_client,
            api_key: config.ai21_api_key.clone(),
            api_url: config.ai21_api_url.clone(),
        })
    }

    fn build_prompt(request: &ReviewRequest) -> String {
        let mut parts: Vec<String> = Vec::new();

        parts.push(match request.length {
            ReviewLength::Short => {
                "Write a very short and concise film review (2-3 sentences maximum). \
                 Focus only on the most important aspects and be direct."
                    .to_string()
            }
            ReviewLength::Medium => {
                "Write a standard length film review (4-6 sentences). Provide balanced \
                 analysis of key elements while maintaining readability."
                    .to_string()
            }
            ReviewLength::Long => {
                "Write a detailed, comprehensive film review exploring narrative \
                 structure, character development, and technical execution in depth."
                    .to_string()
            }
        });

        parts.push(format!("Review the film: '{}'.", request.title));

        if let Some(rating) = request.rating {
            let sentiment = RATING_SENTIMENTS
                .iter()
                .min_by(|a, b| {
                    (a.0 - rating)
                        .abs()
                        .partial_cmp(&(b.0 - rating).abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(_, phrase)| *phrase)
                .unwrap_or("a film");
            parts.push(format!(
                "The review should reflect that this is {} (rated {}/10).",
                sentiment, rating
            ));
        }

        if !request.notes.trim().is_empty() {
            parts.push(format!(
                "Focus your analysis on these aspects: {}",
                request.notes
            ));
            parts.push(
                "Integrate these points naturally into your review without using phrases \
                 like 'Additional notes' or 'Viewer observations'."
                    .to_string(),
            );
        }

        parts.push("Write in a professional critic's voice.".to_string());
        parts.push("Avoid spoilers and focus on the overall viewing experience.".to_string());
        parts.push("Do not include rating numbers or score lines in the text.".to_string());

        parts.join("\n")
    }
}

#[async_trait::async_trait]
impl ReviewProvider for Ai21Provider {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &ReviewRequest) -> AppResult<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| AppError::Upstream("AI21 API key not configured".to_string()))?;

        let prompt = Self::build_prompt(request);
        let payload = serde_json::json!({
            "prompt": prompt,
            "numResults": 1,
            "maxTokens": request.length.max_tokens(),
            "temperature": 0.7,
            "topP": 1,
            "stopSequences": ["\n\n", "Review:", "Rating:"],
        });

        tracing::debug!(title = %request.title, length = ?request.length, "Requesting AI21 review");

        let response = self
            .http_client
            .post(format!("{}/{}/complete", self.api_url, AI21_MODEL))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "AI21 request failed");
            return Err(AppError::Upstream(format!(
                "AI21 returned status {}: {}",
                status, body
            )));
        }

        let body: Ai21Response = response.json().await?;
        let text = body
            .completions
            .first()
            .map(|c| c.data.text.as_str())
            .unwrap_or_default();

        let cleaned = clean_completion(text);
        if cleaned.is_empty() {
            return Err(AppError::Upstream("AI21 returned an empty completion".to_string()));
        }

        Ok(cleaned)
    }
}

/// Normalizes raw completion text into presentable prose.
///
/// Truncates any trailing sentence fragment, drops rating/score lines and
/// note-appendage sections the model sometimes emits, strips a leading
/// "Review:" label, and capitalizes the first character.
pub fn clean_completion(text: &str) -> String {
    let mut text = text.trim().to_string();

    if let Some(last) = text.chars().last() {
        if !matches!(last, '.' | '!' | '?') {
            if let Some(cut) = text.rfind(['.', '!', '?']) {
                text.truncate(cut + 1);
            }
        }
    }

    let lines: Vec<&str> = text
        .lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            !["rating:", "score:", "/10", "/5"]
                .iter()
                .any(|marker| lower.contains(marker))
        })
        .collect();
    let mut text = lines.join("\n").trim().to_string();

    for prefix in ["the review:", "review:"] {
        if text.to_lowercase().starts_with(prefix) {
            text = text[prefix.len()..].trim().to_string();
            break;
        }
    }

    for appendage in ["Additional notes:", "Viewer observations:"] {
        if let Some(position) = text.find(appendage) {
            text.truncate(position);
            text = text.trim().to_string();
        }
    }

    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => text,
    }
}

// ============================================================================
// Template fallback
// ============================================================================

const SHORT_TEMPLATES: &[&str] = &[
    "A compelling {content_type} that delivers strong performances and engaging \
     storytelling. The narrative flows smoothly with well-executed technical \
     elements.{notes}",
    "This {content_type} showcases remarkable craftsmanship with memorable moments \
     throughout. Character development and visual execution stand out as \
     particular strengths.{notes}",
    "With its thoughtful approach to storytelling and solid technical execution, \
     this {content_type} offers a satisfying experience.{notes}",
];

const MEDIUM_TEMPLATES: &[&str] = &[
    "This {content_type} demonstrates exceptional craftsmanship in both \
     storytelling and technical execution. The narrative unfolds with precision, \
     keeping viewers engaged from start to finish.{notes} Character development is \
     particularly noteworthy, with performances that bring depth and authenticity \
     to the story.",
    "A masterful blend of compelling narrative and artistic expression, this \
     {content_type} stands as a significant achievement.{notes} The pacing is \
     expertly handled, allowing both dramatic moments and character interactions \
     to shine.",
    "With its solid approach to storytelling and careful attention to detail, \
     this {content_type} delivers an experience that is both engaging and \
     satisfying.{notes} The ensemble cast turns in consistently enjoyable \
     performances.",
];

const LONG_TEMPLATES: &[&str] = &[
    "This {content_type} represents a remarkable achievement, showcasing a level \
     of craftsmanship that elevates it above typical genre offerings. The \
     narrative structure is meticulously constructed, with each scene serving a \
     distinct purpose in advancing both plot and character development. \
     Performances across the board are strong, with each actor bringing depth and \
     authenticity to their role. Technical elements including cinematography, \
     sound design, and editing work in harmony to create an immersive viewing \
     experience.{notes} The result balances entertainment value with artistic \
     ambition and resonates well after viewing.",
    "From its opening moments, this {content_type} establishes itself as a work \
     of considerable merit and technical proficiency. The storytelling \
     demonstrates a confident understanding of narrative rhythm, knowing when to \
     accelerate tension and when to let character moments breathe. Visual \
     composition throughout is striking yet purposeful, and character arcs are \
     developed with satisfying subtlety and psychological insight.{notes} Its \
     exploration of the central ideas is both rigorous and emotionally resonant, \
     inviting multiple readings while maintaining coherence.",
];

/// Produces a templated review when the provider cannot.
///
/// Templates are selected by requested length, then narrowed by rating tier;
/// an empty tier falls back to the first template of the length set. Notes
/// are folded in as a praise clause.
pub fn fallback_review(request: &ReviewRequest) -> String {
    let templates: &[&str] = match request.length {
        ReviewLength::Short => SHORT_TEMPLATES,
        ReviewLength::Medium => MEDIUM_TEMPLATES,
        ReviewLength::Long => LONG_TEMPLATES,
    };

    let tier_markers: Option<&[&str]> = match request.rating {
        Some(r) if r >= 8.0 => Some(&["exceptional", "masterful", "remarkable"]),
        Some(r) if r >= 6.0 => Some(&["solid", "satisfying", "enjoyable"]),
        Some(_) => Some(&["ambition", "uneven", "flaws"]),
        None => None,
    };

    let candidates: Vec<&&str> = match tier_markers {
        Some(markers) => templates
            .iter()
            .filter(|t| {
                let lower = t.to_lowercase();
                markers.iter().any(|m| lower.contains(m))
            })
            .collect(),
        None => templates.iter().collect(),
    };

    let template = candidates
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(&templates[0]);

    let content_type = if request.title.to_lowercase().contains("season")
        || request.title.to_lowercase().contains("episode")
    {
        "series"
    } else {
        "film"
    };

    let notes = request.notes.trim();
    let notes_clause = if notes.is_empty() {
        String::new()
    } else {
        format!(
            " The {} particularly shines in {}.",
            content_type,
            notes.to_lowercase()
        )
    };

    template
        .replace("{content_type}", content_type)
        .replace("{notes}", &notes_clause)
}

// ============================================================================
// Service
// ============================================================================

/// Review generation facade handed to request handlers
pub struct ReviewService {
    provider: Arc<dyn ReviewProvider>,
}

impl ReviewService {
    pub fn new(provider: Arc<dyn ReviewProvider>) -> Self {
        Self { provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    /// Generates review prose, always returning something usable
    pub async fn generate(&self, request: &ReviewRequest) -> String {
        if !self.provider.is_configured() {
            tracing::info!(title = %request.title, "Review provider unconfigured, using fallback");
            return fallback_review(request);
        }

        match self.provider.generate(request).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!(title = %request.title, "Empty review payload, using fallback");
                fallback_review(request)
            }
            Err(e) => {
                tracing::warn!(title = %request.title, error = %e, "Review generation failed, using fallback");
                fallback_review(request)
            }
        }
    }
}
