use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Average episode runtime used for watch-time estimates
pub const EPISODE_DURATION_MINUTES: i64 = 20;

/// Watch lifecycle of a tracked item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum WatchStatus {
    Wishlist,
    Watching,
    Completed,
}

impl Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchStatus::Wishlist => write!(f, "wishlist"),
            WatchStatus::Watching => write!(f, "watching"),
            WatchStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A tracked movie or show, as persisted
///
/// Episode and minute counters are NOT NULL with a zero default; a rating,
/// when present, has been validated into [0, 10] before it was stored.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MediaItem {
    pub id: i64,
    pub tmdb_id: Option<i64>,
    pub title: String,
    pub director: String,
    pub genre: String,
    pub platform: String,
    pub status: WatchStatus,
    pub rating: Option<f64>,
    pub review: Option<String>,
    pub episodes_watched: i64,
    pub total_episodes: Option<i64>,
    pub minutes_watched: i64,
    pub total_minutes: Option<i64>,
    pub is_tv_show: bool,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A catalog search/discovery result returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub id: i64,
    pub title: String,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub media_type: String,
    pub vote_average: Option<f64>,
    pub is_tv_show: bool,
    #[serde(default)]
    pub popularity: f64,
}

/// Full catalog details for a single title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogDetails {
    pub title: String,
    pub director: String,
    pub genre: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub total_episodes: Option<i64>,
    pub number_of_seasons: Option<i64>,
    pub total_minutes: Option<i64>,
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Raw TMDB list/search response envelope
#[derive(Debug, Deserialize)]
pub struct TmdbPage {
    #[serde(default)]
    pub results: Vec<TmdbListItem>,
}

/// One row of a TMDB search or discovery response
///
/// Movies carry `title`/`release_date`, shows carry `name`/`first_air_date`;
/// both shapes funnel through the same struct.
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbListItem {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub popularity: Option<f64>,
}

impl TmdbListItem {
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_default()
    }

    pub fn display_date(&self) -> Option<String> {
        self.release_date
            .clone()
            .or_else(|| self.first_air_date.clone())
    }
}

/// Raw TMDB details response for a single movie or show
#[derive(Debug, Deserialize)]
pub struct TmdbDetails {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub created_by: Vec<TmdbCreator>,
    #[serde(default)]
    pub runtime: Option<i64>,
    #[serde(default)]
    pub number_of_episodes: Option<i64>,
    #[serde(default)]
    pub number_of_seasons: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TmdbGenre {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TmdbCreator {
    pub name: String,
}

// ============================================================================
// AI21 API Types
// ============================================================================

/// AI21 completion response envelope
#[derive(Debug, Deserialize)]
pub struct Ai21Response {
    #[serde(default)]
    pub completions: Vec<Ai21Completion>,
}

#[derive(Debug, Deserialize)]
pub struct Ai21Completion {
    pub data: Ai21CompletionData,
}

#[derive(Debug, Deserialize)]
pub struct Ai21CompletionData {
    pub text: String,
}

// ============================================================================
// Party Room Types
// ============================================================================

/// One member of a party room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartyMember {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_host: bool,
    pub joined_at: DateTime<Utc>,
}

/// A party room with its membership list decoded
///
/// Rooms reference a media item by id but do not own it; deleting the item
/// leaves the room untouched.
#[derive(Debug, Clone, Serialize)]
pub struct PartyRoom {
    pub id: i64,
    pub code: String,
    pub media_id: i64,
    pub media_title: String,
    pub media_poster: Option<String>,
    pub host_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub members: Vec<PartyMember>,
}

/// A party room row as persisted, membership still JSON-encoded
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PartyRoomRow {
    pub id: i64,
    pub code: String,
    pub media_id: i64,
    pub media_title: String,
    pub media_poster: Option<String>,
    pub host_id: String,
    pub is_active: bool,
    pub members: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl PartyRoomRow {
    /// Decodes the membership list
    pub fn decode_members(&self) -> Result<Vec<PartyMember>, serde_json::Error> {
        serde_json::from_str(&self.members)
    }

    /// Converts the row into a client-facing room with the given membership
    pub fn into_room(self, members: Vec<PartyMember>) -> PartyRoom {
        PartyRoom {
            id: self.id,
            code: self.code,
            media_id: self.media_id,
            media_title: self.media_title,
            media_poster: self.media_poster,
            host_id: self.host_id,
            is_active: self.is_active,
            created_at: self.created_at,
            members,
        }
    }
}

/// Playback actions a room host or member can broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Play,
    Pause,
    Seek,
}

impl Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncAction::Play => write!(f, "play"),
            SyncAction::Pause => write!(f, "pause"),
            SyncAction::Seek => write!(f, "seek"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_status_serde_lowercase() {
        let json = serde_json::to_string(&WatchStatus::Wishlist).unwrap();
        assert_eq!(json, r#""wishlist""#);

        let parsed: WatchStatus = serde_json::from_str(r#""completed""#).unwrap();
        assert_eq!(parsed, WatchStatus::Completed);
    }

    #[test]
    fn test_tmdb_list_item_prefers_movie_fields() {
        let item: TmdbListItem = serde_json::from_str(
            r#"{
                "id": 603,
                "title": "The Matrix",
                "release_date": "1999-03-30",
                "media_type": "movie",
                "vote_average": 8.2
            }"#,
        )
        .unwrap();

        assert_eq!(item.display_title(), "The Matrix");
        assert_eq!(item.display_date(), Some("1999-03-30".to_string()));
    }

    #[test]
    fn test_tmdb_list_item_falls_back_to_tv_fields() {
        let item: TmdbListItem = serde_json::from_str(
            r#"{
                "id": 1396,
                "name": "Breaking Bad",
                "first_air_date": "2008-01-20",
                "media_type": "tv"
            }"#,
        )
        .unwrap();

        assert_eq!(item.display_title(), "Breaking Bad");
        assert_eq!(item.display_date(), Some("2008-01-20".to_string()));
    }

    #[test]
    fn test_party_member_roundtrip() {
        let member = PartyMember {
            id: "h1".to_string(),
            name: "Host".to_string(),
            is_host: true,
            joined_at: Utc::now(),
        };

        let json = serde_json::to_string(&vec![member.clone()]).unwrap();
        let decoded: Vec<PartyMember> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, vec![member]);
    }

    #[test]
    fn test_sync_action_serde() {
        let action: SyncAction = serde_json::from_str(r#""seek""#).unwrap();
        assert_eq!(action, SyncAction::Seek);
        assert_eq!(action.to_string(), "seek");
    }

    #[test]
    fn test_ai21_response_extracts_text() {
        let response: Ai21Response = serde_json::from_str(
            r#"{"completions": [{"data": {"text": "A fine film."}}]}"#,
        )
        .unwrap();
        assert_eq!(response.completions[0].data.text, "A fine film.");
    }
}
