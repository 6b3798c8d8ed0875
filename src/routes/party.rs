use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{
    error::AppResult,
    models::{MediaItem, PartyMember, PartyRoom, SyncAction},
    services::party::{PlaybackAck, RoomDraft},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub media_id: i64,
    pub media_title: String,
    #[serde(default)]
    pub media_poster: Option<String>,
    pub host_id: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub room_code: String,
    pub user_id: String,
    pub user_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LeaveRoomRequest {
    pub room_code: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct EndRoomRequest {
    pub room_code: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub room_code: String,
    pub action: SyncAction,
    pub timestamp_ms: i64,
}

#[derive(Debug, Deserialize)]
pub struct StartRoomRequest {
    pub room_code: String,
}

/// Lightweight view of the media item a room references
#[derive(Debug, Serialize)]
pub struct MediaRef {
    pub id: i64,
    pub title: String,
    pub poster_path: Option<String>,
    pub is_tv_show: bool,
    pub overview: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RoomDetailsResponse {
    pub room: PartyRoom,
    pub media: Option<MediaRef>,
}

#[derive(Debug, Serialize)]
pub struct LeaveRoomResponse {
    pub message: String,
    pub room_ended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<PartyMember>>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: String,
    #[serde(flatten)]
    pub ack: PlaybackAck,
}

#[derive(Debug, Serialize)]
pub struct StartRoomResponse {
    pub message: String,
    pub room_code: String,
    pub media_title: String,
    pub started_at: DateTime<Utc>,
}

/// Handler for creating a party room
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateRoomRequest>,
) -> AppResult<(StatusCode, Json<PartyRoom>)> {
    let room = state
        .party
        .create_room(RoomDraft {
            media_id: request.media_id,
            media_title: request.media_title,
            media_poster: request.media_poster,
            host_id: request.host_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(room)))
}

/// Handler for joining a room by code
pub async fn join(
    State(state): State<AppState>,
    Json(request): Json<JoinRoomRequest>,
) -> AppResult<Json<RoomDetailsResponse>> {
    let room = state
        .party
        .join_room(&request.room_code, &request.user_id, &request.user_name)
        .await?;

    let media = media_ref(&state.db, room.media_id).await;
    Ok(Json(RoomDetailsResponse { room, media }))
}

/// Handler for leaving a room
pub async fn leave(
    State(state): State<AppState>,
    Json(request): Json<LeaveRoomRequest>,
) -> AppResult<Json<LeaveRoomResponse>> {
    let room = state
        .party
        .leave_room(&request.room_code, &request.user_id)
        .await?;

    let response = if room.is_active {
        LeaveRoomResponse {
            message: "Left party room successfully".to_string(),
            room_ended: false,
            members: Some(room.members),
        }
    } else {
        LeaveRoomResponse {
            message: "Party room ended (host left)".to_string(),
            room_ended: true,
            members: None,
        }
    };

    Ok(Json(response))
}

/// Handler for ending a room
pub async fn end(
    State(state): State<AppState>,
    Json(request): Json<EndRoomRequest>,
) -> AppResult<Json<Value>> {
    state.party.end_room(&request.room_code).await?;
    Ok(Json(json!({ "message": "Party room ended successfully" })))
}

/// Handler for fetching an active room
pub async fn get_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<RoomDetailsResponse>> {
    let room = state.party.get_room(&code).await?;
    let media = media_ref(&state.db, room.media_id).await;
    Ok(Json(RoomDetailsResponse { room, media }))
}

/// Handler for playback sync events
pub async fn sync(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> AppResult<Json<SyncResponse>> {
    let ack = state
        .party
        .sync_playback(&request.room_code, request.action, request.timestamp_ms)
        .await?;

    Ok(Json(SyncResponse {
        message: "Playback synced".to_string(),
        ack,
    }))
}

/// Handler for starting a watching session
pub async fn start(
    State(state): State<AppState>,
    Json(request): Json<StartRoomRequest>,
) -> AppResult<Json<StartRoomResponse>> {
    let room = state.party.start_room(&request.room_code).await?;

    Ok(Json(StartRoomResponse {
        message: "Party watching session started".to_string(),
        room_code: room.code,
        media_title: room.media_title,
        started_at: Utc::now(),
    }))
}

/// Best-effort lookup of the referenced media item; rooms outlive deletions
async fn media_ref(pool: &SqlitePool, media_id: i64) -> Option<MediaRef> {
    sqlx::query_as::<_, MediaItem>("SELECT * FROM media_items WHERE id = ?")
        .bind(media_id)
        .fetch_optional(pool)
        .await
        .ok()
        .flatten()
        .map(|item| MediaRef {
            id: item.id,
            title: item.title,
            poster_path: item.poster_path,
            is_tv_show: item.is_tv_show,
            overview: item.overview,
        })
}
