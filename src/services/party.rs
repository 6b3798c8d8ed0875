/// Watch-party room lifecycle
///
/// Rooms live in the `party_rooms` table with their membership list stored as
/// a JSON column. A room is created by a host for exactly one media item,
/// members join and leave by code, and the host leaving (or an explicit end)
/// flips it inactive, a terminal state. Membership mutations go through an
/// optimistic version column with bounded retry, so two simultaneous joins
/// cannot silently drop each other's write.
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    error::{AppError, AppResult},
    models::{PartyMember, PartyRoom, PartyRoomRow, SyncAction},
};

pub const ROOM_CODE_LEN: usize = 6;
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Uniqueness is enforced by the DB constraint; collisions retry with a
/// fresh code
const MAX_CODE_ATTEMPTS: u32 = 5;
const MAX_UPDATE_RETRIES: u32 = 3;

const ROOM_COLUMNS: &str = "id, code, media_id, media_title, media_poster, host_id, \
                            is_active, members, version, created_at";

/// Input for creating a room
#[derive(Debug, Clone)]
pub struct RoomDraft {
    pub media_id: i64,
    pub media_title: String,
    pub media_poster: Option<String>,
    pub host_id: String,
}

/// Acknowledgment of a playback sync event
#[derive(Debug, Serialize)]
pub struct PlaybackAck {
    pub code: String,
    pub action: SyncAction,
    pub timestamp_ms: i64,
}

pub struct PartyRoomManager {
    pool: SqlitePool,
}

impl PartyRoomManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn generate_code() -> String {
        let mut rng = rand::thread_rng();
        (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect()
    }

    /// Creates a room with the host as its only member
    pub async fn create_room(&self, draft: RoomDraft) -> AppResult<PartyRoom> {
        let host = PartyMember {
            id: draft.host_id.clone(),
            name: "Host".to_string(),
            is_host: true,
            joined_at: Utc::now(),
        };
        let members = vec![host];
        let encoded = encode_members(&members)?;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = Self::generate_code();
            let result = sqlx::query(
                "INSERT INTO party_rooms \
                 (code, media_id, media_title, media_poster, host_id, is_active, members, version, created_at) \
                 VALUES (?, ?, ?, ?, ?, 1, ?, 0, ?)",
            )
            .bind(&code)
            .bind(draft.media_id)
            .bind(&draft.media_title)
            .bind(&draft.media_poster)
            .bind(&draft.host_id)
            .bind(&encoded)
            .bind(Utc::now())
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => {
                    tracing::info!(code = %code, media_id = draft.media_id, "Party room created");
                    let row = self.fetch_any(&code).await?;
                    let members = decode_members(&row)?;
                    return Ok(row.into_room(members));
                }
                Err(sqlx::Error::Database(db))
                    if db.kind() == sqlx::error::ErrorKind::UniqueViolation =>
                {
                    tracing::warn!(code = %code, "Room code collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal(
            "Unable to allocate a unique room code".to_string(),
        ))
    }

    /// Adds a non-host member to an active room
    pub async fn join_room(
        &self,
        code: &str,
        user_id: &str,
        user_name: &str,
    ) -> AppResult<PartyRoom> {
        for _ in 0..MAX_UPDATE_RETRIES {
            let row = self.fetch_active(code).await?;
            let mut members = decode_members(&row)?;

            if members.iter().any(|m| m.id == user_id) {
                return Err(AppError::AlreadyMember(
                    "User already in party room".to_string(),
                ));
            }

            members.push(PartyMember {
                id: user_id.to_string(),
                name: user_name.to_string(),
                is_host: false,
                joined_at: Utc::now(),
            });

            if self.try_replace_members(&row, &members).await? {
                tracing::info!(code = %code, user = %user_id, "Member joined party room");
                return Ok(row.into_room(members));
            }

            tracing::debug!(code = %code, "Membership update conflict, retrying");
        }

        Err(AppError::Internal(
            "Concurrent membership update conflict".to_string(),
        ))
    }

    /// Removes a member from an active room.
    ///
    /// The host leaving ends the room and freezes the membership list as-is;
    /// a regular member leaving is filtered out and the room stays active.
    pub async fn leave_room(&self, code: &str, user_id: &str) -> AppResult<PartyRoom> {
        for _ in 0..MAX_UPDATE_RETRIES {
            let row = self.fetch_active(code).await?;
            let members = decode_members(&row)?;

            if !members.iter().any(|m| m.id == user_id) {
                return Err(AppError::NotFound(
                    "User not found in party room".to_string(),
                ));
            }

            if user_id == row.host_id {
                let result = sqlx::query(
                    "UPDATE party_rooms SET is_active = 0, version = version + 1 \
                     WHERE code = ? AND version = ?",
                )
                .bind(&row.code)
                .bind(row.version)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 1 {
                    tracing::info!(code = %code, "Party room ended by host leaving");
                    let mut row = row;
                    row.is_active = false;
                    return Ok(row.into_room(members));
                }
            } else {
                let retained: Vec<PartyMember> =
                    members.into_iter().filter(|m| m.id != user_id).collect();

                if self.try_replace_members(&row, &retained).await? {
                    tracing::info!(code = %code, user = %user_id, "Member left party room");
                    return Ok(row.into_room(retained));
                }
            }

            tracing::debug!(code = %code, "Membership update conflict, retrying");
        }

        Err(AppError::Internal(
            "Concurrent membership update conflict".to_string(),
        ))
    }

    /// Deactivates a room regardless of its current state
    pub async fn end_room(&self, code: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE party_rooms SET is_active = 0, version = version + 1 WHERE code = ?",
        )
        .bind(code)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Party room not found".to_string()));
        }

        tracing::info!(code = %code, "Party room ended");
        Ok(())
    }

    /// Looks up an active room; inactive rooms are invisible here
    pub async fn get_room(&self, code: &str) -> AppResult<PartyRoom> {
        let row = self.fetch_active(code).await?;
        let members = decode_members(&row)?;
        Ok(row.into_room(members))
    }

    /// Records a playback event against an active room.
    ///
    /// The event is acknowledged and logged only; there is no fan-out
    /// transport to other members' clients.
    pub async fn sync_playback(
        &self,
        code: &str,
        action: SyncAction,
        timestamp_ms: i64,
    ) -> AppResult<PlaybackAck> {
        let row = self.fetch_active(code).await?;

        tracing::info!(
            code = %row.code,
            action = %action,
            timestamp_ms,
            "Playback sync event"
        );

        Ok(PlaybackAck {
            code: row.code,
            action,
            timestamp_ms,
        })
    }

    /// Acknowledges the start of a synchronized watching session
    pub async fn start_room(&self, code: &str) -> AppResult<PartyRoom> {
        let row = self.fetch_active(code).await?;
        let members = decode_members(&row)?;

        tracing::info!(code = %code, "Party watching session started");

        Ok(row.into_room(members))
    }

    async fn fetch_active(&self, code: &str) -> AppResult<PartyRoomRow> {
        sqlx::query_as::<_, PartyRoomRow>(&format!(
            "SELECT {} FROM party_rooms WHERE code = ? AND is_active = 1",
            ROOM_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Party room not found or inactive".to_string()))
    }

    async fn fetch_any(&self, code: &str) -> AppResult<PartyRoomRow> {
        sqlx::query_as::<_, PartyRoomRow>(&format!(
            "SELECT {} FROM party_rooms WHERE code = ?",
            ROOM_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Party room not found".to_string()))
    }

    /// Compare-and-swap of the membership list against the version column
    async fn try_replace_members(
        &self,
        row: &PartyRoomRow,
        members: &[PartyMember],
    ) -> AppResult<bool> {
        let encoded = encode_members(members)?;
        let result = sqlx::query(
            "UPDATE party_rooms SET members = ?, version = version + 1 \
             WHERE code = ? AND version = ? AND is_active = 1",
        )
        .bind(encoded)
        .bind(&row.code)
        .bind(row.version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn encode_members(members: &[PartyMember]) -> AppResult<String> {
    serde_json::to_string(members)
        .map_err(|e| AppError::Internal(format!("Member list serialization error: {}", e)))
}

fn decode_members(row: &PartyRoomRow) -> AppResult<Vec<PartyMember>> {
    row.decode_members()
        .map_err(|e| AppError::Internal(format!("Member list deserialization error: {}", e)))
}
