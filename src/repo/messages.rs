use rusqlite::params;

use crate::db::models::{ChatMessage, ChatPeer, PublicUser};
use crate::error::{field_error, AppError, AppResult};
use crate::repo::page_offset;
use crate::state::DbPool;

/// Chat is plain request/response CRUD: send inserts a row, the thread is
/// whatever the table holds, ordered by insertion id. No delivery
/// acknowledgment, no read receipts.
#[derive(Clone)]
pub struct MessageRepo {
    pool: DbPool,
}

impl MessageRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Chat-eligible peers: every activated user except the requester,
    /// newest account first, paginated like the user listings.
    pub fn fetch_peers(&self, user_id: i64, page: u32, per_page: u32) -> AppResult<Vec<ChatPeer>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, avatar_url FROM users
             WHERE is_activated = 1 AND id != ?1 AND deleted_at IS NULL
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
            .query_map(
                params![user_id, per_page, page_offset(page, per_page)],
                |row| {
                    Ok(ChatPeer {
                        user_id: row.get(0)?,
                        user: PublicUser {
                            username: row.get(1)?,
                            avatar_url: row.get(2)?,
                        },
                    })
                },
            )?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Both directions of a conversation, in insertion order.
    pub fn fetch_thread(&self, user_id: i64, peer_id: i64) -> AppResult<Vec<ChatMessage>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, receiver_id, message, created_at
             FROM messages
             WHERE (user_id = ?1 AND receiver_id = ?2)
                OR (user_id = ?2 AND receiver_id = ?1)
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![user_id, peer_id], row_to_message)?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    pub fn send(&self, user_id: i64, receiver_id: i64, message: &str) -> AppResult<ChatMessage> {
        if message.trim().is_empty() {
            return Err(field_error("message", "Message is required"));
        }
        let conn = self.pool.get()?;
        let receiver_exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE id = ?1 AND deleted_at IS NULL",
            params![receiver_id],
            |row| row.get(0),
        )?;
        if !receiver_exists {
            return Err(AppError::Conflict(format!(
                "user {} does not exist",
                receiver_id
            )));
        }

        conn.execute(
            "INSERT INTO messages (user_id, receiver_id, message) VALUES (?1, ?2, ?3)",
            params![user_id, receiver_id, message],
        )?;
        let id = conn.last_insert_rowid();
        let sent = conn.query_row(
            "SELECT id, user_id, receiver_id, message, created_at
             FROM messages WHERE id = ?1",
            params![id],
            row_to_message,
        )?;
        Ok(sent)
    }
}

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        user_id: row.get(1)?,
        receiver_id: row.get(2)?,
        message: row.get(3)?,
        created_at: row.get(4)?,
    })
}
