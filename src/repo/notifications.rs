use rusqlite::params;

use crate::db::models::{Notification, PublicUser};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

#[derive(Clone)]
pub struct NotificationRepo {
    pool: DbPool,
}

impl NotificationRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn create(
        &self,
        recipient_id: i64,
        actor_id: i64,
        post_id: Option<i64>,
        message: &str,
        link: &str,
        kind: &str,
    ) -> AppResult<i64> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO notifications (recipient_id, actor_id, post_id, message, link, type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![recipient_id, actor_id, post_id, message, link, kind],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Unread notifications for a recipient, oldest first, with the acting
    /// user's name and avatar joined in. The query is re-issued on every
    /// call; nothing is consumed by reading it.
    pub fn fetch_unread(&self, recipient_id: i64) -> AppResult<Vec<Notification>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT n.id, n.message, n.actor_id, u.username, u.avatar_url,
                    n.post_id, n.link, n.type
             FROM notifications n
             JOIN users u ON u.id = n.actor_id
             WHERE n.recipient_id = ?1 AND n.is_read = 0
             ORDER BY n.id",
        )?;
        let rows = stmt
            .query_map(params![recipient_id], |row| {
                Ok(Notification {
                    id: row.get(0)?,
                    message: row.get(1)?,
                    user_id: row.get(2)?,
                    user: PublicUser {
                        username: row.get(3)?,
                        avatar_url: row.get(4)?,
                    },
                    post_id: row.get(5)?,
                    link: row.get(6)?,
                    kind: row.get(7)?,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Marks one of the recipient's notifications read.
    pub fn mark_read(&self, id: i64, recipient_id: i64) -> AppResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE notifications SET is_read = 1
             WHERE id = ?1 AND recipient_id = ?2",
            params![id, recipient_id],
        )?;
        if rows == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
