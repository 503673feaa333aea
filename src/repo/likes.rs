use rusqlite::params;

use crate::db::models::{Like, PublicUser};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Result of a like toggle: the caller's new state plus the post's live
/// count, enough for the client to update in place.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Clone)]
pub struct LikeRepo {
    pool: DbPool,
}

impl LikeRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Likes the post if the user hasn't, unlikes it if they have. The
    /// `(post_id, user_id)` unique key resolves concurrent toggles.
    pub fn toggle(&self, post_id: i64, user_id: i64) -> AppResult<LikeToggle> {
        let conn = self.pool.get()?;
        let post_exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1 AND deleted_at IS NULL",
            params![post_id],
            |row| row.get(0),
        )?;
        if !post_exists {
            return Err(AppError::NotFound);
        }

        let currently_liked: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM likes
             WHERE post_id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
            params![post_id, user_id],
            |row| row.get(0),
        )?;

        if currently_liked {
            conn.execute(
                "UPDATE likes SET deleted_at = datetime('now')
                 WHERE post_id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
                params![post_id, user_id],
            )?;
        } else {
            conn.execute(
                "INSERT INTO likes (post_id, user_id)
                 VALUES (?1, ?2)
                 ON CONFLICT(post_id, user_id) DO UPDATE SET deleted_at = NULL",
                params![post_id, user_id],
            )?;
        }

        let like_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM likes WHERE post_id = ?1 AND deleted_at IS NULL",
            params![post_id],
            |row| row.get(0),
        )?;
        Ok(LikeToggle {
            liked: !currently_liked,
            like_count,
        })
    }

    pub fn fetch_by_post(&self, post_id: i64) -> AppResult<Vec<Like>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT l.id, l.post_id, l.user_id, u.username, u.avatar_url
             FROM likes l
             JOIN users u ON u.id = l.user_id
             WHERE l.post_id = ?1 AND l.deleted_at IS NULL
             ORDER BY l.id",
        )?;
        let rows = stmt
            .query_map(params![post_id], |row| {
                Ok(Like {
                    id: row.get(0)?,
                    post_id: row.get(1)?,
                    user_id: row.get(2)?,
                    user: PublicUser {
                        username: row.get(3)?,
                        avatar_url: row.get(4)?,
                    },
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }
}
