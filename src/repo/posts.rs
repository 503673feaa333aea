use rusqlite::{params, OptionalExtension, Row};

use crate::db::models::{Post, PostView, PublicUser};
use crate::error::{AppError, AppResult};
use crate::repo::page_offset;
use crate::state::DbPool;

/// What to do with a post's image on update. The client signals removal
/// with an empty `img_path` field; leaving both fields off the form means
/// "keep whatever is there".
#[derive(Debug, Clone, PartialEq)]
pub enum ImageChange {
    Keep,
    Remove,
    Replace(String),
}

const VIEW_SELECT: &str = "
    SELECT p.id, p.user_id, p.title, p.body, p.img_path, p.shared_post_id,
           p.created_at, p.updated_at,
           u.username, u.avatar_url,
           (SELECT COUNT(*) FROM likes l
             WHERE l.post_id = p.id AND l.deleted_at IS NULL) AS like_count,
           (SELECT COUNT(*) FROM comments c
             WHERE c.post_id = p.id AND c.deleted_at IS NULL) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.user_id";

#[derive(Clone)]
pub struct PostRepo {
    pool: DbPool,
}

impl PostRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// The landing feed: newest first. Page 1 replaces the client's list,
    /// later pages append, so ordering must be stable across pages.
    pub fn fetch_page(&self, page: u32, per_page: u32) -> AppResult<Vec<PostView>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{VIEW_SELECT}
             WHERE p.deleted_at IS NULL
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
            .query_map(params![per_page, page_offset(page, per_page)], row_to_view)?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    pub fn fetch_by_user(
        &self,
        username: &str,
        page: u32,
        per_page: u32,
    ) -> AppResult<Vec<PostView>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{VIEW_SELECT}
             WHERE p.deleted_at IS NULL AND u.username = ?1 AND u.deleted_at IS NULL
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
            .query_map(
                params![username, per_page, page_offset(page, per_page)],
                row_to_view,
            )?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    pub fn fetch_by_id(&self, id: i64) -> AppResult<PostView> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("{VIEW_SELECT} WHERE p.id = ?1 AND p.deleted_at IS NULL"),
            params![id],
            row_to_view,
        )
        .optional()?
        .ok_or(AppError::NotFound)
    }

    pub fn create(
        &self,
        user_id: i64,
        title: &str,
        body: &str,
        img_path: Option<&str>,
    ) -> AppResult<i64> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO posts (user_id, title, body, img_path) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, title, body, img_path],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Updates title/body and applies the image change. Only the author's
    /// own live post matches; anything else is NotFound.
    pub fn update(
        &self,
        id: i64,
        user_id: i64,
        title: &str,
        body: &str,
        image: ImageChange,
    ) -> AppResult<()> {
        let conn = self.pool.get()?;
        let rows = match &image {
            ImageChange::Keep => conn.execute(
                "UPDATE posts SET title = ?1, body = ?2, updated_at = datetime('now')
                 WHERE id = ?3 AND user_id = ?4 AND deleted_at IS NULL",
                params![title, body, id, user_id],
            )?,
            ImageChange::Remove => conn.execute(
                "UPDATE posts SET title = ?1, body = ?2, img_path = NULL,
                        updated_at = datetime('now')
                 WHERE id = ?3 AND user_id = ?4 AND deleted_at IS NULL",
                params![title, body, id, user_id],
            )?,
            ImageChange::Replace(path) => conn.execute(
                "UPDATE posts SET title = ?1, body = ?2, img_path = ?3,
                        updated_at = datetime('now')
                 WHERE id = ?4 AND user_id = ?5 AND deleted_at IS NULL",
                params![title, body, path, id, user_id],
            )?,
        };
        if rows == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    pub fn delete(&self, id: i64, user_id: i64) -> AppResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE posts SET deleted_at = datetime('now')
             WHERE id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
            params![id, user_id],
        )?;
        if rows == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Substring search over title and body, paginated like the feed. A
    /// query matching nothing returns an empty page, not an error; LIKE
    /// wildcards in the query are treated as literal text.
    pub fn search(&self, query: &str, page: u32, per_page: u32) -> AppResult<Vec<PostView>> {
        let pattern = format!(
            "%{}%",
            query
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_")
        );
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{VIEW_SELECT}
             WHERE p.deleted_at IS NULL
               AND (p.title LIKE ?1 ESCAPE '\\' OR p.body LIKE ?1 ESCAPE '\\')
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
            .query_map(
                params![pattern, per_page, page_offset(page, per_page)],
                row_to_view,
            )?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// A share is a fresh post carrying its own body and a pointer back to
    /// the original.
    pub fn share(&self, original_id: i64, user_id: i64, body: &str) -> AppResult<i64> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1 AND deleted_at IS NULL",
            params![original_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(AppError::NotFound);
        }
        conn.execute(
            "INSERT INTO posts (user_id, title, body, shared_post_id)
             VALUES (?1, '', ?2, ?3)",
            params![user_id, body, original_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Author lookup, used when deciding whether a like should notify.
    pub fn owner_of(&self, post_id: i64) -> AppResult<i64> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT user_id FROM posts WHERE id = ?1 AND deleted_at IS NULL",
            params![post_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(AppError::NotFound)
    }
}

fn row_to_view(row: &Row) -> rusqlite::Result<PostView> {
    Ok(PostView {
        post: Post {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            body: row.get(3)?,
            img_path: row.get(4)?,
            shared_post_id: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        },
        user: PublicUser {
            username: row.get(8)?,
            avatar_url: row.get(9)?,
        },
        like_count: row.get(10)?,
        comment_count: row.get(11)?,
    })
}
