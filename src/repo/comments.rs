use rusqlite::params;

use crate::db::models::{Comment, PublicUser};
use crate::error::{field_error, AppError, AppResult};
use crate::repo::page_offset;
use crate::state::DbPool;

#[derive(Clone)]
pub struct CommentRepo {
    pool: DbPool,
}

impl CommentRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Comments on a post, oldest first, paginated.
    pub fn fetch_by_post(
        &self,
        post_id: i64,
        page: u32,
        per_page: u32,
    ) -> AppResult<Vec<Comment>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.post_id, c.user_id, c.body, c.created_at,
                    u.username, u.avatar_url
             FROM comments c
             JOIN users u ON u.id = c.user_id
             WHERE c.post_id = ?1 AND c.deleted_at IS NULL
             ORDER BY c.id
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
            .query_map(
                params![post_id, per_page, page_offset(page, per_page)],
                |row| {
                    Ok(Comment {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        user_id: row.get(2)?,
                        body: row.get(3)?,
                        created_at: row.get(4)?,
                        user: PublicUser {
                            username: row.get(5)?,
                            avatar_url: row.get(6)?,
                        },
                    })
                },
            )?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    pub fn count_by_post(&self, post_id: i64) -> AppResult<i64> {
        let conn = self.pool.get()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE post_id = ?1 AND deleted_at IS NULL",
            params![post_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn add(&self, post_id: i64, user_id: i64, body: &str) -> AppResult<i64> {
        if body.trim().is_empty() {
            return Err(field_error("body", "Comment is required"));
        }
        let conn = self.pool.get()?;
        let post_exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1 AND deleted_at IS NULL",
            params![post_id],
            |row| row.get(0),
        )?;
        if !post_exists {
            return Err(AppError::NotFound);
        }
        conn.execute(
            "INSERT INTO comments (post_id, user_id, body) VALUES (?1, ?2, ?3)",
            params![post_id, user_id, body],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Soft delete, authors only.
    pub fn delete(&self, id: i64, user_id: i64) -> AppResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE comments SET deleted_at = datetime('now')
             WHERE id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
            params![id, user_id],
        )?;
        if rows == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::testutil::{seed_post, seed_user, test_pool};

    fn setup() -> (CommentRepo, i64, i64, i64) {
        let pool = test_pool();
        let author = seed_user(&pool, "authoruser");
        let commenter = seed_user(&pool, "commentator");
        let post = seed_post(&pool, author, "a post");
        (CommentRepo::new(pool), post, author, commenter)
    }

    #[test]
    fn add_and_list_oldest_first() {
        let (repo, post, _author, commenter) = setup();
        repo.add(post, commenter, "first").unwrap();
        repo.add(post, commenter, "second").unwrap();

        let comments = repo.fetch_by_post(post, 1, 10).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].body, "first");
        assert_eq!(comments[1].body, "second");
        assert_eq!(comments[0].user.username, "commentator");
    }

    #[test]
    fn pagination_slices_the_thread() {
        let (repo, post, _author, commenter) = setup();
        for i in 0..5 {
            repo.add(post, commenter, &format!("c{}", i)).unwrap();
        }
        let page2 = repo.fetch_by_post(post, 2, 2).unwrap();
        assert_eq!(page2.len(), 2);
        assert_eq!(page2[0].body, "c2");
    }

    #[test]
    fn count_ignores_deleted_comments() {
        let (repo, post, _author, commenter) = setup();
        let keep = repo.add(post, commenter, "keep").unwrap();
        let gone = repo.add(post, commenter, "gone").unwrap();
        assert_eq!(repo.count_by_post(post).unwrap(), 2);

        repo.delete(gone, commenter).unwrap();
        assert_eq!(repo.count_by_post(post).unwrap(), 1);
        let remaining = repo.fetch_by_post(post, 1, 10).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep);
    }

    #[test]
    fn empty_body_is_a_field_error() {
        let (repo, post, _author, commenter) = setup();
        assert!(matches!(
            repo.add(post, commenter, "   ").unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[test]
    fn commenting_on_missing_post_is_not_found() {
        let (repo, _post, _author, commenter) = setup();
        assert!(matches!(
            repo.add(9999, commenter, "hello").unwrap_err(),
            AppError::NotFound
        ));
    }

    #[test]
    fn only_the_author_may_delete() {
        let (repo, post, author, commenter) = setup();
        let id = repo.add(post, commenter, "mine").unwrap();
        assert!(matches!(
            repo.delete(id, author).unwrap_err(),
            AppError::NotFound
        ));
        repo.delete(id, commenter).unwrap();
    }
}
