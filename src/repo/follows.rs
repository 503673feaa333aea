use rusqlite::params;

use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Follow edges are directional: `user_id` follows `following_id`.
/// "Followers" and "following" are the same table read from opposite
/// foreign keys.
#[derive(Clone)]
pub struct FollowRepo {
    pool: DbPool,
}

impl FollowRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn count_followers(&self, user_id: i64) -> AppResult<i64> {
        let conn = self.pool.get()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM followers WHERE following_id = ?1 AND deleted_at IS NULL",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_following(&self, user_id: i64) -> AppResult<i64> {
        let conn = self.pool.get()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM followers WHERE user_id = ?1 AND deleted_at IS NULL",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn is_following(&self, user_id: i64, following_id: i64) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let found = conn.query_row(
            "SELECT COUNT(*) > 0 FROM followers
             WHERE user_id = ?1 AND following_id = ?2 AND deleted_at IS NULL",
            params![user_id, following_id],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    /// Creates the edge, reviving a previously unfollowed one. Both ends
    /// must be live users; a dangling id is a referential conflict.
    pub fn follow(&self, user_id: i64, following_id: i64) -> AppResult<()> {
        if user_id == following_id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }
        let conn = self.pool.get()?;
        for id in [user_id, following_id] {
            let exists: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM users WHERE id = ?1 AND deleted_at IS NULL",
                params![id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(AppError::Conflict(format!("user {} does not exist", id)));
            }
        }

        conn.execute(
            "INSERT INTO followers (user_id, following_id)
             VALUES (?1, ?2)
             ON CONFLICT(user_id, following_id) DO UPDATE SET deleted_at = NULL",
            params![user_id, following_id],
        )?;
        Ok(())
    }

    /// Soft-deletes the edge. Returns false when there was nothing to
    /// unfollow.
    pub fn unfollow(&self, user_id: i64, following_id: i64) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE followers SET deleted_at = datetime('now')
             WHERE user_id = ?1 AND following_id = ?2 AND deleted_at IS NULL",
            params![user_id, following_id],
        )?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::testutil::{seed_user, test_pool};

    fn setup() -> (FollowRepo, i64, i64, i64) {
        let pool = test_pool();
        let a = seed_user(&pool, "usera_name");
        let b = seed_user(&pool, "userb_name");
        let c = seed_user(&pool, "userc_name");
        (FollowRepo::new(pool), a, b, c)
    }

    #[test]
    fn counts_match_edge_directions() {
        let (repo, a, b, c) = setup();
        repo.follow(a, c).unwrap();
        repo.follow(b, c).unwrap();
        repo.follow(c, a).unwrap();

        // c is followed by a and b, and follows a
        assert_eq!(repo.count_followers(c).unwrap(), 2);
        assert_eq!(repo.count_following(c).unwrap(), 1);
        assert_eq!(repo.count_followers(a).unwrap(), 1);
        assert_eq!(repo.count_following(a).unwrap(), 1);
        assert_eq!(repo.count_followers(b).unwrap(), 0);
    }

    #[test]
    fn unfollow_excludes_edge_from_counts() {
        let (repo, a, b, _c) = setup();
        repo.follow(a, b).unwrap();
        assert_eq!(repo.count_followers(b).unwrap(), 1);

        assert!(repo.unfollow(a, b).unwrap());
        assert_eq!(repo.count_followers(b).unwrap(), 0);
        assert!(!repo.is_following(a, b).unwrap());

        // Nothing left to unfollow
        assert!(!repo.unfollow(a, b).unwrap());
    }

    #[test]
    fn refollow_revives_soft_deleted_edge() {
        let (repo, a, b, _c) = setup();
        repo.follow(a, b).unwrap();
        repo.unfollow(a, b).unwrap();
        repo.follow(a, b).unwrap();

        assert!(repo.is_following(a, b).unwrap());
        assert_eq!(repo.count_followers(b).unwrap(), 1);
    }

    #[test]
    fn follow_requires_both_users_to_exist() {
        let (repo, a, _b, _c) = setup();
        assert!(matches!(
            repo.follow(a, 9999).unwrap_err(),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            repo.follow(9999, a).unwrap_err(),
            AppError::Conflict(_)
        ));
    }

    #[test]
    fn self_follow_is_rejected() {
        let (repo, a, _b, _c) = setup();
        assert!(matches!(
            repo.follow(a, a).unwrap_err(),
            AppError::BadRequest(_)
        ));
    }

    #[test]
    fn following_is_idempotent() {
        let (repo, a, b, _c) = setup();
        repo.follow(a, b).unwrap();
        repo.follow(a, b).unwrap();
        assert_eq!(repo.count_followers(b).unwrap(), 1);
    }
}
