// Repositories isolate all database side effects. One struct per entity,
// each holding a handle to the shared pool; soft deletion is always an
// explicit `deleted_at IS NULL` predicate, never an implied scope.

pub mod comments;
pub mod follows;
pub mod likes;
pub mod messages;
pub mod notifications;
pub mod posts;
pub mod users;

/// Pages are 1-based; page 0 is treated as page 1.
pub(crate) fn page_offset(page: u32, per_page: u32) -> i64 {
    i64::from(page.max(1) - 1) * i64::from(per_page)
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::db;
    use crate::state::DbPool;
    use rusqlite::params;

    pub fn test_pool() -> DbPool {
        let pool = db::create_memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        pool
    }

    /// Insert an activated user with fixed defaults, returning its id.
    pub fn seed_user(pool: &DbPool, username: &str) -> i64 {
        seed_user_with(pool, username, true, None)
    }

    pub fn seed_user_with(
        pool: &DbPool,
        username: &str,
        activated: bool,
        id: Option<i64>,
    ) -> i64 {
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, username, first_name, last_name, email, birthdate,
                                password, sex, is_activated)
             VALUES (?1, ?2, 'Test', 'User', ?3, '1990-01-01', 'not-a-hash', 'F', ?4)",
            params![id, username, format!("{}@example.com", username), activated],
        )
        .unwrap();
        match id {
            Some(id) => id,
            None => conn.last_insert_rowid(),
        }
    }

    pub fn seed_post(pool: &DbPool, user_id: i64, body: &str) -> i64 {
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO posts (user_id, title, body) VALUES (?1, '', ?2)",
            params![user_id, body],
        )
        .unwrap();
        conn.last_insert_rowid()
    }
}

#[cfg(test)]
mod tests {
    use super::page_offset;

    #[test]
    fn page_offset_is_one_based() {
        assert_eq!(page_offset(1, 5), 0);
        assert_eq!(page_offset(2, 5), 5);
        assert_eq!(page_offset(3, 10), 20);
    }

    #[test]
    fn page_zero_acts_like_page_one() {
        assert_eq!(page_offset(0, 5), 0);
    }
}
