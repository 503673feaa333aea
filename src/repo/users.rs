use rusqlite::{params, OptionalExtension};

use crate::db::models::{User, UserSummary};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::repo::page_offset;
use crate::state::DbPool;
use crate::validate::{validate_signup, SignupRequest};

const SUMMARY_FIELDS: &str = "id, username, first_name, last_name, avatar_url";

#[derive(Clone)]
pub struct UserRepo {
    pool: DbPool,
}

impl UserRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Creates a deactivated account from a signup payload.
    ///
    /// A payload that tries to set `is_activated` is rejected outright;
    /// activation only ever happens through [`UserRepo::activate_account`].
    /// Field validation failures come back as a field-keyed error map. A
    /// storage failure after validation passes is an internal fault, not a
    /// user error.
    pub fn add_user(&self, req: &SignupRequest) -> AppResult<i64> {
        if req.is_activated.is_some() {
            // Someone is hand-crafting requests
            return Err(AppError::BadRequest(
                "is_activated cannot be set".to_string(),
            ));
        }

        let mut errors = validate_signup(req);
        self.check_uniqueness(req, &mut errors)?;
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let password = req.password.as_deref().unwrap_or_default();
        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("password hash failed: {}", e)))?;
        let activation_key = uuid::Uuid::now_v7().simple().to_string();

        let conn = self.pool.get()?;
        let result = conn.execute(
            "INSERT INTO users (username, first_name, last_name, email, birthdate,
                                password, sex, is_activated, activation_key)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
            params![
                req.username,
                req.first_name,
                req.last_name,
                req.email,
                req.birthdate,
                hash,
                req.sex,
                activation_key,
            ],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            // Two signups racing on the same username/email: the loser gets
            // the same field message the pre-check would have produced.
            Err(e) if is_unique_violation(&e) => {
                Err(unique_violation_to_field_errors(&e.to_string()))
            }
            Err(e) => Err(AppError::Internal(format!("user insert failed: {}", e))),
        }
    }

    /// Flips `is_activated` for the one user holding this key. The key is
    /// single-use: it is cleared on success.
    pub fn activate_account(&self, key: &str) -> AppResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE users
             SET is_activated = 1, activation_key = NULL, updated_at = datetime('now')
             WHERE activation_key = ?1 AND deleted_at IS NULL",
            params![key],
        )?;
        if rows == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    pub fn fetch_by_username(&self, username: &str) -> AppResult<User> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, username, first_name, last_name, email, birthdate, password,
                    sex, role, avatar_url, is_activated, activation_key,
                    created_at, updated_at, deleted_at
             FROM users WHERE username = ?1 AND deleted_at IS NULL",
            params![username],
            row_to_user,
        )
        .optional()?
        .ok_or(AppError::NotFound)
    }

    pub fn fetch_by_id(&self, id: i64) -> AppResult<User> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, username, first_name, last_name, email, birthdate, password,
                    sex, role, avatar_url, is_activated, activation_key,
                    created_at, updated_at, deleted_at
             FROM users WHERE id = ?1 AND deleted_at IS NULL",
            params![id],
            row_to_user,
        )
        .optional()?
        .ok_or(AppError::NotFound)
    }

    /// Paged "users you could follow". Reads the precomputed table first;
    /// when that page comes back empty (never refreshed, or exhausted),
    /// answers from the live scan instead. An empty fast path is not an
    /// error.
    pub fn fetch_recommended_users(
        &self,
        user_id: i64,
        page: u32,
        per_page: u32,
    ) -> AppResult<Vec<UserSummary>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.username, u.first_name, u.last_name, u.avatar_url
             FROM recommendations r
             JOIN users u ON u.id = r.recommended_id
             WHERE r.user_id = ?1 AND u.is_activated = 1 AND u.deleted_at IS NULL
             ORDER BY r.rank
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows: Vec<UserSummary> = stmt
            .query_map(
                params![user_id, per_page, page_offset(page, per_page)],
                row_to_summary,
            )?
            .collect::<Result<_, _>>()?;

        if rows.is_empty() {
            drop(stmt);
            drop(conn);
            return self.fetch_not_followed_users(user_id, page, per_page);
        }
        Ok(rows)
    }

    /// The fallback scan: every activated user except the requester,
    /// newest account first. Ties on the second-resolution timestamp are
    /// broken by id so pages never overlap.
    pub fn fetch_not_followed_users(
        &self,
        user_id: i64,
        page: u32,
        per_page: u32,
    ) -> AppResult<Vec<UserSummary>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SUMMARY_FIELDS} FROM users
             WHERE is_activated = 1 AND id != ?1 AND deleted_at IS NULL
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
            .query_map(
                params![user_id, per_page, page_offset(page, per_page)],
                row_to_summary,
            )?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Rebuilds the precomputed recommendation set for one user: activated
    /// users they do not already follow, ranked by follower count, then by
    /// account age. Replaces the original stored-procedure path with an
    /// explicit refresh job.
    pub fn refresh_recommendations(&self, user_id: i64) -> AppResult<usize> {
        let conn = self.pool.get()?;
        conn.execute(
            "DELETE FROM recommendations WHERE user_id = ?1",
            params![user_id],
        )?;
        let inserted = conn.execute(
            "INSERT INTO recommendations (user_id, recommended_id, rank)
             SELECT ?1, u.id,
                    ROW_NUMBER() OVER (
                        ORDER BY COALESCE(fc.c, 0) DESC, u.created_at DESC, u.id DESC
                    )
             FROM users u
             LEFT JOIN (
                 SELECT following_id, COUNT(*) AS c
                 FROM followers WHERE deleted_at IS NULL
                 GROUP BY following_id
             ) fc ON fc.following_id = u.id
             WHERE u.is_activated = 1
               AND u.deleted_at IS NULL
               AND u.id != ?1
               AND NOT EXISTS (
                   SELECT 1 FROM followers f
                   WHERE f.user_id = ?1 AND f.following_id = u.id
                     AND f.deleted_at IS NULL
               )",
            params![user_id],
        )?;
        Ok(inserted)
    }

    /// Password check for login. Only activated, live accounts may log in.
    pub fn verify_credentials(&self, username: &str, password: &str) -> AppResult<User> {
        let user = self
            .fetch_by_username(username)
            .map_err(|_| AppError::Unauthorized)?;
        let ok = bcrypt::verify(password, &user.password)
            .map_err(|e| AppError::Internal(format!("password verify failed: {}", e)))?;
        if !ok || !user.is_activated {
            return Err(AppError::Unauthorized);
        }
        Ok(user)
    }

    fn check_uniqueness(&self, req: &SignupRequest, errors: &mut FieldErrors) -> AppResult<()> {
        let conn = self.pool.get()?;
        if let Some(username) = req.username.as_deref() {
            let taken: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )?;
            if taken {
                errors
                    .entry("username".to_string())
                    .or_default()
                    .push("Username already exists".to_string());
            }
        }
        if let Some(email) = req.email.as_deref() {
            let taken: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )?;
            if taken {
                errors
                    .entry("email".to_string())
                    .or_default()
                    .push("Email already exists".to_string());
            }
        }
        Ok(())
    }
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        birthdate: row.get(5)?,
        password: row.get(6)?,
        sex: row.get(7)?,
        role: row.get(8)?,
        avatar_url: row.get(9)?,
        is_activated: row.get(10)?,
        activation_key: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
        deleted_at: row.get(14)?,
    })
}

fn row_to_summary(row: &rusqlite::Row) -> rusqlite::Result<UserSummary> {
    Ok(UserSummary {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        avatar_url: row.get(4)?,
    })
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn unique_violation_to_field_errors(message: &str) -> AppError {
    let mut errors = FieldErrors::new();
    if message.contains("users.email") {
        errors.insert(
            "email".to_string(),
            vec!["Email already exists".to_string()],
        );
    } else {
        errors.insert(
            "username".to_string(),
            vec!["Username already exists".to_string()],
        );
    }
    AppError::Validation(errors)
}
