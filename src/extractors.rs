use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use rusqlite::params;

use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session cookie is found.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(parts, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthorized)?;

        let conn = state.db.get()?;
        conn.query_row(
            "SELECT u.id, u.username FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token = ?1 AND s.expires_at > datetime('now') \
               AND u.deleted_at IS NULL",
            params![token],
            |row| {
                Ok(CurrentUser {
                    id: row.get(0)?,
                    username: row.get(1)?,
                })
            },
        )
        .map_err(|_| AppError::Unauthorized)
    }
}

/// Optional user extractor — returns None instead of 401 when not
/// authenticated. Used where a response merely varies by viewer.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(_) => Ok(MaybeUser(None)),
        }
    }
}

/// Pulls the session token out of the request's Cookie header.
fn extract_session_token(parts: &Parts, cookie_name: &str) -> Option<String> {
    session_token_from_headers(&parts.headers, cookie_name)
}

/// Same, but usable from handlers that only have a `HeaderMap`.
pub fn session_token_from_headers(
    headers: &axum::http::HeaderMap,
    cookie_name: &str,
) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == cookie_name).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_cookie(value: &str) -> Parts {
        let request = Request::builder()
            .header(header::COOKIE, value)
            .body(())
            .unwrap();
        request.into_parts().0
    }

    #[test]
    fn extracts_named_cookie_among_many() {
        let parts = parts_with_cookie("other=1; plaza_session=abc123; last=z");
        assert_eq!(
            extract_session_token(&parts, "plaza_session"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn missing_cookie_yields_none() {
        let parts = parts_with_cookie("other=1");
        assert_eq!(extract_session_token(&parts, "plaza_session"), None);
    }
}
