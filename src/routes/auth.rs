use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::auth::session;
use crate::error::{AppError, AppResult};
use crate::extractors::session_token_from_headers;
use crate::routes::envelope;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let user = state
        .repos
        .users
        .verify_credentials(&req.username, &req.password)?;

    let token = session::create_session(&state.db, user.id, state.config.auth.session_hours)
        .map_err(AppError::Database)?;

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        state.config.auth.cookie_name,
        token,
        state.config.auth.session_hours * 3600
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        envelope(json!({
            "id": user.id,
            "username": user.username,
            "avatar_url": user.avatar_url,
        })),
    ))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    if let Some(token) = session_token_from_headers(&headers, &state.config.auth.cookie_name) {
        session::delete_session(&state.db, &token).map_err(AppError::Database)?;
    }

    let cookie = format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        state.config.auth.cookie_name
    );
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], envelope(true)))
}
