use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::routes::envelope;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/chat/users", get(peers))
        .route("/api/chat/messages", get(thread).post(send))
}

#[derive(Deserialize)]
struct PeersQuery {
    #[serde(rename = "pageNo", default = "default_page")]
    page_no: u32,
}

fn default_page() -> u32 {
    1
}

async fn peers(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PeersQuery>,
) -> AppResult<impl IntoResponse> {
    let peers = state.repos.messages.fetch_peers(
        user.id,
        query.page_no,
        state.config.pagination.users_per_page,
    )?;
    Ok(envelope(peers))
}

#[derive(Deserialize)]
struct ThreadQuery {
    /// The peer's user id, as carried in the chat view's query string.
    id: i64,
}

async fn thread(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ThreadQuery>,
) -> AppResult<impl IntoResponse> {
    Ok(envelope(state.repos.messages.fetch_thread(user.id, query.id)?))
}

#[derive(Deserialize)]
struct SendRequest {
    receiver_id: i64,
    message: String,
}

async fn send(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<SendRequest>,
) -> AppResult<impl IntoResponse> {
    let sent = state
        .repos
        .messages
        .send(user.id, req.receiver_id, &req.message)?;
    Ok((StatusCode::CREATED, envelope(sent)))
}
