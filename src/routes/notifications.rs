use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::Router;

use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::routes::envelope;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications/unread", get(unread))
        .route("/api/notifications/read/{id}", patch(mark_read))
}

async fn unread(State(state): State<AppState>, user: CurrentUser) -> AppResult<impl IntoResponse> {
    Ok(envelope(state.repos.notifications.fetch_unread(user.id)?))
}

async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    state.repos.notifications.mark_read(id, user.id)?;
    Ok(envelope(true))
}
