use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::routes::envelope;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts/comments/{id}", get(by_post))
        .route("/api/posts/commentsCount/{id}", get(count))
        .route("/api/comments", post(add))
        .route("/api/comments/{id}", axum::routing::delete(remove))
}

#[derive(Deserialize)]
struct PageQuery {
    #[serde(default = "default_page")]
    page: u32,
}

fn default_page() -> u32 {
    1
}

async fn by_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let comments = state.repos.comments.fetch_by_post(
        post_id,
        query.page,
        state.config.pagination.posts_per_page,
    )?;
    Ok(envelope(comments))
}

async fn count(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    Ok(envelope(state.repos.comments.count_by_post(post_id)?))
}

#[derive(Deserialize)]
struct AddCommentRequest {
    post_id: i64,
    body: String,
}

async fn add(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<AddCommentRequest>,
) -> AppResult<impl IntoResponse> {
    let id = state.repos.comments.add(req.post_id, user.id, &req.body)?;
    Ok((
        StatusCode::CREATED,
        envelope(serde_json::json!({ "id": id })),
    ))
}

async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    state.repos.comments.delete(id, user.id)?;
    Ok(envelope(true))
}
