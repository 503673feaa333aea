use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppResult;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::envelope;
use crate::state::AppState;
use crate::validate::SignupRequest;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", post(signup))
        .route("/api/users/activate/{key}", post(activate))
        .route("/api/users/recommended", get(recommended))
        .route("/api/users/recommended/refresh", post(refresh_recommended))
        .route("/api/users/{username}", get(profile))
        .route(
            "/api/users/{username}/follow",
            get(follow_info).post(toggle_follow),
        )
}

async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    let id = state.repos.users.add_user(&req)?;
    tracing::info!(user_id = id, "new signup");
    Ok((StatusCode::CREATED, envelope(json!({ "id": id }))))
}

async fn activate(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.repos.users.activate_account(&key)?;
    Ok(envelope(true))
}

/// The public profile projection; everything sensitive stays server-side.
#[derive(Serialize)]
struct ProfileResponse {
    id: i64,
    username: String,
    first_name: String,
    last_name: String,
    avatar_url: Option<String>,
    created_at: String,
}

async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user = state.repos.users.fetch_by_username(&username)?;
    Ok(envelope(ProfileResponse {
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        avatar_url: user.avatar_url,
        created_at: user.created_at,
    }))
}

#[derive(Deserialize)]
struct RecommendedQuery {
    #[serde(rename = "pageNo", default = "default_page")]
    page_no: u32,
    #[serde(rename = "perPage")]
    per_page: Option<u32>,
}

fn default_page() -> u32 {
    1
}

async fn recommended(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<RecommendedQuery>,
) -> AppResult<impl IntoResponse> {
    let per_page = query
        .per_page
        .unwrap_or(state.config.pagination.users_per_page);
    let users = state
        .repos
        .users
        .fetch_recommended_users(user.id, query.page_no, per_page)?;
    Ok(envelope(users))
}

async fn refresh_recommended(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let count = state.repos.users.refresh_recommendations(user.id)?;
    tracing::debug!(user_id = user.id, count, "recommendations refreshed");
    Ok(envelope(json!({ "count": count })))
}

async fn follow_info(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(username): Path<String>,
) -> AppResult<impl IntoResponse> {
    let target = state.repos.users.fetch_by_username(&username)?;
    let followers = state.repos.follows.count_followers(target.id)?;
    let following = state.repos.follows.count_following(target.id)?;
    let is_following = match &viewer {
        Some(viewer) => state.repos.follows.is_following(viewer.id, target.id)?,
        None => false,
    };
    Ok(envelope(json!({
        "followers": followers,
        "following": following,
        "is_following": is_following,
    })))
}

async fn toggle_follow(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<impl IntoResponse> {
    let target = state.repos.users.fetch_by_username(&username)?;

    let following = if state.repos.follows.is_following(user.id, target.id)? {
        state.repos.follows.unfollow(user.id, target.id)?;
        false
    } else {
        state.repos.follows.follow(user.id, target.id)?;
        state.repos.notifications.create(
            target.id,
            user.id,
            None,
            &format!("{} followed you", user.username),
            &format!("/users/{}", user.username),
            "followed",
        )?;
        true
    };

    let followers = state.repos.follows.count_followers(target.id)?;
    Ok(envelope(json!({
        "following": following,
        "followers": followers,
    })))
}
