use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::{field_error, AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::repo::posts::ImageChange;
use crate::routes::envelope;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(feed).post(create))
        .route("/api/posts/search", get(search))
        .route("/api/posts/update/{id}", post(update))
        .route("/api/posts/like/{id}", patch(like))
        .route("/api/posts/share/{id}", post(share))
        .route("/api/posts/user/{username}", get(by_user))
        .route("/api/posts/likes/{id}", get(likes))
        .route("/api/posts/{id}", get(by_id).delete(remove))
}

fn default_page() -> u32 {
    1
}

#[derive(Deserialize)]
struct FeedQuery {
    #[serde(rename = "pageNo", default = "default_page")]
    page_no: u32,
}

#[derive(Deserialize)]
struct PageQuery {
    #[serde(default = "default_page")]
    page: u32,
}

async fn feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<impl IntoResponse> {
    let posts = state
        .repos
        .posts
        .fetch_page(query.page_no, state.config.pagination.posts_per_page)?;
    Ok(envelope(posts))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    #[serde(rename = "pageNo", default = "default_page")]
    page_no: u32,
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<impl IntoResponse> {
    let posts = state.repos.posts.search(
        &query.q,
        query.page_no,
        state.config.pagination.posts_per_page,
    )?;
    Ok(envelope(posts))
}

async fn by_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    // 404s for unknown users rather than returning an empty feed
    state.repos.users.fetch_by_username(&username)?;
    let posts = state.repos.posts.fetch_by_user(
        &username,
        query.page,
        state.config.pagination.posts_per_page,
    )?;
    Ok(envelope(posts))
}

async fn by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    Ok(envelope(state.repos.posts.fetch_by_id(id)?))
}

/// The create/update form, collected from a multipart body. `img` carries
/// file content; a present-but-empty `img_path` is the "remove the image"
/// sentinel.
#[derive(Default)]
struct PostForm {
    title: String,
    body: String,
    img: Option<(Option<String>, Vec<u8>)>,
    img_path: Option<String>,
}

async fn read_post_form(mut multipart: Multipart) -> AppResult<PostForm> {
    let mut form = PostForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => {
                form.title = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?
            }
            "body" => {
                form.body = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?
            }
            "img" => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.img = Some((filename, bytes.to_vec()));
            }
            "img_path" => {
                form.img_path = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?,
                )
            }
            _ => {}
        }
    }
    if form.body.trim().is_empty() {
        return Err(field_error("body", "Body is required"));
    }
    Ok(form)
}

/// Writes an uploaded image under the configured uploads directory with a
/// fresh name, returning the public path stored on the post.
async fn save_upload(
    state: &AppState,
    filename: Option<&str>,
    bytes: &[u8],
) -> AppResult<String> {
    let ext = filename
        .and_then(|f| std::path::Path::new(f).extension())
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    let name = format!("{}.{}", uuid::Uuid::now_v7().simple(), ext);

    let dir = state.config.uploads_path();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(format!("uploads dir: {}", e)))?;
    tokio::fs::write(dir.join(&name), bytes)
        .await
        .map_err(|e| AppError::Internal(format!("upload write: {}", e)))?;

    Ok(format!("/uploads/{}", name))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = read_post_form(multipart).await?;
    let img_path = match &form.img {
        Some((filename, bytes)) => Some(save_upload(&state, filename.as_deref(), bytes).await?),
        None => None,
    };
    let id = state
        .repos
        .posts
        .create(user.id, &form.title, &form.body, img_path.as_deref())?;
    Ok((StatusCode::CREATED, envelope(state.repos.posts.fetch_by_id(id)?)))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = read_post_form(multipart).await?;
    let image = match (&form.img, &form.img_path) {
        (Some((filename, bytes)), _) => {
            ImageChange::Replace(save_upload(&state, filename.as_deref(), bytes).await?)
        }
        (None, Some(path)) if path.is_empty() => ImageChange::Remove,
        _ => ImageChange::Keep,
    };
    state
        .repos
        .posts
        .update(id, user.id, &form.title, &form.body, image)?;
    Ok(envelope(state.repos.posts.fetch_by_id(id)?))
}

async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    state.repos.posts.delete(id, user.id)?;
    Ok(envelope(true))
}

async fn like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let owner = state.repos.posts.owner_of(id)?;
    let toggle = state.repos.likes.toggle(id, user.id)?;

    // A fresh like on someone else's post notifies them; unliking never does
    if toggle.liked && owner != user.id {
        state.repos.notifications.create(
            owner,
            user.id,
            Some(id),
            &format!("{} liked your post", user.username),
            &format!("/posts/{}", id),
            "liked",
        )?;
    }
    Ok(envelope(toggle))
}

#[derive(Deserialize)]
struct ShareRequest {
    body: String,
}

async fn share(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<ShareRequest>,
) -> AppResult<impl IntoResponse> {
    let new_id = state.repos.posts.share(id, user.id, &req.body)?;
    Ok((
        StatusCode::CREATED,
        envelope(json!({ "id": new_id, "shared_post_id": id })),
    ))
}

async fn likes(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    Ok(envelope(state.repos.likes.fetch_by_post(id)?))
}
