use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/uploads/{file}", get(serve))
}

/// Serves a stored upload. File names are server-generated UUIDs, so
/// anything with a path separator in it is not ours.
async fn serve(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> AppResult<impl IntoResponse> {
    if file.contains('/') || file.contains('\\') || file.contains("..") {
        return Err(AppError::BadRequest("invalid file name".to_string()));
    }

    let path = state.config.uploads_path().join(&file);
    let bytes = tokio::fs::read(&path).await.map_err(|_| AppError::NotFound)?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes))
}
