pub mod auth;
pub mod chat;
pub mod comments;
pub mod notifications;
pub mod posts;
pub mod uploads;
pub mod users;

use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

/// Every successful response is wrapped in the `{ "data": ... }` envelope.
pub(crate) fn envelope<T: Serialize>(value: T) -> Json<serde_json::Value> {
    Json(json!({ "data": value }))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(notifications::router())
        .merge(chat::router())
        .merge(uploads::router())
}
