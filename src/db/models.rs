use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birthdate: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub sex: String,
    pub role: String,
    pub avatar_url: Option<String>,
    pub is_activated: bool,
    #[serde(skip_serializing)]
    pub activation_key: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

/// The projection exposed by user listings and the recommendation queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub img_path: Option<String>,
    pub shared_post_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// A post as it appears in feeds: author fields and counts joined in.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub user: PublicUser,
    pub like_count: i64,
    pub comment_count: i64,
}

/// The `{username, avatar_url}` pair joined onto posts, comments and
/// notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub body: String,
    pub created_at: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct Like {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub user: PublicUser,
}

/// Wire shape of an unread notification. `user_id` is the acting user's
/// id (the schema column is `actor_id`); the recipient never appears in
/// the payload because the query is already scoped to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub message: String,
    pub user_id: i64,
    pub user: PublicUser,
    pub post_id: Option<i64>,
    pub link: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: i64,
    pub user_id: i64,
    pub receiver_id: i64,
    pub message: String,
    pub created_at: String,
}

/// A chat-eligible peer, shaped the way the chat view consumes it.
#[derive(Debug, Clone, Serialize)]
pub struct ChatPeer {
    pub user_id: i64,
    pub user: PublicUser,
}
