use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::repo::comments::CommentRepo;
use crate::repo::follows::FollowRepo;
use crate::repo::likes::LikeRepo;
use crate::repo::messages::MessageRepo;
use crate::repo::notifications::NotificationRepo;
use crate::repo::posts::PostRepo;
use crate::repo::users::UserRepo;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Per-entity repositories, constructed once per process and handed to
/// request handlers through the shared state.
#[derive(Clone)]
pub struct Repos {
    pub users: UserRepo,
    pub follows: FollowRepo,
    pub posts: PostRepo,
    pub comments: CommentRepo,
    pub likes: LikeRepo,
    pub notifications: NotificationRepo,
    pub messages: MessageRepo,
}

impl Repos {
    pub fn new(pool: DbPool) -> Self {
        Self {
            users: UserRepo::new(pool.clone()),
            follows: FollowRepo::new(pool.clone()),
            posts: PostRepo::new(pool.clone()),
            comments: CommentRepo::new(pool.clone()),
            likes: LikeRepo::new(pool.clone()),
            notifications: NotificationRepo::new(pool.clone()),
            messages: MessageRepo::new(pool),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub repos: Repos,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let repos = Repos::new(db.clone());
        Self { db, config, repos }
    }
}
