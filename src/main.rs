use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use clap::Parser;
use serde_json::json;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use plaza::auth::session;
use plaza::config::{Cli, Config};
use plaza::db;
use plaza::error::{AppError, AppResult};
use plaza::routes;
use plaza::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Ensure uploads directory exists
    std::fs::create_dir_all(config.uploads_path())?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    // Build app state
    let state = AppState::new(pool, config.clone());

    // Build router
    let mut app = routes::router();

    // Test-only seed endpoint: creates an activated user + session,
    // returns the session cookie
    if std::env::var("PLAZA_TEST_SEED").is_ok() {
        app = app.route("/test/seed", get(test_seed));
    }

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Test-only: seed an activated user + session and return the session cookie.
/// Only mounted when the PLAZA_TEST_SEED env var is set.
async fn test_seed(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let conn = state.db.get()?;
    conn.execute(
        "INSERT OR IGNORE INTO users (username, first_name, last_name, email, birthdate,
                                      password, sex, is_activated)
         VALUES ('testuser01', 'Test', 'User', 'testuser01@example.com', '1990-01-01',
                 'not-a-hash', 'M', 1)",
        [],
    )?;

    // The user may already exist from a previous seed call
    let uid: i64 = conn.query_row(
        "SELECT id FROM users WHERE username = 'testuser01'",
        [],
        |r| r.get(0),
    )?;
    drop(conn);

    let token = session::create_session(&state.db, uid, state.config.auth.session_hours)
        .map_err(AppError::Database)?;

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age=3600",
        state.config.auth.cookie_name, token
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "user_id": uid, "username": "testuser01" })),
    ))
}
