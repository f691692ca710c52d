pub mod config;
pub mod db;
pub mod error;
pub mod pages;
pub mod routes;
pub mod session;
pub mod upload;
pub mod user_models;
pub mod user_storage;

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::Key;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, EnvFilter};

use config::Config;
use db::Database;
use user_storage::UserStorage;

/// Shared by every handler; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: UserStorage,
    key: Key,
}

impl AppState {
    /// Opens the database, creates missing tables and the upload directory.
    pub async fn new(config: Config) -> Result<Self> {
        let db = Database::connect(&config.database).await?;
        db.migrate().await?;

        tokio::fs::create_dir_all(&config.upload_dir)
            .await
            .with_context(|| format!("Failed to create upload directory {:?}", config.upload_dir))?;

        let key = session::signing_key(&config.secret_key);

        Ok(Self {
            config: Arc::new(config),
            storage: UserStorage::new(db),
            key,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(routes::index))
        .route("/login", post(routes::login))
        .route("/signup", get(routes::signup))
        .route("/registered", post(routes::registered))
        .route("/upload", post(routes::upload))
        .route("/profile", get(routes::profile))
        .route("/download/:stored_filename", get(routes::download))
        .route("/logout", get(routes::logout))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `RUST_LOG` wins over the level implied by the debug flag.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    fmt().with_env_filter(filter).init();
}
