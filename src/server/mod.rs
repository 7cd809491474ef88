//! Query and search service over the materialized entity store.
//!
//! Serves enriched entity graphs, bounded search, annotations, share links
//! and signed file references. Handlers run on parallel connections; the
//! ingestion pipeline never shares a connection with them.

pub mod auth;
mod enrich;
mod error;
mod file_tokens;
mod handlers;
mod routes;
mod search;
mod share;

pub use auth::Viewer;
pub use error::ApiError;
pub use file_tokens::{FileTokenError, FileTokenService};
pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::repository::{EntityRepository, SessionRepository, SqlitePool, UserRepository};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub pool: SqlitePool,
    pub entities: Arc<EntityRepository>,
    pub sessions: Arc<SessionRepository>,
    pub users: Arc<UserRepository>,
    /// Present only when a process secret is configured; without it no
    /// signed file references are issued and file serving rejects all
    /// requests.
    pub file_tokens: Arc<Option<FileTokenService>>,
}

impl AppState {
    pub fn new(settings: &Settings, pool: SqlitePool) -> Self {
        let file_tokens = settings
            .file_token_secret_bytes()
            .map(FileTokenService::new);
        Self {
            settings: Arc::new(settings.clone()),
            pool: pool.clone(),
            entities: Arc::new(EntityRepository::new(pool.clone())),
            sessions: Arc::new(SessionRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool)),
            file_tokens: Arc::new(file_tokens),
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let pool = settings.create_pool();
    let state = AppState::new(settings, pool);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
