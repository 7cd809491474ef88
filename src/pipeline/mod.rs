//! Ingestion pipeline orchestration.
//!
//! A four-stage state machine per archive directory: Register -> Parse ->
//! Extract -> Thumbnail. Sessions are processed strictly sequentially; each
//! stage is idempotent and resumable, records its algorithm version on
//! success, and records failures in the session's error column without
//! advancing the marker.

pub mod attachments;
mod extract;
mod parse;
pub mod thumbnails;

pub use extract::extract_session;
pub use parse::parse_session;

use std::path::PathBuf;

use thiserror::Error;

use crate::assets::MediaError;
use crate::config::Settings;
use crate::har::HarError;
use crate::models::{ArchiveSession, SourceType};
use crate::repository::{DieselError, EntityRepository, SessionRepository, SqlitePool};

/// Version of the structure-parsing algorithm, recorded per session.
pub const PARSE_ALGORITHM_VERSION: i32 = 1;
/// Version of the entity-extraction algorithm, recorded per session.
pub const EXTRACT_ALGORITHM_VERSION: i32 = 1;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Session inputs unusable: HAR missing, metadata malformed.
    #[error("bad input: {0}")]
    BadInput(String),
    #[error(transparent)]
    Har(#[from] HarError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("database error: {0}")]
    Db(#[from] DieselError),
}

/// Drives every pipeline stage over the archive root.
pub struct Pipeline {
    settings: Settings,
    sessions: SessionRepository,
    entities: EntityRepository,
}

impl Pipeline {
    pub fn new(settings: Settings, pool: SqlitePool) -> Self {
        Self {
            settings,
            sessions: SessionRepository::new(pool.clone()),
            entities: EntityRepository::new(pool),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sessions(&self) -> &SessionRepository {
        &self.sessions
    }

    pub fn entities(&self) -> &EntityRepository {
        &self.entities
    }

    /// Absolute directory of one session.
    pub fn archive_dir(&self, session: &ArchiveSession) -> PathBuf {
        self.settings.archives_dir.join(&session.archive_location)
    }

    /// Stage Register: insert a session row per unregistered directory.
    pub async fn register_archives(&self) -> anyhow::Result<usize> {
        let mut registered = 0;
        if !self.settings.archives_dir.is_dir() {
            tracing::warn!(dir = %self.settings.archives_dir.display(), "archives directory missing");
            return Ok(0);
        }
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(&self.settings.archives_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let external_id = format!("har-{}", name);
            if let Some(id) = self
                .sessions
                .register(&external_id, name, SourceType::HarCapture)
                .await?
            {
                tracing::info!(%external_id, id, "registered archive session");
                registered += 1;
            }
        }
        Ok(registered)
    }

    /// Stage Parse over every eligible session.
    pub async fn parse_pending(&self) -> anyhow::Result<usize> {
        let mut parsed = 0;
        while let Some(session) = self.sessions.next_parseable().await? {
            match parse_session(self, &session).await {
                Ok(()) => {
                    tracing::info!(session = %session.external_id, "parsed archive session");
                    parsed += 1;
                }
                Err(err) => {
                    tracing::error!(session = %session.external_id, error = %err, "parse stage failed");
                    self.sessions.set_error(session.id, &err.to_string()).await?;
                }
            }
        }
        Ok(parsed)
    }

    /// Stage Extract over every eligible session.
    pub async fn extract_pending(&self) -> anyhow::Result<usize> {
        let mut extracted = 0;
        while let Some(session) = self.sessions.next_extractable().await? {
            match extract_session(self, &session).await {
                Ok(stats) => {
                    tracing::info!(
                        session = %session.external_id,
                        accounts = stats.accounts,
                        posts = stats.posts,
                        media = stats.media,
                        "extracted archive session"
                    );
                    extracted += 1;
                }
                Err(err) => {
                    tracing::error!(session = %session.external_id, error = %err, "extract stage failed");
                    self.sessions.set_error(session.id, &err.to_string()).await?;
                }
            }
        }
        Ok(extracted)
    }

    /// Stage Thumbnail over every media row still lacking one.
    pub async fn generate_thumbnails(&self) -> anyhow::Result<usize> {
        thumbnails::generate_missing(&self.entities, &self.settings).await
    }

    /// Run all stages once, in order.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.register_archives().await?;
        self.parse_pending().await?;
        self.extract_pending().await?;
        self.generate_thumbnails().await?;
        Ok(())
    }
}
