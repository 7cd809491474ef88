//! Archive session repository.
//!
//! Session rows drive the ingestion state machine: stage markers
//! (`parsed_version`, `extracted_version`) are written only on success,
//! failures land in `extraction_error`, and the orchestrator selects the
//! next eligible row by lowest progress.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::models::{ArchiveSession, SourceType};
use crate::schema::archive_sessions;

use super::pool::{DieselError, SqlitePool};
use super::records::{ArchiveSessionRecord, NewArchiveSession};
use super::now_str;

#[derive(Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<ArchiveSession>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<ArchiveSessionRecord> = archive_sessions::table
            .find(id)
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(ArchiveSessionRecord::into_session))
    }

    pub async fn get_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<ArchiveSession>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<ArchiveSessionRecord> = archive_sessions::table
            .filter(archive_sessions::external_id.eq(external_id))
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(ArchiveSessionRecord::into_session))
    }

    pub async fn get_many(&self, ids: &[i64]) -> Result<Vec<ArchiveSession>, DieselError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await?;
        let records: Vec<ArchiveSessionRecord> = archive_sessions::table
            .filter(archive_sessions::id.eq_any(ids.iter().copied()))
            .load(&mut conn)
            .await?;
        Ok(records
            .into_iter()
            .map(ArchiveSessionRecord::into_session)
            .collect())
    }

    /// Insert a session row for a discovered archive directory. Returns the
    /// row id, or `None` if the external id was already registered.
    pub async fn register(
        &self,
        external_id: &str,
        archive_location: &str,
        source_type: SourceType,
    ) -> Result<Option<i64>, DieselError> {
        let mut conn = self.pool.get().await?;

        let exists: Option<i64> = archive_sessions::table
            .filter(archive_sessions::external_id.eq(external_id))
            .select(archive_sessions::id)
            .first(&mut conn)
            .await
            .optional()?;
        if exists.is_some() {
            return Ok(None);
        }

        let now = now_str();
        diesel::insert_into(archive_sessions::table)
            .values(NewArchiveSession {
                create_date: &now,
                update_date: &now,
                external_id,
                archive_location,
                source_type: source_type.as_i32(),
            })
            .execute(&mut conn)
            .await?;
        archive_sessions::table
            .filter(archive_sessions::external_id.eq(external_id))
            .select(archive_sessions::id)
            .first(&mut conn)
            .await
            .map(Some)
    }

    /// Next session awaiting the parse stage.
    pub async fn next_parseable(&self) -> Result<Option<ArchiveSession>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<ArchiveSessionRecord> = archive_sessions::table
            .filter(archive_sessions::parsed_version.is_null())
            .filter(archive_sessions::extraction_error.is_null())
            .filter(archive_sessions::source_type.eq(SourceType::HarCapture.as_i32()))
            .order(archive_sessions::id.asc())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(ArchiveSessionRecord::into_session))
    }

    /// Next session awaiting the extract stage.
    pub async fn next_extractable(&self) -> Result<Option<ArchiveSession>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<ArchiveSessionRecord> = archive_sessions::table
            .filter(archive_sessions::parsed_version.is_not_null())
            .filter(archive_sessions::extracted_version.is_null())
            .filter(archive_sessions::extraction_error.is_null())
            .filter(archive_sessions::source_type.eq(SourceType::HarCapture.as_i32()))
            .order(archive_sessions::id.asc())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(ArchiveSessionRecord::into_session))
    }

    /// Store the parse stage output and mark the stage version.
    #[allow(clippy::too_many_arguments)]
    pub async fn store_parse_result(
        &self,
        id: i64,
        structures: &serde_json::Value,
        metadata: &serde_json::Value,
        attachments: &serde_json::Value,
        archived_url: Option<&str>,
        archiving_timestamp: Option<&str>,
        archiving_timezone: Option<&str>,
        version: i32,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        diesel::update(archive_sessions::table.find(id))
            .set((
                archive_sessions::structures.eq(structures.to_string()),
                archive_sessions::metadata.eq(metadata.to_string()),
                archive_sessions::attachments.eq(attachments.to_string()),
                archive_sessions::archived_url.eq(archived_url),
                archive_sessions::archiving_timestamp.eq(archiving_timestamp),
                archive_sessions::archiving_timezone.eq(archiving_timezone),
                archive_sessions::parsed_version.eq(version),
                archive_sessions::extraction_error.eq(None::<String>),
                archive_sessions::update_date.eq(now_str()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Mark the extract stage complete.
    pub async fn mark_extracted(&self, id: i64, version: i32) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        diesel::update(archive_sessions::table.find(id))
            .set((
                archive_sessions::extracted_version.eq(version),
                archive_sessions::extraction_error.eq(None::<String>),
                archive_sessions::update_date.eq(now_str()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Record a stage failure. The session stops advancing until the error
    /// column is cleared; stage markers are never written on failure.
    pub async fn set_error(&self, id: i64, error: &str) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        diesel::update(archive_sessions::table.find(id))
            .set((
                archive_sessions::extraction_error.eq(error),
                archive_sessions::update_date.eq(now_str()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}
