//! Stage Parse: metadata, attachments, and structure extraction.
//!
//! Streams the session's HAR once, classifying entries into typed
//! structures, and stores the structures blob together with the session
//! metadata. No media is materialized here; that happens in the extract
//! stage.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use crate::har::{stream_entries, EntrySink, HarEntry};
use crate::models::{ArchiveSession, SessionMetadata};
use crate::structures::{structures_from_entry, Structure};

use super::{attachments, Pipeline, PipelineError, PARSE_ALGORITHM_VERSION};

/// Parse one session and store its structures blob.
pub async fn parse_session(
    pipeline: &Pipeline,
    session: &ArchiveSession,
) -> Result<(), PipelineError> {
    let archive_dir = pipeline.archive_dir(session);

    let metadata_path = archive_dir.join("metadata.json");
    let metadata_raw = std::fs::read_to_string(&metadata_path).map_err(|e| {
        PipelineError::BadInput(format!("cannot read {}: {}", metadata_path.display(), e))
    })?;
    let metadata_value: serde_json::Value = serde_json::from_str(&metadata_raw).map_err(|e| {
        PipelineError::BadInput(format!("{} is not valid JSON: {}", metadata_path.display(), e))
    })?;
    let metadata: SessionMetadata =
        serde_json::from_value(metadata_value.clone()).unwrap_or_default();

    let har_path = archive_dir.join("archive.har");
    if !har_path.is_file() {
        return Err(PipelineError::BadInput(format!(
            "HAR file {} does not exist",
            har_path.display()
        )));
    }

    let attachments = attachments::scan(&archive_dir);

    let mut sink = StructureSink::default();
    let stats = stream_entries(&har_path, &mut sink)?;
    tracing::info!(
        session = %session.external_id,
        entries = stats.emitted,
        skipped = stats.skipped,
        structures = sink.structures.len(),
        "parsed HAR"
    );

    // The capture timestamp usually has no zone; it is interpreted in the
    // host zone, and the zone used is recorded so the conversion stays
    // auditable.
    let (archiving_timestamp, archiving_timezone) = metadata
        .archiving_start_timestamp
        .as_deref()
        .and_then(local_timestamp_to_utc)
        .map(|(ts, zone)| (Some(ts), Some(zone)))
        .unwrap_or((None, None));

    let structures_blob = serde_json::to_value(&sink.structures)
        .map_err(|e| PipelineError::BadInput(format!("structures not serializable: {}", e)))?;
    let attachments_blob = serde_json::to_value(&attachments)
        .map_err(|e| PipelineError::BadInput(format!("attachments not serializable: {}", e)))?;

    pipeline
        .sessions()
        .store_parse_result(
            session.id,
            &structures_blob,
            &metadata_value,
            &attachments_blob,
            metadata.target_url.as_deref(),
            archiving_timestamp.map(|t| t.to_rfc3339()).as_deref(),
            archiving_timezone.as_deref(),
            PARSE_ALGORITHM_VERSION,
        )
        .await?;
    Ok(())
}

#[derive(Default)]
struct StructureSink {
    structures: Vec<Structure>,
}

impl EntrySink for StructureSink {
    fn entry(&mut self, entry: HarEntry) -> anyhow::Result<()> {
        self.structures.extend(structures_from_entry(&entry));
        Ok(())
    }
}

/// Interpret an ISO timestamp in the host zone and convert to UTC,
/// returning the assumed offset alongside.
fn local_timestamp_to_utc(raw: &str) -> Option<(DateTime<Utc>, String)> {
    // Zone-carrying timestamps are taken at face value.
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some((dt.with_timezone(&Utc), dt.offset().to_string()));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()?;
    let local = Local.from_local_datetime(&naive).earliest()?;
    let zone = local.offset().to_string();
    Some((local.with_timezone(&Utc), zone))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoned_timestamp_taken_verbatim() {
        let (utc, zone) = local_timestamp_to_utc("2025-05-20T09:51:23+03:00").unwrap();
        assert_eq!(utc.to_rfc3339(), "2025-05-20T06:51:23+00:00");
        assert_eq!(zone, "+03:00");
    }

    #[test]
    fn test_naive_timestamp_uses_host_zone() {
        let (utc, zone) = local_timestamp_to_utc("2025-05-20T09:51:23").unwrap();
        // The exact UTC instant depends on the host zone; the recorded zone
        // must describe the same offset that was applied.
        let local = Local
            .from_local_datetime(
                &NaiveDateTime::parse_from_str("2025-05-20T09:51:23", "%Y-%m-%dT%H:%M:%S")
                    .unwrap(),
            )
            .earliest()
            .unwrap();
        assert_eq!(utc, local.with_timezone(&Utc));
        assert_eq!(zone, local.offset().to_string());
    }

    #[test]
    fn test_garbage_timestamp_is_none() {
        assert!(local_timestamp_to_utc("yesterday").is_none());
    }
}
