//! Stage Extract: asset materialization, entity mapping, persistence.
//!
//! Re-streams the session's HAR for response bytes (the structures blob
//! from the parse stage deliberately carries no bodies), reconstructs
//! photos and videos on disk, maps structures to entity candidates with
//! local files joined in, and persists everything inside one transaction.

use crate::assets::photos::PhotoExtractor;
use crate::assets::transcoder::Transcoder;
use crate::assets::videos::{extend_asset_map, VideoAssembler, VideoCollector};
use crate::assets::AssetMap;
use crate::entities::mapper::map_structures;
use crate::har::{stream_entries, EntrySink, HarEntry};
use crate::models::ArchiveSession;
use crate::repository::entities::PersistStats;
use crate::structures::Structure;

use super::{Pipeline, PipelineError, EXTRACT_ALGORITHM_VERSION};

/// Extract one parsed session: materialize assets, map and persist entities.
pub async fn extract_session(
    pipeline: &Pipeline,
    session: &ArchiveSession,
) -> Result<PersistStats, PipelineError> {
    let archive_dir = pipeline.archive_dir(session);
    let har_path = archive_dir.join("archive.har");
    if !har_path.is_file() {
        return Err(PipelineError::BadInput(format!(
            "HAR file {} does not exist",
            har_path.display()
        )));
    }

    let structures: Vec<Structure> = session
        .structures
        .clone()
        .ok_or_else(|| {
            PipelineError::BadInput("session has no structures blob despite parse marker".into())
        })
        .and_then(|blob| {
            serde_json::from_value(blob)
                .map_err(|e| PipelineError::BadInput(format!("structures blob unreadable: {}", e)))
        })?;

    // Second single-pass sweep over the HAR, this time for response bytes.
    let mut sink = AssetSink {
        photos: PhotoExtractor::new(&archive_dir.join("photos")),
        videos: VideoCollector::new(),
    };
    stream_entries(&har_path, &mut sink)?;

    let mut assets: AssetMap = AssetMap::new();
    let photo_count = sink.photos.len();
    assets.extend(sink.photos.into_files());

    let mut video_count = 0;
    if !sink.videos.is_empty() {
        // The transcoder is only required when there are video assets, so a
        // photos-only session ingests fine on a host without one.
        let settings = pipeline.settings();
        let transcoder =
            Transcoder::discover(&settings.transcoder_bin, &settings.transcoder_probe_bin)?;
        let mut assembler = VideoAssembler::new(&archive_dir.join("videos"), &transcoder);
        if settings.download_full_tracks {
            assembler = assembler.with_full_track_downloads(reqwest::Client::new());
        }
        let assembled = assembler.assemble_all(sink.videos).await?;
        video_count = assembled.iter().filter(|a| a.preferred.is_some()).count();
        extend_asset_map(&mut assets, &assembled);
    }

    let entities = map_structures(&structures, &assets);
    if entities.is_empty() {
        // Benign-empty session: nothing recognizable was captured. The
        // stage marker is still written so the session is not retried.
        tracing::info!(session = %session.external_id, "no entities in session");
    }

    let stats = pipeline
        .entities()
        .persist_session_entities(&entities, session.id)
        .await?;

    tracing::info!(
        session = %session.external_id,
        photos = photo_count,
        videos = video_count,
        "materialized assets"
    );

    pipeline
        .sessions()
        .mark_extracted(session.id, EXTRACT_ALGORITHM_VERSION)
        .await?;
    Ok(stats)
}

struct AssetSink {
    photos: PhotoExtractor,
    videos: VideoCollector,
}

impl EntrySink for AssetSink {
    fn entry(&mut self, entry: HarEntry) -> anyhow::Result<()> {
        self.photos.consume(&entry)?;
        self.videos.consume(&entry);
        Ok(())
    }
}
