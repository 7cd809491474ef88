//! Video track reassembly and muxing.
//!
//! A platform video arrives as many ranged responses sharing one opaque
//! asset id. Tracks (audio, video, alternates) share the id but differ by
//! filename stem; each track arrives as byte-range segments addressed by
//! `bytestart`/`byteend` query parameters. Reassembly writes each track to
//! its own file, validates it with the transcoder probe, classifies it as
//! audio or video, and muxes the best audio and video tracks into one
//! container.
//!
//! Any one track failing never aborts other tracks or other assets; an
//! asset with no usable track is recorded with no preferred file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::transcoder::Transcoder;
use super::{canonical_cdn_url, extract_asset_id, AssetMap, MediaError};
use crate::har::HarEntry;

/// Tracks smaller than this are considered corrupt and abandoned.
pub const MIN_TRACK_BYTES: usize = 1024;

/// One byte-range response for a track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSegment {
    pub start: Option<u64>,
    pub end: Option<u64>,
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// All observed segments for one track of one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaTrack {
    /// URL prefix up to (excluding) the container extension.
    pub base_url: String,
    /// Original URL with the range parameters removed; replaying it fetches
    /// the complete track.
    pub full_url: String,
    pub segments: Vec<MediaSegment>,
}

/// Where a materialized track's bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackOrigin {
    HarSegments,
    FullTrack,
}

impl TrackOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HarSegments => "har_segments",
            Self::FullTrack => "full_track",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Outcome for one materialized track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackMeta {
    pub name: String,
    pub origin: TrackOrigin,
    pub kind: Option<TrackKind>,
    pub file_size: u64,
}

/// Final result for one asset id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledAsset {
    pub asset_id: i64,
    /// Best available file: muxed > video-only > audio-only > none.
    pub preferred: Option<PathBuf>,
    /// All files retained for this asset.
    pub files: Vec<PathBuf>,
    pub tracks: Vec<TrackMeta>,
    /// Canonical CDN URLs this asset answers for (one per track stem).
    pub canonical_urls: Vec<String>,
}

impl AssembledAsset {
    fn empty(asset_id: i64, canonical_urls: Vec<String>) -> Self {
        Self {
            asset_id,
            preferred: None,
            files: Vec::new(),
            tracks: Vec::new(),
            canonical_urls,
        }
    }
}

/// Groups mp4 responses by asset id and track stem during a HAR pass.
#[derive(Debug, Default)]
pub struct VideoCollector {
    assets: BTreeMap<i64, BTreeMap<String, MediaTrack>>,
}

impl VideoCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer one HAR entry; collects it when it is a ranged mp4 response.
    pub fn consume(&mut self, entry: &HarEntry) {
        if !entry.url.contains(".mp4") || !entry.has_body() {
            return;
        }
        let Some(data) = entry.decoded_body() else {
            return;
        };
        let Some(asset_id) = extract_asset_id(&entry.url) else {
            return;
        };
        let base_url = entry.url.split(".mp4").next().unwrap_or("").to_string();
        let Some(stem) = base_url.rsplit('/').next().map(str::to_string) else {
            return;
        };
        if stem.is_empty() {
            return;
        }

        let track = self
            .assets
            .entry(asset_id)
            .or_default()
            .entry(stem)
            .or_insert_with(|| MediaTrack {
                base_url: base_url.clone(),
                full_url: strip_range_params(&entry.url),
                segments: Vec::new(),
            });
        track.segments.push(MediaSegment {
            start: query_param_u64(&entry.url, "bytestart"),
            end: query_param_u64(&entry.url, "byteend"),
            data,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn into_assets(self) -> BTreeMap<i64, BTreeMap<String, MediaTrack>> {
        self.assets
    }
}

/// Remove `bytestart`/`byteend` from a segment URL, keeping everything else.
fn strip_range_params(url: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };
    let remaining: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "bytestart" && k != "byteend")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if remaining.is_empty() {
        parsed.set_query(None);
    } else {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &remaining {
            serializer.append_pair(k, v);
        }
        parsed.set_query(Some(&serializer.finish()));
    }
    parsed.to_string()
}

fn query_param_u64(url: &str, name: &str) -> Option<u64> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == name)
        .and_then(|(_, v)| v.parse().ok())
}

/// Compose a complete track from its segments.
///
/// Segments are sorted by start offset and written into a buffer sized by
/// the highest end offset; later segments overwrite overlaps. A segment
/// with no start replaces the buffer wholesale (rare fallback for
/// unranged responses).
pub fn compose_segments(track: &MediaTrack) -> Vec<u8> {
    let mut segments: Vec<&MediaSegment> = track.segments.iter().collect();
    segments.sort_by_key(|s| s.start.unwrap_or(0));

    let max_end = segments
        .iter()
        .filter_map(|s| s.end)
        .max()
        .map(|e| e as usize + 1)
        .unwrap_or(0);
    let mut buffer = vec![0u8; max_end];

    for segment in segments {
        match segment.start {
            None => buffer = segment.data.clone(),
            Some(start) => {
                let start = start as usize;
                let end = start + segment.data.len();
                if end > buffer.len() {
                    buffer.resize(end, 0);
                }
                buffer[start..end].copy_from_slice(&segment.data);
            }
        }
    }
    buffer
}

/// File name of one materialized track.
pub fn track_file_name(asset_id: i64, stem: &str, origin: TrackOrigin) -> String {
    format!("track_{}_{}_{}.mp4", asset_id, stem, origin.as_str())
}

/// File name of the muxed output for a given video track file.
pub fn muxed_file_name(video_track: &Path) -> PathBuf {
    let stem = video_track
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("track");
    video_track.with_file_name(format!("{}_with_audio.mp4", stem))
}

/// Canonical CDN URL for one track stem.
fn track_canonical_url(base_url: &str) -> String {
    canonical_cdn_url(&format!("{}.mp4", base_url))
}

/// Materializes collected video assets under a session's `videos/` dir.
pub struct VideoAssembler<'a> {
    output_dir: PathBuf,
    transcoder: &'a Transcoder,
    client: Option<reqwest::Client>,
    download_full_tracks: bool,
}

impl<'a> VideoAssembler<'a> {
    pub fn new(output_dir: &Path, transcoder: &'a Transcoder) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            transcoder,
            client: None,
            download_full_tracks: false,
        }
    }

    /// Enable best-effort full-track refetch over the network.
    pub fn with_full_track_downloads(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self.download_full_tracks = true;
        self
    }

    /// Assemble every collected asset. Individual failures are recorded on
    /// the asset and never propagate.
    pub async fn assemble_all(
        &self,
        collector: VideoCollector,
    ) -> Result<Vec<AssembledAsset>, MediaError> {
        let assets = collector.into_assets();
        if !assets.is_empty() {
            std::fs::create_dir_all(&self.output_dir)?;
        }
        let mut results = Vec::with_capacity(assets.len());
        for (asset_id, tracks) in assets {
            results.push(self.assemble_asset(asset_id, tracks).await);
        }
        Ok(results)
    }

    async fn assemble_asset(
        &self,
        asset_id: i64,
        tracks: BTreeMap<String, MediaTrack>,
    ) -> AssembledAsset {
        let canonical_urls: Vec<String> = tracks
            .values()
            .map(|t| track_canonical_url(&t.base_url))
            .collect();

        let mut audio_best: Option<(PathBuf, u64)> = None;
        let mut video_best: Option<(PathBuf, u64)> = None;
        let mut track_meta = Vec::new();

        for (stem, track) in &tracks {
            let Some((path, origin, size)) = self.materialize_track(asset_id, stem, track).await
            else {
                continue;
            };

            let kind = match self.transcoder.has_audio_stream(&path).await {
                Ok(true) => TrackKind::Audio,
                Ok(false) => TrackKind::Video,
                Err(err) => {
                    tracing::warn!(asset_id, track = %stem, error = %err, "stream probe failed, abandoning track");
                    let _ = std::fs::remove_file(&path);
                    continue;
                }
            };
            track_meta.push(TrackMeta {
                name: stem.clone(),
                origin,
                kind: Some(kind),
                file_size: size,
            });

            // Keep only the largest candidate per class.
            let slot = match kind {
                TrackKind::Audio => &mut audio_best,
                TrackKind::Video => &mut video_best,
            };
            let replace = slot.as_ref().map(|(_, held)| size > *held).unwrap_or(true);
            if replace {
                if let Some((loser, _)) = slot.replace((path, size)) {
                    let _ = std::fs::remove_file(loser);
                }
            } else {
                let _ = std::fs::remove_file(&path);
            }
        }

        let mut files = Vec::new();
        let preferred = match (&video_best, &audio_best) {
            (Some((video, _)), Some((audio, _))) => {
                let muxed = muxed_file_name(video);
                match self.transcoder.mux(video, audio, &muxed).await {
                    Ok(()) => {
                        files.push(muxed.clone());
                        Some(muxed)
                    }
                    Err(err) => {
                        tracing::warn!(asset_id, error = %err, "mux failed, keeping separate tracks");
                        files.push(video.clone());
                        files.push(audio.clone());
                        Some(video.clone())
                    }
                }
            }
            (Some((video, _)), None) => {
                files.push(video.clone());
                Some(video.clone())
            }
            (None, Some((audio, _))) => {
                files.push(audio.clone());
                Some(audio.clone())
            }
            (None, None) => None,
        };

        if preferred.is_none() {
            tracing::warn!(asset_id, "no usable track for asset");
            return AssembledAsset::empty(asset_id, canonical_urls);
        }

        AssembledAsset {
            asset_id,
            preferred,
            files,
            tracks: track_meta,
            canonical_urls,
        }
    }

    /// Write one track to disk, preferring a full-track refetch when
    /// enabled, falling back to segment composition. Returns nothing when
    /// the result is too small or fails the container probe.
    async fn materialize_track(
        &self,
        asset_id: i64,
        stem: &str,
        track: &MediaTrack,
    ) -> Option<(PathBuf, TrackOrigin, u64)> {
        let (data, origin) = match self.fetch_full_track(&track.full_url).await {
            Some(bytes) => (bytes, TrackOrigin::FullTrack),
            None => (compose_segments(track), TrackOrigin::HarSegments),
        };

        if data.len() < MIN_TRACK_BYTES {
            tracing::debug!(asset_id, track = %stem, size = data.len(), "track too small, abandoning");
            return None;
        }

        let path = self.output_dir.join(track_file_name(asset_id, stem, origin));
        if let Err(err) = std::fs::write(&path, &data) {
            tracing::warn!(asset_id, track = %stem, error = %err, "failed to write track file");
            return None;
        }

        match self.transcoder.probe_valid(&path).await {
            Ok(true) => Some((path, origin, data.len() as u64)),
            Ok(false) => {
                tracing::warn!(asset_id, track = %stem, "track failed container probe, abandoning");
                let _ = std::fs::remove_file(&path);
                None
            }
            Err(err) => {
                tracing::warn!(asset_id, track = %stem, error = %err, "probe error, abandoning track");
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    async fn fetch_full_track(&self, url: &str) -> Option<Vec<u8>> {
        if !self.download_full_tracks {
            return None;
        }
        let client = self.client.as_ref()?;
        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                resp.bytes().await.ok().map(|b| b.to_vec())
            }
            Ok(resp) => {
                tracing::debug!(url, status = %resp.status(), "full track fetch refused");
                None
            }
            Err(err) => {
                tracing::debug!(url, error = %err, "full track fetch failed");
                None
            }
        }
    }
}

/// Register every assembled asset's canonical URLs in the shared asset map.
pub fn extend_asset_map(map: &mut AssetMap, assets: &[AssembledAsset]) {
    for asset in assets {
        let Some(preferred) = &asset.preferred else {
            continue;
        };
        for canonical in &asset.canonical_urls {
            map.insert(canonical.clone(), preferred.clone());
        }
    }
}
