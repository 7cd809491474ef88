//! Thumbnail generation.
//!
//! Produces fixed-size JPEG previews for image and video media. Video
//! frames come from the external transcoder (first decodable frame among a
//! few early candidates, bounded by a timeout). A failed generation stores
//! an `error: ...` sentinel in the thumbnail-path column so the row is not
//! retried on every pass.

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::DynamicImage;
use sha2::{Digest, Sha256};

use crate::assets::transcoder::Transcoder;
use crate::config::Settings;
use crate::models::{Media, MediaKind};
use crate::repository::EntityRepository;

/// Thumbnails fit within this square box, aspect ratio preserved.
pub const THUMBNAIL_SIZE: u32 = 128;
/// Frame indexes tried in order for video previews.
const FRAME_CANDIDATES: [u32; 4] = [0, 1, 10, 30];
/// Per-media decode budget.
const DECODE_TIMEOUT: Duration = Duration::from_secs(10);

/// Stable thumbnail file name for one media row.
pub fn thumbnail_file_name(media: &Media) -> String {
    let identity = media.platform_id.as_deref().unwrap_or(&media.url);
    let input = format!("{}_{}x{}", identity, THUMBNAIL_SIZE, THUMBNAIL_SIZE);
    let digest = Sha256::digest(input.as_bytes());
    format!("{}.jpg", &hex::encode(digest)[..32])
}

/// Generate thumbnails for every media row still lacking one.
///
/// Safe to run concurrently with the ingestion pipeline: it only reads
/// committed media rows and its single shared write is the idempotent
/// thumbnail-path column update.
pub async fn generate_missing(
    entities: &EntityRepository,
    settings: &Settings,
) -> anyhow::Result<usize> {
    let mut generated = 0;
    let mut transcoder: Option<Transcoder> = None;

    loop {
        let batch = entities.media_missing_thumbnails(10).await?;
        if batch.is_empty() {
            break;
        }
        for media in batch {
            if media.kind == MediaKind::Video && transcoder.is_none() {
                transcoder = Some(Transcoder::discover(
                    &settings.transcoder_bin,
                    &settings.transcoder_probe_bin,
                )?);
            }
            match generate_one(&media, settings, transcoder.as_ref()).await {
                Ok(path) => {
                    entities
                        .set_thumbnail_path(media.id, &path.to_string_lossy())
                        .await?;
                    generated += 1;
                }
                Err(err) => {
                    tracing::warn!(media_id = media.id, error = %err, "thumbnail generation failed");
                    entities
                        .set_thumbnail_path(media.id, &format!("error: {}", err))
                        .await?;
                }
            }
        }
    }
    Ok(generated)
}

async fn generate_one(
    media: &Media,
    settings: &Settings,
    transcoder: Option<&Transcoder>,
) -> anyhow::Result<PathBuf> {
    let local_path = media
        .local_path
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("media has no local file"))?;
    let source = PathBuf::from(local_path);
    if !source.is_file() {
        anyhow::bail!("local file {} missing", source.display());
    }

    let image = match media.kind {
        MediaKind::Image => decode_image(source.clone()).await?,
        MediaKind::Video => {
            let transcoder =
                transcoder.ok_or_else(|| anyhow::anyhow!("no transcoder for video thumbnail"))?;
            first_decodable_frame(transcoder, &source).await?
        }
        MediaKind::Audio => anyhow::bail!("audio media has no thumbnail"),
    };

    let thumbnail = image.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
    std::fs::create_dir_all(&settings.thumbnails_dir)?;
    let path = settings.thumbnails_dir.join(thumbnail_file_name(media));
    thumbnail.to_rgb8().save_with_format(&path, image::ImageFormat::Jpeg)?;
    Ok(path)
}

async fn decode_image(path: PathBuf) -> anyhow::Result<DynamicImage> {
    let decoded = tokio::time::timeout(
        DECODE_TIMEOUT,
        tokio::task::spawn_blocking(move || image::open(path)),
    )
    .await
    .map_err(|_| anyhow::anyhow!("image decode timed out"))??;
    Ok(decoded?)
}

/// Try a few early frames in order, returning the first that decodes.
async fn first_decodable_frame(
    transcoder: &Transcoder,
    source: &Path,
) -> anyhow::Result<DynamicImage> {
    let result = tokio::time::timeout(DECODE_TIMEOUT, async {
        for frame in FRAME_CANDIDATES {
            let tmp = tempfile::Builder::new().suffix(".png").tempfile()?;
            if transcoder
                .extract_frame(source, frame, tmp.path())
                .await
                .is_err()
            {
                continue;
            }
            let path = tmp.path().to_path_buf();
            match tokio::task::spawn_blocking(move || image::open(path)).await? {
                Ok(image) => return Ok(image),
                Err(err) => {
                    tracing::debug!(frame, error = %err, "frame did not decode");
                }
            }
        }
        anyhow::bail!("no decodable frame among {:?}", FRAME_CANDIDATES)
    })
    .await
    .map_err(|_| anyhow::anyhow!("video frame decode timed out"))?;
    result
}
