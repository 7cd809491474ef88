//! Photo extraction from captured response bodies.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{canonical_cdn_url, filename_from_url, AssetMap};
use crate::har::HarEntry;

/// Extensions treated as photo assets.
const IMAGE_EXTENSIONS: [&str; 9] = [
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "heic", "heif",
];

/// Whether a URL names an image asset (by extension, query ignored).
pub fn is_image_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{}", ext)))
}

/// Collects image responses during a HAR pass and materializes them under
/// the session's `photos/` directory.
pub struct PhotoExtractor {
    output_dir: PathBuf,
    files: HashMap<String, PathBuf>,
}

impl PhotoExtractor {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            files: HashMap::new(),
        }
    }

    /// Offer one HAR entry; writes the decoded bytes when it is an image.
    ///
    /// Re-runs are idempotent: an existing non-empty file is reused unless
    /// the new response carries more bytes (a higher-quality duplicate).
    pub fn consume(&mut self, entry: &HarEntry) -> anyhow::Result<()> {
        if !is_image_url(&entry.url) || !entry.has_body() {
            return Ok(());
        }
        let Some(bytes) = entry.decoded_body() else {
            return Ok(());
        };
        if bytes.is_empty() {
            return Ok(());
        }
        let Some(filename) = filename_from_url(&entry.url) else {
            return Ok(());
        };

        let path = self.output_dir.join(filename);
        let existing_len = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if existing_len < bytes.len() as u64 {
            std::fs::create_dir_all(&self.output_dir)?;
            std::fs::write(&path, &bytes)?;
        }

        self.files.insert(canonical_cdn_url(&entry.url), path);
        Ok(())
    }

    /// Number of distinct photos materialized so far.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Canonical-URL to local-path map for the entity mapper join.
    pub fn into_files(self) -> AssetMap {
        self.files
    }
}
