//! Environment-driven configuration for Harbor.

use std::env;
use std::path::PathBuf;

use crate::repository::pool::SqlitePool;

/// Runtime settings, resolved once at startup from the environment.
///
/// Every value has an `HARBOR_*` variable; a `.env` file is honored because
/// `dotenvy` runs before settings are loaded.
#[derive(Debug, Clone)]
pub struct Settings {
    /// SQLite database path or URL.
    pub database_url: String,
    /// Root directory containing one subdirectory per archive session.
    pub archives_dir: PathBuf,
    /// Root directory for generated thumbnails.
    pub thumbnails_dir: PathBuf,
    /// Public prefix substituted for local file paths in API responses.
    pub public_files_root: Option<String>,
    /// Secret for per-file token derivation. Hex-decoded when it looks hex.
    pub file_token_secret: Option<String>,
    /// Transcoder binary (mux / frame extraction).
    pub transcoder_bin: String,
    /// Stream inspector binary (probe).
    pub transcoder_probe_bin: String,
    /// Disables all authentication. Local development only.
    pub dev_bypass_auth: bool,
    /// Fetch complete video tracks over the network when segments are partial.
    pub download_full_tracks: bool,
}

impl Settings {
    /// Load settings from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            env::var("HARBOR_DATABASE_URL").unwrap_or_else(|_| "harbor.db".to_string());
        let archives_dir =
            PathBuf::from(env::var("HARBOR_ARCHIVES_DIR").unwrap_or_else(|_| "archives".into()));
        let thumbnails_dir = PathBuf::from(
            env::var("HARBOR_THUMBNAILS_DIR").unwrap_or_else(|_| "thumbnails".into()),
        );

        Ok(Self {
            database_url,
            archives_dir,
            thumbnails_dir,
            public_files_root: env::var("HARBOR_PUBLIC_FILES_ROOT").ok().filter(|s| !s.is_empty()),
            file_token_secret: env::var("HARBOR_FILE_TOKEN_SECRET").ok().filter(|s| !s.is_empty()),
            transcoder_bin: env::var("HARBOR_TRANSCODER_BIN").unwrap_or_else(|_| "ffmpeg".into()),
            transcoder_probe_bin: env::var("HARBOR_TRANSCODER_PROBE_BIN")
                .unwrap_or_else(|_| "ffprobe".into()),
            dev_bypass_auth: flag("HARBOR_DEV_BYPASS_AUTH"),
            download_full_tracks: flag("HARBOR_DOWNLOAD_FULL_TRACKS"),
        })
    }

    /// Create the database pool for these settings.
    pub fn create_pool(&self) -> SqlitePool {
        SqlitePool::new(&self.database_url)
    }

    /// The secret used for file-token key derivation.
    ///
    /// Accepts raw strings or hex; hex-looking even-length values decode to
    /// raw bytes so operators can paste `openssl rand -hex 32` output.
    pub fn file_token_secret_bytes(&self) -> Option<Vec<u8>> {
        let s = self.file_token_secret.as_ref()?;
        if s.len() % 2 == 0 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            if let Ok(bytes) = hex::decode(s) {
                return Some(bytes);
            }
        }
        Some(s.as_bytes().to_vec())
    }
}

fn flag(name: &str) -> bool {
    matches!(
        env::var(name).unwrap_or_default().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
