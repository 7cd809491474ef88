//! Media asset extraction from captured response bytes.
//!
//! Photos are decoded straight out of base64 response bodies. Videos are
//! reassembled from byte-range segments per asset id and muxed by the
//! external transcoder. Both producers key their output by a canonical CDN
//! URL so the entity mapper can join assets to media records.

pub mod photos;
pub mod transcoder;
pub mod videos;

use std::collections::HashMap;
use std::path::PathBuf;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// CDN host used in canonical asset URLs.
pub const CDN_HOST: &str = "scontent.cdninstagram.com";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("transcoder not available: {0}")]
    TranscoderUnavailable(String),
    #[error("transcoder failed: {0}")]
    TranscoderFailed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Canonical-URL to local-file map shared by both extractors.
pub type AssetMap = HashMap<String, PathBuf>;

/// Last path component of a URL with the query stripped.
pub fn filename_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Canonical CDN URL: host plus filename, query stripped.
///
/// This is the join key between an asset extracted from bytes and a media
/// record extracted from a structure, so it must be produced identically by
/// every caller.
pub fn canonical_cdn_url(url: &str) -> String {
    let filename = filename_from_url(url).unwrap_or("");
    format!("https://{}/v/{}", CDN_HOST, filename)
}

/// Extract the opaque asset id that groups one video's tracks.
///
/// The `efg` query parameter carries base64url-encoded JSON with an
/// `xpv_asset_id` field. When the parameter is missing or unreadable the id
/// falls back to a digest of the track filename stem so segments of the same
/// track still group together.
pub fn extract_asset_id(url: &str) -> Option<i64> {
    if let Ok(parsed) = url::Url::parse(url) {
        for (key, value) in parsed.query_pairs() {
            if key == "efg" {
                if let Some(id) = decode_efg(&value) {
                    return Some(id);
                }
            }
        }
    }
    fallback_asset_id(url)
}

fn decode_efg(value: &str) -> Option<i64> {
    let stripped = value.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(stripped).ok()?;
    let json: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    match &json["xpv_asset_id"] {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Digest-derived id for URLs without a decodable `efg` parameter.
fn fallback_asset_id(url: &str) -> Option<i64> {
    let stem = url.split(".mp4").next()?.rsplit('/').next()?;
    if stem.is_empty() {
        return None;
    }
    let digest = Sha256::digest(stem.as_bytes());
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&digest[..8]);
    Some(i64::from_be_bytes(buf) & i64::MAX)
}
