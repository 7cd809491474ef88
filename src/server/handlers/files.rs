//! Token-gated static file serving for materialized assets.

use std::path::{Component, Path as FsPath, PathBuf};

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::server::{ApiError, AppState};

#[derive(Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Serve one materialized file. The per-file token must have been issued
/// for exactly this request path; a token for any other path fails the
/// AEAD open and is indistinguishable from a forged one.
pub async fn serve_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<FileQuery>,
) -> Result<Response, ApiError> {
    let serving_path = format!("/files/{}", path);

    if !state.settings.dev_bypass_auth {
        let Some(service) = state.file_tokens.as_ref().as_ref() else {
            return Err(ApiError::Unauthorized);
        };
        let Some(token) = query.token.as_deref() else {
            state
                .users
                .log_event("unauthorized_access", None, Some(&serving_path), None)
                .await;
            return Err(ApiError::Unauthorized);
        };
        let login_token = service.verify(token, &serving_path).map_err(|_| {
            ApiError::Unauthorized
        })?;
        let permissions = state.users.check_token(&login_token).await?;
        if !permissions.valid {
            state
                .users
                .log_event("unauthorized_access", None, Some(&serving_path), None)
                .await;
            return Err(ApiError::Unauthorized);
        }
    }

    let fs_path = resolve_servable_path(
        &path,
        &state.settings.archives_dir,
        &state.settings.thumbnails_dir,
    )
    .ok_or(ApiError::NotFound)?;

    let bytes = tokio::fs::read(&fs_path)
        .await
        .map_err(|_| ApiError::NotFound)?;
    let mime = mime_guess::from_path(&fs_path).first_or_octet_stream();
    Ok((
        [(header::CONTENT_TYPE, mime.as_ref().to_string())],
        bytes,
    )
        .into_response())
}

/// Validate and resolve a served path: plain relative components only, and
/// the result must live under the archives or thumbnails root. The serving
/// path always arrives without a leading slash, so an absolute root is
/// re-applied before the prefix check.
fn resolve_servable_path(
    raw: &str,
    archives_dir: &FsPath,
    thumbnails_dir: &FsPath,
) -> Option<PathBuf> {
    let candidate = PathBuf::from(raw);
    if !candidate
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    for base in [archives_dir, thumbnails_dir] {
        if base.is_absolute() {
            let absolute = PathBuf::from("/").join(&candidate);
            if absolute.starts_with(base) {
                return Some(absolute);
            }
        } else if candidate.starts_with(base) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_traversal() {
        let archives = FsPath::new("archives");
        let thumbs = FsPath::new("thumbnails");
        assert!(resolve_servable_path("archives/s/photos/a.jpg", archives, thumbs).is_some());
        assert!(resolve_servable_path("thumbnails/ab.jpg", archives, thumbs).is_some());
        assert!(resolve_servable_path("archives/../etc/passwd", archives, thumbs).is_none());
        assert!(resolve_servable_path("/etc/passwd", archives, thumbs).is_none());
        assert!(resolve_servable_path("secrets/a.txt", archives, thumbs).is_none());
    }

    #[test]
    fn test_resolve_with_absolute_roots() {
        let archives = FsPath::new("/data/archives");
        let thumbs = FsPath::new("/data/thumbnails");
        assert_eq!(
            resolve_servable_path("data/archives/s/photos/a.jpg", archives, thumbs),
            Some(PathBuf::from("/data/archives/s/photos/a.jpg"))
        );
        assert!(resolve_servable_path("data/other/a.jpg", archives, thumbs).is_none());
    }
}
