//! Media endpoints.

use axum::extract::{Path, RawQuery, State};
use axum::Json;

use crate::models::{ArchiveSession, MediaPart, ShareableEntity};
use crate::server::auth::authorize_entity_view;
use crate::server::enrich::{build_graph, EntityGraph, FileRefContext, TransformConfig};
use crate::server::{ApiError, AppState, Viewer};

/// Enriched media graph: the media nested under its post and account.
pub async fn get_media(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    RawQuery(query): RawQuery,
) -> Result<Json<EntityGraph>, ApiError> {
    authorize_entity_view(&state, &viewer, ShareableEntity::Media, id).await?;

    let media = state
        .entities
        .media_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let post = match media.post_id {
        Some(post_id) => state.entities.post_by_id(post_id).await?,
        None => None,
    };
    let accounts = match post.as_ref().and_then(|p| p.account_id) {
        Some(account_id) => state
            .entities
            .account_by_id(account_id)
            .await?
            .into_iter()
            .collect(),
        None => Vec::new(),
    };

    let config = TransformConfig::from_query(query.as_deref());
    let refs = FileRefContext {
        settings: &state.settings,
        file_tokens: state.file_tokens.as_ref().as_ref(),
        session_token: viewer.session_token(),
    };
    Ok(Json(build_graph(
        accounts,
        post.into_iter().collect(),
        vec![media],
        &config,
        &refs,
    )))
}

/// Raw upstream payload for one canonical media row.
pub async fn media_data(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize_entity_view(&state, &viewer, ShareableEntity::Media, id).await?;
    let media = state
        .entities
        .media_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(media.data.unwrap_or(serde_json::Value::Null)))
}

/// User-defined parts of one media asset.
pub async fn media_parts(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<Vec<MediaPart>>, ApiError> {
    authorize_entity_view(&state, &viewer, ShareableEntity::Media, id).await?;
    if state.entities.media_by_id(id).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(state.entities.media_parts_for_media(id).await?))
}

/// Archive sessions in which this media was observed.
pub async fn media_sessions(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ArchiveSession>>, ApiError> {
    authorize_entity_view(&state, &viewer, ShareableEntity::Media, id).await?;
    let session_ids = state.entities.sessions_for_media(id).await?;
    let mut sessions = state.sessions.get_many(&session_ids).await?;
    for session in &mut sessions {
        session.structures = None;
    }
    Ok(Json(sessions))
}
