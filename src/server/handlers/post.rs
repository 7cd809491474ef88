//! Post endpoints.

use axum::extract::{Path, RawQuery, State};
use axum::Json;

use crate::models::{ArchiveSession, ShareableEntity};
use crate::server::auth::authorize_entity_view;
use crate::server::enrich::{build_graph, EntityGraph, FileRefContext, TransformConfig};
use crate::server::{ApiError, AppState, Viewer};

/// Enriched post graph: the post nested under its account, with media.
pub async fn get_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    RawQuery(query): RawQuery,
) -> Result<Json<EntityGraph>, ApiError> {
    authorize_entity_view(&state, &viewer, ShareableEntity::Post, id).await?;

    let post = state
        .entities
        .post_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let accounts = match post.account_id {
        Some(account_id) => state
            .entities
            .account_by_id(account_id)
            .await?
            .into_iter()
            .collect(),
        None => Vec::new(),
    };
    let media = state.entities.media_by_posts(&[post.id]).await?;

    let config = TransformConfig::from_query(query.as_deref());
    let refs = FileRefContext {
        settings: &state.settings,
        file_tokens: state.file_tokens.as_ref().as_ref(),
        session_token: viewer.session_token(),
    };
    Ok(Json(build_graph(accounts, vec![post], media, &config, &refs)))
}

/// Raw upstream payload for one canonical post.
pub async fn post_data(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize_entity_view(&state, &viewer, ShareableEntity::Post, id).await?;
    let post = state
        .entities
        .post_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(post.data.unwrap_or(serde_json::Value::Null)))
}

/// Archive sessions in which this post was observed.
pub async fn post_sessions(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ArchiveSession>>, ApiError> {
    authorize_entity_view(&state, &viewer, ShareableEntity::Post, id).await?;
    let session_ids = state.entities.sessions_for_post(id).await?;
    let mut sessions = state.sessions.get_many(&session_ids).await?;
    for session in &mut sessions {
        session.structures = None;
    }
    Ok(Json(sessions))
}
