//! Account endpoints.

use axum::extract::{Path, RawQuery, State};
use axum::Json;

use crate::models::{ArchiveSession, ShareableEntity};
use crate::server::auth::authorize_entity_view;
use crate::server::enrich::{build_graph, EntityGraph, FileRefContext, TransformConfig};
use crate::server::{ApiError, AppState, Viewer};

/// Enriched account graph: the account with its posts and their media.
pub async fn get_account(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    RawQuery(query): RawQuery,
) -> Result<Json<EntityGraph>, ApiError> {
    authorize_entity_view(&state, &viewer, ShareableEntity::Account, id).await?;

    let account = state
        .entities
        .account_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let posts = state.entities.posts_by_account(id).await?;
    let post_ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let media = state.entities.media_by_posts(&post_ids).await?;

    let config = TransformConfig::from_query(query.as_deref());
    let refs = FileRefContext {
        settings: &state.settings,
        file_tokens: state.file_tokens.as_ref().as_ref(),
        session_token: viewer.session_token(),
    };
    Ok(Json(build_graph(vec![account], posts, media, &config, &refs)))
}

/// Raw upstream payload for one canonical account.
pub async fn account_data(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize_entity_view(&state, &viewer, ShareableEntity::Account, id).await?;
    let account = state
        .entities
        .account_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(account.data.unwrap_or(serde_json::Value::Null)))
}

/// Archive sessions in which this account was observed.
pub async fn account_sessions(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ArchiveSession>>, ApiError> {
    authorize_entity_view(&state, &viewer, ShareableEntity::Account, id).await?;
    let session_ids = state.entities.sessions_for_account(id).await?;
    let mut sessions = state.sessions.get_many(&session_ids).await?;
    for session in &mut sessions {
        session.structures = None;
    }
    Ok(Json(sessions))
}
