//! Share link issuance and lookup.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::models::ShareableEntity;
use crate::server::auth::require_session;
use crate::server::{ApiError, AppState, Viewer};

#[derive(Deserialize)]
pub struct ShareRequest {
    pub entity: String,
    pub entity_id: i64,
}

/// Issue a share link for one entity, reusing an existing valid link.
pub async fn issue_share_link(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(request): Json<ShareRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_session(&state, &viewer).await?;
    let entity = ShareableEntity::from_str(&request.entity)
        .ok_or_else(|| ApiError::BadRequest(format!("{:?} is not shareable", request.entity)))?;

    if let Some(existing) = state
        .users
        .share_link_for_entity(entity, request.entity_id)
        .await?
    {
        return Ok(Json(serde_json::json!({ "link_suffix": existing.link_suffix })));
    }

    let user_id = viewer.permissions.user_id.unwrap_or(0);
    let suffix = state
        .users
        .create_share_link(user_id, entity, request.entity_id)
        .await?;
    Ok(Json(serde_json::json!({ "link_suffix": suffix })))
}

/// Existing valid share link for one entity.
pub async fn get_share_link(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((entity, id)): Path<(String, i64)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_session(&state, &viewer).await?;
    let entity = ShareableEntity::from_str(&entity)
        .ok_or_else(|| ApiError::BadRequest(format!("{:?} is not shareable", entity)))?;
    let link = state
        .users
        .share_link_for_entity(entity, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(serde_json::json!({ "link_suffix": link.link_suffix })))
}

/// Invalidate one share link by suffix.
pub async fn delete_share_link(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(suffix): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_session(&state, &viewer).await?;
    state.users.invalidate_share_link(&suffix).await?;
    Ok(Json(serde_json::json!({ "invalidated": suffix })))
}
