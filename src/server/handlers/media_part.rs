//! Media part create/update/delete.

use axum::extract::{Path, State};
use axum::Json;

use crate::models::MediaPart;
use crate::server::auth::require_session;
use crate::server::{ApiError, AppState, Viewer};

/// Create a media part (id 0) or update an existing one.
pub async fn upsert_media_part(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(part): Json<MediaPart>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_session(&state, &viewer).await?;

    if state.entities.media_by_id(part.media_id).await?.is_none() {
        return Err(ApiError::BadRequest(format!(
            "media {} does not exist",
            part.media_id
        )));
    }

    let id = if part.id == 0 {
        state.entities.insert_media_part(&part).await?
    } else {
        if !state.entities.update_media_part(&part).await? {
            return Err(ApiError::NotFound);
        }
        part.id
    };
    Ok(Json(serde_json::json!({ "id": id })))
}

pub async fn delete_media_part(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_session(&state, &viewer).await?;
    if !state.entities.delete_media_part(id).await? {
        return Err(ApiError::NotFound);
    }
    Ok(Json(serde_json::json!({ "deleted": id })))
}
