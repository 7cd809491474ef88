//! Annotation writes: set notes and replace the tag set of one entity.

use axum::extract::{Path, State};
use axum::Json;

use crate::models::Annotation;
use crate::server::auth::require_session;
use crate::server::{ApiError, AppState, Viewer};

pub async fn annotate_entity(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((entity, id)): Path<(String, i64)>,
    Json(annotation): Json<Annotation>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_session(&state, &viewer).await?;

    let updated = match entity.as_str() {
        "account" => state.entities.annotate_account(id, &annotation).await?,
        "post" => state.entities.annotate_post(id, &annotation).await?,
        "media" => state.entities.annotate_media(id, &annotation).await?,
        other => {
            return Err(ApiError::BadRequest(format!(
                "{:?} is not an annotatable entity",
                other
            )))
        }
    };
    if !updated {
        return Err(ApiError::NotFound);
    }
    Ok(Json(serde_json::json!({ "annotated": id })))
}
