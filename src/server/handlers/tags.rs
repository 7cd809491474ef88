//! Tag autocomplete.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::models::Tag;
use crate::server::auth::require_session;
use crate::server::{ApiError, AppState, Viewer};

#[derive(Deserialize)]
pub struct TagQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn autocomplete_tags(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<TagQuery>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    require_session(&state, &viewer).await?;
    Ok(Json(state.users.autocomplete_tags(&query.q).await?))
}
