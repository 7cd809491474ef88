//! Archive session endpoints.

use axum::extract::{Path, RawQuery, State};
use axum::Json;
use serde::Serialize;

use crate::models::{ArchiveSession, ShareableEntity};
use crate::server::auth::authorize_entity_view;
use crate::server::enrich::{build_graph, EntityGraph, FileRefContext, TransformConfig};
use crate::server::{ApiError, AppState, Viewer};

#[derive(Serialize)]
pub struct SessionWithEntities {
    pub session: ArchiveSession,
    pub entities: EntityGraph,
}

/// One archive session with the entities observed in it.
pub async fn get_archiving_session(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    RawQuery(query): RawQuery,
) -> Result<Json<SessionWithEntities>, ApiError> {
    authorize_entity_view(&state, &viewer, ShareableEntity::ArchivingSession, id).await?;

    let mut session = state.sessions.get(id).await?.ok_or(ApiError::NotFound)?;
    // The structures blob can be tens of megabytes; it stays out of the
    // entity view.
    session.structures = None;

    let (accounts, posts, media) = state.entities.session_entities(id).await?;
    let config = TransformConfig::from_query(query.as_deref());
    let refs = FileRefContext {
        settings: &state.settings,
        file_tokens: state.file_tokens.as_ref().as_ref(),
        session_token: viewer.session_token(),
    };
    let entities = build_graph(accounts, posts, media, &config, &refs);

    Ok(Json(SessionWithEntities { session, entities }))
}
