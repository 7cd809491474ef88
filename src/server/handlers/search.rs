//! Search endpoint.

use axum::extract::State;
use axum::Json;

use crate::server::auth::require_session;
use crate::server::search::{run_search, SearchError, SearchQuery, SearchResult};
use crate::server::{ApiError, AppState, Viewer};

pub async fn search_entities(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(query): Json<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    require_session(&state, &viewer).await?;

    match run_search(&state.pool, &query).await {
        Ok(results) => Ok(Json(results)),
        Err(SearchError::Injection(column)) => {
            tracing::warn!(%column, "rejected search filter referencing non-whitelisted column");
            state
                .users
                .log_event(
                    "injection_attempt",
                    viewer.permissions.user_id,
                    Some(&viewer.path),
                    Some(&column),
                )
                .await;
            Err(ApiError::BadRequest("invalid filter".to_string()))
        }
        Err(SearchError::BadValue) => {
            Err(ApiError::BadRequest("unsupported filter value".to_string()))
        }
        Err(SearchError::Db(err)) => Err(err.into()),
    }
}
