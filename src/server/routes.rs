//! Router configuration for the web server.

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session acquire/release
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        // Enriched entity graphs
        .route("/account/{id}", get(handlers::get_account))
        .route("/account/data/{id}", get(handlers::account_data))
        .route("/account/sessions/{id}", get(handlers::account_sessions))
        .route("/post/{id}", get(handlers::get_post))
        .route("/post/data/{id}", get(handlers::post_data))
        .route("/post/sessions/{id}", get(handlers::post_sessions))
        .route("/media/{id}", get(handlers::get_media))
        .route("/media/data/{id}", get(handlers::media_data))
        .route("/media/parts/{id}", get(handlers::media_parts))
        .route("/media/sessions/{id}", get(handlers::media_sessions))
        .route(
            "/archiving_session/{id}",
            get(handlers::get_archiving_session),
        )
        // Media parts
        .route("/media_part", post(handlers::upsert_media_part))
        .route("/media_part/{id}", delete(handlers::delete_media_part))
        // Annotations
        .route("/annotate/{entity}/{id}", post(handlers::annotate_entity))
        // Search
        .route("/search", post(handlers::search_entities))
        // Share links
        .route("/share", post(handlers::issue_share_link))
        .route("/share/{entity}/{id}", get(handlers::get_share_link))
        .route("/share/{suffix}", delete(handlers::delete_share_link))
        // Tags
        .route("/tags", get(handlers::autocomplete_tags))
        // Materialized files
        .route("/files/{*path}", get(handlers::serve_file))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
