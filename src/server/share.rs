//! Share-link access: ancestor walk.
//!
//! A share link grants read access to its entity and everything below it.
//! When a child entity is requested the walk goes upward (media part ->
//! media -> post -> account) and access is granted if the shared entity is
//! an ancestor of the requested one.

use crate::models::{ShareLink, ShareableEntity};

use super::{ApiError, AppState};

/// Whether `share` covers the requested entity.
pub async fn share_grants_access(
    state: &AppState,
    share: &ShareLink,
    requested: ShareableEntity,
    requested_id: i64,
) -> Result<bool, ApiError> {
    if share.entity == requested && share.entity_id == requested_id {
        return Ok(true);
    }

    let granted = match share.entity {
        ShareableEntity::Account => match requested {
            ShareableEntity::Post => {
                post_account_id(state, requested_id).await? == Some(share.entity_id)
            }
            ShareableEntity::Media => match media_post_id(state, requested_id).await? {
                Some(post_id) => post_account_id(state, post_id).await? == Some(share.entity_id),
                None => false,
            },
            ShareableEntity::MediaPart => {
                match part_media_id(state, requested_id).await? {
                    Some(media_id) => match media_post_id(state, media_id).await? {
                        Some(post_id) => {
                            post_account_id(state, post_id).await? == Some(share.entity_id)
                        }
                        None => false,
                    },
                    None => false,
                }
            }
            _ => false,
        },
        ShareableEntity::Post => match requested {
            ShareableEntity::Media => {
                media_post_id(state, requested_id).await? == Some(share.entity_id)
            }
            ShareableEntity::MediaPart => match part_media_id(state, requested_id).await? {
                Some(media_id) => {
                    media_post_id(state, media_id).await? == Some(share.entity_id)
                }
                None => false,
            },
            _ => false,
        },
        ShareableEntity::Media => match requested {
            ShareableEntity::MediaPart => {
                part_media_id(state, requested_id).await? == Some(share.entity_id)
            }
            _ => false,
        },
        _ => false,
    };
    Ok(granted)
}

async fn post_account_id(state: &AppState, post_id: i64) -> Result<Option<i64>, ApiError> {
    Ok(state
        .entities
        .post_by_id(post_id)
        .await?
        .and_then(|p| p.account_id))
}

async fn media_post_id(state: &AppState, media_id: i64) -> Result<Option<i64>, ApiError> {
    Ok(state
        .entities
        .media_by_id(media_id)
        .await?
        .and_then(|m| m.post_id))
}

async fn part_media_id(state: &AppState, part_id: i64) -> Result<Option<i64>, ApiError> {
    Ok(state
        .entities
        .media_part_by_id(part_id)
        .await?
        .map(|p| p.media_id))
}
