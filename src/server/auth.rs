//! Request authentication.
//!
//! A request may carry a session token (`Authorization: Token:<value>`), a
//! share-link suffix (`share` query parameter or `X-Share-Token` header),
//! or both. The extractor resolves them without rejecting; handlers decide
//! whether a session is required or whether share access suffices.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::models::{ShareLink, ShareableEntity, TokenPermissions};

use super::share::share_grants_access;
use super::{ApiError, AppState};

/// Password hashing with the default argon2id parameters; the PHC string
/// embeds algorithm and parameters.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2::Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(stored_hash: &str, provided: &str) -> bool {
    use argon2::password_hash::{PasswordHash, PasswordVerifier};
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    argon2::Argon2::default()
        .verify_password(provided.as_bytes(), &parsed)
        .is_ok()
}

/// Extract the token value from an Authorization header of the form
/// `<scheme>:<token>`; a bare value is accepted as-is.
pub fn parse_token_header(header: &str) -> Option<&str> {
    let token = match header.split_once(':') {
        Some((_, token)) => token,
        None => header,
    };
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// The resolved caller of one request.
pub struct Viewer {
    /// Raw session token, when one was presented and validated.
    pub login_token: Option<String>,
    pub permissions: TokenPermissions,
    /// Share link presented with the request, valid or not.
    pub share: Option<ShareLink>,
    /// Request path, retained for audit logging.
    pub path: String,
}

impl Viewer {
    /// Whether a valid user session is attached.
    pub fn has_session(&self) -> bool {
        self.permissions.valid
    }

    /// Session token for signed-URL issuance; only session holders get
    /// per-file tokens.
    pub fn session_token(&self) -> Option<&str> {
        if self.permissions.valid {
            self.login_token.as_deref()
        } else {
            None
        }
    }
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let path = parts.uri.path().to_string();

        if state.settings.dev_bypass_auth {
            return Ok(Viewer {
                login_token: None,
                permissions: TokenPermissions {
                    valid: true,
                    admin: true,
                    user_id: None,
                },
                share: None,
                path,
            });
        }

        let raw_token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_token_header)
            .map(str::to_string);

        let permissions = match &raw_token {
            Some(token) => state.users.check_token(token).await?,
            None => TokenPermissions::denied(),
        };

        let share_suffix = share_suffix_from_parts(parts);
        let share = match share_suffix {
            Some(suffix) => state.users.share_link_by_suffix(&suffix).await?,
            None => None,
        };

        Ok(Viewer {
            login_token: raw_token,
            permissions,
            share,
            path,
        })
    }
}

fn share_suffix_from_parts(parts: &Parts) -> Option<String> {
    if let Some(header) = parts
        .headers
        .get("X-Share-Token")
        .and_then(|v| v.to_str().ok())
    {
        if !header.is_empty() {
            return Some(header.to_string());
        }
    }
    let query = parts.uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "share")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Require a valid user session, logging the rejection.
pub async fn require_session(state: &AppState, viewer: &Viewer) -> Result<(), ApiError> {
    if viewer.has_session() {
        return Ok(());
    }
    state
        .users
        .log_event("unauthorized_access", None, Some(&viewer.path), None)
        .await;
    Err(ApiError::Unauthorized)
}

/// Grant entity read access for a session holder, or for a share link
/// whose entity is the requested entity or one of its ancestors.
pub async fn authorize_entity_view(
    state: &AppState,
    viewer: &Viewer,
    entity: ShareableEntity,
    entity_id: i64,
) -> Result<(), ApiError> {
    if viewer.has_session() {
        return Ok(());
    }
    if let Some(share) = &viewer.share {
        if share.valid && share_grants_access(state, share, entity, entity_id).await? {
            return Ok(());
        }
    }
    state
        .users
        .log_event(
            "unauthorized_access",
            None,
            Some(&viewer.path),
            Some(&format!("{}:{}", entity.as_str(), entity_id)),
        )
        .await;
    Err(ApiError::Unauthorized)
}
