//! Users, session tokens, share links and tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A login-capable user of the browsing platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    pub email: String,
    /// PHC-format hash string (algorithm and parameters included).
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
    pub locked: bool,
    pub admin: bool,
    pub login_attempts: i32,
    pub last_login: Option<DateTime<Utc>>,
}

/// Result of validating a session token.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPermissions {
    pub valid: bool,
    pub admin: bool,
    pub user_id: Option<i64>,
}

impl TokenPermissions {
    pub fn denied() -> Self {
        Self {
            valid: false,
            admin: false,
            user_id: None,
        }
    }
}

/// Entity kinds a share link can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareableEntity {
    ArchivingSession,
    Account,
    Post,
    Media,
    MediaPart,
}

impl ShareableEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArchivingSession => "archiving_session",
            Self::Account => "account",
            Self::Post => "post",
            Self::Media => "media",
            Self::MediaPart => "media_part",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "archiving_session" => Some(Self::ArchivingSession),
            "account" => Some(Self::Account),
            "post" => Some(Self::Post),
            "media" => Some(Self::Media),
            "media_part" => Some(Self::MediaPart),
            _ => None,
        }
    }
}

/// An opaque link granting read access to one entity subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLink {
    #[serde(default)]
    pub id: i64,
    pub created_by_user_id: i64,
    pub entity: ShareableEntity,
    pub entity_id: i64,
    pub valid: bool,
    pub link_suffix: String,
}

/// A tag, optionally grouped under a tag type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub tag_type_id: Option<i64>,
    #[serde(default)]
    pub tag_type_name: Option<String>,
}
