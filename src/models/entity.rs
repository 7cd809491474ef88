//! Canonical entity models: accounts, posts, media.
//!
//! Every logical entity exists twice in the store: once in a canonical table
//! (merged across all observations) and once per archive session in an
//! archive table pointing at its canonical row. These structs model the
//! canonical view; the per-session rows reuse the same payload fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a materialized media asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }
}

/// A platform account (profile page).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Database row ID (0 until persisted).
    #[serde(default)]
    pub id: i64,
    /// Canonical profile URL. Identity key.
    pub url: String,
    /// Platform-side identifier, when one was observed.
    pub platform_id: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    /// Raw upstream payload, opaque at this layer.
    pub data: Option<serde_json::Value>,
    pub notes: Option<String>,
    #[serde(default)]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_date: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(url: String) -> Self {
        Self {
            id: 0, // Set by database
            url,
            platform_id: None,
            display_name: None,
            bio: None,
            data: None,
            notes: None,
            create_date: None,
            update_date: None,
        }
    }
}

/// A single publication by an account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: i64,
    /// Canonical post URL. Identity key.
    pub url: String,
    pub platform_id: Option<String>,
    /// Canonical id of the owning account, once linked.
    pub account_id: Option<i64>,
    /// Owning account URL as observed; used to resolve `account_id`.
    pub account_url: Option<String>,
    pub publication_date: Option<DateTime<Utc>>,
    pub caption: Option<String>,
    pub data: Option<serde_json::Value>,
    pub notes: Option<String>,
    #[serde(default)]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_date: Option<DateTime<Utc>>,
}

impl Post {
    pub fn new(url: String) -> Self {
        Self {
            id: 0,
            url,
            platform_id: None,
            account_id: None,
            account_url: None,
            publication_date: None,
            caption: None,
            data: None,
            notes: None,
            create_date: None,
            update_date: None,
        }
    }
}

/// One media asset belonging to a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub id: i64,
    /// Canonical CDN URL (host + filename, query stripped). Identity key and
    /// the join key against extracted local files.
    pub url: String,
    pub platform_id: Option<String>,
    pub post_id: Option<i64>,
    pub post_url: Option<String>,
    /// Path of the materialized asset on disk, when one was reconstructed.
    pub local_path: Option<String>,
    pub kind: MediaKind,
    pub data: Option<serde_json::Value>,
    /// Thumbnail file path, or an `error: ...` sentinel once generation
    /// failed so the row is not retried on every pass.
    pub thumbnail_path: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_date: Option<DateTime<Utc>>,
}

impl Media {
    pub fn new(url: String, kind: MediaKind) -> Self {
        Self {
            id: 0,
            url,
            platform_id: None,
            post_id: None,
            post_url: None,
            local_path: None,
            kind,
            data: None,
            thumbnail_path: None,
            notes: None,
            create_date: None,
            update_date: None,
        }
    }
}

/// User-defined sub-region of one media asset: a time range, a crop, or both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPart {
    #[serde(default)]
    pub id: i64,
    pub media_id: i64,
    pub time_start_ms: Option<i64>,
    pub time_end_ms: Option<i64>,
    pub crop_x: Option<i64>,
    pub crop_y: Option<i64>,
    pub crop_w: Option<i64>,
    pub crop_h: Option<i64>,
    pub notes: Option<String>,
}

/// One mapped post together with its media.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedPost {
    pub post: Post,
    pub media: Vec<Media>,
}

impl ExtractedPost {
    pub fn new(post: Post) -> Self {
        Self {
            post,
            media: Vec::new(),
        }
    }
}

/// Flat candidate set produced by the entity mapper for one archive session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub accounts: Vec<Account>,
    pub posts: Vec<ExtractedPost>,
}

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.posts.is_empty()
    }

    pub fn extend(&mut self, other: ExtractedEntities) {
        self.accounts.extend(other.accounts);
        self.posts.extend(other.posts);
    }

    /// Count of media candidates across all posts.
    pub fn media_count(&self) -> usize {
        self.posts.iter().map(|p| p.media.len()).sum()
    }
}

/// Annotation write: replaces notes and the tag set of one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_round_trip() {
        for kind in [MediaKind::Image, MediaKind::Video, MediaKind::Audio] {
            assert_eq!(MediaKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(MediaKind::from_str("document"), None);
    }

    #[test]
    fn test_extracted_entities_media_count() {
        let mut entities = ExtractedEntities::default();
        let mut post = ExtractedPost::new(Post::new("https://example.com/p/A".into()));
        post.media
            .push(Media::new("https://cdn/v/a.jpg".into(), MediaKind::Image));
        post.media
            .push(Media::new("https://cdn/v/b.mp4".into(), MediaKind::Video));
        entities.posts.push(post);
        assert_eq!(entities.media_count(), 2);
        assert!(!entities.is_empty());
    }
}
