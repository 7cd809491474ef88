//! Typed views of the platform API payloads found inside HAR entries.
//!
//! These model only the fields the mapper and extractors consume; everything
//! else in the upstream payload is dropped at this layer. Numeric ids arrive
//! as strings or numbers depending on the endpoint, so `pk` fields accept
//! both.

use serde::{Deserialize, Deserializer, Serialize};

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Str(String),
        Num(i64),
        None,
    }
    Ok(match Repr::deserialize(deserializer)? {
        Repr::Str(s) => Some(s),
        Repr::Num(n) => Some(n.to_string()),
        Repr::None => None,
    })
}

fn caption_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    // Captions appear either as a bare string or as an object with `text`.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Str(String),
        Obj { text: Option<String> },
        Other(serde_json::Value),
    }
    Ok(match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::Str(s)) => Some(s),
        Some(Repr::Obj { text }) => text,
        _ => None,
    })
}

/// A platform user as embedded in timeline and reel payloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformUser {
    #[serde(default, deserialize_with = "string_or_number")]
    pub pk: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub profile_pic_url: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
    #[serde(default)]
    pub is_verified: Option<bool>,
}

impl PlatformUser {
    /// Best available platform-side identifier.
    pub fn platform_id(&self) -> Option<&str> {
        self.pk.as_deref().or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageCandidate {
    pub url: String,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageVersions {
    #[serde(default)]
    pub candidates: Vec<ImageCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoVersion {
    pub url: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub version_type: Option<i64>,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub bandwidth: Option<i64>,
}

/// One media item: a timeline post, a story frame, a reel, or a carousel
/// child. Carousel children nest as further `MediaItem`s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(default, deserialize_with = "string_or_number")]
    pub pk: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    /// Publication time as a Unix epoch.
    #[serde(default)]
    pub taken_at: Option<i64>,
    /// Upstream numeric discriminator: 1 image, 2 video, 8 carousel.
    #[serde(default)]
    pub media_type: Option<i64>,
    #[serde(default, deserialize_with = "caption_text")]
    pub caption: Option<String>,
    #[serde(default)]
    pub video_versions: Option<Vec<VideoVersion>>,
    #[serde(default)]
    pub image_versions2: Option<ImageVersions>,
    #[serde(default)]
    pub carousel_media: Option<Vec<MediaItem>>,
    #[serde(default)]
    pub user: Option<PlatformUser>,
    #[serde(default)]
    pub owner: Option<PlatformUser>,
}

impl MediaItem {
    /// Numeric primary key, when the payload carried one.
    pub fn numeric_pk(&self) -> Option<i64> {
        self.pk
            .as_deref()
            .or(self.id.as_deref())
            .and_then(|s| s.split('_').next())
            .and_then(|s| s.parse().ok())
    }

    pub fn is_video(&self) -> bool {
        self.video_versions
            .as_ref()
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }

    /// The URL of the preferred asset: first video version, else the first
    /// (highest-quality) image candidate.
    pub fn asset_url(&self) -> Option<&str> {
        if let Some(versions) = self.video_versions.as_ref().filter(|v| !v.is_empty()) {
            return Some(versions[0].url.as_str());
        }
        self.image_versions2
            .as_ref()
            .and_then(|iv| iv.candidates.first())
            .map(|c| c.url.as_str())
    }

    /// The owning user, whichever field the endpoint used.
    pub fn author(&self) -> Option<&PlatformUser> {
        self.owner.as_ref().or(self.user.as_ref())
    }
}

/// `edges -> node` connection of media items (profile timeline).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaConnection {
    #[serde(default)]
    pub edges: Vec<MediaEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaEdge {
    pub node: MediaItem,
}

/// One reel: a user plus their story/highlight items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReelNode {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub user: Option<PlatformUser>,
    #[serde(default)]
    pub items: Vec<MediaItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReelEdge {
    pub node: ReelNode,
}

/// Highlights / reels connection (`edges -> node -> items`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReelsConnection {
    #[serde(default)]
    pub edges: Vec<ReelEdge>,
}

/// Stories feed: bare list of reels without the connection wrapper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoriesFeed {
    #[serde(default)]
    pub reels_media: Vec<ReelNode>,
}

/// Flat `items` list (shortcode page blobs and the media-info endpoint).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaItemList {
    #[serde(default)]
    pub items: Vec<MediaItem>,
}

/// Suggested-users list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserList {
    #[serde(default)]
    pub users: Vec<PlatformUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipsNode {
    pub media: MediaItem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipsEdge {
    pub node: ClipsNode,
}

/// Short-video (clips) connection from the profile reels tab.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipsConnection {
    #[serde(default)]
    pub edges: Vec<ClipsEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pk_accepts_string_and_number() {
        let a: MediaItem = serde_json::from_str(r#"{"pk": "3102345"}"#).unwrap();
        let b: MediaItem = serde_json::from_str(r#"{"pk": 3102345}"#).unwrap();
        assert_eq!(a.numeric_pk(), Some(3102345));
        assert_eq!(b.numeric_pk(), Some(3102345));
    }

    #[test]
    fn test_caption_accepts_string_and_object() {
        let a: MediaItem = serde_json::from_str(r#"{"caption": "hi"}"#).unwrap();
        let b: MediaItem =
            serde_json::from_str(r#"{"caption": {"text": "hi", "pk": "1"}}"#).unwrap();
        let c: MediaItem = serde_json::from_str(r#"{"caption": null}"#).unwrap();
        assert_eq!(a.caption.as_deref(), Some("hi"));
        assert_eq!(b.caption.as_deref(), Some("hi"));
        assert_eq!(c.caption, None);
    }

    #[test]
    fn test_asset_url_prefers_video() {
        let item: MediaItem = serde_json::from_str(
            r#"{
                "video_versions": [{"url": "https://cdn/video.mp4"}],
                "image_versions2": {"candidates": [{"url": "https://cdn/poster.jpg"}]}
            }"#,
        )
        .unwrap();
        assert!(item.is_video());
        assert_eq!(item.asset_url(), Some("https://cdn/video.mp4"));
    }

    #[test]
    fn test_carousel_children_nest() {
        let item: MediaItem = serde_json::from_str(
            r#"{
                "pk": "1",
                "carousel_media": [
                    {"pk": "2", "media_type": 1},
                    {"pk": "3", "media_type": 2, "video_versions": [{"url": "https://cdn/c.mp4"}]}
                ]
            }"#,
        )
        .unwrap();
        let children = item.carousel_media.as_ref().unwrap();
        assert_eq!(children.len(), 2);
        assert!(!children[0].is_video());
        assert!(children[1].is_video());
    }
}
