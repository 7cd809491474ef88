//! Structure-to-entity mapping.
//!
//! Walks each typed structure and emits candidate accounts, posts and
//! media. Post URLs are derived from the numeric media key via the
//! shortcode codec; account URLs from the username; media join against the
//! asset extractor's canonical-URL map to pick up local file paths. Media
//! without a local file are retained so the post's textual content is still
//! captured.

use chrono::{DateTime, Utc};

use super::shortcode::media_id_to_shortcode;
use crate::assets::{canonical_cdn_url, AssetMap};
use crate::models::{Account, ExtractedEntities, ExtractedPost, Media, MediaKind, Post};
use crate::structures::platform::{MediaItem, PlatformUser};
use crate::structures::Structure;

/// Base URL of the archived platform.
pub const PLATFORM_BASE_URL: &str = "https://www.instagram.com";

/// Canonical profile URL for a username.
pub fn account_url(username: &str) -> String {
    format!("{}/{}/", PLATFORM_BASE_URL, username)
}

/// Canonical post URL for a numeric media key.
pub fn post_url(media_pk: i64) -> String {
    format!("{}/p/{}", PLATFORM_BASE_URL, media_id_to_shortcode(media_pk))
}

/// Map every structure of one session into entity candidates.
pub fn map_structures(structures: &[Structure], assets: &AssetMap) -> ExtractedEntities {
    let mut entities = ExtractedEntities::default();
    for structure in structures {
        entities.extend(map_structure(structure, assets));
    }
    entities
}

fn map_structure(structure: &Structure, assets: &AssetMap) -> ExtractedEntities {
    let mut entities = ExtractedEntities::default();
    match structure {
        Structure::ProfileTimeline(conn) => {
            for edge in &conn.edges {
                map_item(&edge.node, edge.node.author(), assets, &mut entities);
            }
        }
        Structure::ReelsMedia(conn) => {
            for edge in &conn.edges {
                let reel_user = edge.node.user.as_ref();
                for item in &edge.node.items {
                    map_item(item, item.author().or(reel_user), assets, &mut entities);
                }
            }
        }
        Structure::StoriesFeed(feed) => {
            for reel in &feed.reels_media {
                let reel_user = reel.user.as_ref();
                for item in &reel.items {
                    map_item(item, item.author().or(reel_user), assets, &mut entities);
                }
            }
        }
        Structure::Clips(conn) => {
            for edge in &conn.edges {
                map_item(&edge.node.media, edge.node.media.author(), assets, &mut entities);
            }
        }
        Structure::MediaInfo(list) | Structure::PostPage(list) => {
            for item in &list.items {
                map_item(item, item.author(), assets, &mut entities);
            }
        }
        Structure::SuggestedUsers(list) => {
            for user in &list.users {
                if let Some(account) = account_from_user(user) {
                    entities.accounts.push(account);
                }
            }
        }
        // Comments and likers stay in the structures blob; they carry no
        // post or media of their own.
        Structure::Comments(_) | Structure::Likers(_) => {}
    }
    entities
}

/// Map one media item (and its carousel children) to a post with media.
fn map_item(
    item: &MediaItem,
    author: Option<&PlatformUser>,
    assets: &AssetMap,
    entities: &mut ExtractedEntities,
) {
    let Some(pk) = item.numeric_pk() else {
        return;
    };

    let mut post = Post::new(post_url(pk));
    post.platform_id = Some(pk.to_string());
    post.publication_date = item.taken_at.and_then(epoch_to_utc);
    post.caption = item.caption.clone();
    post.data = serde_json::to_value(item).ok();

    if let Some(user) = author {
        if let Some(account) = account_from_user(user) {
            post.account_url = Some(account.url.clone());
            entities.accounts.push(account);
        }
    }

    let mut extracted = ExtractedPost::new(post.clone());

    if let Some(media) = media_from_item(item, &post.url, assets) {
        extracted.media.push(media);
    }
    for child in item.carousel_media.as_deref().unwrap_or_default() {
        if let Some(media) = media_from_item(child, &post.url, assets) {
            extracted.media.push(media);
        }
    }

    entities.posts.push(extracted);
}

fn account_from_user(user: &PlatformUser) -> Option<Account> {
    let username = user.username.as_deref()?;
    let mut account = Account::new(account_url(username));
    account.platform_id = user.platform_id().map(str::to_string);
    account.display_name = user.full_name.clone();
    account.bio = user.biography.clone();
    account.data = serde_json::to_value(user).ok();
    Some(account)
}

fn media_from_item(item: &MediaItem, post_url: &str, assets: &AssetMap) -> Option<Media> {
    let asset_url = item.asset_url()?;
    let kind = if item.is_video() {
        MediaKind::Video
    } else {
        MediaKind::Image
    };

    let mut media = Media::new(canonical_cdn_url(asset_url), kind);
    media.platform_id = item.pk.clone().or_else(|| item.id.clone());
    media.post_url = Some(post_url.to_string());
    media.data = media_data_blob(item);
    media.local_path = assets
        .get(&media.url)
        .map(|p| p.to_string_lossy().into_owned());
    Some(media)
}

/// Item payload for the media row, with carousel children elided; each
/// child gets its own row carrying its own payload.
fn media_data_blob(item: &MediaItem) -> Option<serde_json::Value> {
    let mut value = serde_json::to_value(item).ok()?;
    if let Some(map) = value.as_object_mut() {
        map.remove("carousel_media");
    }
    Some(value)
}

fn epoch_to_utc(epoch: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(epoch, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::platform::MediaItemList;
    use std::path::PathBuf;

    fn item_json(pk: &str, video: bool) -> serde_json::Value {
        let mut v = serde_json::json!({
            "pk": pk,
            "taken_at": 1700000000,
            "caption": "hello",
            "owner": {"pk": "7", "username": "author", "full_name": "The Author"}
        });
        if video {
            v["video_versions"] = serde_json::json!([{"url": "https://cdn-x.example/v/vid.mp4?a=1"}]);
        } else {
            v["image_versions2"] =
                serde_json::json!({"candidates": [{"url": "https://cdn-x.example/v/img.jpg?b=2"}]});
        }
        v
    }

    fn structure_with_items(items: Vec<serde_json::Value>) -> Structure {
        let list: MediaItemList =
            serde_json::from_value(serde_json::json!({ "items": items })).unwrap();
        Structure::PostPage(list)
    }

    #[test]
    fn test_single_image_post() {
        let mut assets = AssetMap::new();
        assets.insert(
            canonical_cdn_url("https://cdn-x.example/v/img.jpg"),
            PathBuf::from("archives/s1/photos/img.jpg"),
        );

        let entities = map_structures(
            &[structure_with_items(vec![item_json("1000", false)])],
            &assets,
        );

        assert_eq!(entities.accounts.len(), 1);
        assert_eq!(entities.posts.len(), 1);
        let post = &entities.posts[0].post;
        assert_eq!(
            post.url,
            format!("{}/p/{}", PLATFORM_BASE_URL, media_id_to_shortcode(1000))
        );
        assert_eq!(post.caption.as_deref(), Some("hello"));
        assert_eq!(
            post.account_url.as_deref(),
            Some("https://www.instagram.com/author/")
        );
        assert_eq!(
            post.publication_date.unwrap().timestamp(),
            1700000000
        );

        let media = &entities.posts[0].media;
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].kind, MediaKind::Image);
        assert_eq!(
            media[0].local_path.as_deref(),
            Some("archives/s1/photos/img.jpg")
        );
    }

    #[test]
    fn test_video_post_kind() {
        let entities = map_structures(
            &[structure_with_items(vec![item_json("2000", true)])],
            &AssetMap::new(),
        );
        assert_eq!(entities.posts[0].media[0].kind, MediaKind::Video);
        assert!(entities.posts[0].media[0].local_path.is_none());
    }

    #[test]
    fn test_carousel_children_each_get_a_row() {
        let mut item = item_json("3000", false);
        item["carousel_media"] = serde_json::json!([
            {"pk": "3001", "image_versions2": {"candidates": [{"url": "https://cdn/v/c1.jpg"}]}},
            {"pk": "3002", "video_versions": [{"url": "https://cdn/v/c2.mp4"}]},
            {"pk": "3003"}
        ]);

        let entities =
            map_structures(&[structure_with_items(vec![item])], &AssetMap::new());
        // Primary plus two children with asset URLs; the third child has
        // nothing addressable and is dropped.
        let media = &entities.posts[0].media;
        assert_eq!(media.len(), 3);
        assert_eq!(media[1].kind, MediaKind::Image);
        assert_eq!(media[2].kind, MediaKind::Video);
        assert!(media
            .iter()
            .all(|m| m.post_url.as_deref() == Some(entities.posts[0].post.url.as_str())));
    }

    #[test]
    fn test_item_without_pk_is_skipped() {
        let item = serde_json::json!({"taken_at": 1, "caption": "x"});
        let entities =
            map_structures(&[structure_with_items(vec![item])], &AssetMap::new());
        assert!(entities.posts.is_empty());
    }

    #[test]
    fn test_suggested_users_become_accounts() {
        let list = serde_json::from_value(serde_json::json!({
            "users": [
                {"pk": "1", "username": "alice", "full_name": "Alice"},
                {"pk": "2", "username": "bob"}
            ]
        }))
        .unwrap();
        let entities =
            map_structures(&[Structure::SuggestedUsers(list)], &AssetMap::new());
        assert_eq!(entities.accounts.len(), 2);
        assert_eq!(entities.accounts[0].display_name.as_deref(), Some("Alice"));
        assert!(entities.posts.is_empty());
    }

    #[test]
    fn test_media_data_blob_elides_carousel() {
        let mut item = item_json("4000", false);
        item["carousel_media"] = serde_json::json!([{"pk": "4001"}]);
        let item: MediaItem = serde_json::from_value(item).unwrap();
        let blob = media_data_blob(&item).unwrap();
        assert!(blob.get("carousel_media").is_none() || blob["carousel_media"].is_null());
        assert_eq!(blob["pk"], "4000");
    }
}
