//! Structure extraction: classifying HAR entries into typed platform
//! API payloads.
//!
//! Three producers feed the same [`Structure`] enum: GraphQL responses
//! (selected by the operation name request header), the typed REST API
//! (selected by URL path), and HTML pages with embedded JSON script blocks.
//! An entry yields zero or more structures; emission order is the entry
//! order in the HAR. A structure that fails to decode is logged and
//! dropped, never fatal.

mod api;
mod graphql;
mod html;
pub mod platform;

use serde::{Deserialize, Serialize};

use crate::har::HarEntry;
use self::platform::{
    ClipsConnection, MediaConnection, MediaItemList, ReelsConnection, StoriesFeed, UserList,
};

/// One recognized platform API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Structure {
    /// Profile timeline connection (grid of posts).
    ProfileTimeline(MediaConnection),
    /// Suggested / chained users list.
    SuggestedUsers(UserList),
    /// Highlights reels connection.
    ReelsMedia(ReelsConnection),
    /// Stories feed (reels without the connection wrapper).
    StoriesFeed(StoriesFeed),
    /// Short-video clips connection from the profile reels tab.
    Clips(ClipsConnection),
    /// Comments on one media item. Retained verbatim.
    Comments(serde_json::Value),
    /// Accounts that liked one media item. Retained verbatim.
    Likers(serde_json::Value),
    /// Typed-API media info response.
    MediaInfo(MediaItemList),
    /// Single-post page blob (media by shortcode).
    PostPage(MediaItemList),
}

impl Structure {
    /// Short name for logging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::ProfileTimeline(_) => "profile_timeline",
            Self::SuggestedUsers(_) => "suggested_users",
            Self::ReelsMedia(_) => "reels_media",
            Self::StoriesFeed(_) => "stories_feed",
            Self::Clips(_) => "clips",
            Self::Comments(_) => "comments",
            Self::Likers(_) => "likers",
            Self::MediaInfo(_) => "media_info",
            Self::PostPage(_) => "post_page",
        }
    }
}

/// Extract every recognizable structure from one HAR entry.
pub fn structures_from_entry(entry: &HarEntry) -> Vec<Structure> {
    if entry.url.contains("graphql/query") {
        graphql::extract(entry)
    } else if api::matches(&entry.url) {
        api::extract(entry)
    } else if entry.mime_type.starts_with("text/html") {
        html::extract(entry)
    } else {
        Vec::new()
    }
}

/// Response body as a JSON value, tolerating base64 transfer encoding.
fn body_json(entry: &HarEntry) -> Option<serde_json::Value> {
    let bytes = entry.decoded_body()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, mime: &str, body: &str, headers: Vec<(String, String)>) -> HarEntry {
        HarEntry {
            url: url.to_string(),
            method: "GET".to_string(),
            request_headers: headers,
            post_data: None,
            mime_type: mime.to_string(),
            body_text: Some(body.to_string()),
            body_encoding: None,
            status: Some(200),
            started_date_time: None,
            time_ms: None,
        }
    }

    #[test]
    fn test_unrelated_entry_yields_nothing() {
        let e = entry("https://static.example/app.js", "text/javascript", "var x;", vec![]);
        assert!(structures_from_entry(&e).is_empty());
    }

    #[test]
    fn test_graphql_profile_timeline() {
        let body = r#"{"data": {"xdt_api__v1__feed__user_timeline_graphql_connection": {
            "edges": [{"node": {"pk": "42", "taken_at": 1700000000,
                                "image_versions2": {"candidates": [{"url": "https://cdn/x.jpg"}]},
                                "user": {"pk": "7", "username": "someone"}}}]
        }}}"#;
        let e = entry(
            "https://www.example.com/graphql/query",
            "application/json",
            body,
            vec![(
                "X-FB-Friendly-Name".to_string(),
                "PolarisProfilePostsQuery".to_string(),
            )],
        );
        let structures = structures_from_entry(&e);
        assert_eq!(structures.len(), 1);
        match &structures[0] {
            Structure::ProfileTimeline(conn) => {
                assert_eq!(conn.edges.len(), 1);
                assert_eq!(conn.edges[0].node.numeric_pk(), Some(42));
            }
            other => panic!("wrong structure: {}", other.kind_name()),
        }
    }

    #[test]
    fn test_unknown_graphql_operation_yields_nothing() {
        let e = entry(
            "https://www.example.com/graphql/query",
            "application/json",
            r#"{"data": {}}"#,
            vec![(
                "X-FB-Friendly-Name".to_string(),
                "SomeUnrelatedQuery".to_string(),
            )],
        );
        assert!(structures_from_entry(&e).is_empty());
    }

    #[test]
    fn test_api_media_info() {
        let e = entry(
            "https://www.example.com/api/v1/media/31337/info/",
            "application/json",
            r#"{"items": [{"pk": "31337", "taken_at": 1700000001,
                          "owner": {"pk": "9", "username": "owner", "full_name": "Owner"}}]}"#,
            vec![],
        );
        let structures = structures_from_entry(&e);
        assert_eq!(structures.len(), 1);
        assert!(matches!(structures[0], Structure::MediaInfo(_)));
    }

    #[test]
    fn test_html_post_page_blob() {
        let body = format!(
            r#"<html><body>
            <script type="application/json">{}</script>
            </body></html>"#,
            r#"{"require": [{"deep": {"xdt_api__v1__media__shortcode__web_info":
                {"items": [{"pk": "88", "taken_at": 1700000002,
                            "owner": {"pk": "5", "username": "poster"},
                            "image_versions2": {"candidates": [{"url": "https://cdn/y.jpg"}]}}]}}}]}"#
        );
        let e = entry("https://www.example.com/p/ABC/", "text/html; charset=utf-8", &body, vec![]);
        let structures = structures_from_entry(&e);
        assert_eq!(structures.len(), 1);
        match &structures[0] {
            Structure::PostPage(list) => assert_eq!(list.items.len(), 1),
            other => panic!("wrong structure: {}", other.kind_name()),
        }
    }

    #[test]
    fn test_structure_serialization_round_trip() {
        let s = Structure::MediaInfo(MediaItemList { items: Vec::new() });
        let json = serde_json::to_string(&s).unwrap();
        let back: Structure = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, Structure::MediaInfo(_)));
    }
}
