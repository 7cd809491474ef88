//! GraphQL response classification.
//!
//! The platform multiplexes every GraphQL operation over one endpoint; the
//! operation is named by the `X-FB-Friendly-Name` request header. Only a
//! closed set of operations is decoded; anything else yields nothing.

use serde::de::DeserializeOwned;

use super::{body_json, Structure};
use crate::har::HarEntry;

const OPERATION_HEADER: &str = "X-FB-Friendly-Name";

pub fn extract(entry: &HarEntry) -> Vec<Structure> {
    let Some(operation) = entry.header(OPERATION_HEADER) else {
        return Vec::new();
    };
    let Some(body) = body_json(entry) else {
        return Vec::new();
    };
    let data = &body["data"];

    let structure = match operation {
        "PolarisProfilePostsTabContentQuery_connection" | "PolarisProfilePostsQuery" => decode(
            &data["xdt_api__v1__feed__user_timeline_graphql_connection"],
            Structure::ProfileTimeline,
        ),
        "PolarisProfileSuggestedUsersWithPreloadableQuery" => decode(
            &data["xdt_api__v1__discover__chaining"],
            Structure::SuggestedUsers,
        ),
        "PolarisStoriesV3HighlightsPageQuery" | "PolarisStoriesV3HighlightsPagePaginationQuery" => {
            decode(
                &data["xdt_api__v1__feed__reels_media__connection"],
                Structure::ReelsMedia,
            )
        }
        "PolarisStoriesV3ReelPageStandaloneQuery" => decode(
            &data["xdt_api__v1__feed__reels_media"],
            Structure::StoriesFeed,
        ),
        "PolarisProfileReelsTabContentQuery" => decode(
            &data["xdt_api__v1__clips__user__connection_v2"],
            Structure::Clips,
        ),
        _ => None,
    };

    match structure {
        Some(s) => vec![s],
        None => Vec::new(),
    }
}

fn decode<T, F>(value: &serde_json::Value, wrap: F) -> Option<Structure>
where
    T: DeserializeOwned,
    F: FnOnce(T) -> Structure,
{
    if value.is_null() {
        return None;
    }
    match serde_json::from_value::<T>(value.clone()) {
        Ok(payload) => Some(wrap(payload)),
        Err(err) => {
            tracing::debug!(error = %err, "failed to decode GraphQL payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graphql_entry(operation: &str, body: &str) -> HarEntry {
        HarEntry {
            url: "https://www.example.com/graphql/query".to_string(),
            method: "POST".to_string(),
            request_headers: vec![(OPERATION_HEADER.to_string(), operation.to_string())],
            post_data: None,
            mime_type: "application/json".to_string(),
            body_text: Some(body.to_string()),
            body_encoding: None,
            status: Some(200),
            started_date_time: None,
            time_ms: None,
        }
    }

    #[test]
    fn test_highlights_connection_decodes() {
        let body = r#"{"data": {"xdt_api__v1__feed__reels_media__connection": {
            "edges": [{"node": {"id": "highlight:1",
                                "user": {"pk": "3", "username": "u"},
                                "items": [{"pk": "10", "taken_at": 1700000000}]}}]
        }}}"#;
        let structures = extract(&graphql_entry("PolarisStoriesV3HighlightsPageQuery", body));
        assert_eq!(structures.len(), 1);
        match &structures[0] {
            Structure::ReelsMedia(conn) => assert_eq!(conn.edges[0].node.items.len(), 1),
            other => panic!("wrong structure: {}", other.kind_name()),
        }
    }

    #[test]
    fn test_missing_operation_header_yields_nothing() {
        let mut entry = graphql_entry("PolarisProfilePostsQuery", r#"{"data": {}}"#);
        entry.request_headers.clear();
        assert!(extract(&entry).is_empty());
    }

    #[test]
    fn test_malformed_payload_is_skipped() {
        // edges is a string, not an array: decode fails, entry is skipped.
        let body = r#"{"data": {"xdt_api__v1__feed__user_timeline_graphql_connection": {"edges": "nope"}}}"#;
        assert!(extract(&graphql_entry("PolarisProfilePostsQuery", body)).is_empty());
    }
}
