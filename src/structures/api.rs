//! Typed REST API classification (the `/api/v1/media/` endpoints).

use super::{body_json, Structure};
use crate::har::HarEntry;
use crate::structures::platform::MediaItemList;

/// Whether the URL belongs to the typed media API.
pub fn matches(url: &str) -> bool {
    url.contains("/api/v1/media/")
}

pub fn extract(entry: &HarEntry) -> Vec<Structure> {
    let Some(body) = body_json(entry) else {
        return Vec::new();
    };

    let structure = if entry.url.contains("/info/") {
        match serde_json::from_value::<MediaItemList>(body) {
            Ok(list) => Some(Structure::MediaInfo(list)),
            Err(err) => {
                tracing::debug!(error = %err, "failed to decode media info payload");
                None
            }
        }
    } else if entry.url.contains("/comments/") {
        Some(Structure::Comments(body))
    } else if entry.url.contains("/likers/") {
        Some(Structure::Likers(body))
    } else {
        None
    };

    match structure {
        Some(s) => vec![s],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_entry(url: &str, body: &str) -> HarEntry {
        HarEntry {
            url: url.to_string(),
            method: "GET".to_string(),
            request_headers: Vec::new(),
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
    fn test_comments_kept_verbatim() {
        let url = "https://www.example.com/api/v1/media/5/comments/";
        let structures = extract(&api_entry(url, r#"{"comments": [{"pk": 1, "text": "nice"}]}"#));
        assert_eq!(structures.len(), 1);
        match &structures[0] {
            Structure::Comments(v) => assert!(v["comments"].is_array()),
            other => panic!("wrong structure: {}", other.kind_name()),
        }
    }

    #[test]
    fn test_likers_kept_verbatim() {
        let url = "https://www.example.com/api/v1/media/5/likers/";
        let structures = extract(&api_entry(url, r#"{"users": []}"#));
        assert!(matches!(structures[0], Structure::Likers(_)));
    }

    #[test]
    fn test_other_media_endpoints_ignored() {
        let url = "https://www.example.com/api/v1/media/5/like/";
        assert!(extract(&api_entry(url, r#"{}"#)).is_empty());
    }
}
