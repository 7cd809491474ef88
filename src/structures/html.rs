//! Embedded-JSON extraction from HTML pages.
//!
//! Server-rendered pages carry their API payloads inside
//! `<script type="application/json">` blocks, nested arbitrarily deep under
//! framework bootstrap keys. We scan every block for dictionaries whose key
//! contains one of the well-known payload root keys and decode each match.

use scraper::{Html, Selector};
use serde::de::DeserializeOwned;

use super::Structure;
use crate::har::HarEntry;

pub fn extract(entry: &HarEntry) -> Vec<Structure> {
    let Some(bytes) = entry.decoded_body() else {
        return Vec::new();
    };
    let Ok(text) = String::from_utf8(bytes) else {
        return Vec::new();
    };

    let document = Html::parse_document(&text);
    let selector = Selector::parse(r#"script[type="application/json"]"#)
        .expect("static selector is valid");

    let mut structures = Vec::new();
    for script in document.select(&selector) {
        let raw = script.text().collect::<String>();
        if raw.is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => scan_value(&value, &mut structures),
            Err(err) => {
                tracing::debug!(error = %err, "unparseable JSON script block");
            }
        }
    }
    structures
}

/// Depth-first scan for payload dictionaries, preserving document order.
fn scan_value(value: &serde_json::Value, out: &mut Vec<Structure>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                if child.is_object() {
                    if let Some(structure) = classify(key, child) {
                        out.push(structure);
                    }
                }
                scan_value(child, out);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                scan_value(item, out);
            }
        }
        _ => {}
    }
}

/// Map a dictionary key to a structure kind.
///
/// Checked longest-root-first: the reels-media *connection* key contains the
/// plain reels-media key as a substring and must win.
fn classify(key: &str, value: &serde_json::Value) -> Option<Structure> {
    if key.contains("xdt_api__v1__media__shortcode__web_info") {
        return decode(value, Structure::PostPage);
    }
    if key.contains("xdt_api__v1__feed__reels_media__connection") {
        return decode(value, Structure::ReelsMedia);
    }
    if key.contains("xdt_api__v1__media__media_id__comments__connection") {
        return Some(Structure::Comments(value.clone()));
    }
    if key.contains("xdt_api__v1__profile_timeline") {
        return decode(value, Structure::ProfileTimeline);
    }
    if key.contains("xdt_api__v1__feed__reels_media") {
        return decode(value, Structure::StoriesFeed);
    }
    None
}

fn decode<T, F>(value: &serde_json::Value, wrap: F) -> Option<Structure>
where
    T: DeserializeOwned,
    F: FnOnce(T) -> Structure,
{
    match serde_json::from_value::<T>(value.clone()) {
        Ok(payload) => Some(wrap(payload)),
        Err(err) => {
            tracing::debug!(error = %err, "failed to decode embedded payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html_entry(body: String) -> HarEntry {
        HarEntry {
            url: "https://www.example.com/p/ABC/".to_string(),
            method: "GET".to_string(),
            request_headers: Vec::new(),
            post_data: None,
            mime_type: "text/html".to_string(),
            body_text: Some(body),
            body_encoding: None,
            status: Some(200),
            started_date_time: None,
            time_ms: None,
        }
    }

    #[test]
    fn test_connection_key_not_misread_as_stories() {
        let body = format!(
            r#"<script type="application/json">{}</script>"#,
            r#"{"a": {"xdt_api__v1__feed__reels_media__connection": {"edges": []}}}"#
        );
        let structures = extract(&html_entry(body));
        assert_eq!(structures.len(), 1);
        assert!(matches!(structures[0], Structure::ReelsMedia(_)));
    }

    #[test]
    fn test_multiple_blobs_in_one_page() {
        let body = format!(
            r#"<script type="application/json">{}</script>
               <script type="application/json">{}</script>"#,
            r#"{"x": {"xdt_api__v1__media__shortcode__web_info": {"items": [{"pk": "1"}]}}}"#,
            r#"{"y": {"xdt_api__v1__media__media_id__comments__connection": {"edges": []}}}"#
        );
        let structures = extract(&html_entry(body));
        assert_eq!(structures.len(), 2);
        assert!(matches!(structures[0], Structure::PostPage(_)));
        assert!(matches!(structures[1], Structure::Comments(_)));
    }

    #[test]
    fn test_non_json_scripts_ignored() {
        let body = r#"<script>var a = 1;</script>
                      <script type="application/json">not json</script>"#
            .to_string();
        assert!(extract(&html_entry(body)).is_empty());
    }
}
