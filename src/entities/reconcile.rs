//! Field-wise reconciliation of repeated entity observations.
//!
//! Pure and deterministic: an existing non-empty value always wins over a
//! new one, list values take their deduplicated union, and dictionaries
//! merge recursively per key. Applied twice per entity per session: once
//! against the canonical record and once against the archive-scoped one.

use serde_json::Value;

use crate::models::{Account, Media, Post};

/// Emptiness for merge purposes: null, blank string, empty list or map.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn is_empty_str(value: &Option<String>) -> bool {
    value.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true)
}

/// Scalar rule: keep the existing value unless it is empty.
pub fn merge_scalar_str(existing: Option<String>, new: Option<String>) -> Option<String> {
    if is_empty_str(&existing) {
        if is_empty_str(&new) {
            None
        } else {
            new
        }
    } else {
        existing
    }
}

/// Scalar rule for values whose only empty state is `None`.
pub fn merge_option<T>(existing: Option<T>, new: Option<T>) -> Option<T> {
    existing.or(new)
}

/// Deduplicated union, keyed by stable serialization. Unserializable items
/// (none exist for `Value`) would be kept verbatim.
pub fn merge_lists(existing: Vec<Value>, new: Vec<Value>) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();
    for item in existing.into_iter().chain(new) {
        let key = serde_json::to_string(&item).unwrap_or_default();
        if seen.insert(key) {
            result.push(item);
        }
    }
    result
}

/// Recursive merge of two JSON values using the scalar/list/dict rules.
pub fn merge_values(existing: Option<Value>, new: Option<Value>) -> Option<Value> {
    match (existing, new) {
        (None, b) => b,
        (a, None) => a,
        (Some(Value::Object(mut a)), Some(Value::Object(b))) => {
            for (key, b_value) in b {
                match a.remove(&key) {
                    Some(a_value) => {
                        let merged = merge_values(Some(a_value), Some(b_value))
                            .unwrap_or(Value::Null);
                        a.insert(key, merged);
                    }
                    None => {
                        a.insert(key, b_value);
                    }
                }
            }
            Some(Value::Object(a))
        }
        (Some(Value::Array(a)), Some(Value::Array(b))) => Some(Value::Array(merge_lists(a, b))),
        (Some(a), Some(b)) => {
            if is_empty_value(&a) {
                if is_empty_value(&b) {
                    None
                } else {
                    Some(b)
                }
            } else {
                Some(a)
            }
        }
    }
}

/// Merge a new account observation into an existing record.
pub fn reconcile_account(new: Account, existing: Option<Account>) -> Account {
    let Some(mut account) = existing else {
        return new;
    };
    account.platform_id = merge_scalar_str(account.platform_id, new.platform_id);
    account.display_name = merge_scalar_str(account.display_name, new.display_name);
    account.bio = merge_scalar_str(account.bio, new.bio);
    account.data = merge_values(account.data, new.data);
    account.notes = merge_scalar_str(account.notes, new.notes);
    account
}

/// Merge a new post observation into an existing record.
pub fn reconcile_post(new: Post, existing: Option<Post>) -> Post {
    let Some(mut post) = existing else {
        return new;
    };
    post.platform_id = merge_scalar_str(post.platform_id, new.platform_id);
    post.account_id = merge_option(post.account_id, new.account_id);
    post.account_url = merge_scalar_str(post.account_url, new.account_url);
    post.publication_date = merge_option(post.publication_date, new.publication_date);
    post.caption = merge_scalar_str(post.caption, new.caption);
    post.data = merge_values(post.data, new.data);
    post.notes = merge_scalar_str(post.notes, new.notes);
    post
}

/// Merge a new media observation into an existing record.
pub fn reconcile_media(new: Media, existing: Option<Media>) -> Media {
    let Some(mut media) = existing else {
        return new;
    };
    media.platform_id = merge_scalar_str(media.platform_id, new.platform_id);
    media.post_id = merge_option(media.post_id, new.post_id);
    media.post_url = merge_scalar_str(media.post_url, new.post_url);
    media.local_path = merge_scalar_str(media.local_path, new.local_path);
    media.data = merge_values(media.data, new.data);
    media.notes = merge_scalar_str(media.notes, new.notes);
    media
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;
    use serde_json::json;

    #[test]
    fn test_scalar_existing_wins() {
        assert_eq!(
            merge_scalar_str(Some("kept".into()), Some("ignored".into())),
            Some("kept".into())
        );
        assert_eq!(
            merge_scalar_str(Some("  ".into()), Some("taken".into())),
            Some("taken".into())
        );
        assert_eq!(merge_scalar_str(None, None), None);
    }

    #[test]
    fn test_list_union_dedupes() {
        let merged = merge_lists(
            vec![json!("a"), json!("b")],
            vec![json!("b"), json!("c")],
        );
        assert_eq!(merged, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[test]
    fn test_dict_merge_is_recursive() {
        let a = json!({"user": {"name": "", "followers": 10}, "tags": ["x"]});
        let b = json!({"user": {"name": "filled", "bio": "hi"}, "tags": ["y"]});
        let merged = merge_values(Some(a), Some(b)).unwrap();
        assert_eq!(merged["user"]["name"], "filled");
        assert_eq!(merged["user"]["followers"], 10);
        assert_eq!(merged["user"]["bio"], "hi");
        assert_eq!(merged["tags"], json!(["x", "y"]));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut account = Account::new("https://example.com/u/".into());
        account.display_name = Some("Name".into());
        account.data = Some(json!({"k": [1, 2]}));

        let merged = reconcile_account(account.clone(), Some(account.clone()));
        assert_eq!(merged.display_name, account.display_name);
        assert_eq!(merged.data, account.data);
    }

    #[test]
    fn test_reconcile_commutative_on_disjoint_fields() {
        let mut a = Post::new("https://example.com/p/X".into());
        a.caption = Some("caption".into());
        let mut b = Post::new("https://example.com/p/X".into());
        b.account_url = Some("https://example.com/u/".into());

        let ab = reconcile_post(a.clone(), Some(b.clone()));
        let ba = reconcile_post(b, Some(a));
        assert_eq!(ab.caption, ba.caption);
        assert_eq!(ab.account_url, ba.account_url);
    }

    #[test]
    fn test_non_empty_caption_survives_empty_observation() {
        let mut first = Post::new("https://example.com/p/X".into());
        first.caption = Some("something".into());
        let mut second = Post::new("https://example.com/p/X".into());
        second.caption = None;

        let merged = reconcile_post(second, Some(first));
        assert_eq!(merged.caption.as_deref(), Some("something"));
    }

    #[test]
    fn test_media_local_path_filled_in_later() {
        let existing = Media::new("https://cdn/v/a.jpg".into(), MediaKind::Image);
        let mut new = Media::new("https://cdn/v/a.jpg".into(), MediaKind::Image);
        new.local_path = Some("photos/a.jpg".into());

        let merged = reconcile_media(new, Some(existing));
        assert_eq!(merged.local_path.as_deref(), Some("photos/a.jpg"));
    }
}
