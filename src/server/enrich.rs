//! Enriched entity graphs and view transforms.
//!
//! The nested view is a derived read-model produced per request: flat
//! canonical rows are joined into account -> post -> media trees by id
//! lookup (the entities reference each other cyclically only at this
//! layer). Transforms are requested by query parameters:
//!
//! - `lfr`  rewrite local file paths under this public root
//! - `mwf`  retain only media with local files
//! - `pwm`  retain only posts with at least one media
//! - `awp`  retain only accounts with at least one post
//! - `ndb`  drop raw data blobs

use std::collections::HashMap;

use serde::Serialize;

use crate::config::Settings;
use crate::models::{Account, Media, Post};

use super::FileTokenService;

#[derive(Debug, Clone, Default)]
pub struct TransformConfig {
    pub local_files_root: Option<String>,
    pub media_with_files_only: bool,
    pub posts_with_media_only: bool,
    pub accounts_with_posts_only: bool,
    pub drop_raw_data: bool,
}

impl TransformConfig {
    /// Parse from a raw query string.
    pub fn from_query(query: Option<&str>) -> Self {
        let params: HashMap<String, String> = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();
        let flag = |name: &str| params.get(name).map(|v| v == "true").unwrap_or(false);
        Self {
            local_files_root: params.get("lfr").cloned().filter(|v| !v.is_empty()),
            media_with_files_only: flag("mwf"),
            posts_with_media_only: flag("pwm"),
            accounts_with_posts_only: flag("awp"),
            drop_raw_data: flag("ndb"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NestedPost {
    #[serde(flatten)]
    pub post: Post,
    pub post_media: Vec<Media>,
}

#[derive(Debug, Serialize)]
pub struct NestedAccount {
    #[serde(flatten)]
    pub account: Account,
    pub account_posts: Vec<NestedPost>,
}

/// Nested read-model: accounts own posts own media; entities whose parent
/// is not part of the graph surface at the top level.
#[derive(Debug, Serialize, Default)]
pub struct EntityGraph {
    pub accounts: Vec<NestedAccount>,
    pub posts: Vec<NestedPost>,
    pub media: Vec<Media>,
}

/// Everything needed to turn local paths into servable references.
pub struct FileRefContext<'a> {
    pub settings: &'a Settings,
    pub file_tokens: Option<&'a FileTokenService>,
    pub session_token: Option<&'a str>,
}

impl<'a> FileRefContext<'a> {
    /// Public reference for one stored path, with a per-file token appended
    /// for session holders.
    pub fn file_reference(&self, local_path: &str, root_override: Option<&str>) -> String {
        let serving_path = format!("/files/{}", local_path.trim_start_matches('/'));
        let root = root_override.or(self.settings.public_files_root.as_deref());
        let mut reference = match root {
            Some(root) => format!("{}{}", root.trim_end_matches('/'), serving_path),
            None => serving_path.clone(),
        };
        if let (Some(service), Some(token)) = (self.file_tokens, self.session_token) {
            reference.push_str("?token=");
            reference.push_str(&service.generate(token, &serving_path));
        }
        reference
    }
}

/// Build the nested graph and apply the requested transforms.
pub fn build_graph(
    accounts: Vec<Account>,
    posts: Vec<Post>,
    media: Vec<Media>,
    config: &TransformConfig,
    refs: &FileRefContext,
) -> EntityGraph {
    // Flattened transforms first.
    let mut media: Vec<Media> = media
        .into_iter()
        .filter(|m| !config.media_with_files_only || m.local_path.is_some())
        .map(|mut m| {
            if config.drop_raw_data {
                m.data = None;
            }
            if let Some(path) = m.local_path.take() {
                m.local_path =
                    Some(refs.file_reference(&path, config.local_files_root.as_deref()));
            }
            m.thumbnail_path = m.thumbnail_path.take().map(|path| {
                if path.starts_with("error:") {
                    path
                } else {
                    refs.file_reference(&path, config.local_files_root.as_deref())
                }
            });
            m
        })
        .collect();
    let mut posts = posts;
    let mut accounts = accounts;
    if config.drop_raw_data {
        for p in &mut posts {
            p.data = None;
        }
        for a in &mut accounts {
            a.data = None;
        }
    }

    // Nest by id references.
    let mut graph = EntityGraph::default();
    let mut post_nodes: Vec<NestedPost> = Vec::with_capacity(posts.len());
    let mut post_index: HashMap<i64, usize> = HashMap::new();
    for post in posts {
        post_index.insert(post.id, post_nodes.len());
        post_nodes.push(NestedPost {
            post,
            post_media: Vec::new(),
        });
    }
    for m in media.drain(..) {
        match m.post_id.and_then(|id| post_index.get(&id)) {
            Some(&i) => post_nodes[i].post_media.push(m),
            None => graph.media.push(m),
        }
    }
    if config.posts_with_media_only {
        post_nodes.retain(|p| !p.post_media.is_empty());
    }

    let mut account_nodes: Vec<NestedAccount> = Vec::with_capacity(accounts.len());
    let mut account_index: HashMap<i64, usize> = HashMap::new();
    for account in accounts {
        account_index.insert(account.id, account_nodes.len());
        account_nodes.push(NestedAccount {
            account,
            account_posts: Vec::new(),
        });
    }
    for node in post_nodes {
        match node.post.account_id.and_then(|id| account_index.get(&id)) {
            Some(&i) => account_nodes[i].account_posts.push(node),
            None => graph.posts.push(node),
        }
    }
    if config.accounts_with_posts_only {
        account_nodes.retain(|a| !a.account_posts.is_empty());
    }
    graph.accounts = account_nodes;
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;

    fn settings() -> Settings {
        Settings {
            database_url: "test.db".into(),
            archives_dir: "archives".into(),
            thumbnails_dir: "thumbnails".into(),
            public_files_root: Some("https://files.example".into()),
            file_token_secret: None,
            transcoder_bin: "ffmpeg".into(),
            transcoder_probe_bin: "ffprobe".into(),
            dev_bypass_auth: false,
            download_full_tracks: false,
        }
    }

    fn fixture() -> (Vec<Account>, Vec<Post>, Vec<Media>) {
        let mut account = Account::new("https://x/u/".into());
        account.id = 1;
        let mut post = Post::new("https://x/p/A".into());
        post.id = 10;
        post.account_id = Some(1);
        let mut orphan_post = Post::new("https://x/p/B".into());
        orphan_post.id = 11;
        let mut m1 = Media::new("https://cdn/v/a.jpg".into(), MediaKind::Image);
        m1.id = 100;
        m1.post_id = Some(10);
        m1.local_path = Some("archives/s/photos/a.jpg".into());
        let mut m2 = Media::new("https://cdn/v/b.jpg".into(), MediaKind::Image);
        m2.id = 101;
        m2.post_id = Some(10);
        (vec![account], vec![post, orphan_post], vec![m1, m2])
    }

    #[test]
    fn test_nesting_links_children() {
        let (accounts, posts, media) = fixture();
        let settings = settings();
        let refs = FileRefContext {
            settings: &settings,
            file_tokens: None,
            session_token: None,
        };
        let graph = build_graph(accounts, posts, media, &TransformConfig::default(), &refs);

        assert_eq!(graph.accounts.len(), 1);
        assert_eq!(graph.accounts[0].account_posts.len(), 1);
        assert_eq!(graph.accounts[0].account_posts[0].post_media.len(), 2);
        // The orphan post surfaces at the top level.
        assert_eq!(graph.posts.len(), 1);
        assert!(graph.media.is_empty());
    }

    #[test]
    fn test_media_filter_and_rewrite() {
        let (accounts, posts, media) = fixture();
        let settings = settings();
        let refs = FileRefContext {
            settings: &settings,
            file_tokens: None,
            session_token: None,
        };
        let config = TransformConfig {
            media_with_files_only: true,
            ..Default::default()
        };
        let graph = build_graph(accounts, posts, media, &config, &refs);

        let media = &graph.accounts[0].account_posts[0].post_media;
        assert_eq!(media.len(), 1);
        assert_eq!(
            media[0].local_path.as_deref(),
            Some("https://files.example/files/archives/s/photos/a.jpg")
        );
    }

    #[test]
    fn test_nested_filters() {
        let (accounts, posts, media) = fixture();
        let settings = settings();
        let refs = FileRefContext {
            settings: &settings,
            file_tokens: None,
            session_token: None,
        };
        let config = TransformConfig {
            media_with_files_only: true,
            posts_with_media_only: true,
            accounts_with_posts_only: true,
            ..Default::default()
        };
        let graph = build_graph(accounts, posts, media, &config, &refs);
        assert_eq!(graph.accounts.len(), 1);
        // Orphan post had no media and is dropped.
        assert!(graph.posts.is_empty());
    }

    #[test]
    fn test_signed_reference_appended_for_session_holder() {
        let (accounts, posts, media) = fixture();
        let settings = settings();
        let service = FileTokenService::new(b"secret".to_vec());
        let refs = FileRefContext {
            settings: &settings,
            file_tokens: Some(&service),
            session_token: Some("session-token"),
        };
        let graph = build_graph(accounts, posts, media, &TransformConfig::default(), &refs);
        let media = &graph.accounts[0].account_posts[0].post_media;
        let reference = media[0].local_path.as_deref().unwrap();
        let (_, token) = reference.split_once("?token=").expect("token appended");
        assert_eq!(
            service
                .verify(token, "/files/archives/s/photos/a.jpg")
                .unwrap(),
            "session-token"
        );
    }

    #[test]
    fn test_error_sentinel_thumbnail_not_rewritten() {
        let settings = settings();
        let refs = FileRefContext {
            settings: &settings,
            file_tokens: None,
            session_token: None,
        };
        let mut m = Media::new("https://cdn/v/a.jpg".into(), MediaKind::Image);
        m.thumbnail_path = Some("error: decode failed".into());
        let graph = build_graph(
            Vec::new(),
            Vec::new(),
            vec![m],
            &TransformConfig::default(),
            &refs,
        );
        assert_eq!(
            graph.media[0].thumbnail_path.as_deref(),
            Some("error: decode failed")
        );
    }

    #[test]
    fn test_from_query_parses_flags() {
        let config = TransformConfig::from_query(Some("mwf=true&pwm=true&lfr=https%3A%2F%2Fx&ndb=false"));
        assert!(config.media_with_files_only);
        assert!(config.posts_with_media_only);
        assert!(!config.accounts_with_posts_only);
        assert!(!config.drop_raw_data);
        assert_eq!(config.local_files_root.as_deref(), Some("https://x"));
    }
}
