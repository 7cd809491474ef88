//! Query service access control over a real router.

use std::path::Path;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use harbor::config::Settings;
use harbor::repository::{migrations, UserRepository};
use harbor::server::auth::hash_password;
use harbor::server::{create_router, AppState, FileTokenService};

fn test_settings(root: &Path) -> Settings {
    Settings {
        database_url: root.join("harbor.db").display().to_string(),
        archives_dir: root.join("archives"),
        thumbnails_dir: root.join("thumbnails"),
        public_files_root: None,
        file_token_secret: Some("0123456789abcdef0123456789abcdef".into()),
        transcoder_bin: "ffmpeg".into(),
        transcoder_probe_bin: "ffprobe".into(),
        dev_bypass_auth: false,
        download_full_tracks: false,
    }
}

async fn setup(root: &Path) -> (axum::Router, AppState, String) {
    let settings = test_settings(root);
    let pool = settings.create_pool();
    migrations::init_schema(&pool).await.unwrap();

    let users = UserRepository::new(pool.clone());
    let hash = hash_password("correct horse").unwrap();
    let user_id = users.insert_user("analyst@example.org", &hash, false).await.unwrap();
    let token = users.issue_token(user_id).await.unwrap();

    let state = AppState::new(&settings, pool);
    (create_router(state.clone()), state, token)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Token:{}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_entity_view_requires_session() {
    let root = tempfile::tempdir().unwrap();
    let (router, _state, token) = setup(root.path()).await;

    let response = router.clone().oneshot(get("/account/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // With a session the row simply does not exist.
    let request = Request::builder()
        .uri("/account/1")
        .header("authorization", format!("Token:{}", token))
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_issues_token_and_rejects_bad_password() {
    let root = tempfile::tempdir().unwrap();
    let (router, _state, _token) = setup(root.path()).await;

    let ok = router
        .clone()
        .oneshot(post_json(
            "/login",
            None,
            serde_json::json!({"email": "analyst@example.org", "password": "correct horse"}),
        ))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body = axum::body::to_bytes(ok.into_body(), 1 << 20).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["token"].as_str().unwrap().len() >= 30);

    let bad = router
        .oneshot(post_json(
            "/login",
            None,
            serde_json::json!({"email": "analyst@example.org", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_search_rejects_non_whitelisted_column() {
    let root = tempfile::tempdir().unwrap();
    let (router, _state, token) = setup(root.path()).await;

    let response = router
        .oneshot(post_json(
            "/search",
            Some(&token),
            serde_json::json!({
                "search_mode": "accounts",
                "page_number": 1,
                "page_size": 10,
                "filters": {"column": "password_hash", "op": "eq", "value": "x"}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_with_valid_filter_runs() {
    let root = tempfile::tempdir().unwrap();
    let (router, _state, token) = setup(root.path()).await;

    let response = router
        .oneshot(post_json(
            "/search",
            Some(&token),
            serde_json::json!({
                "search_term": "anything",
                "search_mode": "sessions",
                "page_number": 1,
                "page_size": 10,
                "filters": {"and": [
                    {"column": "source_type", "op": "eq", "value": 1}
                ]}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_file_token_bound_to_path() {
    let root = tempfile::tempdir().unwrap();
    let (router, state, token) = setup(root.path()).await;

    // Materialize two photos on disk.
    let photos = state.settings.archives_dir.join("sess1").join("photos");
    std::fs::create_dir_all(&photos).unwrap();
    std::fs::write(photos.join("a.jpg"), b"photo-a-bytes").unwrap();
    std::fs::write(photos.join("b.jpg"), b"photo-b-bytes").unwrap();

    let service = FileTokenService::new(state.settings.file_token_secret_bytes().unwrap());
    let rel = |name: &str| {
        format!(
            "{}/sess1/photos/{}",
            state.settings.archives_dir.display(),
            name
        )
        .trim_start_matches('/')
        .to_string()
    };
    let a_rel = rel("a.jpg");
    let b_rel = rel("b.jpg");
    let token_for_b = service.generate(&token, &format!("/files/{}", b_rel));

    // A token issued for b.jpg does not open a.jpg.
    let response = router
        .clone()
        .oneshot(get(&format!("/files/{}?token={}", a_rel, token_for_b)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The same token opens the file it was issued for.
    let response = router
        .clone()
        .oneshot(get(&format!("/files/{}?token={}", b_rel, token_for_b)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    assert_eq!(&body[..], b"photo-b-bytes");

    // No token at all: rejected, no bytes.
    let response = router
        .oneshot(get(&format!("/files/{}", a_rel)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
