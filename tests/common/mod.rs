use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use occasion_admin::{
    app::build_app,
    auth::{
        password::hash_password,
        repo::{AdminDirectory, FileAdminDirectory},
        repo_types::NewAdmin,
        sessions::SessionService,
    },
    config::{AppConfig, AuthMode, StorageBackend},
    records::{file_repo::FileRecordStore, repo::Persistence},
    state::AppState,
};

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "admin123";

/// Router over file-backed stores living in a temp dir. Keep the `TempDir`
/// alive for the duration of the test.
pub struct TestApp {
    pub router: Router,
    pub dir: TempDir,
}

pub async fn test_app(persistence: Persistence, auth_mode: AuthMode) -> TestApp {
    let dir = tempfile::tempdir().unwrap();

    // seed through a durable handle so the directory has an admin even in ephemeral runs
    let seeder = FileAdminDirectory::open(dir.path().join("admin.json"), Persistence::Durable)
        .await
        .unwrap();
    seeder
        .replace_all(vec![NewAdmin {
            username: ADMIN_USER.into(),
            password_hash: hash_password(ADMIN_PASS).unwrap(),
            role: "administrator".into(),
        }])
        .await
        .unwrap();

    app_in(dir, persistence, auth_mode).await
}

/// Router over whatever `data.json` / `admin.json` already sit in `dir`.
pub async fn app_in(dir: TempDir, persistence: Persistence, auth_mode: AuthMode) -> TestApp {
    let data_file = dir.path().join("data.json");
    let admin_file = dir.path().join("admin.json");

    let config = AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        storage: StorageBackend::File {
            data_file: data_file.clone(),
            admin_file: admin_file.clone(),
        },
        ephemeral_storage: persistence == Persistence::Ephemeral,
        auth_mode,
        session_ttl_minutes: 5,
    };

    let state = AppState::from_parts(
        Arc::new(FileRecordStore::open(&data_file, persistence).await.unwrap()),
        Arc::new(FileAdminDirectory::open(&admin_file, persistence).await.unwrap()),
        Arc::new(SessionService::in_memory(config.session_ttl().unwrap())),
        Arc::new(config),
    );

    TestApp {
        router: build_app(state),
        dir,
    }
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(json) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn login(app: &Router) -> String {
    let resp = send(
        app,
        Method::POST,
        "/api/login",
        None,
        Some(serde_json::json!({ "username": ADMIN_USER, "password": ADMIN_PASS })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    json["sessionId"].as_str().unwrap().to_string()
}
