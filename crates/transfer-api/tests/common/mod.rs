//! In-process server for API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;
use transfer_api::{build_router, AppState, ServiceConfig};
use transfer_db::test_fixtures::TestDatabase;
use transfer_mail::mock::MockMailer;

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub db: TestDatabase,
    pub mailer: MockMailer,
    pub upload_root: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Start the router on an ephemeral port against a fresh schema.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(customize: impl FnOnce(&mut ServiceConfig)) -> TestApp {
    let db = TestDatabase::new().await;
    let upload_root = tempfile::tempdir().expect("Failed to create upload root");
    let mailer = MockMailer::new();

    let mut config = ServiceConfig::with_database("postgres://unused");
    config.upload_dir = upload_root.path().to_path_buf();
    config.public_dir = upload_root.path().join("public");
    config.hostname = "transfer.example.edu".to_string();
    customize(&mut config);

    let state = AppState::with_mailer(db.db.clone(), config, Arc::new(mailer.clone()));
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        base_url: format!("http://{}", addr),
        client,
        db,
        mailer,
        upload_root,
    }
}

/// `name=value` pairs of every `Set-Cookie` header, joined for a `Cookie` header.
pub fn cookie_header(response: &reqwest::Response) -> String {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}
