//! Registration, `/authenticate` and the staff accession browser.

mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{cookie_header, spawn_app, spawn_app_with, TestApp};
use transfer_db::test_fixtures::{digital_payload, sample_profile};
use transfer_db::{SubmissionRepository, UserRepository};

const ADMIN_EMAIL: &str = "ada1x@virginia.edu";

fn profile_json(email: &str) -> Value {
    json!({
        "firstName": "Grace",
        "lastName": "Hopper",
        "title": "Registrar",
        "affiliation": "Office of the Registrar",
        "email": email,
        "phone": "434 555 0199"
    })
}

/// Create an admin, authenticate as them and return the cookie header.
async fn admin_cookies(app: &TestApp) -> String {
    app.db
        .db
        .users
        .create(&sample_profile(ADMIN_EMAIL))
        .await
        .unwrap();
    app.db.make_admin(ADMIN_EMAIL).await;

    let resp = app
        .client
        .get(app.url("/authenticate?page=admin"))
        .header("remote_user", "ada1x")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    cookie_header(&resp)
}

async fn commit_sample(app: &TestApp) -> i32 {
    let submission = digital_payload("seededtoken", "donor@virginia.edu", &["a.pdf"])
        .validate()
        .unwrap();
    app.db
        .db
        .submissions
        .commit(&submission)
        .await
        .unwrap()
        .accession_id
}

#[tokio::test]
async fn test_create_user_sends_verification() {
    let app = spawn_app().await;
    let resp = app
        .client
        .post(app.url("/api/users"))
        .json(&profile_json("grace@virginia.edu"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let user: Value = resp.json().await.unwrap();
    assert_eq!(user["email"], "grace@virginia.edu");
    assert_eq!(user["verified"], false);
    assert_eq!(user["phone"], "4345550199");
    let token = user["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["grace@virginia.edu"]);
    assert!(sent[0]
        .html_body
        .contains(&format!("https://transfer.example.edu/verify/{}", token)));
}

#[tokio::test]
async fn test_create_user_validation_and_conflict() {
    let app = spawn_app().await;

    let mut incomplete = profile_json("grace@virginia.edu");
    incomplete["phone"] = json!("");
    let resp = app
        .client
        .post(app.url("/api/users"))
        .json(&incomplete)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "All fields are required");

    for expected in [StatusCode::OK, StatusCode::CONFLICT] {
        let resp = app
            .client
            .post(app.url("/api/users"))
            .json(&profile_json("grace@virginia.edu"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), expected);
    }
    assert_eq!(app.db.count("users").await, 1);
}

#[tokio::test]
async fn test_lookup_user() {
    let app = spawn_app().await;
    app.db
        .db
        .users
        .create(&sample_profile("ada@virginia.edu"))
        .await
        .unwrap();

    let resp = app
        .client
        .get(app.url("/api/users/lookup?email=ada@virginia.edu"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let user: Value = resp.json().await.unwrap();
    assert_eq!(user["firstName"], "Ada");
    assert!(user.get("admin").is_none());

    let resp = app
        .client
        .get(app.url("/api/users/lookup?email=nobody@virginia.edu"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.text().await.unwrap(), "nobody@virginia.edu not found");

    let resp = app
        .client
        .get(app.url("/api/users/lookup"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_and_resend() {
    let app = spawn_app().await;
    let user = app
        .db
        .db
        .users
        .create(&sample_profile("ada@virginia.edu"))
        .await
        .unwrap();

    let resp = app
        .client
        .post(app.url("/api/resend/verification"))
        .json(&json!({ "token": user.verify_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "email resent");
    assert_eq!(app.mailer.sent().len(), 1);

    for _ in 0..2 {
        let resp = app
            .client
            .post(app.url(&format!("/api/verify/{}", user.verify_token)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["verified"], true);
    }

    let resp = app
        .client
        .post(app.url("/api/verify/not-a-token"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_authenticate_sets_cookies_and_redirects() {
    let app = spawn_app().await;
    app.db
        .db
        .users
        .create(&sample_profile(ADMIN_EMAIL))
        .await
        .unwrap();

    let resp = app
        .client
        .get(app.url("/authenticate?page=admin/accessions"))
        .header("remote_user", "ada1x")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()["location"], "/admin/accessions");

    let cookies: Vec<&str> = resp
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies[0].starts_with("archives_xfer_api_session="));
    assert!(cookies[0].contains("HttpOnly"));
    assert!(cookies[0].contains("Secure"));
    assert!(cookies[1].starts_with("archives_xfer_user="));
}

#[tokio::test]
async fn test_authenticate_submit_page_skips_session() {
    let app = spawn_app().await;
    app.db
        .db
        .users
        .create(&sample_profile(ADMIN_EMAIL))
        .await
        .unwrap();

    let resp = app
        .client
        .get(app.url("/authenticate?page=submit"))
        .header("remote_user", "ada1x")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()["location"], "/submit");
    let cookies = cookie_header(&resp);
    assert!(cookies.starts_with("archives_xfer_user="));
    assert!(!cookies.contains("archives_xfer_api_session"));
}

#[tokio::test]
async fn test_authenticate_unknown_user_is_forbidden() {
    let app = spawn_app().await;

    let resp = app
        .client
        .get(app.url("/authenticate?page=admin"))
        .header("remote_user", "zz9z")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()["location"], "/forbidden");

    let resp = app
        .client
        .get(app.url("/authenticate?page=admin"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["location"], "/forbidden");
}

#[tokio::test]
async fn test_dev_auth_user_overrides_header() {
    let app = spawn_app_with(|config| config.dev_auth_user = Some("ada1x".to_string())).await;
    app.db
        .db
        .users
        .create(&sample_profile(ADMIN_EMAIL))
        .await
        .unwrap();

    let resp = app
        .client
        .get(app.url("/authenticate?page=admin"))
        .header("remote_user", "someone-else")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["location"], "/admin");
    let session = resp
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|c| c.starts_with("archives_xfer_api_session="))
        .unwrap()
        .to_string();
    assert!(!session.contains("Secure"));
}

#[tokio::test]
async fn test_admin_routes_require_session() {
    let app = spawn_app().await;
    let id = commit_sample(&app).await;

    for path in [
        "/api/admin/accessions".to_string(),
        format!("/api/admin/accessions/{}", id),
        format!("/api/admin/accessions/{}/notes", id),
    ] {
        let resp = app.client.get(app.url(&path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", path);
    }

    let resp = app
        .client
        .get(app.url("/api/admin/accessions"))
        .header("cookie", "archives_xfer_api_session=bogus%7Cada1x%40virginia.edu")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_non_admin_session_is_forbidden() {
    let app = spawn_app().await;
    app.db
        .db
        .users
        .create(&sample_profile(ADMIN_EMAIL))
        .await
        .unwrap();

    let resp = app
        .client
        .get(app.url("/authenticate?page=admin"))
        .header("remote_user", "ada1x")
        .send()
        .await
        .unwrap();
    let cookies = cookie_header(&resp);

    let resp = app
        .client
        .get(app.url("/api/admin/accessions"))
        .header("cookie", cookies)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(resp.text().await.unwrap(), "Forbidden");
}

#[tokio::test]
async fn test_admin_browses_accessions_and_notes() {
    let app = spawn_app().await;
    let id = commit_sample(&app).await;
    let cookies = admin_cookies(&app).await;

    let page: Value = app
        .client
        .get(app.url("/api/admin/accessions?page=1"))
        .header("cookie", &cookies)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["accessions"][0]["accessionID"], "seededtoken");

    let filtered: Value = app
        .client
        .get(app.url("/api/admin/accessions?g=Audiovisual"))
        .header("cookie", &cookies)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(filtered["filteredTotal"], 0);

    let detail: Value = app
        .client
        .get(app.url(&format!("/api/admin/accessions/{}", id)))
        .header("cookie", &cookies)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["summary"], "Departmental records");
    assert_eq!(detail["digital"]["uploadedFiles"], json!(["a.pdf"]));

    let resp = app
        .client
        .get(app.url("/api/admin/accessions/99999"))
        .header("cookie", &cookies)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .client
        .post(app.url(&format!("/api/admin/accessions/{}/notes", id)))
        .header("cookie", &cookies)
        .json(&json!({ "title": "Received", "note": "Boxes arrived on the loading dock" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let note: Value = resp.json().await.unwrap();
    assert_eq!(note["title"], "Received");
    assert_eq!(note["userName"], "Ada Byron");

    let notes: Vec<Value> = app
        .client
        .get(app.url(&format!("/api/admin/accessions/{}/notes", id)))
        .header("cookie", &cookies)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["note"], "Boxes arrived on the loading dock");
}

#[tokio::test]
async fn test_unknown_path_falls_back_to_index() {
    let app = spawn_app().await;
    let public = app.upload_root.path().join("public");
    std::fs::create_dir_all(&public).unwrap();
    std::fs::write(public.join("index.html"), "<html>transfer</html>").unwrap();

    let resp = app
        .client
        .get(app.url("/admin/accessions"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "<html>transfer</html>");
}
