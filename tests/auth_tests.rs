mod common;

use axum::http::StatusCode;
use common::{Req, TEST_PASSWORD, TestApp, test_app};
use mountify::db::{UserRole, UserStatus};
use serde_json::json;

fn registration(username: &str) -> serde_json::Value {
    json!({
        "full_name": "Rina Pendaki",
        "username": username,
        "email": format!("{}@example.com", username),
        "password": "summit-2024",
        "domicile": "Bandung",
    })
}

async fn login(t: &TestApp, email: &str, password: &str) -> common::TestResponse {
    t.send(
        Req::post("/api/auth/login").json(json!({ "email": email, "password": password })),
    )
    .await
}

#[tokio::test]
async fn test_register_creates_active_user() {
    let t = test_app().await;

    let response = t
        .send(Req::post("/api/auth/register").json(registration("rina")))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["user"]["username"], "rina");
    assert_eq!(response.body["user"]["role"], "user");
    assert_eq!(response.body["user"]["status"], "active");
    assert_eq!(response.body["user"]["domicile"], "Bandung");
    assert!(response.body["user"].get("password_hash").is_none());

    let user = t
        .db
        .users()
        .get_by_email("rina@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(user.password_hash, "summit-2024");
    assert!(user.password_hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn test_register_validation() {
    let t = test_app().await;

    let missing = t
        .send(Req::post("/api/auth/register").json(json!({ "username": "x" })))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let mut bad_email = registration("rina");
    bad_email["email"] = json!("not-an-email");
    let response = t.send(Req::post("/api/auth/register").json(bad_email)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let mut short = registration("rina");
    short["password"] = json!("short");
    let response = t.send(Req::post("/api/auth/register").json(short)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].as_str().unwrap().contains("8"));
}

#[tokio::test]
async fn test_register_duplicates_name_the_field() {
    let t = test_app().await;

    let response = t
        .send(Req::post("/api/auth/register").json(registration("rina")))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let mut same_email = registration("other");
    same_email["email"] = json!("rina@example.com");
    let response = t.send(Req::post("/api/auth/register").json(same_email)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "Email is already registered");

    let mut same_username = registration("rina");
    same_username["email"] = json!("rina2@example.com");
    let response = t
        .send(Req::post("/api/auth/register").json(same_username))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "Username is already taken");
}

#[tokio::test]
async fn test_login_returns_working_token() {
    let t = test_app().await;
    let id = t.create_user("budi", UserRole::User).await;

    let response = login(&t, "budi@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["id"], id);
    assert_eq!(response.body["user"]["role"], "user");
    let token = response.body["token"].as_str().unwrap().to_string();

    let profile = t.send(Req::get("/api/profile").bearer(&token).empty()).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["email"], "budi@example.com");
    assert!(profile.body["last_online_at"].is_string());
}

#[tokio::test]
async fn test_login_failures() {
    let t = test_app().await;
    let id = t.create_user("budi", UserRole::User).await;

    let missing = t
        .send(Req::post("/api/auth/login").json(json!({ "email": "budi@example.com" })))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let wrong = login(&t, "budi@example.com", "wrong-password").await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    let unknown = login(&t, "nobody@example.com", TEST_PASSWORD).await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["error"], unknown.body["error"]);

    t.db.users().set_status(id, UserStatus::Banned).await.unwrap();
    let banned = login(&t, "budi@example.com", TEST_PASSWORD).await;
    assert_eq!(banned.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_rate_limited() {
    let t = test_app().await;
    t.create_user("budi", UserRole::User).await;

    for _ in 0..5 {
        let response = login(&t, "nobody@example.com", "wrong-password").await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }
    let response = login(&t, "budi@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_forgot_and_reset_password() {
    let t = test_app().await;
    t.create_user("sari", UserRole::User).await;

    let known = t
        .send(Req::post("/api/auth/forgot-password").json(json!({ "email": "sari@example.com" })))
        .await;
    assert_eq!(known.status, StatusCode::OK);
    let (email, link) = t.notifier.last_link().expect("reset link sent");
    assert_eq!(email, "sari@example.com");
    assert!(link.starts_with("http://localhost:3000/reset-password?token="));

    let unknown = t
        .send(
            Req::post("/api/auth/forgot-password").json(json!({ "email": "ghost@example.com" })),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::OK);
    assert_eq!(known.body["message"], unknown.body["message"]);
    assert_eq!(t.notifier.sent.lock().unwrap().len(), 1);

    let token = link.split("token=").nth(1).unwrap();
    let reset = t
        .send(
            Req::post("/api/auth/reset-password")
                .json(json!({ "token": token, "new_password": "new-summit-pass" })),
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK);

    assert_eq!(
        login(&t, "sari@example.com", TEST_PASSWORD).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        login(&t, "sari@example.com", "new-summit-pass").await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_reset_rejects_access_tokens() {
    let t = test_app().await;
    let (_, access) = t.user_with_token("sari", UserRole::User).await;

    let response = t
        .send(
            Req::post("/api/auth/reset-password")
                .json(json!({ "token": access, "new_password": "new-summit-pass" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Invalid or expired reset token");
}
