mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_vec, TestApp};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct StatusBody {
    logged_in: bool,
    user: StatusUser,
}

#[derive(Deserialize)]
struct StatusUser {
    username: String,
    permissions: Option<PermissionFlags>,
}

#[derive(Deserialize)]
struct PermissionFlags {
    visitor: bool,
    prop_manager: bool,
}

#[tokio::test]
async fn login_and_status_roundtrip() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let password = "s3cret";
    app.insert_user("alice", password, true).await?;

    let cookie = app.login_cookie("alice", password).await?;

    let response = app.get("/api/user/status", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let status: StatusBody = serde_json::from_slice(&body)?;

    assert!(status.logged_in);
    assert_eq!(status.user.username, "alice");
    let flags = status.user.permissions.expect("permission flags");
    assert!(flags.prop_manager);
    assert!(flags.visitor);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn rejects_missing_or_invalid_cookie() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app.get("/api/user/status", None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .get("/api/user/status", Some("token=not-a-real-jwt"))
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn distinguishes_unknown_user_from_wrong_password() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("bob", "correct-horse", false).await?;

    let response = app
        .post_json(
            "/api/user/login",
            &json!({ "username": "nobody", "password": "whatever" }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .post_json(
            "/api/user/login",
            &json!({ "username": "bob", "password": "battery-staple" }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn health_endpoint_is_open_and_reports_ok() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app.get("/api/health", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let payload: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(payload["status"], "ok");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn logout_clears_the_auth_cookie() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app.post_json("/api/user/logout", &json!({}), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get("set-cookie")
        .expect("logout sets cookie")
        .to_str()?;
    assert!(set_cookie.starts_with("token=;"));
    assert!(set_cookie.contains("Max-Age=0"));

    app.cleanup().await?;
    Ok(())
}
