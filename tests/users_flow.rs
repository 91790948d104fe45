mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use common::{acquire_db_lock, body_to_vec, TestApp};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize)]
struct UserBody {
    id: Uuid,
    username: String,
    email: Option<String>,
    permissions: Option<PermissionFlags>,
}

#[derive(Deserialize)]
struct PermissionFlags {
    visitor: bool,
    owner: bool,
    prop_manager: bool,
}

#[derive(Deserialize)]
struct ProfileBody {
    first_name: Option<String>,
    contact: Option<String>,
    profile_picture: Option<String>,
}

#[derive(Deserialize)]
struct ImportSummary {
    created: usize,
    skipped: usize,
}

#[tokio::test]
async fn register_creates_plain_visitor_account() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app
        .post_json(
            "/api/user",
            &json!({ "username": "carol", "password": "letmein" }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_vec(response.into_body()).await?;
    let user: UserBody = serde_json::from_slice(&body)?;
    assert_eq!(user.username, "carol");
    let flags = user.permissions.expect("permission flags");
    assert!(flags.visitor);
    assert!(!flags.prop_manager);

    // The fresh account can log in right away.
    app.login_cookie("carol", "letmein").await?;

    let duplicate = app
        .post_json(
            "/api/user",
            &json!({ "username": "carol", "password": "other" }),
            None,
        )
        .await?;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn seeding_permission_flags_is_manager_only() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("resident", "res-pass", false).await?;
    app.insert_user("admin", "adm-pass", true).await?;

    let payload = json!({
        "username": "new-owner",
        "password": "pw",
        "permissions": { "owner": true }
    });

    let anonymous = app.post_json("/api/user", &payload, None).await?;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let resident_cookie = app.login_cookie("resident", "res-pass").await?;
    let forbidden = app
        .post_json("/api/user", &payload, Some(&resident_cookie))
        .await?;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let admin_cookie = app.login_cookie("admin", "adm-pass").await?;
    let created = app
        .post_json("/api/user", &payload, Some(&admin_cookie))
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = body_to_vec(created.into_body()).await?;
    let user: UserBody = serde_json::from_slice(&body)?;
    let flags = user.permissions.expect("permission flags");
    assert!(flags.owner);
    assert!(!flags.visitor);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn listing_users_is_gated_to_managers() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("resident", "res-pass", false).await?;
    app.insert_user("admin", "adm-pass", true).await?;

    let resident_cookie = app.login_cookie("resident", "res-pass").await?;
    let forbidden = app.get("/api/user/all", Some(&resident_cookie)).await?;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let admin_cookie = app.login_cookie("admin", "adm-pass").await?;
    let response = app.get("/api/user/all", Some(&admin_cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let users: Vec<UserBody> = serde_json::from_slice(&body)?;
    let names: Vec<_> = users.iter().map(|user| user.username.as_str()).collect();
    assert_eq!(names, vec!["admin", "resident"]);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn manager_updates_profile_fields_and_flags() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let resident_id = app.insert_user("resident", "res-pass", false).await?;
    app.insert_user("admin", "adm-pass", true).await?;
    let admin_cookie = app.login_cookie("admin", "adm-pass").await?;

    let response = app
        .put_json(
            "/api/user/updateUser",
            &json!({
                "id": resident_id,
                "email": "resident@example.com",
                "password": "rotated",
                "permissions": { "visitor": true, "owner": true }
            }),
            Some(&admin_cookie),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let user: UserBody = serde_json::from_slice(&body)?;
    assert_eq!(user.id, resident_id);
    assert_eq!(user.email.as_deref(), Some("resident@example.com"));
    assert!(user.permissions.expect("permission flags").owner);

    // The rotated password replaces the old one.
    app.login_cookie("resident", "rotated").await?;
    let old = app
        .post_json(
            "/api/user/login",
            &json!({ "username": "resident", "password": "res-pass" }),
            None,
        )
        .await?;
    assert_eq!(old.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn permissions_only_update_applies_the_flags() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let resident_id = app.insert_user("resident", "res-pass", false).await?;
    app.insert_user("admin", "adm-pass", true).await?;
    let admin_cookie = app.login_cookie("admin", "adm-pass").await?;

    // No profile fields at all, just the role change.
    let response = app
        .put_json(
            "/api/user/updateUser",
            &json!({
                "id": resident_id,
                "permissions": { "visitor": true, "owner": true }
            }),
            Some(&admin_cookie),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let user: UserBody = serde_json::from_slice(&body)?;
    assert_eq!(user.id, resident_id);
    let flags = user.permissions.expect("permission flags");
    assert!(flags.visitor);
    assert!(flags.owner);

    // The untouched credential still works.
    app.login_cookie("resident", "res-pass").await?;

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn residents_update_their_own_profile_with_a_picture() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("resident", "res-pass", false).await?;
    let resident_cookie = app.login_cookie("resident", "res-pass").await?;

    let picture = b"\x89PNG fake image bytes".to_vec();
    let response = app
        .send_multipart(
            Method::PUT,
            "/api/user/profile",
            &[("first_name", "Pat"), ("contact", "555-0199")],
            Some(("profile_picture", "avatar.png", "image/png", &picture)),
            &resident_cookie,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let user: ProfileBody = serde_json::from_slice(&body)?;
    assert_eq!(user.first_name.as_deref(), Some("Pat"));
    assert_eq!(user.contact.as_deref(), Some("555-0199"));
    let key = user.profile_picture.expect("picture key");
    assert!(key.starts_with("profile/"));
    assert_eq!(
        app.storage().get(&key).await.expect("stored picture"),
        picture
    );

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn deleting_a_user_cascades_and_reports_missing() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let resident_id = app.insert_user("resident", "res-pass", false).await?;
    app.insert_user("admin", "adm-pass", true).await?;
    let admin_cookie = app.login_cookie("admin", "adm-pass").await?;

    let response = app
        .delete(&format!("/api/user/{resident_id}"), Some(&admin_cookie))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let gone = app
        .delete(&format!("/api/user/{resident_id}"), Some(&admin_cookie))
        .await?;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    let login = app
        .post_json(
            "/api/user/login",
            &json!({ "username": "resident", "password": "res-pass" }),
            None,
        )
        .await?;
    assert_eq!(login.status(), StatusCode::NOT_FOUND);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn bulk_import_skips_duplicates_and_applies_default_password() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("existing", "taken", false).await?;
    app.insert_user("admin", "adm-pass", true).await?;
    let admin_cookie = app.login_cookie("admin", "adm-pass").await?;

    let response = app
        .post_json(
            "/api/user/upload",
            &json!({
                "users": [
                    { "username": "unit-101", "email": "u101@example.com" },
                    { "username": "existing" },
                    { "username": "  " },
                    { "username": "unit-102", "password": "custom-pass" }
                ]
            }),
            Some(&admin_cookie),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let summary: ImportSummary = serde_json::from_slice(&body)?;
    assert_eq!(summary.created, 2);
    assert_eq!(summary.skipped, 2);

    // Rows without a password get the configured default.
    app.login_cookie("unit-101", "123456").await?;
    app.login_cookie("unit-102", "custom-pass").await?;

    app.cleanup().await?;
    Ok(())
}
