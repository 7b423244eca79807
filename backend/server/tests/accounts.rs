mod common;

use common::{PASSWORD, TestApp, read};
use reqwest::{StatusCode, header::SET_COOKIE};
use serde_json::json;

#[tokio::test]
async fn register_signin_logout() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    let response = app.register(&client, "NewUser@Example.com").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let (_, user) = read(response).await;
    assert_eq!(user["email"], "newuser@example.com");
    assert!(user.get("password_hash").is_none());

    let response = app.signin(&client, "newuser@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("session cookie")
        .to_string();
    assert!(cookie.starts_with("tracker_session="));
    assert!(cookie.contains("HttpOnly"));

    let (status, profile) = app.get(&client, "/accounts/profile").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["user"]["username"], "NewUser");
    assert_eq!(profile["invitations"], json!([]));

    let (status, _) = app.post(&client, "/accounts/logout", json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get(&client, "/accounts/profile").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn register_reports_field_errors() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();
    app.register(&client, "taken@example.com").await;

    let (status, body) = app
        .post(
            &client,
            "/accounts/register",
            json!({
                "email": "TAKEN@example.com",
                "username": "someone",
                "password1": PASSWORD,
                "password2": "different123",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["password2"], json!(["Passwords don't match"]));

    let (status, body) = app
        .post(
            &client,
            "/accounts/register",
            json!({
                "email": "taken@example.com",
                "username": "taken",
                "password1": PASSWORD,
                "password2": PASSWORD,
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["email"].is_array());
    assert!(body["errors"]["username"].is_array());
}

#[tokio::test]
async fn signin_rejects_bad_credentials_and_inactive_users() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();
    app.register(&client, "user@example.com").await;

    let response = app.signin(&client, "user@example.com", "wrongpassword").await;
    let (status, body) = read(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password.");

    let response = app.signin(&client, "nobody@example.com", PASSWORD).await;
    let (status, body) = read(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password.");

    let user = app
        .db
        .user_by_email("user@example.com")
        .expect("lookup")
        .expect("user");
    app.db.set_user_active(user.id, false).expect("deactivate");

    let response = app.signin(&client, "user@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deactivated_user_loses_session() {
    let app = TestApp::spawn().await;
    let (client, user_id) = app.user("user@example.com").await;

    let (status, _) = app.get(&client, "/groups").await;
    assert_eq!(status, StatusCode::OK);

    app.db.set_user_active(user_id, false).expect("deactivate");

    let (status, _) = app.get(&client, "/groups").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    for path in ["/groups", "/projects", "/tickets", "/accounts/profile"] {
        let (status, _) = app.get(&client, path).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
async fn profile_update_and_public_profile() {
    let app = TestApp::spawn().await;
    let (client, user_id) = app.user("user@example.com").await;
    let (other, _) = app.user("other@example.com").await;

    let (status, body) = app
        .post(
            &client,
            "/accounts/profile",
            json!({
                "email": "other@example.com",
                "username": "user",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["email"].is_array());

    let (status, body) = app
        .post(
            &client,
            "/accounts/profile",
            json!({
                "email": "renamed@example.com",
                "username": "user",
                "first_name": "Jane",
                "last_name": "Doe",
                "password": "newpass456",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["email"], "renamed@example.com");

    let fresh = TestApp::client();
    let response = app.signin(&fresh, "renamed@example.com", "newpass456").await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = app.get(&other, &format!("/accounts/users/{user_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Jane Doe");

    let (status, _) = app.get(&other, "/accounts/users/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = TestApp::spawn().await;
    let (client, _) = app.user("user@example.com").await;

    let response = client
        .post(app.url("/groups"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("post");

    let (status, body) = read(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Malformed payload");
}

#[tokio::test]
async fn autocomplete_emails() {
    let app = TestApp::spawn().await;
    let (client, _) = app.user("alice@example.com").await;
    app.user("bob@example.com").await;
    app.user("bobby@test.org").await;

    let (status, body) = app.get(&client, "/api/autocomplete/emails?q=BOB").await;
    assert_eq!(status, StatusCode::OK);
    let emails: Vec<&str> = body
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|m| m["email"].as_str())
        .collect();
    assert_eq!(emails, ["bob@example.com", "bobby@test.org"]);

    let (_, body) = app.get(&client, "/api/autocomplete/emails?q=alice").await;
    assert_eq!(body, json!([]));

    let (_, body) = app.get(&client, "/api/autocomplete/emails?q=").await;
    assert_eq!(body, json!([]));
}
