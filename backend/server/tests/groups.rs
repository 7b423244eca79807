mod common;

use common::TestApp;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn group_creation_sends_invitations() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.user("owner@example.com").await;
    let (bob, bob_id) = app.user("bob@example.com").await;

    let (status, body) = app
        .post(
            &owner,
            "/groups",
            json!({
                "title": "Test Group",
                "description": "Test Description",
                "emails": "bob@example.com, ghost@example.com, owner@example.com, BOB@example.com",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["group"]["title"], "Test Group");
    assert_eq!(body["invitations"]["invited"], json!(["bob@example.com"]));
    assert_eq!(body["invitations"]["skipped"], json!(["owner@example.com"]));
    assert_eq!(body["invitations"]["unknown"], json!(["ghost@example.com"]));
    let group_id = body["group"]["id"].as_i64().expect("group id");

    let invitations = app.pending_invitations(&bob).await;
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0]["kind"], "group");
    assert_eq!(invitations[0]["target_group_id"], group_id);
    assert_eq!(invitations[0]["status"], "pending");

    let (status, _) = app.get(&bob, &format!("/groups/{group_id}")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let id = invitations[0]["id"].as_i64().expect("invitation id");
    let (status, body) = app
        .post(&bob, &format!("/accounts/invitations/{id}/accept"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let (status, body) = app.get(&bob, &format!("/groups/{group_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let members: Vec<i64> = body["members"]
        .as_array()
        .expect("members")
        .iter()
        .filter_map(|m| m["id"].as_i64())
        .collect();
    assert!(members.contains(&bob_id));

    let (_, groups) = app.get(&bob, "/groups").await;
    assert_eq!(groups.as_array().expect("groups").len(), 1);

    let (status, _) = app
        .post(&bob, &format!("/accounts/invitations/{id}/accept"), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invitation_belongs_to_its_invitee() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.user("owner@example.com").await;
    let (bob, _) = app.user("bob@example.com").await;
    let (carol, _) = app.user("carol@example.com").await;
    let group_id = app.group(&owner, "Group").await;

    app.post(
        &owner,
        &format!("/groups/{group_id}/invitations"),
        json!({ "emails": "bob@example.com" }),
    )
    .await;
    let id = app.pending_invitations(&bob).await[0]["id"]
        .as_i64()
        .expect("invitation id");

    let (status, _) = app
        .post(&carol, &format!("/accounts/invitations/{id}/accept"), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(&bob, "/accounts/invitations/9999/decline", json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(&bob, &format!("/accounts/invitations/{id}/decline"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "declined");

    let (status, _) = app
        .post(&bob, &format!("/accounts/invitations/{id}/accept"), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.get(&bob, &format!("/groups/{group_id}")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn only_the_owner_manages_the_group() {
    let app = TestApp::spawn().await;
    let (owner, owner_id) = app.user("owner@example.com").await;
    let (bob, bob_id) = app.user("bob@example.com").await;
    let group_id = app.group(&owner, "Group").await;
    app.join_group(&owner, &bob, group_id, "bob@example.com").await;

    let (status, _) = app
        .post(
            &bob,
            &format!("/groups/{group_id}/edit"),
            json!({ "title": "Hijacked" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            &bob,
            &format!("/groups/{group_id}/invitations"),
            json!({ "emails": "someone@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(&bob, &format!("/groups/{group_id}/delete"), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            &owner,
            &format!("/groups/{group_id}/edit"),
            json!({ "title": "Renamed", "description": "New" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Renamed");

    let (status, body) = app
        .post(
            &owner,
            &format!("/groups/{group_id}/edit"),
            json!({ "title": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["title"].is_array());

    let (status, _) = app
        .post(
            &owner,
            &format!("/groups/{group_id}/members/{owner_id}/remove"),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            &owner,
            &format!("/groups/{group_id}/members/{bob_id}/remove"),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&bob, &format!("/groups/{group_id}")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(&owner, &format!("/groups/{group_id}/delete"), json!({}))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&owner, &format!("/groups/{group_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn members_leave_but_owners_cannot() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.user("owner@example.com").await;
    let (bob, _) = app.user("bob@example.com").await;
    let group_id = app.group(&owner, "Group").await;
    app.join_group(&owner, &bob, group_id, "bob@example.com").await;

    let (status, _) = app
        .post(&owner, &format!("/groups/{group_id}/leave"), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(&bob, &format!("/groups/{group_id}/leave"), json!({}))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, groups) = app.get(&bob, "/groups").await;
    assert_eq!(groups, json!([]));
}

#[tokio::test]
async fn removing_a_group_member_drops_project_access() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.user("owner@example.com").await;
    let (bob, bob_id) = app.user("bob@example.com").await;
    let group_id = app.group(&owner, "Group").await;
    let project_id = app.project(&owner, group_id, "Project").await;

    app.join_group(&owner, &bob, group_id, "bob@example.com").await;
    app.join_project(&owner, &bob, project_id, "bob@example.com").await;

    let (status, _) = app.get(&bob, &format!("/projects/{project_id}")).await;
    assert_eq!(status, StatusCode::OK);

    app.post(
        &owner,
        &format!("/groups/{group_id}/members/{bob_id}/remove"),
        json!({}),
    )
    .await;

    let (status, body) = app.get(&bob, &format!("/projects/{project_id}")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "No access to this project");
}

#[tokio::test]
async fn removed_member_loses_projects_they_own() {
    let app = TestApp::spawn().await;
    let (owner, owner_id) = app.user("owner@example.com").await;
    let (bob, bob_id) = app.user("bob@example.com").await;
    let group_id = app.group(&owner, "Group").await;
    app.join_group(&owner, &bob, group_id, "bob@example.com").await;

    let project_id = app.project(&bob, group_id, "Bob's").await;
    app.ticket(&bob, project_id, "Secret").await;

    let (status, _) = app
        .post(
            &owner,
            &format!("/groups/{group_id}/members/{bob_id}/remove"),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&bob, &format!("/projects/{project_id}")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get(&owner, &format!("/projects/{project_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project"]["owner_id"], owner_id);
    assert_eq!(body["tickets"][0]["title"], "Secret");

    let (_, listing) = app.get(&bob, "/projects").await;
    assert_eq!(listing["owned"], json!([]));
}
