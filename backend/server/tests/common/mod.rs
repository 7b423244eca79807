#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc};

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tracker_server::{build_router, config::Config, database::Database, state::AppState};

pub const PASSWORD: &str = "testpass123";

pub struct TestApp {
    pub base: String,
    pub db: Arc<Database>,
    pub media_root: PathBuf,
    _media: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let media = tempfile::tempdir().expect("tempdir");
        let config = Config {
            media_root: media.path().to_path_buf(),
            ..Config::default()
        };
        let db = Arc::new(Database::open_in_memory().expect("open database"));
        let state = AppState::with_database(config, db.clone())
            .await
            .expect("state");

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, build_router(state))
                .await
                .expect("serve");
        });

        Self {
            base: format!("http://{addr}"),
            db,
            media_root: media.path().to_path_buf(),
            _media: media,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("client")
    }

    pub async fn register(&self, client: &Client, email: &str) -> Response {
        let username = email.split('@').next().expect("local part");

        client
            .post(self.url("/accounts/register"))
            .json(&json!({
                "email": email,
                "username": username,
                "password1": PASSWORD,
                "password2": PASSWORD,
            }))
            .send()
            .await
            .expect("register")
    }

    pub async fn signin(&self, client: &Client, email: &str, password: &str) -> Response {
        client
            .post(self.url("/accounts/signin"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("signin")
    }

    /// Registers `email` and returns a client holding its session cookie plus the user id.
    pub async fn user(&self, email: &str) -> (Client, i64) {
        let client = Self::client();

        let registered = self.register(&client, email).await;
        assert_eq!(registered.status(), StatusCode::CREATED);
        let user: Value = registered.json().await.expect("user json");

        let signed_in = self.signin(&client, email, PASSWORD).await;
        assert_eq!(signed_in.status(), StatusCode::OK);

        (client, user["id"].as_i64().expect("user id"))
    }

    pub async fn post(&self, client: &Client, path: &str, body: Value) -> (StatusCode, Value) {
        let response = client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("post");

        read(response).await
    }

    pub async fn get(&self, client: &Client, path: &str) -> (StatusCode, Value) {
        let response = client.get(self.url(path)).send().await.expect("get");

        read(response).await
    }

    /// Group owned by the client's user, returns its id.
    pub async fn group(&self, client: &Client, title: &str) -> i64 {
        let (status, body) = self
            .post(client, "/groups", json!({ "title": title }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        body["group"]["id"].as_i64().expect("group id")
    }

    pub async fn project(&self, client: &Client, group_id: i64, title: &str) -> i64 {
        let (status, body) = self
            .post(
                client,
                &format!("/groups/{group_id}/projects"),
                json!({ "title": title }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        body["id"].as_i64().expect("project id")
    }

    pub async fn ticket(&self, client: &Client, project_id: i64, title: &str) -> i64 {
        let (status, body) = self
            .post(
                client,
                &format!("/projects/{project_id}/tickets"),
                json!({ "title": title, "description": "Steps to reproduce" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        body["id"].as_i64().expect("ticket id")
    }

    /// Invites `email` to the group and accepts as `invitee`.
    pub async fn join_group(&self, owner: &Client, invitee: &Client, group_id: i64, email: &str) {
        let (status, report) = self
            .post(
                owner,
                &format!("/groups/{group_id}/invitations"),
                json!({ "emails": email }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{report}");

        self.accept_latest(invitee).await;
    }

    pub async fn join_project(
        &self,
        owner: &Client,
        invitee: &Client,
        project_id: i64,
        email: &str,
    ) {
        let (status, report) = self
            .post(
                owner,
                &format!("/projects/{project_id}/invitations"),
                json!({ "emails": email }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{report}");
        assert_eq!(report["invited"], json!([email]));

        self.accept_latest(invitee).await;
    }

    pub async fn pending_invitations(&self, client: &Client) -> Vec<Value> {
        let (status, profile) = self.get(client, "/accounts/profile").await;
        assert_eq!(status, StatusCode::OK);

        profile["invitations"]
            .as_array()
            .cloned()
            .expect("invitations")
    }

    async fn accept_latest(&self, invitee: &Client) {
        let invitations = self.pending_invitations(invitee).await;
        let id = invitations[0]["id"].as_i64().expect("invitation id");

        let (status, body) = self
            .post(invitee, &format!("/accounts/invitations/{id}/accept"), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
}

pub async fn read(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let text = response.text().await.expect("body");
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };

    (status, body)
}
