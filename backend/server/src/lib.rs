//! Multi-tenant ticket tracker.
//!
//! # Layout
//! - Users sign up, sign in and get a session cookie
//! - Groups are the tenants, projects live inside a group, tickets inside a project
//! - Groups and projects each keep an owner plus a member set
//! - Invitations are the only way into a member set
//!
//!
//!
//! # Storage
//!
//! SQLite through `rusqlite`, one connection behind a mutex. Attachments are
//! written under `MEDIA_ROOT` and only their relative path is stored.
//!
//! Sessions stay in SQLite unless `REDIS_URL` is set, in which case every
//! session is a Redis key with a TTL.
//!
//!
//!
//! # Configuration
//!
//! | Variable           | Default           |
//! |--------------------|-------------------|
//! | `RUST_PORT`        | `8000`            |
//! | `DATABASE_PATH`    | `tracker.sqlite3` |
//! | `MEDIA_ROOT`       | `media`           |
//! | `SESSION_TTL_SECS` | `1209600`         |
//! | `REDIS_URL`        | unset             |
//! | `CORS_ORIGIN`      | unset             |
//!
//! Log level comes from `RUST_LOG`.
//!
//!
//!
//! # Setup
//!
//! Run locally.
//! ```sh
//! RUST_LOG=info cargo run -p tracker
//! ```
//!
//! Create the first account.
//! ```sh
//! cargo run -p tracker-admin -- --database tracker.sqlite3 create-superuser \
//!     --email admin@example.com --username admin --password 'change-me-now'
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{CONTENT_TYPE, COOKIE},
    },
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod access;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod invitations;
pub mod routes;
pub mod sessions;
pub mod state;
pub mod utils;

use config::Config;
use routes::*;
use state::AppState;

/// Leaves room for multipart framing around a maximum size attachment.
pub const BODY_LIMIT: usize = 12 * 1024 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    let app: Router<Arc<AppState>> = Router::new()
        .route("/accounts/register", post(register_handler))
        .route("/accounts/signin", post(signin_handler))
        .route("/accounts/logout", post(logout_handler))
        .route(
            "/accounts/profile",
            get(profile_handler).post(update_profile_handler),
        )
        .route("/accounts/users/{id}", get(user_handler))
        .route(
            "/accounts/invitations/{id}/accept",
            post(accept_invitation_handler),
        )
        .route(
            "/accounts/invitations/{id}/decline",
            post(decline_invitation_handler),
        )
        .route("/groups", get(list_groups_handler).post(create_group_handler))
        .route("/groups/{id}", get(group_handler))
        .route("/groups/{id}/edit", post(edit_group_handler))
        .route("/groups/{id}/delete", post(delete_group_handler))
        .route(
            "/groups/{id}/members/{user_id}/remove",
            post(remove_group_member_handler),
        )
        .route("/groups/{id}/leave", post(leave_group_handler))
        .route("/groups/{id}/invitations", post(invite_to_group_handler))
        .route("/groups/{id}/projects", post(create_project_handler))
        .route("/projects", get(list_projects_handler))
        .route("/projects/{id}", get(project_handler))
        .route("/projects/{id}/edit", post(edit_project_handler))
        .route("/projects/{id}/delete", post(delete_project_handler))
        .route("/projects/{id}/invitations", post(invite_to_project_handler))
        .route(
            "/projects/{id}/members/{user_id}/remove",
            post(remove_project_member_handler),
        )
        .route("/projects/{id}/tickets", post(create_ticket_handler))
        .route("/projects/{id}/tickets/status", post(ticket_status_handler))
        .route(
            "/projects/{id}/tickets/{ticket_id}",
            get(ticket_handler).post(ticket_action_handler),
        )
        .route(
            "/projects/{id}/tickets/{ticket_id}/update",
            post(update_ticket_handler),
        )
        .route(
            "/projects/{id}/tickets/{ticket_id}/attachments",
            post(upload_attachment_handler),
        )
        .route(
            "/projects/{id}/tickets/{ticket_id}/attachments/{attachment_id}",
            get(download_attachment_handler),
        )
        .route("/tickets", get(list_tickets_handler))
        .route("/tickets/{id}/subtasks", post(add_subtask_handler))
        .route(
            "/tickets/{id}/subtasks/{subtask_id}/status",
            post(subtask_status_handler),
        )
        .route("/api/autocomplete/emails", get(autocomplete_emails_handler))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http());

    let app = match cors_layer(&state.config) {
        Some(cors) => app.layer(cors),
        None => app,
    };

    app.with_state(state)
}

fn cors_layer(config: &Config) -> Option<CorsLayer> {
    let origin = config.cors_origin.as_deref()?;

    let Ok(origin) = HeaderValue::from_str(origin) else {
        warn!("CORS_ORIGIN {origin} is not a valid header value, CORS disabled");
        return None;
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, COOKIE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(60 * 60)),
    )
}

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let config = Config::load()?;
    let state = AppState::new(config).await?;

    let purged = state.db.purge_expired_sessions(chrono::Utc::now())?;
    info!("Purged {purged} expired sessions");

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = build_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
