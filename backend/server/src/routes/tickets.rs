use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State, multipart::MultipartRejection, rejection::JsonRejection,
    },
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use tracker_model::{
    TicketStatus, ValidationErrors,
    forms::{CommentForm, StatusUpdateForm, SubTaskForm, SubTaskStatusForm, TicketForm},
};

use crate::{
    access::{check_assignee, project_access, ticket_access, ticket_by_id},
    auth::CurrentUser,
    error::AppError,
    state::AppState,
    utils::{content_disposition, content_type, read_attachment, read_upload, save_attachment},
};

#[derive(Debug, Default, Deserialize)]
pub struct TicketFilter {
    pub status: Option<String>,
}

/// Inline actions posted from the ticket page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketAction {
    AddComment(CommentForm),
    AddSubtask(SubTaskForm),
}

pub async fn list_tickets_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<TicketFilter>,
) -> Result<impl IntoResponse, AppError> {
    let status = match filter.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<TicketStatus>()
                .map_err(|e| ValidationErrors::single("status", e.to_string()))?,
        ),
    };

    Ok(Json(state.db.tickets_for_user(user.id, status)?))
}

pub async fn create_ticket_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<i64>,
    payload: Result<Json<TicketForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let project = project_access(&state.db, project_id, &user)?;
    let Json(form) = payload?;
    let draft = form.validate(Utc::now())?;
    check_assignee(&state.db, &project, draft.assignee)?;

    let ticket = state.db.create_ticket(project.id, user.id, &draft)?;
    info!("User {} opened ticket {} in project {}", user.id, ticket.id, project.id);

    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn ticket_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((project_id, ticket_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let (_, ticket) = ticket_access(&state.db, project_id, ticket_id, &user)?;

    let comments = state.db.comments(ticket.id)?;
    let attachments = state.db.attachments(ticket.id)?;
    let subtasks = state.db.subtasks(ticket.id)?;

    Ok(Json(json!({
        "ticket": ticket,
        "comments": comments,
        "attachments": attachments,
        "subtasks": subtasks,
    })))
}

pub async fn ticket_action_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((project_id, ticket_id)): Path<(i64, i64)>,
    payload: Result<Json<TicketAction>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (_, ticket) = ticket_access(&state.db, project_id, ticket_id, &user)?;
    let Json(action) = payload?;

    let body = match action {
        TicketAction::AddComment(form) => {
            let text = form.validate()?;
            let comment = state.db.add_comment(ticket.id, user.id, &text)?;
            json!({ "comment": comment })
        }
        TicketAction::AddSubtask(form) => {
            let (text, is_done) = form.validate()?;
            let subtask = state.db.add_subtask(ticket.id, &text, is_done)?;
            json!({ "subtask": subtask })
        }
    };

    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn update_ticket_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((project_id, ticket_id)): Path<(i64, i64)>,
    payload: Result<Json<TicketForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (project, ticket) = ticket_access(&state.db, project_id, ticket_id, &user)?;
    let Json(form) = payload?;
    let draft = form.validate(Utc::now())?;
    check_assignee(&state.db, &project, draft.assignee)?;

    let updated = state.db.update_ticket(ticket.id, &draft)?;
    info!("User {} updated ticket {}", user.id, ticket.id);

    Ok(Json(updated))
}

pub async fn upload_attachment_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((project_id, ticket_id)): Path<(i64, i64)>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (_, ticket) = ticket_access(&state.db, project_id, ticket_id, &user)?;
    let multipart = multipart.map_err(|_| AppError::MalformedPayload)?;

    let upload = read_upload(multipart).await?;
    let attachment =
        save_attachment(&state.db, &state.config.media_root, ticket.id, user.id, &upload).await?;
    info!(
        "User {} attached {} ({} bytes) to ticket {}",
        user.id, attachment.file_name, attachment.size_bytes, ticket.id
    );

    Ok((StatusCode::CREATED, Json(attachment)))
}

pub async fn download_attachment_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((project_id, ticket_id, attachment_id)): Path<(i64, i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let (_, ticket) = ticket_access(&state.db, project_id, ticket_id, &user)?;

    let attachment = state
        .db
        .attachment(attachment_id)?
        .filter(|attachment| attachment.ticket_id == ticket.id)
        .ok_or(AppError::NotFound("Attachment"))?;
    let bytes = read_attachment(&state.config.media_root, &attachment).await?;

    Ok((
        [
            (CONTENT_TYPE, content_type(&attachment.file_name).to_string()),
            (CONTENT_DISPOSITION, content_disposition(&attachment.file_name)),
        ],
        bytes,
    ))
}

/// Kanban drag between status columns.
pub async fn ticket_status_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<i64>,
    payload: Result<Json<StatusUpdateForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let project = project_access(&state.db, project_id, &user)?;
    let Json(form) = payload?;
    let (ticket_id, status) = form.validate()?;

    let (_, ticket) = ticket_access(&state.db, project.id, ticket_id, &user)?;
    let ticket = state.db.set_ticket_status(ticket.id, status)?;

    Ok(Json(json!({
        "success": true,
        "status": ticket.status,
        "badge_class": ticket.status.badge_class(),
    })))
}

pub async fn add_subtask_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(ticket_id): Path<i64>,
    payload: Result<Json<SubTaskForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (_, ticket) = ticket_by_id(&state.db, ticket_id, &user)?;
    let Json(form) = payload?;
    let (text, is_done) = form.validate()?;

    let subtask = state.db.add_subtask(ticket.id, &text, is_done)?;

    Ok((StatusCode::CREATED, Json(subtask)))
}

pub async fn subtask_status_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((ticket_id, subtask_id)): Path<(i64, i64)>,
    payload: Result<Json<SubTaskStatusForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (_, ticket) = ticket_by_id(&state.db, ticket_id, &user)?;
    let Json(form) = payload?;

    let subtask = state
        .db
        .subtask(subtask_id)?
        .filter(|subtask| subtask.ticket_id == ticket.id)
        .ok_or(AppError::NotFound("Subtask"))?;
    let subtask = state.db.set_subtask_done(subtask.id, form.is_done)?;

    Ok(Json(json!({ "success": true, "is_done": subtask.is_done })))
}
