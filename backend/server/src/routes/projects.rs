use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;
use tracker_model::{
    PublicUser,
    forms::{InviteForm, ProjectForm},
};

use crate::{
    access::{group_access, project_access, project_owner},
    auth::CurrentUser,
    database::InvitationTarget,
    error::AppError,
    invitations::send_invitations,
    state::AppState,
};

pub async fn list_projects_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let owned = state.db.projects_owned_by(user.id)?;
    let member = state.db.projects_joined_by(user.id)?;

    Ok(Json(json!({ "owned": owned, "member": member })))
}

pub async fn create_project_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(group_id): Path<i64>,
    payload: Result<Json<ProjectForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let group = group_access(&state.db, group_id, &user)?;
    let Json(form) = payload?;
    let draft = form.validate()?;

    let project = state
        .db
        .create_project(group.id, user.id, &draft.title, &draft.description)?;
    info!("User {} created project {} in group {}", user.id, project.id, group.id);

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn project_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let project = project_access(&state.db, project_id, &user)?;

    let members: Vec<PublicUser> = state
        .db
        .project_members(project.id)?
        .iter()
        .map(|member| member.public())
        .collect();
    let tickets = state.db.tickets_in_project(project.id)?;

    Ok(Json(json!({
        "project": project,
        "members": members,
        "tickets": tickets,
    })))
}

pub async fn edit_project_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<i64>,
    payload: Result<Json<ProjectForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let project = project_owner(&state.db, project_id, &user)?;
    let Json(form) = payload?;
    let draft = form.validate()?;

    let updated = state
        .db
        .update_project(project.id, &draft.title, &draft.description)?;

    Ok(Json(updated))
}

pub async fn delete_project_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let project = project_owner(&state.db, project_id, &user)?;

    state.db.delete_project(project.id)?;
    info!("User {} deleted project {}", user.id, project.id);

    Ok(StatusCode::NO_CONTENT)
}

pub async fn invite_to_project_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<i64>,
    payload: Result<Json<InviteForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let project = project_owner(&state.db, project_id, &user)?;
    let Json(form) = payload?;
    let emails = form.validate()?;

    let report = send_invitations(
        &state.db,
        &user,
        InvitationTarget::Project(project.id),
        &emails,
    )?;

    Ok(Json(report))
}

pub async fn remove_project_member_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((project_id, member_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let project = project_owner(&state.db, project_id, &user)?;

    if member_id == project.owner_id {
        return Err(AppError::Conflict("The project owner cannot be removed"));
    }
    if !state.db.remove_project_member(project.id, member_id)? {
        return Err(AppError::NotFound("Member"));
    }

    info!("User {member_id} removed from project {}", project.id);

    Ok(StatusCode::NO_CONTENT)
}
