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
    forms::{GroupForm, InviteForm},
};

use crate::{
    access::{group_access, group_owner},
    auth::CurrentUser,
    database::InvitationTarget,
    error::AppError,
    invitations::{InviteReport, send_invitations},
    state::AppState,
};

pub async fn list_groups_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.groups_for_user(user.id)?))
}

pub async fn create_group_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<GroupForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(form) = payload?;
    let draft = form.validate()?;

    let group = state
        .db
        .create_group(user.id, &draft.title, &draft.description)?;
    info!("User {} created group {}", user.id, group.id);

    let report = if draft.emails.is_empty() {
        InviteReport::default()
    } else {
        send_invitations(
            &state.db,
            &user,
            InvitationTarget::Group(group.id),
            &draft.emails,
        )?
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({ "group": group, "invitations": report })),
    ))
}

pub async fn group_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(group_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let group = group_access(&state.db, group_id, &user)?;

    let members: Vec<PublicUser> = state
        .db
        .group_members(group.id)?
        .iter()
        .map(|member| member.public())
        .collect();
    let projects = state.db.projects_in_group(group.id)?;

    Ok(Json(json!({
        "group": group,
        "members": members,
        "projects": projects,
    })))
}

pub async fn edit_group_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(group_id): Path<i64>,
    payload: Result<Json<GroupForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let group = group_owner(&state.db, group_id, &user)?;
    let Json(form) = payload?;
    let draft = form.validate()?;

    let updated = state
        .db
        .update_group(group.id, &draft.title, &draft.description)?;

    Ok(Json(updated))
}

pub async fn delete_group_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(group_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let group = group_owner(&state.db, group_id, &user)?;

    state.db.delete_group(group.id)?;
    info!("User {} deleted group {}", user.id, group.id);

    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_group_member_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((group_id, member_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let group = group_owner(&state.db, group_id, &user)?;

    if member_id == group.owner_id {
        return Err(AppError::Conflict("The group owner cannot be removed"));
    }
    if !state.db.remove_group_member(group.id, member_id)? {
        return Err(AppError::NotFound("Member"));
    }

    info!("User {member_id} removed from group {}", group.id);

    Ok(StatusCode::NO_CONTENT)
}

pub async fn leave_group_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(group_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let group = group_access(&state.db, group_id, &user)?;

    if group.owner_id == user.id {
        return Err(AppError::Conflict("The group owner cannot leave the group"));
    }

    state.db.remove_group_member(group.id, user.id)?;
    info!("User {} left group {}", user.id, group.id);

    Ok(StatusCode::NO_CONTENT)
}

pub async fn invite_to_group_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(group_id): Path<i64>,
    payload: Result<Json<InviteForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let group = group_owner(&state.db, group_id, &user)?;
    let Json(form) = payload?;
    let emails = form.validate()?;

    let report = send_invitations(&state.db, &user, InvitationTarget::Group(group.id), &emails)?;

    Ok(Json(report))
}
