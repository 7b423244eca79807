use tracing::warn;
use tracker_model::{Group, Project, Ticket, User};

use crate::{database::Database, error::AppError};

pub const NO_GROUP_ACCESS: &str = "No access to this group";
pub const NO_PROJECT_ACCESS: &str = "No access to this project";
pub const GROUP_OWNER_ONLY: &str = "Only the group owner can do this";
pub const PROJECT_OWNER_ONLY: &str = "Only the project owner can do this";

fn load_group(db: &Database, group_id: i64) -> Result<Group, AppError> {
    db.group(group_id)?.ok_or(AppError::NotFound("Group"))
}

fn load_project(db: &Database, project_id: i64) -> Result<Project, AppError> {
    db.project(project_id)?.ok_or(AppError::NotFound("Project"))
}

/// Group the user owns or belongs to.
pub fn group_access(db: &Database, group_id: i64, user: &User) -> Result<Group, AppError> {
    let group = load_group(db, group_id)?;

    if group.owner_id == user.id || db.is_group_member(group.id, user.id)? {
        return Ok(group);
    }

    warn!("User {} denied access to group {}", user.id, group.id);
    Err(AppError::Forbidden(NO_GROUP_ACCESS))
}

pub fn group_owner(db: &Database, group_id: i64, user: &User) -> Result<Group, AppError> {
    let group = group_access(db, group_id, user)?;

    if group.owner_id != user.id {
        warn!("User {} is not the owner of group {}", user.id, group.id);
        return Err(AppError::Forbidden(GROUP_OWNER_ONLY));
    }

    Ok(group)
}

/// Project the user owns or belongs to.
pub fn project_access(db: &Database, project_id: i64, user: &User) -> Result<Project, AppError> {
    let project = load_project(db, project_id)?;

    if project.owner_id == user.id || db.is_project_member(project.id, user.id)? {
        return Ok(project);
    }

    warn!("User {} denied access to project {}", user.id, project.id);
    Err(AppError::Forbidden(NO_PROJECT_ACCESS))
}

pub fn project_owner(db: &Database, project_id: i64, user: &User) -> Result<Project, AppError> {
    let project = project_access(db, project_id, user)?;

    if project.owner_id != user.id {
        warn!("User {} is not the owner of project {}", user.id, project.id);
        return Err(AppError::Forbidden(PROJECT_OWNER_ONLY));
    }

    Ok(project)
}

/// Ticket addressed through `project_id`. A ticket of another project is reported missing.
pub fn ticket_access(
    db: &Database,
    project_id: i64,
    ticket_id: i64,
    user: &User,
) -> Result<(Project, Ticket), AppError> {
    let project = project_access(db, project_id, user)?;

    match db.ticket(ticket_id)? {
        Some(ticket) if ticket.project_id == project.id => Ok((project, ticket)),
        _ => Err(AppError::NotFound("Ticket")),
    }
}

/// Ticket addressed by id alone, access follows its project.
pub fn ticket_by_id(db: &Database, ticket_id: i64, user: &User) -> Result<(Project, Ticket), AppError> {
    let ticket = db.ticket(ticket_id)?.ok_or(AppError::NotFound("Ticket"))?;
    let project = project_access(db, ticket.project_id, user)?;

    Ok((project, ticket))
}

/// Assignees must be able to see the ticket.
pub fn check_assignee(db: &Database, project: &Project, assignee: Option<i64>) -> Result<(), AppError> {
    let Some(assignee) = assignee else {
        return Ok(());
    };

    if assignee == project.owner_id || db.is_project_member(project.id, assignee)? {
        return Ok(());
    }

    Err(tracker_model::ValidationErrors::single(
        "assignee",
        "Select a valid choice. That user is not part of this project.",
    )
    .into())
}
