//! # Invitations
//!
//! The only way into a group or project member set.
//!
//! - Owners send, one invitation per user and target while pending
//! - Project invitations only reach users already in the project's group
//! - The invitee accepts or declines, nobody else can touch it
//! - Accepting writes the membership and the status together
use serde::Serialize;
use tracing::{info, warn};
use tracker_model::{Invitation, User};

use crate::{
    database::{Database, InvitationTarget},
    error::AppError,
};

/// Outcome of inviting a list of emails, one bucket per email.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct InviteReport {
    pub invited: Vec<String>,
    pub skipped: Vec<String>,
    pub unknown: Vec<String>,
}

fn is_member(db: &Database, user_id: i64, target: InvitationTarget) -> Result<bool, AppError> {
    Ok(match target {
        InvitationTarget::Group(group_id) => db.is_group_member(group_id, user_id)?,
        InvitationTarget::Project(project_id) => db.is_project_member(project_id, user_id)?,
    })
}

/// Invites every email to `target`. The caller has already checked that `owner` owns it.
pub fn send_invitations(
    db: &Database,
    owner: &User,
    target: InvitationTarget,
    emails: &[String],
) -> Result<InviteReport, AppError> {
    let required_group = match target {
        InvitationTarget::Project(project_id) => Some(
            db.project(project_id)?
                .ok_or(AppError::NotFound("Project"))?
                .group_id,
        ),
        InvitationTarget::Group(_) => None,
    };

    let mut report = InviteReport::default();

    for email in emails {
        let Some(invitee) = db.user_by_email(email)?.filter(|u| u.is_active) else {
            report.unknown.push(email.clone());
            continue;
        };

        let outside_group = match required_group {
            Some(group_id) => !db.is_group_member(group_id, invitee.id)?,
            None => false,
        };

        if invitee.id == owner.id
            || outside_group
            || is_member(db, invitee.id, target)?
            || db.has_pending_invitation(invitee.id, target)?
        {
            report.skipped.push(email.clone());
            continue;
        }

        db.create_invitation(owner.id, invitee.id, target)?;
        report.invited.push(email.clone());
    }

    info!(
        "User {} invited {} to {:?} ({} skipped, {} unknown)",
        owner.id,
        report.invited.len(),
        target,
        report.skipped.len(),
        report.unknown.len()
    );

    Ok(report)
}

/// Invitation addressed to `user` that is still pending.
fn pending_for(db: &Database, invitation_id: i64, user: &User) -> Result<Invitation, AppError> {
    let invitation = db
        .invitation(invitation_id)?
        .ok_or(AppError::NotFound("Invitation"))?;

    if invitation.target_user_id != user.id {
        warn!("User {} touched invitation {} of another user", user.id, invitation.id);
        return Err(AppError::Forbidden("This invitation is not for you"));
    }

    if !invitation.is_pending() {
        return Err(AppError::Conflict("Invitation is no longer pending"));
    }

    Ok(invitation)
}

pub fn accept(db: &Database, invitation_id: i64, user: &User) -> Result<Invitation, AppError> {
    let invitation = pending_for(db, invitation_id, user)?;
    let target = InvitationTarget::of(&invitation)
        .ok_or_else(|| AppError::internal(format!("Invitation {} has no target", invitation.id)))?;

    if is_member(db, user.id, target)? {
        return Err(AppError::Conflict("Already a member"));
    }

    let accepted = db
        .accept_invitation(invitation.id)?
        .ok_or(AppError::Conflict("Invitation is no longer pending"))?;

    info!("User {} accepted invitation {} to {:?}", user.id, accepted.id, target);

    Ok(accepted)
}

pub fn decline(db: &Database, invitation_id: i64, user: &User) -> Result<Invitation, AppError> {
    let invitation = pending_for(db, invitation_id, user)?;

    let declined = db
        .decline_invitation(invitation.id)?
        .ok_or(AppError::Conflict("Invitation is no longer pending"))?;

    info!("User {} declined invitation {}", user.id, declined.id);

    Ok(declined)
}
