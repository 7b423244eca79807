use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use tracker_model::{Invitation, InvitationKind, InvitationStatus};

use super::{Database, choice};

const INVITATION_COLUMNS: &str = "id, target_user_id, owner_id, kind, target_group_id, \
     target_project_id, status, created_at";

fn invitation_from_row(row: &Row<'_>) -> rusqlite::Result<Invitation> {
    Ok(Invitation {
        id: row.get(0)?,
        target_user_id: row.get(1)?,
        owner_id: row.get(2)?,
        kind: choice(row, 3)?,
        target_group_id: row.get(4)?,
        target_project_id: row.get(5)?,
        status: choice(row, 6)?,
        created_at: row.get(7)?,
    })
}

/// The member set an invitation grants access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationTarget {
    Group(i64),
    Project(i64),
}

impl InvitationTarget {
    pub fn kind(self) -> InvitationKind {
        match self {
            InvitationTarget::Group(_) => InvitationKind::Group,
            InvitationTarget::Project(_) => InvitationKind::Project,
        }
    }

    fn columns(self) -> (Option<i64>, Option<i64>) {
        match self {
            InvitationTarget::Group(id) => (Some(id), None),
            InvitationTarget::Project(id) => (None, Some(id)),
        }
    }

    pub fn of(invitation: &Invitation) -> Option<Self> {
        match invitation.kind {
            InvitationKind::Group => invitation.target_group_id.map(InvitationTarget::Group),
            InvitationKind::Project => invitation.target_project_id.map(InvitationTarget::Project),
        }
    }
}

impl Database {
    pub fn create_invitation(
        &self,
        owner_id: i64,
        target_user_id: i64,
        target: InvitationTarget,
    ) -> rusqlite::Result<Invitation> {
        let conn = self.conn();
        let (group_id, project_id) = target.columns();

        conn.execute(
            "INSERT INTO invitations (target_user_id, owner_id, kind, target_group_id, \
             target_project_id, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
            params![
                target_user_id,
                owner_id,
                target.kind().as_str(),
                group_id,
                project_id,
                Utc::now(),
            ],
        )?;
        let id = conn.last_insert_rowid();

        conn.query_row(
            &format!("SELECT {INVITATION_COLUMNS} FROM invitations WHERE id = ?1"),
            [id],
            invitation_from_row,
        )
    }

    pub fn invitation(&self, id: i64) -> rusqlite::Result<Option<Invitation>> {
        self.conn()
            .query_row(
                &format!("SELECT {INVITATION_COLUMNS} FROM invitations WHERE id = ?1"),
                [id],
                invitation_from_row,
            )
            .optional()
    }

    pub fn has_pending_invitation(
        &self,
        target_user_id: i64,
        target: InvitationTarget,
    ) -> rusqlite::Result<bool> {
        let (group_id, project_id) = target.columns();

        self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM invitations WHERE target_user_id = ?1 \
             AND status = 'pending' AND target_group_id IS ?2 AND target_project_id IS ?3)",
            params![target_user_id, group_id, project_id],
            |r| r.get(0),
        )
    }

    pub fn pending_invitations_for(&self, user_id: i64) -> rusqlite::Result<Vec<Invitation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations \
             WHERE target_user_id = ?1 AND status = 'pending' ORDER BY created_at DESC, id DESC"
        ))?;

        stmt.query_map([user_id], invitation_from_row)?.collect()
    }

    /// Adds the membership and marks the invitation accepted in one transaction.
    /// Returns `None` when the invitation was no longer pending.
    pub fn accept_invitation(&self, id: i64) -> rusqlite::Result<Option<Invitation>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let Some(invitation) = tx
            .query_row(
                &format!(
                    "SELECT {INVITATION_COLUMNS} FROM invitations WHERE id = ?1 AND status = 'pending'"
                ),
                [id],
                invitation_from_row,
            )
            .optional()?
        else {
            return Ok(None);
        };

        match InvitationTarget::of(&invitation) {
            Some(InvitationTarget::Group(group_id)) => tx.execute(
                "INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2)",
                params![group_id, invitation.target_user_id],
            )?,
            Some(InvitationTarget::Project(project_id)) => tx.execute(
                "INSERT OR IGNORE INTO project_members (project_id, user_id) VALUES (?1, ?2)",
                params![project_id, invitation.target_user_id],
            )?,
            None => return Ok(None),
        };

        tx.execute(
            "UPDATE invitations SET status = 'accepted' WHERE id = ?1",
            [id],
        )?;
        tx.commit()?;

        Ok(Some(Invitation {
            status: InvitationStatus::Accepted,
            ..invitation
        }))
    }

    /// Returns `None` when the invitation was no longer pending.
    pub fn decline_invitation(&self, id: i64) -> rusqlite::Result<Option<Invitation>> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE invitations SET status = 'declined' WHERE id = ?1 AND status = 'pending'",
            [id],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        conn.query_row(
            &format!("SELECT {INVITATION_COLUMNS} FROM invitations WHERE id = ?1"),
            [id],
            invitation_from_row,
        )
        .optional()
    }
}
