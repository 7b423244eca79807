use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use tracker_model::{Group, User};

use super::{
    Database,
    users::{USER_COLUMNS, user_from_row},
};

const GROUP_COLUMNS: &str = "g.id, g.title, g.description, g.created_at, g.owner_id";

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
        owner_id: row.get(4)?,
    })
}

impl Database {
    /// Inserts the group with its owner as the first member.
    pub fn create_group(
        &self,
        owner_id: i64,
        title: &str,
        description: &str,
    ) -> rusqlite::Result<Group> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO tracker_groups (title, description, created_at, owner_id) \
             VALUES (?1, ?2, ?3, ?4)",
            params![title, description, Utc::now(), owner_id],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO group_members (group_id, user_id) VALUES (?1, ?2)",
            params![id, owner_id],
        )?;

        let group = tx.query_row(
            &format!("SELECT {GROUP_COLUMNS} FROM tracker_groups g WHERE g.id = ?1"),
            [id],
            group_from_row,
        )?;
        tx.commit()?;

        Ok(group)
    }

    pub fn group(&self, id: i64) -> rusqlite::Result<Option<Group>> {
        self.conn()
            .query_row(
                &format!("SELECT {GROUP_COLUMNS} FROM tracker_groups g WHERE g.id = ?1"),
                [id],
                group_from_row,
            )
            .optional()
    }

    pub fn update_group(&self, id: i64, title: &str, description: &str) -> rusqlite::Result<Group> {
        let conn = self.conn();
        conn.execute(
            "UPDATE tracker_groups SET title = ?2, description = ?3 WHERE id = ?1",
            params![id, title, description],
        )?;

        conn.query_row(
            &format!("SELECT {GROUP_COLUMNS} FROM tracker_groups g WHERE g.id = ?1"),
            [id],
            group_from_row,
        )
    }

    /// Cascades to the group's projects, their tickets and pending invitations.
    pub fn delete_group(&self, id: i64) -> rusqlite::Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM tracker_groups WHERE id = ?1", [id])?;

        Ok(deleted > 0)
    }

    /// Groups the user owns or belongs to, newest first.
    pub fn groups_for_user(&self, user_id: i64) -> rusqlite::Result<Vec<Group>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT {GROUP_COLUMNS} FROM tracker_groups g \
             LEFT JOIN group_members m ON m.group_id = g.id \
             WHERE g.owner_id = ?1 OR m.user_id = ?1 \
             ORDER BY g.created_at DESC, g.id DESC"
        ))?;

        stmt.query_map([user_id], group_from_row)?.collect()
    }

    pub fn group_members(&self, group_id: i64) -> rusqlite::Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             JOIN group_members m ON m.user_id = users.id \
             WHERE m.group_id = ?1 ORDER BY users.email"
        ))?;

        stmt.query_map([group_id], user_from_row)?.collect()
    }

    pub fn is_group_member(&self, group_id: i64, user_id: i64) -> rusqlite::Result<bool> {
        self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM group_members WHERE group_id = ?1 AND user_id = ?2)",
            params![group_id, user_id],
            |r| r.get(0),
        )
    }

    pub fn add_group_member(&self, group_id: i64, user_id: i64) -> rusqlite::Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2)",
            params![group_id, user_id],
        )?;

        Ok(())
    }

    /// Drops the membership and every project membership inside the group.
    /// Projects the user owned there pass to the group owner.
    /// Returns false when the user was not a member.
    pub fn remove_group_member(&self, group_id: i64, user_id: i64) -> rusqlite::Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let removed = tx.execute(
            "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
            params![group_id, user_id],
        )?;
        let group_owner: i64 = tx.query_row(
            "SELECT owner_id FROM tracker_groups WHERE id = ?1",
            [group_id],
            |r| r.get(0),
        )?;
        tx.execute(
            "UPDATE projects SET owner_id = ?3 WHERE group_id = ?1 AND owner_id = ?2",
            params![group_id, user_id, group_owner],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO project_members (project_id, user_id) \
             SELECT id, owner_id FROM projects WHERE group_id = ?1",
            [group_id],
        )?;
        tx.execute(
            "DELETE FROM project_members WHERE user_id = ?2 \
             AND project_id IN (SELECT id FROM projects WHERE group_id = ?1)",
            params![group_id, user_id],
        )?;
        tx.execute(
            "UPDATE invitations SET status = 'declined' WHERE status = 'pending' \
             AND target_user_id = ?2 \
             AND target_project_id IN (SELECT id FROM projects WHERE group_id = ?1)",
            params![group_id, user_id],
        )?;
        tx.commit()?;

        Ok(removed > 0)
    }
}
