use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use tracker_model::{Project, User};

use super::{
    Database,
    users::{USER_COLUMNS, user_from_row},
};

const PROJECT_COLUMNS: &str = "p.id, p.title, p.description, p.created_at, p.owner_id, p.group_id";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
        owner_id: row.get(4)?,
        group_id: row.get(5)?,
    })
}

impl Database {
    /// Inserts the project with its creator as owner and first member.
    pub fn create_project(
        &self,
        group_id: i64,
        owner_id: i64,
        title: &str,
        description: &str,
    ) -> rusqlite::Result<Project> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO projects (title, description, created_at, owner_id, group_id) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![title, description, Utc::now(), owner_id, group_id],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO project_members (project_id, user_id) VALUES (?1, ?2)",
            params![id, owner_id],
        )?;

        let project = tx.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?1"),
            [id],
            project_from_row,
        )?;
        tx.commit()?;

        Ok(project)
    }

    pub fn project(&self, id: i64) -> rusqlite::Result<Option<Project>> {
        self.conn()
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?1"),
                [id],
                project_from_row,
            )
            .optional()
    }

    pub fn update_project(
        &self,
        id: i64,
        title: &str,
        description: &str,
    ) -> rusqlite::Result<Project> {
        let conn = self.conn();
        conn.execute(
            "UPDATE projects SET title = ?2, description = ?3 WHERE id = ?1",
            params![id, title, description],
        )?;

        conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?1"),
            [id],
            project_from_row,
        )
    }

    pub fn delete_project(&self, id: i64) -> rusqlite::Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM projects WHERE id = ?1", [id])?;

        Ok(deleted > 0)
    }

    pub fn projects_owned_by(&self, user_id: i64) -> rusqlite::Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.owner_id = ?1 \
             ORDER BY p.created_at DESC, p.id DESC"
        ))?;

        stmt.query_map([user_id], project_from_row)?.collect()
    }

    /// Projects the user is a member of without owning them.
    pub fn projects_joined_by(&self, user_id: i64) -> rusqlite::Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p \
             JOIN project_members m ON m.project_id = p.id \
             WHERE m.user_id = ?1 AND p.owner_id != ?1 \
             ORDER BY p.created_at DESC, p.id DESC"
        ))?;

        stmt.query_map([user_id], project_from_row)?.collect()
    }

    pub fn projects_in_group(&self, group_id: i64) -> rusqlite::Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.group_id = ?1 \
             ORDER BY p.created_at DESC, p.id DESC"
        ))?;

        stmt.query_map([group_id], project_from_row)?.collect()
    }

    pub fn project_members(&self, project_id: i64) -> rusqlite::Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             JOIN project_members m ON m.user_id = users.id \
             WHERE m.project_id = ?1 ORDER BY users.email"
        ))?;

        stmt.query_map([project_id], user_from_row)?.collect()
    }

    pub fn is_project_member(&self, project_id: i64, user_id: i64) -> rusqlite::Result<bool> {
        self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM project_members WHERE project_id = ?1 AND user_id = ?2)",
            params![project_id, user_id],
            |r| r.get(0),
        )
    }

    pub fn add_project_member(&self, project_id: i64, user_id: i64) -> rusqlite::Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO project_members (project_id, user_id) VALUES (?1, ?2)",
            params![project_id, user_id],
        )?;

        Ok(())
    }

    pub fn remove_project_member(&self, project_id: i64, user_id: i64) -> rusqlite::Result<bool> {
        let removed = self.conn().execute(
            "DELETE FROM project_members WHERE project_id = ?1 AND user_id = ?2",
            params![project_id, user_id],
        )?;

        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::database::test_support::{db, user};

    #[test]
    fn test_project_creation_with_group() {
        let db = db();
        let owner = user(&db, "owner@example.com");
        let group = db.create_group(owner.id, "Test Group", "").unwrap();

        let project = db
            .create_project(group.id, owner.id, "Test Project", "")
            .unwrap();

        assert_eq!(project.title, "Test Project");
        assert_eq!(project.group_id, group.id);
        assert_eq!(db.projects_in_group(group.id).unwrap(), [project.clone()]);
        assert_eq!(db.project_members(project.id).unwrap(), [owner]);
    }

    #[test]
    fn test_owned_and_joined_are_disjoint() {
        let db = db();
        let owner = user(&db, "owner@example.com");
        let member = user(&db, "member@example.com");
        let group = db.create_group(owner.id, "Group", "").unwrap();

        let mine = db.create_project(group.id, owner.id, "Mine", "").unwrap();
        let theirs = db.create_project(group.id, member.id, "Theirs", "").unwrap();
        db.add_project_member(theirs.id, owner.id).unwrap();

        assert_eq!(db.projects_owned_by(owner.id).unwrap(), [mine]);
        assert_eq!(db.projects_joined_by(owner.id).unwrap(), [theirs.clone()]);
        assert_eq!(db.projects_owned_by(member.id).unwrap(), [theirs]);
        assert!(db.projects_joined_by(member.id).unwrap().is_empty());
    }

    #[test]
    fn test_membership_changes() {
        let db = db();
        let owner = user(&db, "owner@example.com");
        let member = user(&db, "member@example.com");
        let group = db.create_group(owner.id, "Group", "").unwrap();
        let project = db.create_project(group.id, owner.id, "Project", "").unwrap();

        db.add_project_member(project.id, member.id).unwrap();
        assert!(db.is_project_member(project.id, member.id).unwrap());

        assert!(db.remove_project_member(project.id, member.id).unwrap());
        assert!(!db.remove_project_member(project.id, member.id).unwrap());

        let renamed = db.update_project(project.id, "Renamed", "").unwrap();
        assert_eq!(renamed.title, "Renamed");

        assert!(db.delete_project(project.id).unwrap());
        assert_eq!(db.project(project.id).unwrap(), None);
    }
}
