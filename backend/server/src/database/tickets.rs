use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tracker_model::{Attachment, Comment, SubTask, Ticket, TicketStatus, forms::TicketDraft};

use super::{Database, choice};

const TICKET_COLUMNS: &str = "t.id, t.title, t.description, t.status, t.priority, t.ticket_type, \
     t.created_at, t.updated_at, t.due_date, t.project_id, t.creator_id, t.assignee_id";

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: choice(row, 3)?,
        priority: choice(row, 4)?,
        ticket_type: choice(row, 5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        due_date: row.get(8)?,
        project_id: row.get(9)?,
        creator_id: row.get(10)?,
        assignee_id: row.get(11)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        author_id: row.get(2)?,
        text: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn attachment_from_row(row: &Row<'_>) -> rusqlite::Result<Attachment> {
    Ok(Attachment {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        file_name: row.get(2)?,
        stored_path: row.get(3)?,
        size_bytes: row.get(4)?,
        uploaded_by: row.get(5)?,
        uploaded_at: row.get(6)?,
    })
}

fn subtask_from_row(row: &Row<'_>) -> rusqlite::Result<SubTask> {
    Ok(SubTask {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        text: row.get(2)?,
        is_done: row.get(3)?,
    })
}

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub ticket_id: i64,
    pub file_name: String,
    pub stored_path: String,
    pub size_bytes: i64,
    pub uploaded_by: i64,
}

impl Database {
    pub fn create_ticket(
        &self,
        project_id: i64,
        creator_id: i64,
        draft: &TicketDraft,
    ) -> rusqlite::Result<Ticket> {
        let conn = self.conn();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO tickets (title, description, status, priority, ticket_type, created_at, \
             updated_at, due_date, project_id, creator_id, assignee_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?8, ?9, ?10)",
            params![
                draft.title,
                draft.description,
                draft.status.unwrap_or_default().as_str(),
                draft.priority.as_str(),
                draft.ticket_type.as_str(),
                now,
                draft.due_date,
                project_id,
                creator_id,
                draft.assignee,
            ],
        )?;
        let id = conn.last_insert_rowid();

        conn.query_row(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets t WHERE t.id = ?1"),
            [id],
            ticket_from_row,
        )
    }

    pub fn ticket(&self, id: i64) -> rusqlite::Result<Option<Ticket>> {
        self.conn()
            .query_row(
                &format!("SELECT {TICKET_COLUMNS} FROM tickets t WHERE t.id = ?1"),
                [id],
                ticket_from_row,
            )
            .optional()
    }

    /// Rewrites the editable fields. A draft without status keeps the current one.
    pub fn update_ticket(&self, id: i64, draft: &TicketDraft) -> rusqlite::Result<Ticket> {
        let conn = self.conn();

        conn.execute(
            "UPDATE tickets SET title = ?2, description = ?3, status = COALESCE(?4, status), \
             priority = ?5, ticket_type = ?6, due_date = ?7, assignee_id = ?8, updated_at = ?9 \
             WHERE id = ?1",
            params![
                id,
                draft.title,
                draft.description,
                draft.status.map(TicketStatus::as_str),
                draft.priority.as_str(),
                draft.ticket_type.as_str(),
                draft.due_date,
                draft.assignee,
                Utc::now(),
            ],
        )?;

        conn.query_row(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets t WHERE t.id = ?1"),
            [id],
            ticket_from_row,
        )
    }

    pub fn set_ticket_status(&self, id: i64, status: TicketStatus) -> rusqlite::Result<Ticket> {
        let conn = self.conn();

        conn.execute(
            "UPDATE tickets SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), Utc::now()],
        )?;

        conn.query_row(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets t WHERE t.id = ?1"),
            [id],
            ticket_from_row,
        )
    }

    pub fn tickets_in_project(&self, project_id: i64) -> rusqlite::Result<Vec<Ticket>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets t WHERE t.project_id = ?1 \
             ORDER BY t.created_at DESC, t.id DESC"
        ))?;

        stmt.query_map([project_id], ticket_from_row)?.collect()
    }

    /// Tickets the user created or is assigned to, optionally in one status.
    pub fn tickets_for_user(
        &self,
        user_id: i64,
        status: Option<TicketStatus>,
    ) -> rusqlite::Result<Vec<Ticket>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets t \
             WHERE (t.creator_id = ?1 OR t.assignee_id = ?1) AND (?2 IS NULL OR t.status = ?2) \
             ORDER BY t.updated_at DESC, t.id DESC"
        ))?;

        stmt.query_map(
            params![user_id, status.map(TicketStatus::as_str)],
            ticket_from_row,
        )?
        .collect()
    }

    pub fn add_comment(&self, ticket_id: i64, author_id: i64, text: &str) -> rusqlite::Result<Comment> {
        let conn = self.conn();
        let now: DateTime<Utc> = Utc::now();

        conn.execute(
            "INSERT INTO comments (ticket_id, author_id, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![ticket_id, author_id, text, now],
        )?;

        Ok(Comment {
            id: conn.last_insert_rowid(),
            ticket_id,
            author_id,
            text: text.to_string(),
            created_at: now,
        })
    }

    pub fn comments(&self, ticket_id: i64) -> rusqlite::Result<Vec<Comment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, ticket_id, author_id, text, created_at FROM comments \
             WHERE ticket_id = ?1 ORDER BY created_at, id",
        )?;

        stmt.query_map([ticket_id], comment_from_row)?.collect()
    }

    pub fn add_attachment(&self, new: &NewAttachment) -> rusqlite::Result<Attachment> {
        let conn = self.conn();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO attachments (ticket_id, file_name, stored_path, size_bytes, uploaded_by, \
             uploaded_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.ticket_id,
                new.file_name,
                new.stored_path,
                new.size_bytes,
                new.uploaded_by,
                now,
            ],
        )?;

        Ok(Attachment {
            id: conn.last_insert_rowid(),
            ticket_id: new.ticket_id,
            file_name: new.file_name.clone(),
            stored_path: new.stored_path.clone(),
            size_bytes: new.size_bytes,
            uploaded_by: new.uploaded_by,
            uploaded_at: now,
        })
    }

    pub fn attachments(&self, ticket_id: i64) -> rusqlite::Result<Vec<Attachment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, ticket_id, file_name, stored_path, size_bytes, uploaded_by, uploaded_at \
             FROM attachments WHERE ticket_id = ?1 ORDER BY uploaded_at, id",
        )?;

        stmt.query_map([ticket_id], attachment_from_row)?.collect()
    }

    pub fn attachment(&self, id: i64) -> rusqlite::Result<Option<Attachment>> {
        self.conn()
            .query_row(
                "SELECT id, ticket_id, file_name, stored_path, size_bytes, uploaded_by, \
                 uploaded_at FROM attachments WHERE id = ?1",
                [id],
                attachment_from_row,
            )
            .optional()
    }

    pub fn add_subtask(&self, ticket_id: i64, text: &str, is_done: bool) -> rusqlite::Result<SubTask> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO subtasks (ticket_id, text, is_done) VALUES (?1, ?2, ?3)",
            params![ticket_id, text, is_done],
        )?;

        Ok(SubTask {
            id: conn.last_insert_rowid(),
            ticket_id,
            text: text.to_string(),
            is_done,
        })
    }

    pub fn subtask(&self, id: i64) -> rusqlite::Result<Option<SubTask>> {
        self.conn()
            .query_row(
                "SELECT id, ticket_id, text, is_done FROM subtasks WHERE id = ?1",
                [id],
                subtask_from_row,
            )
            .optional()
    }

    pub fn set_subtask_done(&self, id: i64, is_done: bool) -> rusqlite::Result<SubTask> {
        let conn = self.conn();
        conn.execute(
            "UPDATE subtasks SET is_done = ?2 WHERE id = ?1",
            params![id, is_done],
        )?;

        conn.query_row(
            "SELECT id, ticket_id, text, is_done FROM subtasks WHERE id = ?1",
            [id],
            subtask_from_row,
        )
    }

    pub fn subtasks(&self, ticket_id: i64) -> rusqlite::Result<Vec<SubTask>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, ticket_id, text, is_done FROM subtasks WHERE ticket_id = ?1 ORDER BY id",
        )?;

        stmt.query_map([ticket_id], subtask_from_row)?.collect()
    }
}
