use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use tracker_model::{PublicUser, User};

use super::{Database, like_pattern};

pub(super) const USER_COLUMNS: &str = "users.id, users.email, users.username, users.first_name, \
     users.last_name, users.password_hash, users.is_active, users.is_staff, users.is_superuser, \
     users.date_joined";

pub(super) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        password_hash: row.get(5)?,
        is_active: row.get(6)?,
        is_staff: row.get(7)?,
        is_superuser: row.get(8)?,
        date_joined: row.get(9)?,
    })
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl Database {
    pub fn create_user(&self, new: &NewUser) -> rusqlite::Result<User> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (email, username, first_name, last_name, password_hash, \
             is_staff, is_superuser, date_joined) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new.email,
                new.username,
                new.first_name,
                new.last_name,
                new.password_hash,
                new.is_staff,
                new.is_superuser,
                Utc::now(),
            ],
        )?;
        let id = conn.last_insert_rowid();

        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            user_from_row,
        )
    }

    pub fn user_by_id(&self, id: i64) -> rusqlite::Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                user_from_row,
            )
            .optional()
    }

    pub fn user_by_email(&self, email: &str) -> rusqlite::Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                [email],
                user_from_row,
            )
            .optional()
    }

    pub fn list_users(&self) -> rusqlite::Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;

        stmt.query_map([], user_from_row)?.collect()
    }

    /// Whether another account already uses `email`.
    pub fn email_taken(&self, email: &str, except: Option<i64>) -> rusqlite::Result<bool> {
        self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND id IS NOT ?2)",
            params![email, except],
            |r| r.get(0),
        )
    }

    pub fn username_taken(&self, username: &str, except: Option<i64>) -> rusqlite::Result<bool> {
        self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND id IS NOT ?2)",
            params![username, except],
            |r| r.get(0),
        )
    }

    pub fn update_profile(
        &self,
        id: i64,
        email: &str,
        username: &str,
        first_name: &str,
        last_name: &str,
        password_hash: Option<&str>,
    ) -> rusqlite::Result<User> {
        let conn = self.conn();
        conn.execute(
            "UPDATE users SET email = ?2, username = ?3, first_name = ?4, last_name = ?5, \
             password_hash = COALESCE(?6, password_hash) WHERE id = ?1",
            params![id, email, username, first_name, last_name, password_hash],
        )?;

        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            user_from_row,
        )
    }

    /// Returns false when no user has that id.
    pub fn set_user_active(&self, id: i64, active: bool) -> rusqlite::Result<bool> {
        let changed = self.conn().execute(
            "UPDATE users SET is_active = ?2 WHERE id = ?1",
            params![id, active],
        )?;

        Ok(changed > 0)
    }

    /// Users whose email contains `query`, case-insensitively, for invite autocomplete.
    pub fn search_emails(
        &self,
        query: &str,
        exclude: i64,
        limit: usize,
    ) -> rusqlite::Result<Vec<PublicUser>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE lower(email) LIKE ?1 ESCAPE '\\' AND id != ?2 AND is_active = 1 \
             ORDER BY email LIMIT ?3"
        ))?;

        stmt.query_map(
            params![like_pattern(&query.to_lowercase()), exclude, limit as i64],
            user_from_row,
        )?
        .map(|user| user.map(|user| user.public()))
        .collect()
    }
}
