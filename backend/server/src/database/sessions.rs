use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use super::Database;

impl Database {
    pub fn insert_session(
        &self,
        token_hash: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> rusqlite::Result<()> {
        self.conn().execute(
            "INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?1, ?2, ?3)",
            params![token_hash, user_id, expires_at],
        )?;

        Ok(())
    }

    /// User behind a live session. Expired rows are removed on sight.
    pub fn session_user(&self, token_hash: &str, now: DateTime<Utc>) -> rusqlite::Result<Option<i64>> {
        let conn = self.conn();
        let row: Option<(i64, DateTime<Utc>)> = conn
            .query_row(
                "SELECT user_id, expires_at FROM sessions WHERE token_hash = ?1",
                [token_hash],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;

        match row {
            Some((user_id, expires_at)) if expires_at > now => Ok(Some(user_id)),
            Some(_) => {
                conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn delete_session(&self, token_hash: &str) -> rusqlite::Result<()> {
        self.conn()
            .execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?;

        Ok(())
    }

    pub fn delete_user_sessions(&self, user_id: i64) -> rusqlite::Result<usize> {
        self.conn()
            .execute("DELETE FROM sessions WHERE user_id = ?1", [user_id])
    }

    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> rusqlite::Result<usize> {
        self.conn()
            .execute("DELETE FROM sessions WHERE expires_at <= ?1", [now])
    }
}
