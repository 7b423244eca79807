//! # Sessions
//!
//! Who is signed in.
//!
//! ## Implementation
//!
//! - Random 256-bit token handed to the browser in an `HttpOnly` cookie
//! - Only the SHA-256 of the token is persisted, a leaked table does not leak sessions
//! - SQLite `sessions` table by default
//! - Redis when `REDIS_URL` is set: one key per session, `SET EX` handles expiry
//!
//! ## Redis
//!
//! Keys are `tracker:session:<token hash>` holding the user id.
use std::{fmt::Write, sync::Arc, time::Duration};

use chrono::Utc;
use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::{database::Database, error::AppError};

const REDIS_PREFIX: &str = "tracker:session:";

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, RedisError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    info!("Connected to Redis session store");

    Ok(connection_manager)
}

pub fn new_token() -> String {
    rand::random::<[u8; 32]>()
        .iter()
        .fold(String::with_capacity(64), |mut token, byte| {
            let _ = write!(token, "{byte:02x}");
            token
        })
}

pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

#[derive(Clone)]
pub enum SessionStore {
    Database(Arc<Database>),
    Redis(ConnectionManager),
}

impl SessionStore {
    /// Starts a session and returns the raw token for the cookie.
    pub async fn create(&self, user_id: i64, ttl: Duration) -> Result<String, AppError> {
        let token = new_token();
        let hash = hash_token(&token);

        match self {
            SessionStore::Database(db) => {
                let ttl = chrono::Duration::from_std(ttl)
                    .map_err(|e| AppError::internal(format!("Session ttl out of range: {e}")))?;
                db.insert_session(&hash, user_id, Utc::now() + ttl)?;
            }
            SessionStore::Redis(connection) => {
                let mut connection = connection.clone();
                let _: () = connection
                    .set_ex(format!("{REDIS_PREFIX}{hash}"), user_id, ttl.as_secs())
                    .await?;
            }
        }

        Ok(token)
    }

    pub async fn resolve(&self, token: &str) -> Result<Option<i64>, AppError> {
        let hash = hash_token(token);

        match self {
            SessionStore::Database(db) => Ok(db.session_user(&hash, Utc::now())?),
            SessionStore::Redis(connection) => {
                let mut connection = connection.clone();
                let user_id: Option<i64> = connection.get(format!("{REDIS_PREFIX}{hash}")).await?;

                Ok(user_id)
            }
        }
    }

    pub async fn destroy(&self, token: &str) -> Result<(), AppError> {
        let hash = hash_token(token);

        match self {
            SessionStore::Database(db) => db.delete_session(&hash)?,
            SessionStore::Redis(connection) => {
                let mut connection = connection.clone();
                let _: () = connection.del(format!("{REDIS_PREFIX}{hash}")).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{db, user};

    #[test]
    fn test_tokens_are_random_hex() {
        let a = new_token();
        let b = new_token();

        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_token() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_database_store_round_trip() {
        let db = Arc::new(db());
        let me = user(&db, "me@example.com");
        let store = SessionStore::Database(db.clone());

        let token = store.create(me.id, Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.resolve(&token).await.unwrap(), Some(me.id));
        assert_eq!(store.resolve("forged").await.unwrap(), None);

        store.destroy(&token).await.unwrap();
        assert_eq!(store.resolve(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_expired() {
        let db = Arc::new(db());
        let me = user(&db, "me@example.com");
        let store = SessionStore::Database(db);

        let token = store.create(me.id, Duration::ZERO).await.unwrap();
        assert_eq!(store.resolve(&token).await.unwrap(), None);
    }
}
