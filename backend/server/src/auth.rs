//! Password hashing, session cookies and the signed-in user extractor.
use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
        request::Parts,
    },
};
use tracing::warn;
use tracker_model::User;

use crate::{error::AppError, state::AppState};

pub const SESSION_COOKIE: &str = "tracker_session";

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| AppError::internal(format!("Salt encoding failed: {e}")))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        warn!("Stored password hash is not a PHC string");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY: LazyLock<Option<String>> =
        LazyLock::new(|| hash_password("no account has this password").ok());

    DUMMY.as_deref()
}

/// Checks `password` against the account behind a lookup. A missing account
/// still pays for one verification so response time does not reveal it.
pub fn verify_account(password: &str, user: Option<User>) -> Option<User> {
    match user {
        Some(user) => verify_password(password, &user.password_hash).then_some(user),
        None => {
            if let Some(hash) = dummy_hash() {
                verify_password(password, hash);
            }
            None
        }
    }
}

pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(token: &str, ttl: Duration) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        ttl.as_secs()
    ))
    .map_err(|e| AppError::internal(format!("Invalid cookie: {e}")))
}

pub fn cleared_cookie() -> HeaderValue {
    HeaderValue::from_static("tracker_session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// Adds the `Set-Cookie` header for a fresh session.
pub fn set_session_cookie(headers: &mut HeaderMap, token: &str, ttl: Duration) -> Result<(), AppError> {
    headers.insert(SET_COOKIE, session_cookie(token, ttl)?);

    Ok(())
}

/// The signed-in, active user behind the request's session cookie.
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = cookie_value(&parts.headers, SESSION_COOKIE).ok_or(AppError::Unauthorized)?;

        let user_id = state
            .sessions
            .resolve(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        match state.db.user_by_id(user_id)? {
            Some(user) if user.is_active => Ok(CurrentUser(user)),
            _ => Err(AppError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("testpass123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("testpass123", &hash));
        assert!(!verify_password("wrongpassword", &hash));
        assert!(!verify_password("testpass123", "plaintext"));
    }

    #[test]
    fn test_verify_account() {
        let user = User {
            id: 1,
            email: "user@example.com".to_string(),
            username: "user".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: hash_password("testpass123").unwrap(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            date_joined: chrono::Utc::now(),
        };

        assert!(verify_account("testpass123", Some(user.clone())).is_some());
        assert!(verify_account("wrongpassword", Some(user)).is_none());
        assert!(verify_account("testpass123", None).is_none());

        let dummy = dummy_hash().unwrap();
        assert!(dummy.starts_with("$argon2"));
        assert!(!verify_password("testpass123", dummy));
    }

    #[test]
    fn test_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; tracker_session=abc"));
        headers.append(COOKIE, HeaderValue::from_static("other=1"));

        assert_eq!(cookie_value(&headers, SESSION_COOKIE), Some("abc"));
        assert_eq!(cookie_value(&headers, "other"), Some("1"));
        assert_eq!(cookie_value(&headers, "missing"), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cleared_cookie());
        assert_eq!(cookie_value(&headers, SESSION_COOKIE), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc", Duration::from_secs(60)).unwrap();
        let cookie = cookie.to_str().unwrap();

        assert!(cookie.starts_with("tracker_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.ends_with("Max-Age=60"));
    }
}
