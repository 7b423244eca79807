use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;
use tracker_model::{
    ValidationErrors,
    forms::{ProfileForm, RegisterForm, SignInForm},
};

use crate::{
    auth::{
        CurrentUser, SESSION_COOKIE, cleared_cookie, cookie_value, hash_password,
        set_session_cookie, verify_account,
    },
    database::NewUser,
    error::AppError,
    invitations,
    state::AppState,
};

fn check_unique(
    state: &AppState,
    email: &str,
    username: &str,
    except: Option<i64>,
) -> Result<(), AppError> {
    let mut errors = ValidationErrors::new();

    if state.db.email_taken(email, except)? {
        errors.add("email", "A user with that email already exists.");
    }
    if state.db.username_taken(username, except)? {
        errors.add("username", "A user with that username already exists.");
    }

    Ok(errors.finish(())?)
}

pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(form) = payload?;
    let clean = form.validate()?;
    check_unique(&state, &clean.email, &clean.username, None)?;

    let user = state.db.create_user(&NewUser {
        password_hash: hash_password(&clean.password)?,
        email: clean.email,
        username: clean.username,
        first_name: clean.first_name,
        last_name: clean.last_name,
        is_staff: false,
        is_superuser: false,
    })?;

    info!("Registered user {} ({})", user.id, user.email);

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn signin_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignInForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(form) = payload?;
    let (email, password) = form.validate()?;

    let user = verify_account(&password, state.db.user_by_email(&email)?)
        .filter(|user| user.is_active)
        .ok_or(AppError::InvalidCredentials)?;

    let token = state.sessions.create(user.id, state.config.session_ttl).await?;
    let mut headers = HeaderMap::new();
    set_session_cookie(&mut headers, &token, state.config.session_ttl)?;

    info!("User {} signed in", user.id);

    Ok((headers, Json(user)))
}

pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = cookie_value(&headers, SESSION_COOKIE) {
        state.sessions.destroy(token).await?;
    }

    info!("User {} logged out", user.id);

    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cleared_cookie())]))
}

pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let invitations = state.db.pending_invitations_for(user.id)?;

    Ok(Json(json!({ "user": user, "invitations": invitations })))
}

pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<ProfileForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(form) = payload?;
    let clean = form.validate()?;
    check_unique(&state, &clean.email, &clean.username, Some(user.id))?;

    let password_hash = clean.password.as_deref().map(hash_password).transpose()?;
    let updated = state.db.update_profile(
        user.id,
        &clean.email,
        &clean.username,
        &clean.first_name,
        &clean.last_name,
        password_hash.as_deref(),
    )?;

    info!("User {} updated their profile", user.id);

    Ok(Json(updated))
}

pub async fn user_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(_): CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .db
        .user_by_id(user_id)?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(user.public()))
}

pub async fn accept_invitation_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(invitation_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(invitations::accept(&state.db, invitation_id, &user)?))
}

pub async fn decline_invitation_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(invitation_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(invitations::decline(&state.db, invitation_id, &user)?))
}
