use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{auth::CurrentUser, error::AppError, state::AppState};

pub const AUTOCOMPLETE_LIMIT: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct EmailMatch {
    pub id: i64,
    pub email: String,
}

/// Email suggestions for the invite boxes.
pub async fn autocomplete_emails_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AutocompleteQuery>,
) -> Result<impl IntoResponse, AppError> {
    let needle = query.q.trim();
    if needle.is_empty() {
        return Ok(Json(Vec::<EmailMatch>::new()));
    }

    let matches: Vec<EmailMatch> = state
        .db
        .search_emails(needle, user.id, AUTOCOMPLETE_LIMIT)?
        .into_iter()
        .map(|found| EmailMatch {
            id: found.id,
            email: found.email,
        })
        .collect();

    Ok(Json(matches))
}
