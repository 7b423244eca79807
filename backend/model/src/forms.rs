//! # Forms
//!
//! Client payloads and the rules that clean them.
//!
//! Every field is optional on the wire (`#[serde(default)]`) so that a
//! missing field is reported as a field error instead of a malformed payload.
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::{
    choices::{Priority, TicketStatus, TicketType},
    validation::ValidationErrors,
};

pub const TITLE_MAX_LEN: usize = 200;
pub const NAME_MAX_LEN: usize = 150;
pub const SUBTASK_MAX_LEN: usize = 255;
pub const PASSWORD_MIN_LEN: usize = 8;

pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;
pub const ATTACHMENT_TOO_LARGE: &str = "File size must be under 10MB";
pub const ALLOWED_EXTENSIONS: [&str; 6] = ["pdf", "doc", "docx", "jpg", "jpeg", "png"];

const REQUIRED: &str = "This field is required.";
const INVALID_EMAIL: &str = "Enter a valid email address.";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s,]+@[^@\s,]+\.[^@\s,]+$").unwrap());
static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

fn required(errors: &mut ValidationErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    }

    value.to_string()
}

fn max_len(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        );
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn clean_email(errors: &mut ValidationErrors, field: &str, value: &str) -> String {
    let email = required(errors, field, value).to_lowercase();
    if !email.is_empty() && !is_valid_email(&email) {
        errors.add(field, INVALID_EMAIL);
    }

    email
}

fn clean_username(errors: &mut ValidationErrors, value: &str) -> String {
    let username = required(errors, "username", value);
    if username.is_empty() {
        return username;
    }

    max_len(errors, "username", &username, NAME_MAX_LEN);
    if !USERNAME_RE.is_match(&username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }

    username
}

fn check_password_strength(errors: &mut ValidationErrors, field: &str, password: &str) {
    if password.chars().count() < PASSWORD_MIN_LEN {
        errors.add(
            field,
            format!(
                "This password is too short. It must contain at least {PASSWORD_MIN_LEN} characters."
            ),
        );
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, "This password is entirely numeric.");
    }
}

/// Comma separated list of emails, deduplicated in input order.
fn clean_email_list(errors: &mut ValidationErrors, field: &str, raw: &str) -> Vec<String> {
    let mut emails: Vec<String> = Vec::new();

    for email in raw.split(',').map(|e| e.trim().to_lowercase()) {
        if email.is_empty() || emails.contains(&email) {
            continue;
        }

        if !is_valid_email(&email) {
            errors.add(field, format!("Enter a valid email address: {email}"));
            continue;
        }

        emails.push(email);
    }

    emails
}

fn choice<T: std::str::FromStr>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
) -> Option<T> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;

    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.add(
                field,
                format!("Select a valid choice. {value} is not one of the available choices."),
            );
            None
        }
    }
}

/// Accepts RFC 3339 or the `YYYY-MM-DDTHH:MM` a datetime-local input sends, read as UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(self) -> Result<Registration, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let email = clean_email(&mut errors, "email", &self.email);
        let username = clean_username(&mut errors, &self.username);
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        max_len(&mut errors, "first_name", &first_name, NAME_MAX_LEN);
        max_len(&mut errors, "last_name", &last_name, NAME_MAX_LEN);

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else {
            check_password_strength(&mut errors, "password1", &self.password1);
        }

        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "Passwords don't match");
        }

        errors.finish(Registration {
            email,
            username,
            first_name,
            last_name,
            password: self.password1,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    /// Normalized email and the raw password.
    pub fn validate(self) -> Result<(String, String), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let email = clean_email(&mut errors, "email", &self.email);
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }

        errors.finish((email, self.password))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// `None` keeps the current password.
    pub password: Option<String>,
}

impl ProfileForm {
    pub fn validate(self) -> Result<ProfileUpdate, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let email = clean_email(&mut errors, "email", &self.email);
        let username = clean_username(&mut errors, &self.username);
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        max_len(&mut errors, "first_name", &first_name, NAME_MAX_LEN);
        max_len(&mut errors, "last_name", &last_name, NAME_MAX_LEN);

        let password = self.password.filter(|p| !p.is_empty());
        if let Some(password) = &password {
            check_password_strength(&mut errors, "password", password);
        }

        errors.finish(ProfileUpdate {
            email,
            username,
            first_name,
            last_name,
            password,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GroupForm {
    pub title: String,
    pub description: String,
    /// Comma separated emails to invite right away.
    pub emails: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDraft {
    pub title: String,
    pub description: String,
    pub emails: Vec<String>,
}

impl GroupForm {
    pub fn validate(self) -> Result<GroupDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = required(&mut errors, "title", &self.title);
        max_len(&mut errors, "title", &title, TITLE_MAX_LEN);
        let emails = clean_email_list(&mut errors, "emails", &self.emails);

        errors.finish(GroupDraft {
            title,
            description: self.description.trim().to_string(),
            emails,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InviteForm {
    pub emails: String,
}

impl InviteForm {
    pub fn validate(self) -> Result<Vec<String>, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let emails = clean_email_list(&mut errors, "emails", &self.emails);
        if emails.is_empty() && errors.is_empty() {
            errors.add("emails", "Enter at least one email.");
        }

        errors.finish(emails)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectForm {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
}

impl ProjectForm {
    pub fn validate(self) -> Result<ProjectDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = required(&mut errors, "title", &self.title);
        max_len(&mut errors, "title", &title, TITLE_MAX_LEN);

        errors.finish(ProjectDraft {
            title,
            description: self.description.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TicketForm {
    pub title: String,
    pub description: String,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub ticket_type: Option<String>,
    pub due_date: Option<String>,
    pub assignee: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketDraft {
    pub title: String,
    pub description: String,
    /// `None` leaves the status as is (or open for a new ticket).
    pub status: Option<TicketStatus>,
    pub priority: Priority,
    pub ticket_type: TicketType,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee: Option<i64>,
}

impl TicketForm {
    /// Assignee membership is checked by the server, it needs the project.
    pub fn validate(self, now: DateTime<Utc>) -> Result<TicketDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = required(&mut errors, "title", &self.title);
        max_len(&mut errors, "title", &title, TITLE_MAX_LEN);
        let description = required(&mut errors, "description", &self.description);

        let status = choice(&mut errors, "status", self.status.as_deref());
        let priority = choice(&mut errors, "priority", self.priority.as_deref()).unwrap_or_default();
        let ticket_type =
            choice(&mut errors, "ticket_type", self.ticket_type.as_deref()).unwrap_or_default();

        let due_date = match self.due_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match parse_datetime(raw) {
                Some(due) if due < now => {
                    errors.add("due_date", "Due date cannot be in the past.");
                    None
                }
                Some(due) => Some(due),
                None => {
                    errors.add("due_date", "Enter a valid date/time.");
                    None
                }
            },
        };

        errors.finish(TicketDraft {
            title,
            description,
            status,
            priority,
            ticket_type,
            due_date,
            assignee: self.assignee,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(self) -> Result<String, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let text = required(&mut errors, "text", &self.text);

        errors.finish(text)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubTaskForm {
    pub text: String,
    pub is_done: bool,
}

impl SubTaskForm {
    pub fn validate(self) -> Result<(String, bool), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let text = required(&mut errors, "text", &self.text);
        max_len(&mut errors, "text", &text, SUBTASK_MAX_LEN);

        errors.finish((text, self.is_done))
    }
}

/// Kanban drag payload. The board sends ids from `data-*` attributes, so they may be strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatusUpdateForm {
    #[serde(deserialize_with = "lenient_id")]
    pub task_id: Option<i64>,
    pub status: String,
}

impl StatusUpdateForm {
    pub fn validate(self) -> Result<(i64, TicketStatus), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.task_id.is_none() {
            errors.add("task_id", REQUIRED);
        }

        let status = if self.status.trim().is_empty() {
            errors.add("status", REQUIRED);
            None
        } else {
            choice(&mut errors, "status", Some(&self.status))
        };

        match (self.task_id, status) {
            (Some(task_id), Some(status)) if errors.is_empty() => Ok((task_id, status)),
            _ => Err(errors),
        }
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Int(i64),
        Str(String),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Int(id)) => Some(id),
        Some(Id::Str(raw)) => raw.trim().parse().ok(),
        None => None,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubTaskStatusForm {
    pub is_done: bool,
}

/// Lowercased extension after the last dot, if any.
pub fn file_extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

pub fn validate_attachment(file_name: &str, size: usize) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let field = "attached_file";

    let file_name = file_name.trim();
    if file_name.is_empty() {
        errors.add(field, "No file was submitted.");
        return Err(errors);
    }

    if size > MAX_ATTACHMENT_BYTES {
        errors.add(field, ATTACHMENT_TOO_LARGE);
    }

    let allowed = file_extension(file_name)
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));
    if !allowed {
        errors.add(
            field,
            format!(
                "File type not allowed. Allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ),
        );
    }

    errors.finish(file_name.to_string())
}
