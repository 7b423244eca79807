use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::choices::{InvitationKind, InvitationStatus, Priority, TicketStatus, TicketType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn short_name(&self) -> &str {
        &self.first_name
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            full_name: self.full_name(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email)
    }
}

/// What other users get to see about someone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub owner_id: i64,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub owner_id: i64,
    pub group_id: i64,
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub ticket_type: TicketType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: i64,
    pub creator_id: i64,
    pub assignee_id: Option<i64>,
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.status.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: i64,
    pub ticket_id: i64,
    pub author_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub id: i64,
    pub ticket_id: i64,
    pub file_name: String,
    #[serde(skip)]
    pub stored_path: String,
    pub size_bytes: i64,
    pub uploaded_by: i64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubTask {
    pub id: i64,
    pub ticket_id: i64,
    pub text: String,
    pub is_done: bool,
}

impl fmt::Display for SubTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_done { "done" } else { "pending" };
        write!(f, "{} ({state})", self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invitation {
    pub id: i64,
    pub target_user_id: i64,
    pub owner_id: i64,
    pub kind: InvitationKind,
    pub target_group_id: Option<i64>,
    pub target_project_id: Option<i64>,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            email: "test@example.com".to_string(),
            username: "testuser".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            password_hash: "secret".to_string(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_user_names() {
        let user = user();

        assert_eq!(user.full_name(), "John Doe");
        assert_eq!(user.short_name(), "John");
        assert_eq!(user.to_string(), "test@example.com");
    }

    #[test]
    fn test_user_never_serializes_hash() {
        let json = serde_json::to_value(user()).unwrap();

        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "test@example.com");
    }

    #[test]
    fn test_ticket_display() {
        let now = Utc::now();
        let ticket = Ticket {
            id: 1,
            title: "Test Ticket".to_string(),
            description: "body".to_string(),
            status: TicketStatus::Open,
            priority: Priority::High,
            ticket_type: TicketType::Task,
            created_at: now,
            updated_at: now,
            due_date: None,
            project_id: 1,
            creator_id: 1,
            assignee_id: Some(1),
        };

        assert_eq!(ticket.to_string(), "Test Ticket (Open)");
    }

    #[test]
    fn test_subtask_display() {
        let mut subtask = SubTask {
            id: 1,
            ticket_id: 1,
            text: "Test subtask".to_string(),
            is_done: false,
        };
        assert!(!subtask.to_string().contains("done"));

        subtask.is_done = true;
        assert!(subtask.to_string().contains("done"));
    }
}
