//! # Tracker Model
//!
//! Shared data structures between the server and the admin tooling.
//!
//! ## Entities
//! - Users own groups and projects and author tickets, comments and attachments
//! - Groups hold projects, projects hold tickets
//! - Groups and projects each have an owner plus a member set
//! - Invitations are how a user enters a member set
//!
//! ## Forms
//! Every write coming from a client goes through one of the form structs in [`forms`].
//! A form either cleans into a value the server can persist or yields
//! [`ValidationErrors`] keyed by field name, with `__all__` for errors that
//! are not tied to a single field.
pub mod choices;
pub mod entities;
pub mod forms;
pub mod validation;

pub use choices::{InvitationKind, InvitationStatus, Priority, TicketStatus, TicketType};
pub use entities::{
    Attachment, Comment, Group, Invitation, Project, PublicUser, SubTask, Ticket, User,
};
pub use validation::ValidationErrors;
