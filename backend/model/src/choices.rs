use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("\"{value}\" is not a valid {kind}")]
pub struct UnknownChoice {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! choices {
    (
        $(#[$meta:meta])*
        $name:ident as $kind:literal {
            $($(#[$variant_meta:meta])* $variant:ident => ($key:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$variant_meta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownChoice;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($key => Ok($name::$variant),)+
                    _ => Err(UnknownChoice {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

choices! {
    /// Kanban column a ticket sits in.
    #[derive(Default)]
    TicketStatus as "status" {
        #[default]
        Open => ("open", "Open"),
        InProgress => ("in_progress", "In progress"),
        Testing => ("testing", "Testing"),
        Done => ("done", "Done"),
        Closed => ("closed", "Closed"),
    }
}

choices! {
    #[derive(Default)]
    Priority as "priority" {
        #[default]
        Low => ("low", "Low"),
        Medium => ("medium", "Medium"),
        High => ("high", "High"),
        Critical => ("critical", "Critical"),
    }
}

choices! {
    #[derive(Default)]
    TicketType as "ticket type" {
        #[default]
        Task => ("task", "Task"),
        Bug => ("bug", "Bug"),
        Feature => ("feature", "Feature"),
    }
}

choices! {
    #[derive(Default)]
    InvitationStatus as "invitation status" {
        #[default]
        Pending => ("pending", "Pending"),
        Accepted => ("accepted", "Accepted"),
        Declined => ("declined", "Declined"),
    }
}

choices! {
    /// What an invitation grants membership of.
    InvitationKind as "invitation kind" {
        Group => ("group", "Group"),
        Project => ("project", "Project"),
    }
}

impl TicketStatus {
    /// CSS class the board uses for the status badge.
    pub fn badge_class(self) -> &'static str {
        match self {
            TicketStatus::Open => "bg-secondary",
            TicketStatus::InProgress => "bg-primary",
            TicketStatus::Testing => "bg-warning",
            TicketStatus::Done => "bg-success",
            TicketStatus::Closed => "bg-dark",
        }
    }
}
