//! # Tracker Admin
//!
//! Account maintenance against the tracker database, without going through HTTP.
//!
//! ```sh
//! tracker-admin --database tracker.sqlite3 create-superuser \
//!     --email admin@example.com --username admin --password 'change-me-now'
//! tracker-admin --database tracker.sqlite3 deactivate --email spammer@example.com
//! tracker-admin --database tracker.sqlite3 list-users
//! ```
use std::{fmt::Write, path::PathBuf};

use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use tracker_model::forms::RegisterForm;
use tracker_server::{
    auth::hash_password,
    database::{Database, NewUser},
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// SQLite database file, created when missing.
    #[arg(long, default_value = "tracker.sqlite3")]
    pub database: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    CreateUser(UserArgs),

    /// Same as create-user with staff and superuser flags set.
    CreateSuperuser(UserArgs),

    /// Blocks sign-in and ends every session of the user.
    Deactivate {
        #[arg(long)]
        email: String,
    },

    ListUsers,
}

#[derive(Args, Debug)]
pub struct UserArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub password: String,

    #[arg(long, default_value = "")]
    pub first_name: String,

    #[arg(long, default_value = "")]
    pub last_name: String,
}

pub fn run(cli: Cli) -> anyhow::Result<String> {
    let db = Database::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;

    match cli.command {
        Command::CreateUser(args) => create_user(&db, args, false),
        Command::CreateSuperuser(args) => create_user(&db, args, true),
        Command::Deactivate { email } => deactivate(&db, &email),
        Command::ListUsers => list_users(&db),
    }
}

fn create_user(db: &Database, args: UserArgs, superuser: bool) -> anyhow::Result<String> {
    let clean = RegisterForm {
        email: args.email,
        username: args.username,
        first_name: args.first_name,
        last_name: args.last_name,
        password1: args.password.clone(),
        password2: args.password,
    }
    .validate()?;

    if db.email_taken(&clean.email, None)? {
        bail!("A user with email {} already exists", clean.email);
    }
    if db.username_taken(&clean.username, None)? {
        bail!("A user with username {} already exists", clean.username);
    }

    let password_hash =
        hash_password(&clean.password).map_err(|e| anyhow!("Failed to hash password: {e}"))?;
    let user = db.create_user(&NewUser {
        email: clean.email,
        username: clean.username,
        first_name: clean.first_name,
        last_name: clean.last_name,
        password_hash,
        is_staff: superuser,
        is_superuser: superuser,
    })?;

    let role = if superuser { "superuser" } else { "user" };

    Ok(format!("Created {role} {} ({})", user.email, user.id))
}

fn deactivate(db: &Database, email: &str) -> anyhow::Result<String> {
    let email = email.trim().to_lowercase();
    let user = db
        .user_by_email(&email)?
        .ok_or_else(|| anyhow!("No user with email {email}"))?;

    db.set_user_active(user.id, false)?;
    let sessions = db.delete_user_sessions(user.id)?;

    Ok(format!("Deactivated {email}, ended {sessions} sessions"))
}

fn list_users(db: &Database) -> anyhow::Result<String> {
    let mut out = String::new();

    for user in db.list_users()? {
        let mut flags = Vec::new();
        if !user.is_active {
            flags.push("inactive");
        }
        if user.is_superuser {
            flags.push("superuser");
        } else if user.is_staff {
            flags.push("staff");
        }

        writeln!(
            out,
            "{:>5}  {:<32} {:<20} {}",
            user.id,
            user.email,
            user.username,
            flags.join(",")
        )?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(database: &std::path::Path, args: &[&str]) -> Cli {
        let database = database.to_string_lossy().into_owned();
        let mut argv = vec!["tracker-admin", "--database", database.as_str()];
        argv.extend_from_slice(args);

        Cli::parse_from(argv)
    }

    #[test]
    fn test_create_list_and_deactivate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.sqlite3");

        let created = run(cli(
            &path,
            &[
                "create-superuser",
                "--email",
                "Admin@Example.com",
                "--username",
                "admin",
                "--password",
                "testpass123",
            ],
        ))
        .unwrap();
        assert!(created.starts_with("Created superuser admin@example.com"));

        let duplicate = run(cli(
            &path,
            &[
                "create-user",
                "--email",
                "admin@example.com",
                "--username",
                "other",
                "--password",
                "testpass123",
            ],
        ));
        assert!(duplicate.is_err());

        let listing = run(cli(&path, &["list-users"])).unwrap();
        assert!(listing.contains("admin@example.com"));
        assert!(listing.contains("superuser"));

        let deactivated = run(cli(&path, &["deactivate", "--email", "admin@example.com"])).unwrap();
        assert!(deactivated.starts_with("Deactivated admin@example.com"));

        let listing = run(cli(&path, &["list-users"])).unwrap();
        assert!(listing.contains("inactive"));
    }

    #[test]
    fn test_weak_password_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.sqlite3");

        let result = run(cli(
            &path,
            &[
                "create-user",
                "--email",
                "user@example.com",
                "--username",
                "user",
                "--password",
                "12345678",
            ],
        ));

        assert!(result.is_err());
    }

    #[test]
    fn test_deactivate_unknown_user() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.sqlite3");

        assert!(run(cli(&path, &["deactivate", "--email", "ghost@example.com"])).is_err());
    }
}
