//! User registration and linking commands.

use clap::Subcommand;
use overseer_core::{Role, UserRepo};

use super::{context, CliResult};

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a new identity
    Register {
        /// Numeric platform identity
        id: i64,
        /// Display name
        username: String,
        /// Role, fixed at registration
        #[arg(value_parser = ["supervisor", "assignee"])]
        role: String,
    },
    /// Link a supervisor with an assignee
    Link {
        supervisor: i64,
        assignee: i64,
    },
    /// Show a user
    Show {
        id: i64,
    },
    /// Set a user's IANA timezone
    Timezone {
        id: i64,
        /// e.g. Europe/Berlin
        timezone: String,
    },
}

pub async fn run(action: UserAction) -> CliResult {
    let ctx = context()?;
    let users = UserRepo::new(ctx.db);

    match action {
        UserAction::Register { id, username, role } => {
            let role = if role == "supervisor" {
                Role::Supervisor
            } else {
                Role::Assignee
            };
            let user = users.register(id, &username, role)?;
            println!("Registered {} as {:?} (id {})", user.username, user.role, user.id);
        }
        UserAction::Link {
            supervisor,
            assignee,
        } => {
            users.link(supervisor, assignee)?;
            println!("Linked supervisor {supervisor} with assignee {assignee}");
        }
        UserAction::Show { id } => {
            let user = users.get(id)?;
            println!(
                "{} (id {}): {:?}, {} points, timezone {}",
                user.username, user.id, user.role, user.points, user.timezone
            );
        }
        UserAction::Timezone { id, timezone } => {
            users.set_timezone(id, &timezone)?;
            println!("Timezone for user {id} set to {timezone}");
        }
    }
    Ok(())
}
