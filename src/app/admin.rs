//! Administrative subcommands.
//!
//! Each handler runs one service operation against an already migrated
//! connection and reports the outcome on standard output.

#![expect(
    clippy::print_stdout,
    reason = "intentional user output for CLI commands"
)]

use anyhow::{Context as _, Result, anyhow};
use cli_defs::{AddRubricArgs, AppConfig, Commands, CreateUserArgs};

use super::config::build_context;
use crate::{
    accounts::{self, AdminAccount},
    db::{self, DbConnection},
    rubrics,
};

/// Execute an administrative command.
///
/// # Errors
///
/// Propagates configuration, validation and database failures.
pub async fn run_command(command: Commands, cfg: &AppConfig, conn: &mut DbConnection) -> Result<()> {
    match command {
        Commands::CreateUser(args) => run_create_user(args, cfg, conn).await,
        Commands::AddRubric(args) => run_add_rubric(args, conn).await,
        Commands::RemoveRubric { id } => {
            rubrics::delete_rubric(conn, id)
                .await
                .with_context(|| format!("failed to remove rubric {id}"))?;
            println!("Rubric {id} removed");
            Ok(())
        }
        Commands::ListPending { older_than_days } => {
            let pending = accounts::list_pending_activation(conn, older_than_days).await?;
            if pending.is_empty() {
                println!("No accounts pending activation");
            }
            for account in pending {
                println!(
                    "{}\t{}\t{}\t{}",
                    account.id, account.username, account.email, account.date_joined
                );
            }
            Ok(())
        }
        Commands::ResendActivation { ids } => {
            let ctx = build_context(cfg)?;
            let sent = accounts::resend_activation(conn, &ctx, &ids).await?;
            println!("Sent {sent} activation letter(s)");
            Ok(())
        }
        Commands::DeleteUser { username } => {
            let account = db::get_account_by_username(conn, &username)
                .await?
                .ok_or_else(|| anyhow!("no user named '{username}'"))?;
            let ctx = build_context(cfg)?;
            let report = accounts::delete_account(conn, &ctx, account.id).await?;
            println!(
                "User {username} deleted with {} article(s), {} image(s) and {} comment(s)",
                report.articles, report.additional_images, report.comments
            );
            Ok(())
        }
    }
}

async fn run_create_user(args: CreateUserArgs, cfg: &AppConfig, conn: &mut DbConnection) -> Result<()> {
    let ctx = build_context(cfg)?;
    let request = AdminAccount {
        username: args.username,
        email: args.email,
        password: args.password,
        is_staff: args.staff,
        is_superuser: args.superuser,
    };
    let account = accounts::create_activated_account(conn, &ctx, &request)
        .await
        .with_context(|| format!("failed to create user '{}'", request.username))?;
    println!("User {} created", account.username);
    Ok(())
}

async fn run_add_rubric(args: AddRubricArgs, conn: &mut DbConnection) -> Result<()> {
    let rubric = match args.parent {
        None => rubrics::create_super_rubric(conn, &args.name, args.order).await,
        Some(parent) => rubrics::create_sub_rubric(conn, &args.name, args.order, parent).await,
    }
    .with_context(|| format!("failed to add rubric '{}'", args.name))?;
    println!("Rubric {} created with id {}", rubric.name, rubric.id);
    Ok(())
}
