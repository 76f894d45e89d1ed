//! Shared CLI type definitions for gazette build and runtime.
//!
//! This crate provides CLI argument and configuration types used by both the
//! `build.rs` script (for man page generation) and the runtime binary.
//! Extracting these types into a separate crate keeps build-time and runtime
//! dependencies cleanly separated.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

// Argon2 defaults duplicated from `argon2::Params::DEFAULT_*` (argon2 0.5.x)
// so build-time consumers need not depend on `argon2`.

/// Default Argon2 memory cost (matches `argon2::Params::DEFAULT_M_COST`).
pub const DEFAULT_ARGON2_M_COST: u32 = 19_456;
/// Default Argon2 time cost (matches `argon2::Params::DEFAULT_T_COST`).
pub const DEFAULT_ARGON2_T_COST: u32 = 2;
/// Default Argon2 parallelism cost (matches `argon2::Params::DEFAULT_P_COST`).
pub const DEFAULT_ARGON2_P_COST: u32 = 1;

/// Default database path.
pub const DEFAULT_DATABASE: &str = "gazette.db";
/// Default site root used in mailed links.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Default directory for uploaded images.
pub const DEFAULT_MEDIA_DIR: &str = "media";
/// Default sender address.
pub const DEFAULT_FROM_EMAIL: &str = "webmaster@localhost";
/// Default SMTP submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Where outgoing letters go.
#[derive(ValueEnum, Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailBackend {
    /// Write letters to the log.
    #[default]
    Log,
    /// Relay letters through an SMTP server.
    Smtp,
}

/// How the SMTP connection is secured.
#[derive(ValueEnum, Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurityMode {
    /// Upgrade a plaintext connection with STARTTLS.
    #[default]
    Starttls,
    /// Connect with implicit TLS.
    Tls,
    /// No transport security.
    None,
}

/// Fully merged runtime configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Database connection string or path.
    pub database: String,
    /// Site root used to build absolute links in letters.
    pub base_url: String,
    /// Secret used to sign activation links.
    pub secret_key: String,
    /// Directory holding uploaded images.
    pub media_dir: String,
    /// Sender address of outgoing letters.
    pub from_email: String,
    /// Mail delivery backend.
    pub mail_backend: MailBackend,
    /// SMTP server host name.
    pub smtp_host: Option<String>,
    /// SMTP server port.
    pub smtp_port: u16,
    /// SMTP user name.
    pub smtp_username: Option<String>,
    /// SMTP password.
    pub smtp_password: Option<String>,
    /// SMTP transport security.
    pub smtp_security: SmtpSecurityMode,
    /// Argon2 memory cost parameter.
    pub argon2_m_cost: u32,
    /// Argon2 time cost parameter.
    pub argon2_t_cost: u32,
    /// Argon2 parallelism cost parameter.
    pub argon2_p_cost: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            secret_key: String::new(),
            media_dir: DEFAULT_MEDIA_DIR.to_owned(),
            from_email: DEFAULT_FROM_EMAIL.to_owned(),
            mail_backend: MailBackend::Log,
            smtp_host: None,
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_username: None,
            smtp_password: None,
            smtp_security: SmtpSecurityMode::Starttls,
            argon2_m_cost: DEFAULT_ARGON2_M_COST,
            argon2_t_cost: DEFAULT_ARGON2_T_COST,
            argon2_p_cost: DEFAULT_ARGON2_P_COST,
        }
    }
}

/// Command-line overrides for [`AppConfig`].
///
/// Every field is optional; only the flags actually given take precedence
/// over configuration files and the environment.
#[derive(Args, Serialize, Deserialize, Default, Debug, Clone)]
pub struct ConfigOverrides {
    /// Database connection string or path.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Site root used to build absolute links in letters.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Secret used to sign activation links.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    /// Directory holding uploaded images.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_dir: Option<String>,
    /// Sender address of outgoing letters.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_email: Option<String>,
    /// Mail delivery backend.
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_backend: Option<MailBackend>,
    /// SMTP server host name.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_host: Option<String>,
    /// SMTP server port.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<u16>,
    /// SMTP user name.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_username: Option<String>,
    /// SMTP transport security.
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_security: Option<SmtpSecurityMode>,
    /// Argon2 memory cost parameter.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argon2_m_cost: Option<u32>,
    /// Argon2 time cost parameter.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argon2_t_cost: Option<u32>,
    /// Argon2 parallelism cost parameter.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argon2_p_cost: Option<u32>,
}

/// Arguments for the `create-user` subcommand.
#[derive(Args, Serialize, Deserialize, Default, Debug, Clone)]
pub struct CreateUserArgs {
    /// Username for the new account.
    pub username: String,
    /// Password for the new account.
    #[arg(long)]
    pub password: String,
    /// Email address for the new account.
    #[arg(long, default_value = "")]
    pub email: String,
    /// Grant access to moderation tools.
    #[arg(long)]
    pub staff: bool,
    /// Grant every permission.
    #[arg(long)]
    pub superuser: bool,
}

/// Arguments for the `add-rubric` subcommand.
#[derive(Args, Serialize, Deserialize, Default, Debug, Clone)]
pub struct AddRubricArgs {
    /// Rubric name.
    pub name: String,
    /// Id of the super rubric to nest under; omit for a super rubric.
    #[arg(long)]
    pub parent: Option<i32>,
    /// Position among siblings.
    #[arg(long, default_value_t = 0)]
    pub order: i16,
}

/// CLI subcommands exposed by `gazette`.
#[derive(Subcommand, Deserialize, Serialize, Debug, Clone)]
pub enum Commands {
    /// Create an activated account.
    #[command(name = "create-user")]
    CreateUser(CreateUserArgs),
    /// Create a super rubric, or a sub rubric with `--parent`.
    #[command(name = "add-rubric")]
    AddRubric(AddRubricArgs),
    /// Delete a rubric nothing refers to.
    #[command(name = "remove-rubric")]
    RemoveRubric {
        /// Rubric id.
        id: i32,
    },
    /// List accounts still waiting for activation.
    #[command(name = "list-pending")]
    ListPending {
        /// Only accounts that joined more than this many days ago.
        #[arg(long)]
        older_than_days: Option<u32>,
    },
    /// Mail the activation letter again.
    #[command(name = "resend-activation")]
    ResendActivation {
        /// Account ids.
        #[arg(required = true)]
        ids: Vec<i32>,
    },
    /// Delete an account together with its articles.
    #[command(name = "delete-user")]
    DeleteUser {
        /// Username of the account.
        username: String,
    },
}

/// Top-level CLI entry point consumed by binaries.
#[derive(Parser, Serialize, Debug, Clone)]
#[command(name = "gazette", version, about)]
pub struct Cli {
    /// Configuration overrides (merged with files and environment at runtime).
    #[command(flatten)]
    pub config: ConfigOverrides,
    /// Optional subcommand.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn cli_definition_is_consistent() { Cli::command().debug_assert(); }

    #[rstest]
    fn parses_subcommand_with_overrides() {
        let cli = Cli::try_parse_from([
            "gazette",
            "--database",
            "other.db",
            "add-rubric",
            "Cats",
            "--parent",
            "3",
            "--order",
            "2",
        ])
        .expect("parse");
        assert_eq!(cli.config.database.as_deref(), Some("other.db"));
        let Some(Commands::AddRubric(args)) = cli.command else {
            panic!("expected add-rubric");
        };
        assert_eq!((args.name.as_str(), args.parent, args.order), ("Cats", Some(3), 2));
    }

    #[rstest]
    fn resend_requires_ids() {
        assert!(Cli::try_parse_from(["gazette", "resend-activation"]).is_err());
    }

    #[rstest]
    fn unset_overrides_serialize_to_nothing() {
        let cli = Cli::try_parse_from(["gazette"]).expect("parse");
        assert!(cli.command.is_none());
        assert!(cli.config.database.is_none());
        assert!(cli.config.mail_backend.is_none());
    }
}
