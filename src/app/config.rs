//! Layered runtime configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the XDG config file
//! `gazette/config.toml`, `.gazette.toml` in the working directory,
//! `GAZETTE_*` environment variables, then command-line flags.

use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use cli_defs::{AppConfig, ConfigOverrides, MailBackend, SmtpSecurityMode};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use url::Url;

use crate::{
    context::Context,
    mail::{LogMailer, Mailer, SmtpMailer, SmtpSecurity, SmtpSettings},
    media::{MediaStore, RasterCodec},
    notify::Notifier,
    passwords::{HashCosts, argon2_with_costs},
    signing::HmacSigner,
};

/// Per-directory configuration file.
pub const CONFIG_FILE: &str = ".gazette.toml";
/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "GAZETTE_";

/// Assemble every configuration source, without extracting it.
#[must_use]
pub fn sources(overrides: &ConfigOverrides) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
    if let Some(path) = xdg::BaseDirectories::with_prefix("gazette").find_config_file("config.toml") {
        figment = figment.merge(Toml::file(path));
    }
    figment
        .merge(Toml::file(CONFIG_FILE))
        .merge(Env::prefixed(ENV_PREFIX))
        .merge(Serialized::globals(overrides))
}

/// Merge every configuration source into an [`AppConfig`].
///
/// # Errors
/// Returns an error when a source cannot be read or a value has the wrong
/// type.
pub fn load_config(overrides: &ConfigOverrides) -> Result<AppConfig> {
    sources(overrides)
        .extract()
        .context("failed to load configuration")
}

/// Reject configurations the services cannot run with.
///
/// # Errors
/// Returns an error naming the first offending setting.
pub fn validate_config(cfg: &AppConfig) -> Result<()> {
    if cfg.secret_key.trim().is_empty() {
        bail!("secret_key must be set (use --secret-key or {ENV_PREFIX}SECRET_KEY)");
    }
    let base = Url::parse(&cfg.base_url).with_context(|| format!("invalid base_url {:?}", cfg.base_url))?;
    if !matches!(base.scheme(), "http" | "https") {
        bail!("base_url must use http or https, got {:?}", base.scheme());
    }
    if cfg.mail_backend == MailBackend::Smtp && cfg.smtp_host.as_deref().is_none_or(str::is_empty) {
        bail!("smtp_host must be set when mail_backend is smtp");
    }
    Ok(())
}

fn mailer(cfg: &AppConfig) -> Result<Arc<dyn Mailer>> {
    match cfg.mail_backend {
        MailBackend::Log => Ok(Arc::new(LogMailer)),
        MailBackend::Smtp => {
            let settings = SmtpSettings {
                host: cfg.smtp_host.clone().unwrap_or_default(),
                port: cfg.smtp_port,
                security: match cfg.smtp_security {
                    SmtpSecurityMode::Starttls => SmtpSecurity::StartTls,
                    SmtpSecurityMode::Tls => SmtpSecurity::Tls,
                    SmtpSecurityMode::None => SmtpSecurity::None,
                },
                username: cfg.smtp_username.clone(),
                password: cfg.smtp_password.clone(),
            };
            Ok(Arc::new(
                SmtpMailer::new(&settings, &cfg.from_email).context("failed to configure SMTP")?,
            ))
        }
    }
}

/// Build the service [`Context`] described by `cfg`.
///
/// # Errors
/// Returns an error when the configuration is invalid or a collaborator
/// cannot be constructed.
pub fn build_context(cfg: &AppConfig) -> Result<Context> {
    validate_config(cfg)?;
    let argon2 = argon2_with_costs(HashCosts {
        m_cost: cfg.argon2_m_cost,
        t_cost: cfg.argon2_t_cost,
        p_cost: cfg.argon2_p_cost,
    })
    .with_context(|| {
        format!(
            "invalid Argon2 params derived from config: m_cost={}, t_cost={}, p_cost={}",
            cfg.argon2_m_cost, cfg.argon2_t_cost, cfg.argon2_p_cost
        )
    })?;
    let signer = Arc::new(HmacSigner::new(cfg.secret_key.as_bytes()));
    let notifier = Notifier::new(mailer(cfg)?, signer, &cfg.base_url)?;
    let media = MediaStore::open(&cfg.media_dir)
        .with_context(|| format!("failed to open media directory {:?}", cfg.media_dir))?;
    Ok(Context::new(
        Arc::new(argon2),
        Arc::new(notifier),
        Arc::new(RasterCodec),
        Arc::new(media),
    ))
}
