//! Account lifecycle: registration, activation, profile upkeep and removal.
//!
//! Self-registered accounts start inactive and unactivated. The only way
//! forward is the signed link mailed by [`register`]; [`activate`] checks the
//! signature and flips both flags at once. Administrators bypass this with
//! [`create_activated_account`].

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::{
    context::Context,
    db::{self, DbConnection, DeletionReport},
    error::{ServiceError, ValidationErrors, unique_violation_as_field},
    models::{Account, AccountProfile, NewAccount},
    passwords::{hash_password, verify_password},
    validation::{check_email, check_max_chars, check_password_pair, check_required, check_username},
};

const USERNAME_TAKEN: &str = "A user with that username already exists.";
const NAME_MAX: usize = 150;

/// Fields submitted on the registration form.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
    pub first_name: String,
    pub last_name: String,
    pub subscribe_to_notifications: bool,
}

/// Fields an account holder may edit on their profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub subscribe_to_notifications: bool,
}

/// Administrator-created account.
#[derive(Debug, Clone, Default)]
pub struct AdminAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Result of redeeming an activation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The account moved from pending to active.
    Activated(Account),
    /// The account had already been activated; nothing changed.
    AlreadyActivated(Account),
}

impl ActivationOutcome {
    #[must_use]
    pub const fn account(&self) -> &Account {
        match self {
            Self::Activated(account) | Self::AlreadyActivated(account) => account,
        }
    }
}

fn check_names(errors: &mut ValidationErrors, first_name: &str, last_name: &str) {
    check_max_chars(errors, "first_name", first_name, NAME_MAX);
    check_max_chars(errors, "last_name", last_name, NAME_MAX);
}

fn validate_registration(form: &Registration) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_username(&mut errors, &form.username);
    check_email(&mut errors, &form.email);
    check_names(&mut errors, &form.first_name, &form.last_name);
    check_password_pair(&mut errors, &form.password1, &form.password2, &form.username);
    errors.into_result()
}

/// Store a pending account and mail its activation link.
///
/// The account row is committed before the letter is sent; a delivery
/// failure is returned to the caller but leaves the account in place, from
/// where [`resend_activation`] can retry.
///
/// # Errors
/// Returns [`ServiceError::Validation`] for rejected fields (including a
/// taken username), or any database, hashing or notification error.
#[must_use = "handle the result"]
pub async fn register(
    conn: &mut DbConnection,
    ctx: &Context,
    form: &Registration,
) -> Result<Account, ServiceError> {
    validate_registration(form)?;
    let hashed = hash_password(&ctx.argon2, &form.password1)?;
    let new = NewAccount {
        username: &form.username,
        email: &form.email,
        first_name: &form.first_name,
        last_name: &form.last_name,
        password: &hashed,
        is_active: false,
        is_activated: false,
        subscribe_to_notifications: form.subscribe_to_notifications,
        is_staff: false,
        is_superuser: false,
        date_joined: Utc::now().naive_utc(),
    };
    let account = db::create_account(conn, &new)
        .await
        .map_err(|e| unique_violation_as_field(e, "username", USERNAME_TAKEN))?;
    info!(account = %account.username, id = account.id, "account registered");
    ctx.notifier.on_account_registered(&account).await?;
    Ok(account)
}

/// Redeem a signed activation token.
///
/// # Errors
/// Returns [`ServiceError::InvalidSignature`] for tampered or malformed
/// tokens and [`ServiceError::NotFound`] when the signed username no longer
/// exists. Neither case touches stored state.
#[must_use = "handle the result"]
pub async fn activate(
    conn: &mut DbConnection,
    ctx: &Context,
    token: &str,
) -> Result<ActivationOutcome, ServiceError> {
    let username = ctx.signer().unsign(token).inspect_err(|_| {
        warn!("activation attempted with an invalid token");
    })?;
    let account = db::get_account_by_username(conn, &username)
        .await?
        .ok_or_else(|| ServiceError::not_found("account"))?;
    if account.is_activated {
        return Ok(ActivationOutcome::AlreadyActivated(account));
    }
    if db::mark_activated(conn, account.id).await? == 0 {
        // Another request activated it between the read and the update.
        return Ok(ActivationOutcome::AlreadyActivated(account));
    }
    info!(account = %account.username, "account activated");
    Ok(ActivationOutcome::Activated(Account {
        is_active: true,
        is_activated: true,
        ..account
    }))
}

/// Create an account that can sign in immediately.
///
/// # Errors
/// Returns [`ServiceError::Validation`] for rejected fields, or any database
/// or hashing error.
#[must_use = "handle the result"]
pub async fn create_activated_account(
    conn: &mut DbConnection,
    ctx: &Context,
    req: &AdminAccount,
) -> Result<Account, ServiceError> {
    let mut errors = ValidationErrors::new();
    check_username(&mut errors, &req.username);
    if !req.email.is_empty() {
        check_email(&mut errors, &req.email);
    }
    check_required(&mut errors, "password", &req.password);
    errors.into_result()?;

    let hashed = hash_password(&ctx.argon2, &req.password)?;
    let new = NewAccount {
        username: &req.username,
        email: &req.email,
        first_name: "",
        last_name: "",
        password: &hashed,
        is_active: true,
        is_activated: true,
        subscribe_to_notifications: true,
        is_staff: req.is_staff || req.is_superuser,
        is_superuser: req.is_superuser,
        date_joined: Utc::now().naive_utc(),
    };
    let account = db::create_account(conn, &new)
        .await
        .map_err(|e| unique_violation_as_field(e, "username", USERNAME_TAKEN))?;
    info!(
        account = %account.username,
        staff = account.is_staff,
        superuser = account.is_superuser,
        "activated account created"
    );
    Ok(account)
}

/// Check credentials and record the sign-in.
///
/// Returns `None` for unknown usernames, wrong passwords and accounts that
/// are not active.
///
/// # Errors
/// Returns any database error.
#[must_use = "handle the result"]
pub async fn authenticate(
    conn: &mut DbConnection,
    username: &str,
    password: &str,
) -> Result<Option<Account>, ServiceError> {
    let Some(account) = db::get_account_by_username(conn, username).await? else {
        return Ok(None);
    };
    if !account.is_active || !verify_password(&account.password, password) {
        return Ok(None);
    }
    let now = Utc::now().naive_utc();
    db::touch_last_login(conn, account.id, now).await?;
    Ok(Some(Account {
        last_login: Some(now),
        ..account
    }))
}

/// Replace the editable profile columns of an account.
///
/// # Errors
/// Returns [`ServiceError::Validation`] for rejected fields,
/// [`ServiceError::NotFound`] for unknown accounts, or any database error.
#[must_use = "handle the result"]
pub async fn update_profile(
    conn: &mut DbConnection,
    account_id: i32,
    update: &ProfileUpdate,
) -> Result<Account, ServiceError> {
    let mut errors = ValidationErrors::new();
    check_username(&mut errors, &update.username);
    check_email(&mut errors, &update.email);
    check_names(&mut errors, &update.first_name, &update.last_name);
    errors.into_result()?;

    let profile = AccountProfile {
        username: &update.username,
        email: &update.email,
        first_name: &update.first_name,
        last_name: &update.last_name,
        subscribe_to_notifications: update.subscribe_to_notifications,
    };
    match db::update_profile(conn, account_id, &profile).await {
        Ok(account) => Ok(account),
        Err(diesel::result::Error::NotFound) => Err(ServiceError::not_found("account")),
        Err(e) => Err(unique_violation_as_field(e, "username", USERNAME_TAKEN)),
    }
}

/// Change a password after confirming the current one.
///
/// # Errors
/// Returns [`ServiceError::Validation`] when the old password is wrong or
/// the new pair is rejected, [`ServiceError::NotFound`] for unknown
/// accounts, or any database or hashing error.
#[must_use = "handle the result"]
pub async fn change_password(
    conn: &mut DbConnection,
    ctx: &Context,
    account_id: i32,
    old_password: &str,
    new_password1: &str,
    new_password2: &str,
) -> Result<(), ServiceError> {
    let account = db::get_account(conn, account_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("account"))?;
    let mut errors = ValidationErrors::new();
    if !verify_password(&account.password, old_password) {
        errors.add(
            "old_password",
            "Your old password was entered incorrectly. Please enter it again.",
        );
    }
    check_password_pair(&mut errors, new_password1, new_password2, &account.username);
    errors.into_result()?;

    let hashed = hash_password(&ctx.argon2, new_password1)?;
    db::set_password_hash(conn, account.id, &hashed).await?;
    info!(account = %account.username, "password changed");
    Ok(())
}

/// Remove an account after removing every article it wrote.
///
/// Image files of the removed articles are deleted once the transaction has
/// committed.
///
/// # Errors
/// Returns [`ServiceError::NotFound`] for unknown accounts, or any database
/// error (in which case nothing is removed).
#[must_use = "handle the result"]
pub async fn delete_account(
    conn: &mut DbConnection,
    ctx: &Context,
    account_id: i32,
) -> Result<DeletionReport, ServiceError> {
    let report = db::delete_account_cascade(conn, account_id).await?;
    if report.accounts == 0 {
        return Err(ServiceError::not_found("account"));
    }
    ctx.discard_files(&report.orphaned_files);
    info!(
        account_id,
        articles = report.articles,
        images = report.additional_images,
        comments = report.comments,
        "account deleted"
    );
    Ok(report)
}

/// Mail the activation letter again to each listed account still pending
/// activation. Activated and unknown ids are skipped.
///
/// Returns how many letters were sent.
///
/// # Errors
/// Stops at the first database or delivery error.
#[must_use = "handle the result"]
pub async fn resend_activation(
    conn: &mut DbConnection,
    ctx: &Context,
    ids: &[i32],
) -> Result<usize, ServiceError> {
    let mut sent = 0;
    for account in db::get_accounts(conn, ids).await? {
        if account.is_activated {
            info!(account = %account.username, "already activated; letter not resent");
            continue;
        }
        ctx.notifier.on_account_registered(&account).await?;
        sent += 1;
    }
    Ok(sent)
}

/// Accounts still waiting for activation, optionally only those that joined
/// more than `older_than_days` days ago.
///
/// # Errors
/// Returns any database error.
#[must_use = "handle the result"]
pub async fn list_pending_activation(
    conn: &mut DbConnection,
    older_than_days: Option<u32>,
) -> Result<Vec<Account>, ServiceError> {
    let cutoff = older_than_days.map(|days| (Utc::now() - Duration::days(i64::from(days))).naive_utc());
    Ok(db::list_pending_activation(conn, cutoff).await?)
}

/// Accounts that finished activation.
///
/// # Errors
/// Returns any database error.
#[must_use = "handle the result"]
pub async fn list_activated(conn: &mut DbConnection) -> Result<Vec<Account>, ServiceError> {
    Ok(db::list_activated(conn).await?)
}
