//! Error taxonomy shared by the service layer.
//!
//! Field-level problems are collected into [`ValidationErrors`] so a caller
//! can report every bad field at once. Everything else is a
//! [`ServiceError`] variant that aborts the operation.

use std::fmt;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::{mail::MailError, media::MediaError, notify::NotifyError, signing::BadSignature};

/// One rejected field and the message to show next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// A non-empty set of field errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    #[must_use]
    pub const fn new() -> Self { Self { errors: Vec::new() } }

    /// Build a set holding a single error.
    #[must_use]
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool { self.errors.is_empty() }

    #[must_use]
    pub fn errors(&self) -> &[FieldError] { &self.errors }

    /// Messages recorded against `field`.
    pub fn for_field(&self, field: &str) -> impl Iterator<Item = &str> {
        self.errors
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| e.message.as_str())
    }

    #[must_use]
    pub fn has_field(&self, field: &str) -> bool { self.for_field(field).next().is_some() }

    /// Turn the collected errors into a result: `Ok(())` when none were added.
    ///
    /// # Errors
    /// Returns `self` when at least one field was rejected.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        for (idx, err) in self.errors.iter().enumerate() {
            let sep = if idx == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", err.field, err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Failures surfaced by the account, rubric, article and comment services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{entity} {id} is still referenced by {referenced_by}")]
    ReferentialIntegrity {
        entity: &'static str,
        id: i32,
        referenced_by: String,
    },
    #[error("invalid activation link")]
    InvalidSignature(#[from] BadSignature),
    #[error("challenge response was not accepted")]
    ChallengeFailed,
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("account {actor} may not change {entity} {id}")]
    PermissionDenied {
        actor: String,
        entity: &'static str,
        id: i32,
    },
    #[error(transparent)]
    Database(DieselError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Password(#[from] argon2::password_hash::Error),
}

impl From<DieselError> for ServiceError {
    fn from(value: DieselError) -> Self { Self::Database(value) }
}

impl From<MailError> for ServiceError {
    fn from(value: MailError) -> Self { Self::Notify(NotifyError::Mail(value)) }
}

impl ServiceError {
    pub(crate) const fn not_found(entity: &'static str) -> Self { Self::NotFound { entity } }

    /// Field errors carried by this error, if it is a validation failure.
    #[must_use]
    pub const fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Map a unique-constraint violation onto a field error, passing other
/// database errors through.
pub(crate) fn unique_violation_as_field(
    err: DieselError,
    field: &'static str,
    message: &str,
) -> ServiceError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            ValidationErrors::single(field, message).into()
        }
        other => ServiceError::Database(other),
    }
}
