//! Core library for the gazette publishing site.
//!
//! Authors publish articles into sub rubrics of a two-level rubric tree;
//! readers list, search and comment on them. This crate holds the data model
//! and its lifecycle rules (account activation, ownership checks, ordered
//! cascading deletes, comment notifications) behind plain async functions
//! that take a database connection and a shared [`context::Context`]. The
//! request layer is left to the embedding application.
//!
//! Only one database backend (either `sqlite` or `postgres`) should be
//! enabled at a time.

pub mod accounts;
pub mod app;
pub mod articles;
pub mod challenge;
pub mod comments;
pub mod context;
pub mod db;
pub mod error;
pub mod mail;
pub mod media;
pub mod models;
pub mod notify;
pub mod paging;
pub mod passwords;
pub mod rubrics;
pub mod schema;
pub mod signing;
pub mod validation;

pub use context::Context;
pub use error::{FieldError, ServiceError, ValidationErrors};
