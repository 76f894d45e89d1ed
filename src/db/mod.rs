//! Manage database connections and domain queries.
//!
//! This module tree exposes helpers for creating pooled Diesel connections,
//! running embedded migrations, auditing backend capabilities, and executing
//! the row-level queries behind accounts, rubrics, articles and comments.
//! Validation and lifecycle rules live one layer up, in the service modules.

mod accounts;
mod articles;
mod audit;
mod cascade;
mod comments;
mod connection;
mod migrations;
mod rubrics;


#[cfg(feature = "postgres")]
pub use self::audit::audit_postgres_features;
#[cfg(feature = "sqlite")]
pub use self::audit::audit_sqlite_features;
pub use self::{
    accounts::{
        create_account,
        get_account,
        get_account_by_username,
        get_accounts,
        list_activated,
        list_pending_activation,
        mark_activated,
        set_password_hash,
        touch_last_login,
        update_profile,
    },
    articles::{
        add_additional_image,
        create_article,
        delete_additional_image,
        get_additional_image,
        get_article,
        list_active,
        list_additional_images,
        list_by_author,
        list_by_rubric,
        update_article,
    },
    cascade::{DeletionReport, delete_account_cascade, delete_article_cascade},
    comments::{count_comments, insert_comment, list_active_comments},
    connection::{Backend, DbConnection, DbPool, MIGRATIONS, establish_pool},
    migrations::{apply_migrations, run_migrations},
    rubrics::{
        RubricDeleteError,
        create_rubric,
        delete_rubric,
        get_rubric,
        get_sub_rubric,
        list_sub_rubrics,
        list_super_rubrics,
        update_rubric,
    },
};
