//! Comment submission.
//!
//! Signed-in readers comment under their username; guests pick a display
//! name and must pass a challenge first. Either way the article's author is
//! told about the new comment unless they opted out.

use chrono::Utc;
use tracing::{info, warn};

use crate::{
    challenge::ChallengeVerifier,
    context::Context,
    db::{self, DbConnection},
    error::{ServiceError, ValidationErrors},
    models::{Account, Comment, NewComment},
    validation::{COMMENT_AUTHOR_MAX, check_max_chars, check_required},
};

async fn insert(
    conn: &mut DbConnection,
    ctx: &Context,
    article_id: i32,
    author: &str,
    content: &str,
) -> Result<Comment, ServiceError> {
    let mut errors = ValidationErrors::new();
    if check_required(&mut errors, "author", author) {
        check_max_chars(&mut errors, "author", author, COMMENT_AUTHOR_MAX);
    }
    check_required(&mut errors, "content", content);
    errors.into_result()?;

    let article = db::get_article(conn, article_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("article"))?;
    let comment = db::insert_comment(
        conn,
        &NewComment {
            article_id: article.id,
            author,
            content,
            is_active: true,
            created_at: Utc::now().naive_utc(),
        },
    )
    .await?;
    info!(article = article.id, comment = comment.id, author, "comment added");

    let Some(owner) = db::get_account(conn, article.author_id).await? else {
        warn!(article = article.id, "article author missing; comment letter skipped");
        return Ok(comment);
    };
    ctx.notifier
        .on_comment_created(&comment, &article, &owner)
        .await?;
    Ok(comment)
}

/// Comment as a signed-in account, under its username.
///
/// # Errors
/// Returns [`ServiceError::Validation`] for empty content,
/// [`ServiceError::NotFound`] for unknown articles, or any database or
/// notification error. A notification error is raised after the comment
/// has been stored.
#[must_use = "handle the result"]
pub async fn submit_as_authenticated(
    conn: &mut DbConnection,
    ctx: &Context,
    article_id: i32,
    account: &Account,
    content: &str,
) -> Result<Comment, ServiceError> {
    insert(conn, ctx, article_id, &account.username, content).await
}

/// Comment as a guest once `challenge` accepts `response`.
///
/// # Errors
/// Returns [`ServiceError::ChallengeFailed`] without storing anything when
/// the response is rejected; otherwise as [`submit_as_authenticated`].
#[must_use = "handle the result"]
pub async fn submit_as_guest(
    conn: &mut DbConnection,
    ctx: &Context,
    article_id: i32,
    author_name: &str,
    content: &str,
    challenge: &dyn ChallengeVerifier,
    response: &str,
) -> Result<Comment, ServiceError> {
    if !challenge.verify(response) {
        warn!(article = article_id, "guest comment rejected by challenge");
        return Err(ServiceError::ChallengeFailed);
    }
    insert(conn, ctx, article_id, author_name, content).await
}

/// Visible comments of an article, oldest first.
///
/// # Errors
/// Returns any database error.
#[must_use = "handle the result"]
pub async fn list_active_comments(conn: &mut DbConnection, article_id: i32) -> Result<Vec<Comment>, ServiceError> {
    Ok(db::list_active_comments(conn, article_id).await?)
}
