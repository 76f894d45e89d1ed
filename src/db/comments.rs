//! Comment record helpers.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::{
    models::{Comment, NewComment},
    schema::comments,
};

/// Insert a comment and return the stored row.
///
/// # Errors
/// Returns any error produced by the insertion.
#[must_use = "handle the result"]
pub async fn insert_comment(conn: &mut DbConnection, comment: &NewComment<'_>) -> QueryResult<Comment> {
    diesel::insert_into(comments::table)
        .values(comment)
        .returning(Comment::as_returning())
        .get_result(conn)
        .await
}

/// Visible comments on an article, oldest first.
///
/// # Errors
/// Returns any error produced by the query.
#[must_use = "handle the result"]
pub async fn list_active_comments(conn: &mut DbConnection, article: i32) -> QueryResult<Vec<Comment>> {
    comments::table
        .filter(comments::article_id.eq(article))
        .filter(comments::is_active.eq(true))
        .order((comments::created_at.asc(), comments::id.asc()))
        .select(Comment::as_select())
        .load(conn)
        .await
}

/// Number of comment rows attached to an article, hidden ones included.
///
/// # Errors
/// Returns any error produced by the query.
#[must_use = "handle the result"]
pub async fn count_comments(conn: &mut DbConnection, article: i32) -> QueryResult<i64> {
    comments::table
        .filter(comments::article_id.eq(article))
        .count()
        .get_result(conn)
        .await
}
