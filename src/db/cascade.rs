//! Ordered, explicit deletion of owned rows.
//!
//! Nothing here relies on `ON DELETE` clauses: every dependent row is removed
//! by the application before its owner, inside one transaction, so the caller
//! learns exactly which stored image files became unreferenced.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;

use super::{accounts::delete_account_row, connection::DbConnection};
use crate::schema::{additional_images, articles, comments};

/// What a cascading delete removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeletionReport {
    pub accounts: usize,
    pub articles: usize,
    pub additional_images: usize,
    pub comments: usize,
    /// Stored file names no longer referenced by any row.
    pub orphaned_files: Vec<String>,
}

impl DeletionReport {
    fn absorb(&mut self, other: Self) {
        self.accounts += other.accounts;
        self.articles += other.articles;
        self.additional_images += other.additional_images;
        self.comments += other.comments;
        self.orphaned_files.extend(other.orphaned_files);
    }
}

/// Remove one article: its additional images first, then its comments, then
/// the article row. Must run inside a transaction.
async fn delete_article_rows(conn: &mut DbConnection, article_id: i32) -> QueryResult<DeletionReport> {
    let mut report = DeletionReport::default();

    let hero: Option<Option<String>> = articles::table
        .find(article_id)
        .select(articles::image)
        .first(conn)
        .await
        .optional()?;
    let Some(hero) = hero else {
        return Ok(report);
    };

    let images: Vec<(i32, String)> = additional_images::table
        .filter(additional_images::article_id.eq(article_id))
        .select((additional_images::id, additional_images::image))
        .load(conn)
        .await?;
    for (image_id, file) in images {
        report.additional_images += diesel::delete(additional_images::table.find(image_id))
            .execute(conn)
            .await?;
        report.orphaned_files.push(file);
    }

    report.comments = diesel::delete(comments::table.filter(comments::article_id.eq(article_id)))
        .execute(conn)
        .await?;
    report.articles = diesel::delete(articles::table.find(article_id))
        .execute(conn)
        .await?;
    report.orphaned_files.extend(hero);
    debug!(
        article_id,
        images = report.additional_images,
        comments = report.comments,
        "article rows removed"
    );
    Ok(report)
}

/// Delete an article together with everything it owns.
///
/// Returns an empty report when the article does not exist.
///
/// # Errors
/// Returns any error produced by the deletions; the transaction is rolled
/// back in that case.
#[must_use = "handle the result"]
pub async fn delete_article_cascade(conn: &mut DbConnection, article_id: i32) -> QueryResult<DeletionReport> {
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        Box::pin(async move { delete_article_rows(conn, article_id).await })
    })
    .await
}

/// Delete an account after deleting, one by one, every article it wrote.
///
/// Returns an empty report when the account does not exist.
///
/// # Errors
/// Returns any error produced by the deletions; the transaction is rolled
/// back in that case.
#[must_use = "handle the result"]
pub async fn delete_account_cascade(conn: &mut DbConnection, account_id: i32) -> QueryResult<DeletionReport> {
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        Box::pin(async move {
            let mut report = DeletionReport::default();
            let owned: Vec<i32> = articles::table
                .filter(articles::author_id.eq(account_id))
                .select(articles::id)
                .order(articles::id.asc())
                .load(conn)
                .await?;
            for article_id in owned {
                let removed = delete_article_rows(conn, article_id).await?;
                report.absorb(removed);
            }
            report.accounts = delete_account_row(conn, account_id).await?;
            Ok(report)
        })
    })
    .await
}
