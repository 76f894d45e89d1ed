//! Article and additional image helpers.

use cfg_if::cfg_if;
use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::{Backend, DbConnection};
use crate::{
    models::{AdditionalImage, Article, ArticleChanges, NewAdditionalImage, NewArticle},
    paging::{Page, window},
    schema::{additional_images, articles},
};

/// Insert an article and return the stored row.
///
/// # Errors
/// Returns any error produced by the insertion.
#[must_use = "handle the result"]
pub async fn create_article(conn: &mut DbConnection, article: &NewArticle<'_>) -> QueryResult<Article> {
    diesel::insert_into(articles::table)
        .values(article)
        .returning(Article::as_returning())
        .get_result(conn)
        .await
}

/// Apply edits to an existing article.
///
/// # Errors
/// Returns any error produced by the update; a missing row surfaces as
/// [`diesel::result::Error::NotFound`].
#[must_use = "handle the result"]
pub async fn update_article(
    conn: &mut DbConnection,
    article_id: i32,
    changes: &ArticleChanges<'_>,
) -> QueryResult<Article> {
    diesel::update(articles::table.find(article_id))
        .set(changes)
        .returning(Article::as_returning())
        .get_result(conn)
        .await
}

/// Fetch an article by id regardless of its visibility.
///
/// # Errors
/// Returns any error produced by the query.
#[must_use = "handle the result"]
pub async fn get_article(conn: &mut DbConnection, article_id: i32) -> QueryResult<Option<Article>> {
    articles::table
        .find(article_id)
        .select(Article::as_select())
        .first(conn)
        .await
        .optional()
}

/// Visible articles, newest first, optionally capped at `limit` rows.
///
/// # Errors
/// Returns any error produced by the query.
#[must_use = "handle the result"]
pub async fn list_active(conn: &mut DbConnection, limit: Option<i64>) -> QueryResult<Vec<Article>> {
    let mut query = articles::table
        .filter(articles::is_active.eq(true))
        .order((articles::created_at.desc(), articles::id.desc()))
        .select(Article::as_select())
        .into_boxed();
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    query.load(conn).await
}

/// Every article written by `author`, hidden ones included, newest first.
///
/// # Errors
/// Returns any error produced by the query.
#[must_use = "handle the result"]
pub async fn list_by_author(conn: &mut DbConnection, author: i32) -> QueryResult<Vec<Article>> {
    articles::table
        .filter(articles::author_id.eq(author))
        .order((articles::created_at.desc(), articles::id.desc()))
        .select(Article::as_select())
        .load(conn)
        .await
}

/// Escape `LIKE` metacharacters and wrap the keyword for substring search.
fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for ch in keyword.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

cfg_if! {
    if #[cfg(feature = "postgres")] {
        fn keyword_scope<'a>(
            query: articles::BoxedQuery<'a, Backend>,
            pattern: String,
        ) -> articles::BoxedQuery<'a, Backend> {
            query.filter(
                articles::title
                    .ilike(pattern.clone())
                    .escape('\\')
                    .or(articles::content.ilike(pattern).escape('\\')),
            )
        }
    } else {
        // SQLite's LIKE already folds ASCII case.
        fn keyword_scope<'a>(
            query: articles::BoxedQuery<'a, Backend>,
            pattern: String,
        ) -> articles::BoxedQuery<'a, Backend> {
            query.filter(
                articles::title
                    .like(pattern.clone())
                    .escape('\\')
                    .or(articles::content.like(pattern).escape('\\')),
            )
        }
    }
}

fn rubric_scope<'a>(rubric: i32, keyword: Option<&str>) -> articles::BoxedQuery<'a, Backend> {
    let query = articles::table
        .filter(articles::rubric_id.eq(rubric))
        .filter(articles::is_active.eq(true))
        .into_boxed();
    match keyword.map(str::trim).filter(|k| !k.is_empty()) {
        Some(keyword) => keyword_scope(query, like_pattern(keyword)),
        None => query,
    }
}

/// One page of visible articles in a rubric, newest first.
///
/// A non-empty `keyword` keeps only articles whose title or content contains
/// it, ignoring case. On SQLite only ASCII letters are folded, so `КОТ` does
/// not find `кот` there; PostgreSQL's `ILIKE` folds every letter. Out-of-range
/// page numbers are clamped.
///
/// # Errors
/// Returns any error produced by the count or page queries.
#[must_use = "handle the result"]
pub async fn list_by_rubric(
    conn: &mut DbConnection,
    rubric: i32,
    keyword: Option<&str>,
    page: i64,
    per_page: i64,
) -> QueryResult<Page<Article>> {
    let total: i64 = rubric_scope(rubric, keyword)
        .count()
        .get_result(conn)
        .await?;
    let span = window(page, total, per_page);
    let items = rubric_scope(rubric, keyword)
        .order((articles::created_at.desc(), articles::id.desc()))
        .limit(span.limit)
        .offset(span.offset)
        .select(Article::as_select())
        .load(conn)
        .await?;
    Ok(Page {
        items,
        number: span.number,
        num_pages: span.num_pages,
        total,
        per_page: span.limit,
    })
}

/// Attach an additional image to an article.
///
/// # Errors
/// Returns any error produced by the insertion.
#[must_use = "handle the result"]
pub async fn add_additional_image(
    conn: &mut DbConnection,
    image: &NewAdditionalImage<'_>,
) -> QueryResult<AdditionalImage> {
    diesel::insert_into(additional_images::table)
        .values(image)
        .returning(AdditionalImage::as_returning())
        .get_result(conn)
        .await
}

/// Additional images of an article in insertion order.
///
/// # Errors
/// Returns any error produced by the query.
#[must_use = "handle the result"]
pub async fn list_additional_images(
    conn: &mut DbConnection,
    article: i32,
) -> QueryResult<Vec<AdditionalImage>> {
    additional_images::table
        .filter(additional_images::article_id.eq(article))
        .order(additional_images::id.asc())
        .select(AdditionalImage::as_select())
        .load(conn)
        .await
}

/// Fetch one additional image.
///
/// # Errors
/// Returns any error produced by the query.
#[must_use = "handle the result"]
pub async fn get_additional_image(
    conn: &mut DbConnection,
    image_id: i32,
) -> QueryResult<Option<AdditionalImage>> {
    additional_images::table
        .find(image_id)
        .select(AdditionalImage::as_select())
        .first(conn)
        .await
        .optional()
}

/// Remove one additional image row.
///
/// # Errors
/// Returns any error produced by the deletion.
#[must_use = "handle the result"]
pub async fn delete_additional_image(conn: &mut DbConnection, image_id: i32) -> QueryResult<usize> {
    diesel::delete(additional_images::table.find(image_id))
        .execute(conn)
        .await
}
