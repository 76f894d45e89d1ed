//! Rubric table helpers.
//!
//! Super and sub rubrics share one table; every query here projects one of
//! the two partitions by testing `parent_id` for `NULL`.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;
use thiserror::Error;

use super::connection::DbConnection;
use crate::{
    models::{NewRubric, Rubric, SubRubric},
    schema::rubrics,
};

diesel::alias!(crate::schema::rubrics as parents: ParentRubrics);

/// Why a rubric could not be removed.
#[derive(Debug, Error)]
pub enum RubricDeleteError {
    #[error("rubric {id} does not exist")]
    Missing { id: i32 },
    #[error("rubric {id} is referenced by {articles} article(s) and {children} sub rubric(s)")]
    Referenced { id: i32, articles: i64, children: i64 },
    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),
}

/// Insert a rubric row and return it.
///
/// # Errors
/// Returns any error produced by the insertion, including unique violations
/// on `name`.
#[must_use = "handle the result"]
pub async fn create_rubric(conn: &mut DbConnection, rubric: &NewRubric<'_>) -> QueryResult<Rubric> {
    diesel::insert_into(rubrics::table)
        .values(rubric)
        .returning(Rubric::as_returning())
        .get_result(conn)
        .await
}

/// Fetch any rubric row by id.
///
/// # Errors
/// Returns any error produced by the query.
#[must_use = "handle the result"]
pub async fn get_rubric(conn: &mut DbConnection, rubric_id: i32) -> QueryResult<Option<Rubric>> {
    rubrics::table
        .find(rubric_id)
        .select(Rubric::as_select())
        .first(conn)
        .await
        .optional()
}

/// Top-level rubrics ordered by their `order` column.
///
/// # Errors
/// Returns any error produced by the query.
#[must_use = "handle the result"]
pub async fn list_super_rubrics(conn: &mut DbConnection) -> QueryResult<Vec<Rubric>> {
    rubrics::table
        .filter(rubrics::parent_id.is_null())
        .order((rubrics::sort_order.asc(), rubrics::id.asc()))
        .select(Rubric::as_select())
        .load(conn)
        .await
}

/// Nested rubrics ordered by `(parent.order, order)`, optionally limited to
/// the children of one super rubric.
///
/// # Errors
/// Returns any error produced by the query.
#[must_use = "handle the result"]
pub async fn list_sub_rubrics(
    conn: &mut DbConnection,
    parent: Option<i32>,
) -> QueryResult<Vec<SubRubric>> {
    let mut query = rubrics::table
        .inner_join(parents.on(rubrics::parent_id.eq(parents.field(rubrics::id).nullable())))
        .select((
            Rubric::as_select(),
            parents.field(rubrics::id),
            parents.field(rubrics::name),
        ))
        .order((
            parents.field(rubrics::sort_order).asc(),
            rubrics::sort_order.asc(),
            rubrics::id.asc(),
        ))
        .into_boxed();
    if let Some(parent_id) = parent {
        query = query.filter(rubrics::parent_id.eq(parent_id));
    }
    let rows: Vec<(Rubric, i32, String)> = query.load(conn).await?;
    Ok(rows
        .into_iter()
        .map(|(rubric, parent_id, parent_name)| SubRubric {
            rubric,
            parent_id,
            parent_name,
        })
        .collect())
}

/// Fetch one sub rubric with its parent's name. Super rubrics yield `None`.
///
/// # Errors
/// Returns any error produced by the query.
#[must_use = "handle the result"]
pub async fn get_sub_rubric(conn: &mut DbConnection, rubric_id: i32) -> QueryResult<Option<SubRubric>> {
    let row: Option<(Rubric, i32, String)> = rubrics::table
        .inner_join(parents.on(rubrics::parent_id.eq(parents.field(rubrics::id).nullable())))
        .filter(rubrics::id.eq(rubric_id))
        .select((
            Rubric::as_select(),
            parents.field(rubrics::id),
            parents.field(rubrics::name),
        ))
        .first(conn)
        .await
        .optional()?;
    Ok(row.map(|(rubric, parent_id, parent_name)| SubRubric {
        rubric,
        parent_id,
        parent_name,
    }))
}

/// Rename or reorder a rubric.
///
/// # Errors
/// Returns any error produced by the update, including unique violations on
/// `name`.
#[must_use = "handle the result"]
pub async fn update_rubric(
    conn: &mut DbConnection,
    rubric_id: i32,
    name: &str,
    order: i16,
) -> QueryResult<Rubric> {
    diesel::update(rubrics::table.find(rubric_id))
        .set((rubrics::name.eq(name), rubrics::sort_order.eq(order)))
        .returning(Rubric::as_returning())
        .get_result(conn)
        .await
}

/// Delete a rubric unless an article or a child rubric still points at it.
///
/// # Errors
/// Returns [`RubricDeleteError::Referenced`] when the row is protected,
/// [`RubricDeleteError::Missing`] when it does not exist, or any database
/// error.
#[must_use = "handle the result"]
pub async fn delete_rubric(conn: &mut DbConnection, rubric_id: i32) -> Result<(), RubricDeleteError> {
    use diesel_async::AsyncConnection;

    use crate::schema::articles;

    conn.transaction::<_, RubricDeleteError, _>(|conn| {
        Box::pin(async move {
            let article_refs: i64 = articles::table
                .filter(articles::rubric_id.eq(rubric_id))
                .count()
                .get_result(conn)
                .await?;
            let child_refs: i64 = rubrics::table
                .filter(rubrics::parent_id.eq(rubric_id))
                .count()
                .get_result(conn)
                .await?;
            if article_refs > 0 || child_refs > 0 {
                return Err(RubricDeleteError::Referenced {
                    id: rubric_id,
                    articles: article_refs,
                    children: child_refs,
                });
            }
            let removed = diesel::delete(rubrics::table.find(rubric_id))
                .execute(conn)
                .await?;
            if removed == 0 {
                return Err(RubricDeleteError::Missing { id: rubric_id });
            }
            Ok(())
        })
    })
    .await
}
