//! Super and sub rubrics over the shared rubric table.

use tracing::info;

use crate::{
    db::{self, DbConnection, RubricDeleteError},
    error::{ServiceError, ValidationErrors, unique_violation_as_field},
    models::{NewRubric, Rubric, RubricKind, SubRubric},
    validation::{RUBRIC_NAME_MAX, check_max_chars, check_required},
};

const NAME_TAKEN: &str = "Rubric with this Name already exists.";

fn validate_name(errors: &mut ValidationErrors, name: &str) {
    if check_required(errors, "name", name) {
        check_max_chars(errors, "name", name, RUBRIC_NAME_MAX);
    }
}

async fn insert(conn: &mut DbConnection, rubric: &NewRubric<'_>) -> Result<Rubric, ServiceError> {
    let stored = db::create_rubric(conn, rubric)
        .await
        .map_err(|e| unique_violation_as_field(e, "name", NAME_TAKEN))?;
    info!(rubric = %stored.name, id = stored.id, parent = ?stored.parent_id, "rubric created");
    Ok(stored)
}

/// Create a top-level rubric.
///
/// # Errors
/// Returns [`ServiceError::Validation`] for an empty, overlong or taken
/// name, or any database error.
#[must_use = "handle the result"]
pub async fn create_super_rubric(
    conn: &mut DbConnection,
    name: &str,
    order: i16,
) -> Result<Rubric, ServiceError> {
    let mut errors = ValidationErrors::new();
    validate_name(&mut errors, name);
    errors.into_result()?;
    insert(
        conn,
        &NewRubric {
            name,
            order,
            parent_id: None,
        },
    )
    .await
}

/// Create a rubric nested under an existing super rubric.
///
/// # Errors
/// Returns [`ServiceError::Validation`] for a bad name or when `parent` is
/// missing or is itself a sub rubric, or any database error.
#[must_use = "handle the result"]
pub async fn create_sub_rubric(
    conn: &mut DbConnection,
    name: &str,
    order: i16,
    parent: i32,
) -> Result<Rubric, ServiceError> {
    let mut errors = ValidationErrors::new();
    validate_name(&mut errors, name);
    match db::get_rubric(conn, parent).await?.map(|r| r.kind()) {
        Some(RubricKind::Super) => {}
        Some(RubricKind::Sub { .. }) | None => errors.add(
            "super_rubric",
            "Select a valid choice. That choice is not one of the available choices.",
        ),
    }
    errors.into_result()?;
    insert(
        conn,
        &NewRubric {
            name,
            order,
            parent_id: Some(parent),
        },
    )
    .await
}

/// Rename or reorder a rubric of either kind.
///
/// # Errors
/// Returns [`ServiceError::Validation`] for a bad or taken name,
/// [`ServiceError::NotFound`] for unknown rubrics, or any database error.
#[must_use = "handle the result"]
pub async fn update_rubric(
    conn: &mut DbConnection,
    rubric_id: i32,
    name: &str,
    order: i16,
) -> Result<Rubric, ServiceError> {
    let mut errors = ValidationErrors::new();
    validate_name(&mut errors, name);
    errors.into_result()?;
    match db::update_rubric(conn, rubric_id, name, order).await {
        Ok(rubric) => Ok(rubric),
        Err(diesel::result::Error::NotFound) => Err(ServiceError::not_found("rubric")),
        Err(e) => Err(unique_violation_as_field(e, "name", NAME_TAKEN)),
    }
}

/// Top-level rubrics ordered by `order`.
///
/// # Errors
/// Returns any database error.
#[must_use = "handle the result"]
pub async fn list_super_rubrics(conn: &mut DbConnection) -> Result<Vec<Rubric>, ServiceError> {
    Ok(db::list_super_rubrics(conn).await?)
}

/// Sub rubrics ordered by `(parent order, order)`, optionally only those of
/// one super rubric.
///
/// # Errors
/// Returns any database error.
#[must_use = "handle the result"]
pub async fn list_sub_rubrics(
    conn: &mut DbConnection,
    parent: Option<i32>,
) -> Result<Vec<SubRubric>, ServiceError> {
    Ok(db::list_sub_rubrics(conn, parent).await?)
}

/// One sub rubric with its parent's name.
///
/// # Errors
/// Returns [`ServiceError::NotFound`] when `rubric_id` is unknown or names a
/// super rubric, or any database error.
#[must_use = "handle the result"]
pub async fn get_sub_rubric(conn: &mut DbConnection, rubric_id: i32) -> Result<SubRubric, ServiceError> {
    db::get_sub_rubric(conn, rubric_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("sub rubric"))
}

/// Remove a rubric nobody refers to.
///
/// # Errors
/// Returns [`ServiceError::ReferentialIntegrity`] while articles or sub
/// rubrics still point at it, [`ServiceError::NotFound`] for unknown rubrics,
/// or any database error. Rows are left untouched on error.
#[must_use = "handle the result"]
pub async fn delete_rubric(conn: &mut DbConnection, rubric_id: i32) -> Result<(), ServiceError> {
    match db::delete_rubric(conn, rubric_id).await {
        Ok(()) => {
            info!(rubric_id, "rubric deleted");
            Ok(())
        }
        Err(RubricDeleteError::Referenced {
            id,
            articles,
            children,
        }) => Err(ServiceError::ReferentialIntegrity {
            entity: "rubric",
            id,
            referenced_by: format!("{articles} article(s) and {children} sub rubric(s)"),
        }),
        Err(RubricDeleteError::Missing { .. }) => Err(ServiceError::not_found("rubric")),
        Err(RubricDeleteError::Diesel(e)) => Err(e.into()),
    }
}
