//! Row types mapped onto the tables declared in [`crate::schema`].

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// A registered account.
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::schema::accounts)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub is_active: bool,
    pub is_activated: bool,
    pub subscribe_to_notifications: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
}

#[derive(Insertable, Deserialize)]
#[diesel(table_name = crate::schema::accounts)]
pub struct NewAccount<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password: &'a str,
    pub is_active: bool,
    pub is_activated: bool,
    pub subscribe_to_notifications: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: NaiveDateTime,
}

/// Profile columns an account holder may change themselves.
#[derive(AsChangeset, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::accounts)]
pub struct AccountProfile<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub subscribe_to_notifications: bool,
}

/// A row of the shared rubric table.
///
/// Whether the row is a super rubric or a sub rubric is derived from
/// `parent_id`; see [`Rubric::kind`].
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::schema::rubrics)]
pub struct Rubric {
    pub id: i32,
    pub name: String,
    #[diesel(column_name = sort_order)]
    pub order: i16,
    pub parent_id: Option<i32>,
}

/// Partition of the rubric table a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RubricKind {
    /// Top-level rubric without a parent.
    Super,
    /// Rubric nested under the given super rubric.
    Sub { parent_id: i32 },
}

impl Rubric {
    /// Classify the row by its parent reference.
    #[must_use]
    pub const fn kind(&self) -> RubricKind {
        match self.parent_id {
            None => RubricKind::Super,
            Some(parent_id) => RubricKind::Sub { parent_id },
        }
    }
}

#[derive(Insertable, Deserialize)]
#[diesel(table_name = crate::schema::rubrics)]
pub struct NewRubric<'a> {
    pub name: &'a str,
    #[diesel(column_name = sort_order)]
    pub order: i16,
    pub parent_id: Option<i32>,
}

/// A sub rubric together with the name and order of its parent.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubRubric {
    pub rubric: Rubric,
    pub parent_id: i32,
    pub parent_name: String,
}

impl std::fmt::Display for SubRubric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.parent_name, self.rubric.name)
    }
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, PartialEq, Eq)]
#[diesel(belongs_to(Rubric))]
#[diesel(belongs_to(Account, foreign_key = author_id))]
#[diesel(table_name = crate::schema::articles)]
pub struct Article {
    pub id: i32,
    pub rubric_id: i32,
    pub title: String,
    pub content: String,
    pub source: String,
    pub characters: String,
    pub image: Option<String>,
    pub author_id: i32,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::articles)]
pub struct NewArticle<'a> {
    pub rubric_id: i32,
    pub title: &'a str,
    pub content: &'a str,
    pub source: &'a str,
    pub characters: &'a str,
    pub image: Option<&'a str>,
    pub author_id: i32,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// Editable article columns. `image` is only written when it is `Some`.
#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::articles)]
pub struct ArticleChanges<'a> {
    pub rubric_id: i32,
    pub title: &'a str,
    pub content: &'a str,
    pub source: &'a str,
    pub characters: &'a str,
    pub image: Option<Option<&'a str>>,
    pub is_active: bool,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, PartialEq, Eq)]
#[diesel(belongs_to(Article))]
#[diesel(table_name = crate::schema::additional_images)]
pub struct AdditionalImage {
    pub id: i32,
    pub article_id: i32,
    pub image: String,
    pub caption: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::additional_images)]
pub struct NewAdditionalImage<'a> {
    pub article_id: i32,
    pub image: &'a str,
    pub caption: &'a str,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, PartialEq, Eq)]
#[diesel(belongs_to(Article))]
#[diesel(table_name = crate::schema::comments)]
pub struct Comment {
    pub id: i32,
    pub article_id: i32,
    pub author: String,
    pub content: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::comments)]
pub struct NewComment<'a> {
    pub article_id: i32,
    pub author: &'a str,
    pub content: &'a str,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}
