//! Seed rows shared by the integration tests.

use gazette::{
    Context,
    accounts::{self, AdminAccount, Registration},
    articles::{self, ArticleDraft},
    db::DbConnection,
    models::{Account, Article, Rubric},
    rubrics,
};

use crate::AnyError;

/// Password given to every seeded account.
pub const PASSWORD: &str = "correct-horse-42";

/// Create an activated, non-staff account.
///
/// # Errors
/// Returns any service error raised while creating the account.
pub async fn seed_account(
    conn: &mut DbConnection,
    ctx: &Context,
    username: &str,
) -> Result<Account, AnyError> {
    let account = accounts::create_activated_account(
        conn,
        ctx,
        &AdminAccount {
            username: username.to_owned(),
            email: format!("{username}@example.com"),
            password: PASSWORD.to_owned(),
            is_staff: false,
            is_superuser: false,
        },
    )
    .await?;
    Ok(account)
}

/// Register an account through the public flow, leaving it pending.
///
/// # Errors
/// Returns any service error raised by registration.
pub async fn seed_pending_account(
    conn: &mut DbConnection,
    ctx: &Context,
    username: &str,
) -> Result<Account, AnyError> {
    let account = accounts::register(
        conn,
        ctx,
        &Registration {
            username: username.to_owned(),
            email: format!("{username}@example.com"),
            password1: PASSWORD.to_owned(),
            password2: PASSWORD.to_owned(),
            subscribe_to_notifications: true,
            ..Registration::default()
        },
    )
    .await?;
    Ok(account)
}

/// Create a super rubric `News` with one sub rubric `World`; returns
/// `(super, sub)`.
///
/// # Errors
/// Returns any service error raised while creating the rubrics.
pub async fn seed_rubrics(conn: &mut DbConnection) -> Result<(Rubric, Rubric), AnyError> {
    let parent = rubrics::create_super_rubric(conn, "News", 1).await?;
    let child = rubrics::create_sub_rubric(conn, "World", 1, parent.id).await?;
    Ok((parent, child))
}

/// A valid, active draft in `rubric_id`.
#[must_use]
pub fn draft(rubric_id: i32, title: &str) -> ArticleDraft {
    ArticleDraft {
        rubric_id,
        title: title.to_owned(),
        content: format!("Body of {title}"),
        source: "Wire service".to_owned(),
        characters: "Ada Lovelace (1815-1852)".to_owned(),
        is_active: true,
    }
}

/// Publish an article without an image.
///
/// # Errors
/// Returns any service error raised while creating the article.
pub async fn seed_article(
    conn: &mut DbConnection,
    ctx: &Context,
    author: &Account,
    rubric_id: i32,
    title: &str,
) -> Result<Article, AnyError> {
    let article = articles::create_article(conn, ctx, author, &draft(rubric_id, title), None).await?;
    Ok(article)
}
