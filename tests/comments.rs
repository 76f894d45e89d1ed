//! Integration tests for comment submission and author notifications.

use gazette::{
    ServiceError,
    accounts::{self, ProfileUpdate},
    comments,
    db,
};
use rstest::rstest;
use test_util::{
    AnyError,
    BASE_URL,
    Harness,
    ScriptedChallenge,
    migrated_connection,
    seed_account,
    seed_article,
    seed_rubrics,
};

#[rstest]
#[tokio::test]
async fn signed_in_comment_notifies_the_author() -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;
    let (_, world) = seed_rubrics(&mut conn).await?;
    let author = seed_account(&mut conn, &h.ctx, "author").await?;
    let reader = seed_account(&mut conn, &h.ctx, "reader").await?;
    let article = seed_article(&mut conn, &h.ctx, &author, world.id, "Headline").await?;

    let comment = comments::submit_as_authenticated(&mut conn, &h.ctx, article.id, &reader, "Great read").await?;
    assert_eq!(comment.author, "reader");
    assert!(comment.is_active);

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    let letter = sent.first().expect("one letter");
    assert_eq!(letter.to, "author@example.com");
    assert_eq!(letter.subject, "New comment on \"Headline\"");
    let link = format!("{BASE_URL}/{}/{}/", world.id, article.id);
    assert!(letter.html_body.contains(&link), "{}", letter.html_body);
    assert!(letter.html_body.contains("Great read"));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn failed_challenge_stores_nothing() -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;
    let (_, world) = seed_rubrics(&mut conn).await?;
    let author = seed_account(&mut conn, &h.ctx, "author").await?;
    let article = seed_article(&mut conn, &h.ctx, &author, world.id, "Headline").await?;

    let err = comments::submit_as_guest(
        &mut conn,
        &h.ctx,
        article.id,
        "guest",
        "spam",
        &ScriptedChallenge(false),
        "wrong",
    )
    .await
    .expect_err("challenge rejects");
    assert!(matches!(err, ServiceError::ChallengeFailed));
    assert_eq!(db::count_comments(&mut conn, article.id).await?, 0);
    assert!(h.mailer.sent().is_empty());

    comments::submit_as_guest(
        &mut conn,
        &h.ctx,
        article.id,
        "guest",
        "hello",
        &ScriptedChallenge(true),
        "right",
    )
    .await?;
    assert_eq!(comments::list_active_comments(&mut conn, article.id).await?.len(), 1);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn unsubscribed_author_gets_no_letter() -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;
    let (_, world) = seed_rubrics(&mut conn).await?;
    let author = seed_account(&mut conn, &h.ctx, "author").await?;
    accounts::update_profile(
        &mut conn,
        author.id,
        &ProfileUpdate {
            username: author.username.clone(),
            email: author.email.clone(),
            subscribe_to_notifications: false,
            ..ProfileUpdate::default()
        },
    )
    .await?;
    let article = seed_article(&mut conn, &h.ctx, &author, world.id, "Quiet").await?;

    comments::submit_as_guest(
        &mut conn,
        &h.ctx,
        article.id,
        "guest",
        "hello",
        &ScriptedChallenge(true),
        "ok",
    )
    .await?;
    assert_eq!(db::count_comments(&mut conn, article.id).await?, 1);
    assert!(h.mailer.sent().is_empty());
    Ok(())
}

#[rstest]
#[case::blank_author("   ", "text", "author")]
#[case::long_author("abcdefghijklmnopqrstuvwxyz012345", "text", "author")]
#[case::blank_content("guest", "", "content")]
#[tokio::test]
async fn guest_fields_are_validated(
    #[case] author_name: &str,
    #[case] content: &str,
    #[case] field: &str,
) -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;
    let (_, world) = seed_rubrics(&mut conn).await?;
    let author = seed_account(&mut conn, &h.ctx, "author").await?;
    let article = seed_article(&mut conn, &h.ctx, &author, world.id, "Headline").await?;

    let err = comments::submit_as_guest(
        &mut conn,
        &h.ctx,
        article.id,
        author_name,
        content,
        &ScriptedChallenge(true),
        "ok",
    )
    .await
    .expect_err("invalid comment");
    assert!(err.validation().is_some_and(|e| e.has_field(field)));
    assert_eq!(db::count_comments(&mut conn, article.id).await?, 0);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn commenting_on_missing_article_is_not_found() -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;
    let reader = seed_account(&mut conn, &h.ctx, "reader").await?;
    let err = comments::submit_as_authenticated(&mut conn, &h.ctx, 404, &reader, "hello")
        .await
        .expect_err("no article");
    assert!(matches!(err, ServiceError::NotFound { entity: "article" }));
    Ok(())
}
