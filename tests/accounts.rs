//! Integration tests for the account lifecycle.
//!
//! Covers registration with its activation letter, redeeming signed links
//! (including tampered ones), sign-in, password changes and the cascading
//! removal of an account with everything it wrote.

use gazette::{
    ServiceError,
    accounts::{self, ActivationOutcome, Registration},
    articles,
    comments,
    db,
    media::Upload,
};
use rstest::rstest;
use test_util::{
    AnyError,
    BASE_URL,
    Harness,
    ScriptedChallenge,
    draft,
    fake_image,
    migrated_connection,
    seed_account,
    seed_article,
    seed_pending_account,
    seed_rubrics,
};

const PASSWORD: &str = "correct-horse-42";

#[rstest]
#[tokio::test]
async fn registration_mails_a_working_activation_link() -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;

    let account = seed_pending_account(&mut conn, &h.ctx, "alice").await?;
    assert!(!account.is_active);
    assert!(!account.is_activated);

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    let letter = sent.first().expect("one letter");
    assert_eq!(letter.to, "alice@example.com");
    assert!(letter.subject.contains("alice"));

    let token = h.ctx.signer().sign("alice");
    let link = format!("{BASE_URL}/accounts/register/activate/{token}/");
    assert!(letter.html_body.contains(&link), "{}", letter.html_body);

    let outcome = accounts::activate(&mut conn, &h.ctx, &token).await?;
    assert!(matches!(outcome, ActivationOutcome::Activated(_)));
    assert!(outcome.account().is_active && outcome.account().is_activated);

    let again = accounts::activate(&mut conn, &h.ctx, &token).await?;
    assert!(matches!(again, ActivationOutcome::AlreadyActivated(_)));
    Ok(())
}

#[rstest]
#[case::flipped_value("mallory")]
#[case::garbage("not-a-token")]
#[case::empty("")]
#[tokio::test]
async fn tampered_tokens_change_nothing(#[case] forged_user: &str) -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;
    seed_pending_account(&mut conn, &h.ctx, "alice").await?;

    let genuine = h.ctx.signer().sign("alice");
    let signature = genuine.rsplit_once(':').map(|(_, s)| s).unwrap_or_default();
    let forged = if forged_user == "mallory" {
        format!("{forged_user}:{signature}")
    } else {
        forged_user.to_owned()
    };

    let err = accounts::activate(&mut conn, &h.ctx, &forged)
        .await
        .expect_err("forged token must be rejected");
    assert!(matches!(err, ServiceError::InvalidSignature(_)));

    let stored = db::get_account_by_username(&mut conn, "alice")
        .await?
        .expect("account kept");
    assert!(!stored.is_activated && !stored.is_active);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn signed_token_for_unknown_user_is_not_found() -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;
    let token = h.ctx.signer().sign("ghost");
    let err = accounts::activate(&mut conn, &h.ctx, &token)
        .await
        .expect_err("no such account");
    assert!(matches!(err, ServiceError::NotFound { entity: "account" }));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn duplicate_username_is_a_field_error() -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;
    seed_account(&mut conn, &h.ctx, "alice").await?;

    let err = seed_pending_account(&mut conn, &h.ctx, "alice")
        .await
        .expect_err("username taken");
    let err = err.downcast::<ServiceError>()?;
    let fields = err.validation().expect("validation error");
    assert!(fields.has_field("username"));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn failed_letter_keeps_pending_account_for_resend() -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;
    h.mailer.set_failing(true);

    let form = Registration {
        username: "bob".into(),
        email: "bob@example.com".into(),
        password1: PASSWORD.into(),
        password2: PASSWORD.into(),
        ..Registration::default()
    };
    let err = accounts::register(&mut conn, &h.ctx, &form)
        .await
        .expect_err("mail backend down");
    assert!(matches!(err, ServiceError::Notify(_)));

    let pending = accounts::list_pending_activation(&mut conn, None).await?;
    assert_eq!(pending.len(), 1);

    h.mailer.set_failing(false);
    let activated = seed_account(&mut conn, &h.ctx, "carol").await?;
    let ids: Vec<i32> = pending.iter().map(|a| a.id).chain([activated.id, 999]).collect();
    let sent = accounts::resend_activation(&mut conn, &h.ctx, &ids).await?;
    assert_eq!(sent, 1);
    assert_eq!(h.mailer.sent().len(), 1);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn only_activated_accounts_sign_in() -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;
    seed_pending_account(&mut conn, &h.ctx, "alice").await?;

    assert!(accounts::authenticate(&mut conn, "alice", PASSWORD).await?.is_none());

    let token = h.ctx.signer().sign("alice");
    accounts::activate(&mut conn, &h.ctx, &token).await?;
    assert!(accounts::authenticate(&mut conn, "alice", "wrong-pass").await?.is_none());
    let signed_in = accounts::authenticate(&mut conn, "alice", PASSWORD)
        .await?
        .expect("credentials accepted");
    assert!(signed_in.last_login.is_some());
    assert_eq!(accounts::list_activated(&mut conn).await?.len(), 1);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn password_change_requires_old_password() -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;
    let alice = seed_account(&mut conn, &h.ctx, "alice").await?;

    let err = accounts::change_password(&mut conn, &h.ctx, alice.id, "nope", "n3w-secret", "n3w-secret")
        .await
        .expect_err("old password wrong");
    assert!(err.validation().is_some_and(|e| e.has_field("old_password")));

    accounts::change_password(&mut conn, &h.ctx, alice.id, PASSWORD, "n3w-secret", "n3w-secret").await?;
    assert!(accounts::authenticate(&mut conn, "alice", PASSWORD).await?.is_none());
    assert!(accounts::authenticate(&mut conn, "alice", "n3w-secret").await?.is_some());
    Ok(())
}

#[rstest]
#[tokio::test]
async fn profile_update_toggles_notifications() -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;
    let alice = seed_account(&mut conn, &h.ctx, "alice").await?;
    assert!(alice.subscribe_to_notifications);

    let updated = accounts::update_profile(
        &mut conn,
        alice.id,
        &accounts::ProfileUpdate {
            username: "alice".into(),
            email: "alice@example.org".into(),
            first_name: "Alice".into(),
            last_name: String::new(),
            subscribe_to_notifications: false,
        },
    )
    .await?;
    assert_eq!(updated.email, "alice@example.org");
    assert!(!updated.subscribe_to_notifications);

    let err = accounts::update_profile(&mut conn, 999, &accounts::ProfileUpdate {
        username: "ghost".into(),
        email: "ghost@example.org".into(),
        ..accounts::ProfileUpdate::default()
    })
    .await
    .expect_err("unknown account");
    assert!(matches!(err, ServiceError::NotFound { .. }));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn deleting_an_account_removes_its_articles_and_files() -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;
    let (_, world) = seed_rubrics(&mut conn).await?;
    let author = seed_account(&mut conn, &h.ctx, "author").await?;
    let reader = seed_account(&mut conn, &h.ctx, "reader").await?;

    let mut files = Vec::new();
    for n in 0..2 {
        let article = articles::create_article(
            &mut conn,
            &h.ctx,
            &author,
            &draft(world.id, &format!("Story {n}")),
            Some(&Upload::new("hero.png", fake_image(640, 480))),
        )
        .await?;
        files.extend(article.image.clone());
        let extra = articles::add_additional_image(
            &mut conn,
            &h.ctx,
            &author,
            article.id,
            &Upload::new("extra.png", fake_image(10, 10)),
            "caption",
        )
        .await?;
        files.push(extra.image);
        for _ in 0..3 {
            comments::submit_as_authenticated(&mut conn, &h.ctx, article.id, &reader, "Nice").await?;
        }
    }
    let survivor = seed_article(&mut conn, &h.ctx, &reader, world.id, "Reader's own").await?;
    comments::submit_as_guest(
        &mut conn,
        &h.ctx,
        survivor.id,
        "guest",
        "Hello",
        &ScriptedChallenge(true),
        "any",
    )
    .await?;
    assert!(files.iter().all(|f| h.media().exists(f)));

    let report = accounts::delete_account(&mut conn, &h.ctx, author.id).await?;
    assert_eq!(report.accounts, 1);
    assert_eq!(report.articles, 2);
    assert_eq!(report.additional_images, 2);
    assert_eq!(report.comments, 6);
    assert!(files.iter().all(|f| !h.media().exists(f)));

    assert!(db::get_account(&mut conn, author.id).await?.is_none());
    assert_eq!(db::count_comments(&mut conn, survivor.id).await?, 1);
    assert!(db::get_account(&mut conn, reader.id).await?.is_some());

    let err = accounts::delete_account(&mut conn, &h.ctx, author.id)
        .await
        .expect_err("already gone");
    assert!(matches!(err, ServiceError::NotFound { entity: "account" }));
    Ok(())
}
