//! Integration tests for the two-level rubric tree.

use gazette::{ServiceError, models::RubricKind, rubrics};
use rstest::rstest;
use test_util::{AnyError, Harness, migrated_connection, seed_account, seed_article, seed_rubrics};

#[rstest]
#[tokio::test]
async fn sub_rubrics_need_a_super_parent() -> Result<(), AnyError> {
    let mut conn = migrated_connection().await?;
    let (news, world) = seed_rubrics(&mut conn).await?;
    assert_eq!(world.kind(), RubricKind::Sub { parent_id: news.id });

    for parent in [world.id, 999] {
        let err = rubrics::create_sub_rubric(&mut conn, "Nested", 1, parent)
            .await
            .expect_err("parent must be a super rubric");
        assert!(err.validation().is_some_and(|e| e.has_field("super_rubric")));
    }
    Ok(())
}

#[rstest]
#[case::empty("")]
#[case::too_long("abcdefghijklmnopqrstu")]
#[case::taken("News")]
#[tokio::test]
async fn rubric_names_are_validated(#[case] name: &str) -> Result<(), AnyError> {
    let mut conn = migrated_connection().await?;
    seed_rubrics(&mut conn).await?;
    let err = rubrics::create_super_rubric(&mut conn, name, 5)
        .await
        .expect_err("name rejected");
    assert!(err.validation().is_some_and(|e| e.has_field("name")), "{err}");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn listings_are_ordered_and_labelled() -> Result<(), AnyError> {
    let mut conn = migrated_connection().await?;
    let sport = rubrics::create_super_rubric(&mut conn, "Sport", 2).await?;
    let arts = rubrics::create_super_rubric(&mut conn, "Arts", 1).await?;
    rubrics::create_sub_rubric(&mut conn, "Tennis", 2, sport.id).await?;
    rubrics::create_sub_rubric(&mut conn, "Chess", 1, sport.id).await?;
    let film = rubrics::create_sub_rubric(&mut conn, "Film", 3, arts.id).await?;

    let supers: Vec<_> = rubrics::list_super_rubrics(&mut conn)
        .await?
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(supers, ["Arts", "Sport"]);

    let labels: Vec<_> = rubrics::list_sub_rubrics(&mut conn, None)
        .await?
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(labels, ["Arts - Film", "Sport - Chess", "Sport - Tennis"]);
    assert_eq!(rubrics::list_sub_rubrics(&mut conn, Some(sport.id)).await?.len(), 2);

    let renamed = rubrics::update_rubric(&mut conn, film.id, "Cinema", 0).await?;
    assert_eq!(renamed.order, 0);
    assert_eq!(rubrics::get_sub_rubric(&mut conn, film.id).await?.to_string(), "Arts - Cinema");

    let err = rubrics::get_sub_rubric(&mut conn, arts.id)
        .await
        .expect_err("super rubric");
    assert!(matches!(err, ServiceError::NotFound { .. }));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn referenced_rubrics_cannot_be_deleted() -> Result<(), AnyError> {
    let h = Harness::new()?;
    let mut conn = migrated_connection().await?;
    let (news, world) = seed_rubrics(&mut conn).await?;
    let author = seed_account(&mut conn, &h.ctx, "author").await?;
    let article = seed_article(&mut conn, &h.ctx, &author, world.id, "Pinned").await?;

    let err = rubrics::delete_rubric(&mut conn, news.id)
        .await
        .expect_err("has a sub rubric");
    assert!(matches!(err, ServiceError::ReferentialIntegrity { entity: "rubric", .. }));
    let err = rubrics::delete_rubric(&mut conn, world.id)
        .await
        .expect_err("has an article");
    assert!(err.to_string().contains("1 article(s)"), "{err}");

    gazette::articles::delete_article(&mut conn, &h.ctx, &author, article.id).await?;
    rubrics::delete_rubric(&mut conn, world.id).await?;
    rubrics::delete_rubric(&mut conn, news.id).await?;
    assert!(rubrics::list_super_rubrics(&mut conn).await?.is_empty());

    let err = rubrics::delete_rubric(&mut conn, news.id)
        .await
        .expect_err("already gone");
    assert!(matches!(err, ServiceError::NotFound { .. }));
    Ok(())
}
