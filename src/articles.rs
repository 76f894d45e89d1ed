//! Article authoring, listing and removal.
//!
//! Articles live in sub rubrics only. Hero images are fitted within
//! [`HERO_IMAGE_MAX_SIDE`](crate::media::HERO_IMAGE_MAX_SIDE) pixels before
//! they are written to the media directory; additional images are stored as
//! uploaded. File removal always happens after the owning rows are gone.

use chrono::Utc;
use tracing::{debug, info};

use crate::{
    context::Context,
    db::{self, DbConnection, DeletionReport},
    error::{ServiceError, ValidationErrors},
    media::{Upload, prepare_hero_image},
    models::{
        Account,
        AdditionalImage,
        Article,
        ArticleChanges,
        Comment,
        NewAdditionalImage,
        NewArticle,
        Rubric,
        RubricKind,
    },
    paging::{ARTICLES_PER_PAGE, Page},
    validation::{CAPTION_MAX, TITLE_MAX, check_characters, check_max_chars, check_required},
};

/// Text fields of an article as submitted by its author.
#[derive(Debug, Clone)]
pub struct ArticleDraft {
    pub rubric_id: i32,
    pub title: String,
    pub content: String,
    pub source: String,
    pub characters: String,
    pub is_active: bool,
}

/// What to do with the hero image when editing an article.
#[derive(Debug, Clone, Default)]
pub enum ImageChange {
    #[default]
    Keep,
    Replace(Upload),
    Clear,
}

/// Everything shown on an article page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDetail {
    pub article: Article,
    pub rubric: Rubric,
    pub images: Vec<AdditionalImage>,
    pub comments: Vec<Comment>,
}

async fn validate_draft(conn: &mut DbConnection, draft: &ArticleDraft) -> Result<(), ServiceError> {
    let mut errors = ValidationErrors::new();
    if check_required(&mut errors, "title", &draft.title) {
        check_max_chars(&mut errors, "title", &draft.title, TITLE_MAX);
    }
    check_required(&mut errors, "content", &draft.content);
    check_required(&mut errors, "source", &draft.source);
    check_characters(&mut errors, &draft.characters);
    let rubric = db::get_rubric(conn, draft.rubric_id).await?;
    if !matches!(rubric.map(|r| r.kind()), Some(RubricKind::Sub { .. })) {
        errors.add(
            "rubric",
            "Select a valid choice. That choice is not one of the available choices.",
        );
    }
    Ok(errors.into_result()?)
}

fn ensure_may_edit(actor: &Account, article: &Article) -> Result<(), ServiceError> {
    if actor.id == article.author_id || actor.is_staff {
        return Ok(());
    }
    Err(ServiceError::PermissionDenied {
        actor: actor.username.clone(),
        entity: "article",
        id: article.id,
    })
}

async fn owned_article(
    conn: &mut DbConnection,
    actor: &Account,
    article_id: i32,
) -> Result<Article, ServiceError> {
    let article = db::get_article(conn, article_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("article"))?;
    ensure_may_edit(actor, &article)?;
    Ok(article)
}

fn store_hero(ctx: &Context, upload: &Upload) -> Result<String, ServiceError> {
    let fitted = prepare_hero_image(ctx.codec.as_ref(), &upload.bytes)?;
    Ok(ctx.media.save(&upload.file_name, &fitted)?)
}

/// Publish a new article written by `author`.
///
/// # Errors
/// Returns [`ServiceError::Validation`] for rejected fields (a malformed
/// `characters` value or a rubric that is not a sub rubric among them),
/// [`ServiceError::Media`] when the image cannot be processed, or any
/// database error.
#[must_use = "handle the result"]
pub async fn create_article(
    conn: &mut DbConnection,
    ctx: &Context,
    author: &Account,
    draft: &ArticleDraft,
    image: Option<&Upload>,
) -> Result<Article, ServiceError> {
    validate_draft(conn, draft).await?;
    let stored = image.map(|upload| store_hero(ctx, upload)).transpose()?;
    let new = NewArticle {
        rubric_id: draft.rubric_id,
        title: &draft.title,
        content: &draft.content,
        source: &draft.source,
        characters: &draft.characters,
        image: stored.as_deref(),
        author_id: author.id,
        is_active: draft.is_active,
        created_at: Utc::now().naive_utc(),
    };
    match db::create_article(conn, &new).await {
        Ok(article) => {
            info!(article = article.id, author = %author.username, "article created");
            Ok(article)
        }
        Err(e) => {
            ctx.discard_files(&stored);
            Err(e.into())
        }
    }
}

/// Edit an article. Only its author or a staff account may do so.
///
/// A replaced or cleared hero image is removed from disk once the update has
/// been stored.
///
/// # Errors
/// Returns [`ServiceError::NotFound`], [`ServiceError::PermissionDenied`],
/// [`ServiceError::Validation`], [`ServiceError::Media`] or any database
/// error.
#[must_use = "handle the result"]
pub async fn update_article(
    conn: &mut DbConnection,
    ctx: &Context,
    actor: &Account,
    article_id: i32,
    draft: &ArticleDraft,
    image: &ImageChange,
) -> Result<Article, ServiceError> {
    let current = owned_article(conn, actor, article_id).await?;
    validate_draft(conn, draft).await?;
    let stored = match image {
        ImageChange::Replace(upload) => Some(store_hero(ctx, upload)?),
        ImageChange::Keep | ImageChange::Clear => None,
    };
    let image_column = match image {
        ImageChange::Keep => None,
        ImageChange::Replace(_) => Some(stored.as_deref()),
        ImageChange::Clear => Some(None),
    };
    let changes = ArticleChanges {
        rubric_id: draft.rubric_id,
        title: &draft.title,
        content: &draft.content,
        source: &draft.source,
        characters: &draft.characters,
        image: image_column,
        is_active: draft.is_active,
    };
    match db::update_article(conn, article_id, &changes).await {
        Ok(article) => {
            if !matches!(image, ImageChange::Keep) {
                ctx.discard_files(&current.image);
            }
            info!(article = article.id, actor = %actor.username, "article updated");
            Ok(article)
        }
        Err(e) => {
            ctx.discard_files(&stored);
            Err(e.into())
        }
    }
}

/// Delete an article, its additional images and its comments.
///
/// # Errors
/// Returns [`ServiceError::NotFound`], [`ServiceError::PermissionDenied`] or
/// any database error.
#[must_use = "handle the result"]
pub async fn delete_article(
    conn: &mut DbConnection,
    ctx: &Context,
    actor: &Account,
    article_id: i32,
) -> Result<DeletionReport, ServiceError> {
    owned_article(conn, actor, article_id).await?;
    let report = db::delete_article_cascade(conn, article_id).await?;
    ctx.discard_files(&report.orphaned_files);
    info!(
        article_id,
        actor = %actor.username,
        images = report.additional_images,
        comments = report.comments,
        "article deleted"
    );
    Ok(report)
}

/// Visible articles, newest first, optionally capped at `limit`.
///
/// # Errors
/// Returns any database error.
#[must_use = "handle the result"]
pub async fn list_active(conn: &mut DbConnection, limit: Option<i64>) -> Result<Vec<Article>, ServiceError> {
    Ok(db::list_active(conn, limit).await?)
}

/// One page of a sub rubric's visible articles, optionally narrowed to those
/// whose title or content contains `keyword` regardless of case.
///
/// Pages hold [`ARTICLES_PER_PAGE`] articles. Page numbers outside the
/// available range are clamped to the first or last page.
///
/// # Errors
/// Returns [`ServiceError::NotFound`] when `rubric_id` is not a sub rubric,
/// or any database error.
#[must_use = "handle the result"]
pub async fn list_by_rubric(
    conn: &mut DbConnection,
    rubric_id: i32,
    keyword: Option<&str>,
    page: i64,
) -> Result<Page<Article>, ServiceError> {
    if db::get_sub_rubric(conn, rubric_id).await?.is_none() {
        return Err(ServiceError::not_found("sub rubric"));
    }
    let page = db::list_by_rubric(conn, rubric_id, keyword, page, ARTICLES_PER_PAGE).await?;
    debug!(
        rubric_id,
        keyword = ?keyword,
        page = page.number,
        of = page.num_pages,
        total = page.total,
        "rubric listing"
    );
    Ok(page)
}

/// Every article written by `author_id`, hidden ones included.
///
/// # Errors
/// Returns any database error.
#[must_use = "handle the result"]
pub async fn list_by_author(conn: &mut DbConnection, author_id: i32) -> Result<Vec<Article>, ServiceError> {
    Ok(db::list_by_author(conn, author_id).await?)
}

/// Load an article with its rubric, additional images and visible comments.
///
/// # Errors
/// Returns [`ServiceError::NotFound`] for unknown articles, or any database
/// error.
#[must_use = "handle the result"]
pub async fn get_article_detail(conn: &mut DbConnection, article_id: i32) -> Result<ArticleDetail, ServiceError> {
    let article = db::get_article(conn, article_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("article"))?;
    let rubric = db::get_rubric(conn, article.rubric_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("rubric"))?;
    let images = db::list_additional_images(conn, article.id).await?;
    let comments = db::list_active_comments(conn, article.id).await?;
    Ok(ArticleDetail {
        article,
        rubric,
        images,
        comments,
    })
}

/// Attach an extra image to an article the actor may edit.
///
/// # Errors
/// Returns [`ServiceError::Validation`] for an overlong caption,
/// [`ServiceError::NotFound`], [`ServiceError::PermissionDenied`],
/// [`ServiceError::Media`] or any database error.
#[must_use = "handle the result"]
pub async fn add_additional_image(
    conn: &mut DbConnection,
    ctx: &Context,
    actor: &Account,
    article_id: i32,
    upload: &Upload,
    caption: &str,
) -> Result<AdditionalImage, ServiceError> {
    let article = owned_article(conn, actor, article_id).await?;
    let mut errors = ValidationErrors::new();
    check_max_chars(&mut errors, "caption", caption, CAPTION_MAX);
    errors.into_result()?;

    let stored = ctx.media.save(&upload.file_name, &upload.bytes)?;
    let new = NewAdditionalImage {
        article_id: article.id,
        image: &stored,
        caption,
    };
    match db::add_additional_image(conn, &new).await {
        Ok(image) => {
            debug!(article = article.id, image = image.id, "additional image added");
            Ok(image)
        }
        Err(e) => {
            ctx.discard_files([&stored]);
            Err(e.into())
        }
    }
}

/// Detach an extra image and delete its file.
///
/// # Errors
/// Returns [`ServiceError::NotFound`], [`ServiceError::PermissionDenied`] or
/// any database error.
#[must_use = "handle the result"]
pub async fn remove_additional_image(
    conn: &mut DbConnection,
    ctx: &Context,
    actor: &Account,
    image_id: i32,
) -> Result<(), ServiceError> {
    let image = db::get_additional_image(conn, image_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("additional image"))?;
    owned_article(conn, actor, image.article_id).await?;
    db::delete_additional_image(conn, image.id).await?;
    ctx.discard_files([&image.image]);
    debug!(article = image.article_id, image = image.id, "additional image removed");
    Ok(())
}
