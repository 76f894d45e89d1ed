//! Letters sent when an account registers or an article receives a comment.
//!
//! Both hooks are called inline by the service that caused the event, after
//! the triggering row has been stored. Delivery errors are returned to that
//! service, which passes them on to its caller.

use std::sync::Arc;

use serde::Serialize;
use tera::{Context as TeraContext, Tera};
use thiserror::Error;
use tracing::info;

use crate::{
    mail::{MailError, Mailer, OutgoingMail},
    models::{Account, Article, Comment},
    signing::Signer,
};

const ACTIVATION_SUBJECT: &str = "activation_letter_subject.txt";
const ACTIVATION_BODY: &str = "activation_letter_body.html";
const COMMENT_SUBJECT: &str = "new_comment_letter_subject.txt";
const COMMENT_BODY: &str = "new_comment_letter_body.html";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to render letter: {0}")]
    Render(#[from] tera::Error),
    #[error(transparent)]
    Mail(#[from] MailError),
}

#[derive(Serialize)]
struct ActivationLetter<'a> {
    username: &'a str,
    link: &'a str,
}

#[derive(Serialize)]
struct CommentLetter<'a> {
    username: &'a str,
    title: &'a str,
    link: &'a str,
    comment_author: &'a str,
    comment_content: &'a str,
}

/// Renders and sends notification letters.
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    signer: Arc<dyn Signer>,
    base_url: String,
    templates: Tera,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    /// Build a notifier linking back to `base_url`.
    ///
    /// # Errors
    /// Returns [`NotifyError::Render`] if an embedded template fails to
    /// parse.
    pub fn new(
        mailer: Arc<dyn Mailer>,
        signer: Arc<dyn Signer>,
        base_url: &str,
    ) -> Result<Self, NotifyError> {
        let mut templates = Tera::default();
        templates.add_raw_templates([
            (
                ACTIVATION_SUBJECT,
                include_str!("../templates/email/activation_letter_subject.txt"),
            ),
            (
                ACTIVATION_BODY,
                include_str!("../templates/email/activation_letter_body.html"),
            ),
            (
                COMMENT_SUBJECT,
                include_str!("../templates/email/new_comment_letter_subject.txt"),
            ),
            (
                COMMENT_BODY,
                include_str!("../templates/email/new_comment_letter_body.html"),
            ),
        ])?;
        Ok(Self {
            mailer,
            signer,
            base_url: base_url.trim_end_matches('/').to_owned(),
            templates,
        })
    }

    /// Signer used for activation tokens.
    #[must_use]
    pub fn signer(&self) -> &dyn Signer { self.signer.as_ref() }

    /// Absolute activation link for `username`.
    #[must_use]
    pub fn activation_link(&self, username: &str) -> String {
        format!(
            "{}/accounts/register/activate/{}/",
            self.base_url,
            self.signer.sign(username)
        )
    }

    /// Absolute link to an article page.
    #[must_use]
    pub fn article_link(&self, article: &Article) -> String {
        format!("{}/{}/{}/", self.base_url, article.rubric_id, article.id)
    }

    fn render(&self, subject: &str, body: &str, ctx: &TeraContext) -> Result<(String, String), NotifyError> {
        let subject = self.templates.render(subject, ctx)?;
        // Subjects must be a single line.
        let subject = subject.split_whitespace().collect::<Vec<_>>().join(" ");
        let body = self.templates.render(body, ctx)?;
        Ok((subject, body))
    }

    /// Send the activation letter to a freshly registered account.
    ///
    /// # Errors
    /// Returns [`NotifyError`] when rendering or delivery fails.
    pub async fn on_account_registered(&self, account: &Account) -> Result<(), NotifyError> {
        let link = self.activation_link(&account.username);
        let ctx = TeraContext::from_serialize(ActivationLetter {
            username: &account.username,
            link: &link,
        })?;
        let (subject, html_body) = self.render(ACTIVATION_SUBJECT, ACTIVATION_BODY, &ctx)?;
        self.mailer
            .send(&OutgoingMail {
                to: account.email.clone(),
                subject,
                html_body,
            })
            .await?;
        info!(account = %account.username, "activation letter sent");
        Ok(())
    }

    /// Tell the article's author about a new comment.
    ///
    /// Returns `false` without sending anything when the author has opted out
    /// of notifications.
    ///
    /// # Errors
    /// Returns [`NotifyError`] when rendering or delivery fails.
    pub async fn on_comment_created(
        &self,
        comment: &Comment,
        article: &Article,
        author: &Account,
    ) -> Result<bool, NotifyError> {
        if !author.subscribe_to_notifications {
            info!(
                article = article.id,
                author = %author.username,
                "author unsubscribed; comment letter skipped"
            );
            return Ok(false);
        }
        let link = self.article_link(article);
        let ctx = TeraContext::from_serialize(CommentLetter {
            username: &author.username,
            title: &article.title,
            link: &link,
            comment_author: &comment.author,
            comment_content: &comment.content,
        })?;
        let (subject, html_body) = self.render(COMMENT_SUBJECT, COMMENT_BODY, &ctx)?;
        self.mailer
            .send(&OutgoingMail {
                to: author.email.clone(),
                subject,
                html_body,
            })
            .await?;
        info!(article = article.id, comment = comment.id, "comment letter sent");
        Ok(true)
    }
}
