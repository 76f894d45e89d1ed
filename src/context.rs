//! Shared collaborators handed to every service call.

use std::sync::Arc;

use argon2::Argon2;

use crate::{
    media::{ImageCodec, MediaStore},
    notify::Notifier,
    signing::Signer,
};

/// Long-lived dependencies of the account, article and comment services.
///
/// Built once at start-up and borrowed by each request; nothing in here
/// carries per-request state.
#[derive(Clone)]
pub struct Context {
    pub argon2: Arc<Argon2<'static>>,
    pub notifier: Arc<Notifier>,
    pub codec: Arc<dyn ImageCodec>,
    pub media: Arc<MediaStore>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("notifier", &self.notifier)
            .field("media", &self.media.root())
            .finish_non_exhaustive()
    }
}

impl Context {
    #[must_use]
    pub const fn new(
        argon2: Arc<Argon2<'static>>,
        notifier: Arc<Notifier>,
        codec: Arc<dyn ImageCodec>,
        media: Arc<MediaStore>,
    ) -> Self {
        Self {
            argon2,
            notifier,
            codec,
            media,
        }
    }

    #[must_use]
    pub fn signer(&self) -> &dyn Signer { self.notifier.signer() }

    /// Delete stored files after the rows pointing at them are gone.
    ///
    /// Failures are logged and otherwise ignored.
    pub(crate) fn discard_files<'a>(&self, names: impl IntoIterator<Item = &'a String>) {
        for name in names {
            if let Err(error) = self.media.remove(name) {
                tracing::warn!(file = %name, %error, "could not remove media file");
            }
        }
    }
}
