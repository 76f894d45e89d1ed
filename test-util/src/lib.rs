//! Utilities for integration tests.
//!
//! The `test-util` crate provides a migrated database connection, a
//! [`Harness`] bundling a service [`Context`] wired to in-memory fakes, and
//! seed helpers for the rows most tests start from. It is used by the
//! integration tests in the main crate.

pub mod fixtures;

use std::sync::{
    Arc,
    Mutex,
    PoisonError,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use camino::Utf8Path;
#[cfg(feature = "sqlite")]
use diesel_async::AsyncConnection;
pub use fixtures::{
    draft,
    seed_account,
    seed_article,
    seed_pending_account,
    seed_rubrics,
};
use gazette::{
    Context,
    challenge::ChallengeVerifier,
    db::{DbConnection, apply_migrations},
    mail::{MailError, Mailer, OutgoingMail},
    media::{ImageCodec, ImageFormat, ImageInfo, MediaError, MediaStore},
    notify::Notifier,
    passwords::{HashCosts, argon2_with_costs},
    signing::HmacSigner,
};
use tempfile::TempDir;

/// Error type returned by helpers and tests.
pub type AnyError = anyhow::Error;

/// Base URL the notifier links back to in tests.
pub const BASE_URL: &str = "http://testserver";
/// Signing secret shared by every [`Harness`].
pub const SECRET: &[u8] = b"test-secret";

/// Open a fresh, migrated in-memory `SQLite` database.
///
/// # Errors
/// Returns an error if the connection cannot be opened or migrated.
#[cfg(feature = "sqlite")]
pub async fn migrated_connection() -> Result<DbConnection, AnyError> {
    let mut conn = DbConnection::establish(":memory:").await?;
    apply_migrations(&mut conn, "").await?;
    Ok(conn)
}

/// Connect to the database named by `GAZETTE_TEST_DATABASE_URL` and migrate
/// it.
///
/// # Errors
/// Returns an error if the variable is unset or the database cannot be
/// reached or migrated.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub async fn migrated_connection() -> Result<DbConnection, AnyError> {
    use diesel_async::AsyncConnection;
    let url = std::env::var("GAZETTE_TEST_DATABASE_URL")?;
    let mut conn = DbConnection::establish(&url).await?;
    apply_migrations(&mut conn, &url).await?;
    Ok(conn)
}

/// [`Mailer`] that keeps every letter in memory.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    /// Letters delivered so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make subsequent deliveries fail (or succeed again).
    pub fn set_failing(&self, failing: bool) { self.failing.store(failing, Ordering::SeqCst); }

    /// Forget every recorded letter.
    pub fn clear(&self) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Rejected("recording mailer set to fail".into()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(mail.clone());
        Ok(())
    }
}

/// Challenge whose verdict is fixed up front.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedChallenge(pub bool);

impl ChallengeVerifier for ScriptedChallenge {
    fn verify(&self, _response: &str) -> bool { self.0 }
}

const FAKE_MAGIC: &[u8; 4] = b"FAKE";

/// Encode a placeholder image understood by [`FakeCodec`].
#[must_use]
pub fn fake_image(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = FAKE_MAGIC.to_vec();
    bytes.extend_from_slice(&width.to_le_bytes());
    bytes.extend_from_slice(&height.to_le_bytes());
    bytes
}

/// [`ImageCodec`] over [`fake_image`] payloads, so tests can use huge
/// dimensions without decoding pixels.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeCodec;

impl ImageCodec for FakeCodec {
    fn decode(&self, bytes: &[u8]) -> Result<ImageInfo, MediaError> {
        let (magic, rest) = bytes.split_at_checked(4).ok_or(MediaError::UnknownFormat)?;
        if magic != FAKE_MAGIC {
            return Err(MediaError::UnknownFormat);
        }
        let (w, h) = rest.split_at_checked(4).ok_or(MediaError::UnknownFormat)?;
        let width = u32::from_le_bytes(w.try_into().map_err(|_| MediaError::UnknownFormat)?);
        let height = u32::from_le_bytes(h.try_into().map_err(|_| MediaError::UnknownFormat)?);
        Ok(ImageInfo {
            width,
            height,
            format: ImageFormat::Png,
        })
    }

    fn resize(&self, bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>, MediaError> {
        self.decode(bytes)?;
        Ok(fake_image(width, height))
    }
}

/// A service [`Context`] backed by a temporary media directory, cheap
/// password hashing, a [`RecordingMailer`] and a [`FakeCodec`].
pub struct Harness {
    pub ctx: Context,
    pub mailer: Arc<RecordingMailer>,
    _media_dir: TempDir,
}

impl Harness {
    /// Build a harness with a fresh media directory.
    ///
    /// # Errors
    /// Returns an error if the media directory cannot be created.
    pub fn new() -> Result<Self, AnyError> { Self::with_codec(Arc::new(FakeCodec)) }

    /// Build a harness around a specific image codec.
    ///
    /// # Errors
    /// Returns an error if the media directory cannot be created.
    pub fn with_codec(codec: Arc<dyn ImageCodec>) -> Result<Self, AnyError> {
        let media_dir = TempDir::new()?;
        let root = Utf8Path::from_path(media_dir.path())
            .ok_or_else(|| anyhow::anyhow!("temporary directory is not UTF-8"))?;
        let media = MediaStore::open(root)?;
        let mailer = Arc::new(RecordingMailer::default());
        let argon2 = argon2_with_costs(HashCosts {
            m_cost: 1024,
            t_cost: 1,
            p_cost: 1,
        })
        .map_err(|e| anyhow::anyhow!("argon2 params: {e}"))?;
        let notifier = Notifier::new(mailer.clone(), Arc::new(HmacSigner::new(SECRET)), BASE_URL)?;
        let ctx = Context::new(Arc::new(argon2), Arc::new(notifier), codec, Arc::new(media));
        Ok(Self {
            ctx,
            mailer,
            _media_dir: media_dir,
        })
    }

    /// Media store the harness writes uploads to.
    #[must_use]
    pub fn media(&self) -> &MediaStore { &self.ctx.media }
}
