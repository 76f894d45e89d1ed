//! Stateless signed tokens.
//!
//! A token is `<value>:<signature>` where the signature is an unpadded
//! URL-safe base64 HMAC-SHA256 of the value. Verification needs only the
//! secret, so activation links can be checked without storing anything.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = ':';
const SALT: &[u8] = b"gazette.signing.HmacSigner";

/// Raised when a token is malformed or its signature does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("signature does not match")]
pub struct BadSignature;

/// Produces and checks signed tokens.
pub trait Signer: Send + Sync {
    /// Append a signature to `value`.
    fn sign(&self, value: &str) -> String;

    /// Recover the value from `token`, failing closed on any tampering.
    ///
    /// # Errors
    /// Returns [`BadSignature`] when the token is malformed or was not
    /// produced with this signer's secret.
    fn unsign(&self, token: &str) -> Result<String, BadSignature>;
}

/// HMAC-SHA256 signer keyed by a salted digest of the site secret.
#[derive(Clone)]
pub struct HmacSigner {
    key: [u8; 32],
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner").finish_non_exhaustive()
    }
}

impl HmacSigner {
    /// Derive the signing key from `secret`.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut digest = Sha256::new();
        digest.update(SALT);
        digest.update(secret);
        Self {
            key: digest.finalize().into(),
        }
    }

    fn mac(&self, value: &str) -> HmacSha256 {
        #[expect(clippy::expect_used, reason = "HMAC accepts keys of any length")]
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(value.as_bytes());
        mac
    }
}

impl Signer for HmacSigner {
    fn sign(&self, value: &str) -> String {
        let signature = self.mac(value).finalize().into_bytes();
        format!("{value}{SEPARATOR}{}", URL_SAFE_NO_PAD.encode(signature))
    }

    fn unsign(&self, token: &str) -> Result<String, BadSignature> {
        let (value, signature) = token.rsplit_once(SEPARATOR).ok_or(BadSignature)?;
        let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| BadSignature)?;
        self.mac(value)
            .verify_slice(&signature)
            .map_err(|_| BadSignature)?;
        Ok(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn signer() -> HmacSigner { HmacSigner::new(b"test-secret") }

    #[rstest]
    fn round_trips_value(signer: HmacSigner) {
        let token = signer.sign("alice");
        assert!(token.starts_with("alice:"));
        assert_eq!(signer.unsign(&token), Ok("alice".to_owned()));
    }

    #[rstest]
    fn signing_is_deterministic(signer: HmacSigner) {
        assert_eq!(signer.sign("alice"), signer.sign("alice"));
    }

    #[rstest]
    fn values_containing_separator_survive(signer: HmacSigner) {
        let token = signer.sign("a:b");
        assert_eq!(signer.unsign(&token), Ok("a:b".to_owned()));
    }

    #[rstest]
    #[case("alice")]
    #[case("")]
    #[case(":")]
    #[case("alice:!!not-base64!!")]
    fn malformed_tokens_fail(signer: HmacSigner, #[case] token: &str) {
        assert_eq!(signer.unsign(token), Err(BadSignature));
    }

    #[rstest]
    fn tampered_value_fails(signer: HmacSigner) {
        let token = signer.sign("alice");
        let forged = token.replacen("alice", "mallory", 1);
        assert_eq!(signer.unsign(&forged), Err(BadSignature));
    }

    #[rstest]
    fn tampered_signature_fails(signer: HmacSigner) {
        let mut token = signer.sign("alice");
        let last = token.pop().map_or('A', |c| if c == 'A' { 'B' } else { 'A' });
        token.push(last);
        assert_eq!(signer.unsign(&token), Err(BadSignature));
    }

    #[rstest]
    fn other_secret_fails(signer: HmacSigner) {
        let token = HmacSigner::new(b"other-secret").sign("alice");
        assert_eq!(signer.unsign(&token), Err(BadSignature));
    }
}
