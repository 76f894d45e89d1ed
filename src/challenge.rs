//! Human-verification checks for guest comments.

/// Decides whether a challenge response proves a human is posting.
pub trait ChallengeVerifier: Send + Sync {
    fn verify(&self, response: &str) -> bool;
}

/// Accepts a single known answer, ignoring surrounding whitespace and ASCII
/// case. The request layer issues the challenge and builds one of these per
/// submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedResponse {
    answer: String,
}

impl ExpectedResponse {
    #[must_use]
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into().trim().to_owned(),
        }
    }
}

impl ChallengeVerifier for ExpectedResponse {
    fn verify(&self, response: &str) -> bool {
        !self.answer.is_empty() && response.trim().eq_ignore_ascii_case(&self.answer)
    }
}
