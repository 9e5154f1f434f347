//! Provider-layer error types.

use std::time::Duration;

/// Errors from a single provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request never got a usable response (network, DNS, TLS).
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The call exceeded its deadline.
    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    /// The provider reported quota or rate-limit exhaustion (HTTP 429).
    /// Retrying soon will not help; callers back off for an extended
    /// period.
    #[error("Provider quota exceeded")]
    QuotaExceeded,

    /// The provider answered but the payload could not be parsed or
    /// failed structural validation.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// The provider rejected the request with a non-2xx status.
    #[error("Provider rejected the request ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ProviderError {
    /// Whether this failure indicates quota exhaustion.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded)
    }
}
