use serde_json::Value;
use thiserror::Error;

use crate::models::ProviderId;

/// Everything that can go wrong between accepting a user message and
/// appending the assistant reply. The variants are deliberately
/// distinguishable so the caller can render different guidance.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No API key configured for the resolved provider. Detected locally,
    /// before any network call.
    #[error("No API key configured for {}", .0.display_name())]
    MissingCredential(ProviderId),

    /// The model identifier maps to no known provider. Also detected
    /// before any network call.
    #[error("Model '{0}' does not map to a known provider")]
    UnsupportedProvider(String),

    /// The provider answered with a non-success status. Carries the
    /// provider's own error message when the body was parseable.
    #[error("Provider request failed: {message}")]
    Provider { status: u16, message: String },

    /// Connection-level failure before any provider response arrived.
    #[error("Network error: {0}")]
    Transport(String),

    /// Success status but the expected reply field was absent.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

/// A fully built provider request: endpoint, headers (including
/// authentication) and JSON body.
#[derive(Clone)]
pub struct WireRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

impl std::fmt::Debug for WireRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Header values carry API keys; log names only.
        let header_names: Vec<&str> = self.headers.iter().map(|(name, _)| *name).collect();
        f.debug_struct("WireRequest")
            .field("url", &self.url)
            .field("headers", &header_names)
            .field("body", &self.body)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    pub body: Value,
}

impl WireResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
