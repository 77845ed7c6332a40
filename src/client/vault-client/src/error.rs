//! Client error types.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while talking to Vault.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The request payload could not be encoded as JSON.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// The query parameters could not be URL-encoded.
    #[error("query encode error: {0}")]
    Query(#[from] serde_urlencoded::ser::Error),

    /// Vault answered with a non-success status.
    #[error("vault returned {status}: {}", describe(.errors, .body))]
    Http {
        /// HTTP status code.
        status: StatusCode,
        /// Messages from the `errors` array of the response body, if any.
        errors: Vec<String>,
        /// Raw response body.
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown transit key type name.
    #[error("invalid key type: {0}")]
    InvalidKeyType(String),

    /// Unknown hash algorithm name.
    #[error("invalid hash algorithm: {0}")]
    InvalidHashAlgorithm(String),
}

/// Shorthand for results returned by this crate.
pub type Result<T> = std::result::Result<T, VaultError>;

impl VaultError {
    /// Builds an HTTP error from a status and the raw body Vault sent back.
    pub(crate) fn from_response(status: StatusCode, body: String) -> Self {
        let errors = serde_json::from_str::<ErrorBody>(&body)
            .map(|parsed| parsed.errors)
            .unwrap_or_default();
        Self::Http {
            status,
            errors,
            body,
        }
    }

    /// Returns the HTTP status, if the error came from a Vault response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            _ => None,
        }
    }

    /// True when Vault answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// True for Vault's empty-listing answer: a 404 whose `errors` array is
    /// empty. A 404 naming an error (e.g. an unmounted route) is not one.
    pub fn is_empty_listing(&self) -> bool {
        matches!(
            self,
            Self::Http { status, errors, .. }
                if *status == StatusCode::NOT_FOUND && errors.is_empty()
        )
    }

    /// True when the request timed out before a response arrived.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }
}

/// Vault error bodies look like `{"errors": ["permission denied"]}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

fn describe(errors: &[String], body: &str) -> String {
    if !errors.is_empty() {
        return errors.join("; ");
    }
    let body = body.trim();
    if body.is_empty() {
        "(empty body)".to_string()
    } else {
        body.to_string()
    }
}
