use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::log_sanitizer::truncate_for_log;

/// Unified error type for every wire-layer operation.
///
/// Each backend-facing variant carries a `provider` field naming the backend that
/// produced it. Codec failures carry the offending key instead, since the codec is
/// not tied to a backend. All variants are serializable for structured reporting.
///
/// Nothing in this crate retries. [`TransportError`](Self::TransportError) is the
/// only variant a caller may reasonably retry, and doing so is the caller's call.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ProviderError {
    /// The channel could not be created, executed, or timed out.
    ///
    /// Raised for a missing executable, a refused connection, or an expired deadline.
    /// A transport failure never produces a fabricated status code.
    #[error("[{provider}] Transport error: {detail}")]
    TransportError {
        /// Provider that produced the error.
        provider: String,
        /// Error details.
        detail: String,
    },

    /// Credentials were rejected by the backend or the auth-token exchange failed.
    #[error("[{provider}] Authentication failed{}", message_suffix(.raw_message))]
    AuthenticationError {
        /// Provider that produced the error.
        provider: String,
        /// Original error message from the backend, if available.
        raw_message: Option<String>,
    },

    /// A flat parameter key does not match the expected dotted shape, or one
    /// struct index received the same field twice.
    #[error("Malformed key '{key}': {detail}")]
    MalformedKey {
        /// The offending key (or key prefix).
        key: String,
        /// What is wrong with it.
        detail: String,
    },

    /// The success predicate rejected the outcome and no more specific error applied.
    #[error("[{provider}] Unexpected response (status {status}): {}", output_summary(.body, .diagnostic))]
    ProtocolError {
        /// Provider that produced the error.
        provider: String,
        /// HTTP status or process exit code.
        status: i32,
        /// Raw response body (or captured stdout).
        body: String,
        /// Diagnostic stream (captured stderr), empty for HTTP backends.
        diagnostic: String,
    },

    /// The backend reports no resource matching the requested id.
    #[error("[{provider}] Resource '{resource_id}' not found")]
    ResourceNotFound {
        /// Provider that produced the error.
        provider: String,
        /// Id of the resource that was not found.
        resource_id: String,
        /// Original error message from the backend, if available.
        raw_message: Option<String>,
    },

    /// A resource with the same identifier already exists.
    #[error("[{provider}] Resource '{resource_name}' already exists")]
    ResourceExists {
        /// Provider that produced the error.
        provider: String,
        /// Name of the conflicting resource.
        resource_name: String,
        /// Original error message from the backend, if available.
        raw_message: Option<String>,
    },

    /// A request parameter is invalid before anything was sent.
    #[error("[{provider}] Invalid parameter '{param}': {detail}")]
    InvalidParameter {
        /// Provider that produced the error.
        provider: String,
        /// Name of the invalid parameter.
        param: String,
        /// Description of what's wrong.
        detail: String,
    },

    /// A successful response body could not be decoded into the expected shape.
    #[error("[{provider}] Parse error: {detail}")]
    ParseError {
        /// Provider that produced the error.
        provider: String,
        /// Details about the parse failure.
        detail: String,
    },

    /// Failed to serialize a request body.
    #[error("[{provider}] Serialization error: {detail}")]
    SerializationError {
        /// Provider that produced the error.
        provider: String,
        /// Details about the serialization failure.
        detail: String,
    },
}

impl ProviderError {
    /// Whether the error stems from caller input or remote state rather than a fault.
    ///
    /// `true` means log at `warn`, `false` at `error`.
    /// **Keep in sync when adding variants.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationError { .. }
                | Self::MalformedKey { .. }
                | Self::ResourceNotFound { .. }
                | Self::ResourceExists { .. }
                | Self::InvalidParameter { .. }
        )
    }

    pub(crate) fn malformed_key(key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedKey {
            key: key.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn transport(provider: &str, detail: impl ToString) -> Self {
        Self::TransportError {
            provider: provider.to_string(),
            detail: detail.to_string(),
        }
    }
}

#[allow(clippy::ref_option)]
fn message_suffix(raw_message: &Option<String>) -> String {
    raw_message
        .as_deref()
        .map(|msg| format!(": {msg}"))
        .unwrap_or_default()
}

fn output_summary(body: &str, diagnostic: &str) -> String {
    let joined = match (body.trim().is_empty(), diagnostic.trim().is_empty()) {
        (true, true) => return "<empty body>".to_string(),
        (false, true) => body.trim().to_string(),
        (true, false) => diagnostic.trim().to_string(),
        (false, false) => format!("{} {}", body.trim(), diagnostic.trim()),
    };
    truncate_for_log(&joined)
}

/// Convenience type alias for `Result<T, ProviderError>`.
pub type Result<T> = std::result::Result<T, ProviderError>;
