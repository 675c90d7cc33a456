//! Outcome interpretation.
//!
//! A [`Response`] is built in a fixed order: the success predicate runs first,
//! then either the error mapper (failure) or the body parser (success). A value
//! of this type therefore always holds a successful, parsed outcome.

use std::fmt;
use std::sync::Arc;

use crate::codec::FlatParams;
use crate::connection::{Headers, RawOutcome};
use crate::error::{ProviderError, Result};
use crate::traits::{ErrorContext, ErrorMapper};
use crate::utils::log_sanitizer::truncate_for_log;
use crate::xml::XmlDocument;

/// HTTP statuses accepted by default.
pub const DEFAULT_SUCCESS_CODES: &[i32] = &[200, 201, 202, 204];

/// Which statuses count as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessRule {
    /// Process backends: exit code 0.
    ExitCodeZero,
    /// HTTP backends: status in the set.
    StatusIn(Vec<i32>),
}

impl SuccessRule {
    /// `StatusIn` [`DEFAULT_SUCCESS_CODES`].
    pub fn http_default() -> Self {
        Self::StatusIn(DEFAULT_SUCCESS_CODES.to_vec())
    }

    pub fn is_success(&self, status: i32) -> bool {
        match self {
            Self::ExitCodeZero => status == 0,
            Self::StatusIn(codes) => codes.contains(&status),
        }
    }
}

/// Expected encoding of successful bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyFormat {
    /// Kept as text.
    Raw,
    Json,
    /// Paths are resolved in `namespace` when set.
    Xml { namespace: Option<String> },
    /// `key=value&...` form encoding.
    FlatQuery,
}

/// A successful body after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    /// The body was empty, whatever the format.
    Empty,
    Text(String),
    Json(serde_json::Value),
    Xml(XmlDocument),
    Flat(FlatParams),
}

impl ParsedBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_xml(&self) -> Option<&XmlDocument> {
        match self {
            Self::Xml(document) => Some(document),
            _ => None,
        }
    }

    pub fn as_flat(&self) -> Option<&FlatParams> {
        match self {
            Self::Flat(params) => Some(params),
            _ => None,
        }
    }
}

/// Per-backend interpretation rules.
#[derive(Clone)]
pub struct ResponseRules {
    pub provider: &'static str,
    pub success: SuccessRule,
    pub body_format: BodyFormat,
    pub error_mapper: Arc<dyn ErrorMapper>,
}

impl fmt::Debug for ResponseRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseRules")
            .field("provider", &self.provider)
            .field("success", &self.success)
            .field("body_format", &self.body_format)
            .finish_non_exhaustive()
    }
}

impl ResponseRules {
    /// Exit code 0, raw text, generic errors.
    pub fn process(provider: &'static str) -> Self {
        Self {
            provider,
            success: SuccessRule::ExitCodeZero,
            body_format: BodyFormat::Raw,
            error_mapper: Arc::new(GenericErrorMapper::new(provider)),
        }
    }

    /// Default HTTP statuses, given format, status-based errors.
    pub fn http(provider: &'static str, body_format: BodyFormat) -> Self {
        Self {
            provider,
            success: SuccessRule::http_default(),
            body_format,
            error_mapper: Arc::new(StatusErrorMapper::new(provider)),
        }
    }

    #[must_use]
    pub fn with_success(mut self, success: SuccessRule) -> Self {
        self.success = success;
        self
    }

    #[must_use]
    pub fn with_error_mapper(mut self, error_mapper: Arc<dyn ErrorMapper>) -> Self {
        self.error_mapper = error_mapper;
        self
    }
}

/// A successful, parsed outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: i32,
    headers: Headers,
    body: ParsedBody,
}

impl Response {
    /// Runs the construction protocol: success check, then error mapping or body parsing.
    pub fn new(outcome: RawOutcome, rules: &ResponseRules, context: &ErrorContext) -> Result<Self> {
        if !rules.success.is_success(outcome.status) {
            let error = rules.error_mapper.map_error(&outcome, context);
            if error.is_expected() {
                log::warn!("[{}] {error}", rules.provider);
            } else {
                log::error!("[{}] {error}", rules.provider);
            }
            return Err(error);
        }

        let body = parse_body(rules.provider, &outcome.body, &rules.body_format)?;
        Ok(Self {
            status: outcome.status,
            headers: outcome.headers,
            body,
        })
    }

    pub fn status(&self) -> i32 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The parsed body.
    pub fn object(&self) -> &ParsedBody {
        &self.body
    }

    pub fn into_object(self) -> ParsedBody {
        self.body
    }
}

fn parse_body(provider: &str, body: &str, format: &BodyFormat) -> Result<ParsedBody> {
    if body.trim().is_empty() {
        return Ok(ParsedBody::Empty);
    }
    let parsed = match format {
        BodyFormat::Raw => ParsedBody::Text(body.to_string()),
        BodyFormat::Json => {
            let value = serde_json::from_str(body).map_err(|e| {
                log::error!("[{provider}] JSON parse failed: {e}");
                log::error!("[{provider}] Raw response: {}", truncate_for_log(body));
                ProviderError::ParseError {
                    provider: provider.to_string(),
                    detail: e.to_string(),
                }
            })?;
            ParsedBody::Json(value)
        }
        BodyFormat::Xml { namespace } => {
            ParsedBody::Xml(XmlDocument::parse(provider, body, namespace.as_deref())?)
        }
        BodyFormat::FlatQuery => ParsedBody::Flat(FlatParams::from_query_string(body.trim())?),
    };
    Ok(parsed)
}

// ============ Error mappers ============

/// Every failure is a [`ProviderError::ProtocolError`].
#[derive(Debug, Clone, Copy)]
pub struct GenericErrorMapper {
    provider: &'static str,
}

impl GenericErrorMapper {
    pub fn new(provider: &'static str) -> Self {
        Self { provider }
    }
}

impl ErrorMapper for GenericErrorMapper {
    fn provider_name(&self) -> &'static str {
        self.provider
    }

    fn map_error(&self, outcome: &RawOutcome, _context: &ErrorContext) -> ProviderError {
        self.protocol_error(outcome)
    }
}

/// 401/403 are authentication failures, 404 is a missing resource.
#[derive(Debug, Clone, Copy)]
pub struct StatusErrorMapper {
    provider: &'static str,
}

impl StatusErrorMapper {
    pub fn new(provider: &'static str) -> Self {
        Self { provider }
    }
}

impl ErrorMapper for StatusErrorMapper {
    fn provider_name(&self) -> &'static str {
        self.provider
    }

    fn map_error(&self, outcome: &RawOutcome, context: &ErrorContext) -> ProviderError {
        let message = Some(outcome.body.trim().to_string()).filter(|m| !m.is_empty());
        match outcome.status {
            401 | 403 => self.authentication_error(message),
            404 => self.not_found_error(context, message),
            _ => self.protocol_error(outcome),
        }
    }
}
