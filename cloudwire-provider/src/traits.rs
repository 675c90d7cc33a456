use crate::connection::RawOutcome;
use crate::error::{ProviderError, Result};
use crate::types::{CreateDatabaseRequest, Database, DriverMetadata, Size};

/// A backend error code and message pulled out of a response body (internal).
#[derive(Debug, Clone)]
pub(crate) struct RawApiError {
    /// Error code, format differs per backend.
    pub code: Option<String>,
    /// Original error message.
    pub message: String,
}

impl RawApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Identifiers of the resource a call was about, attached to mapped errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Used by `ResourceNotFound`.
    pub resource_id: Option<String>,
    /// Used by `ResourceExists`.
    pub resource_name: Option<String>,
}

impl ErrorContext {
    pub fn for_id(id: impl Into<String>) -> Self {
        Self {
            resource_id: Some(id.into()),
            resource_name: None,
        }
    }

    pub fn for_name(name: impl Into<String>) -> Self {
        Self {
            resource_id: None,
            resource_name: Some(name.into()),
        }
    }
}

/// Turns an outcome rejected by the success predicate into an error.
///
/// Each backend implements this to map its own error bodies and codes onto
/// [`ProviderError`].
pub trait ErrorMapper: Send + Sync {
    /// Backend identifier used in the produced errors.
    fn provider_name(&self) -> &'static str;

    fn map_error(&self, outcome: &RawOutcome, context: &ErrorContext) -> ProviderError;

    /// Fallback when nothing more specific applies.
    fn protocol_error(&self, outcome: &RawOutcome) -> ProviderError {
        ProviderError::ProtocolError {
            provider: self.provider_name().to_string(),
            status: outcome.status,
            body: outcome.body.clone(),
            diagnostic: outcome.diagnostic.clone(),
        }
    }

    /// Shortcut for [`ProviderError::AuthenticationError`].
    fn authentication_error(&self, raw_message: Option<String>) -> ProviderError {
        ProviderError::AuthenticationError {
            provider: self.provider_name().to_string(),
            raw_message,
        }
    }

    /// Shortcut for [`ProviderError::ResourceNotFound`].
    fn not_found_error(&self, context: &ErrorContext, raw_message: Option<String>) -> ProviderError {
        ProviderError::ResourceNotFound {
            provider: self.provider_name().to_string(),
            resource_id: context.resource_id.clone().unwrap_or_default(),
            raw_message,
        }
    }
}

/// Database driver: uniform management of database instances on one backend.
///
/// Every operation that touches the backend takes `&mut self`: a driver owns one
/// connection and runs one request at a time.
pub trait DatabaseDriver: Send {
    /// Driver identifier, e.g. `"rds"`.
    fn id(&self) -> &'static str;

    /// Static metadata for this driver type.
    fn metadata() -> DriverMetadata
    where
        Self: Sized;

    /// Engines the driver can create.
    fn list_engines(&self) -> Vec<String>;

    /// Instance sizes the driver can create.
    fn list_sizes(&self) -> Vec<Size>;

    fn list_databases(&mut self) -> Result<Vec<Database>>;

    /// Fails with [`ProviderError::ResourceNotFound`] for an unknown id.
    fn get_database(&mut self, database_id: &str) -> Result<Database>;

    fn create_database(&mut self, request: &CreateDatabaseRequest) -> Result<Database>;

    fn destroy_database(&mut self, database_id: &str) -> Result<()>;
}
