//! # cloudwire-provider
//!
//! A wire-adaptation layer for managing database instances across backends that
//! speak very different protocols: local subprocesses, cookie-session JSON APIs
//! and signed-query XML APIs.
//!
//! ## Layers
//!
//! | Layer | Type | Role |
//! |-------|------|------|
//! | Parameters | [`ParamCodec`] | Nested [`ParameterTree`] to and from flat dotted keys |
//! | Signing | [`RequestSigner`] | HMAC-SHA256 signature version 2 over the canonical query |
//! | Transport | [`Connection`] | [`ProcessConnection`] or [`HttpConnection`], one request at a time |
//! | Interpretation | [`Response`] | Success predicate, body decoding, error mapping |
//! | Operations | [`DriverFacade`] | `list / get / create / destroy` over one connection |
//!
//! ## Supported Drivers
//!
//! | Driver | Feature Flag | Auth Method |
//! |--------|-------------|-------------|
//! | In-memory | `dummy` | None |
//! | [Amazon RDS](http://aws.amazon.com/rds/) | `rds` | HMAC-SHA256 signed query (V2) |
//! | [Heroku Postgres](http://postgres.heroku.com/) | `heroku` | Form login + session cookie |
//!
//! ## Feature Flags
//!
//! ### Driver Selection
//!
//! - **`all-providers`** *(default)*: enable every driver listed above.
//! - **`dummy`**, **`rds`**, **`heroku`**: enable a single driver.
//!
//! ### TLS Backend
//!
//! - **`native-tls`** *(default)*: use the platform's native TLS implementation.
//! - **`rustls`**: use rustls.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cloudwire_provider::{create_driver, CreateDatabaseRequest, DriverCredentials};
//!
//! let mut driver = create_driver(DriverCredentials::Rds {
//!     access_key_id: "your-access-key-id".to_string(),
//!     secret_access_key: "your-secret-access-key".to_string(),
//! })?;
//!
//! let db = driver.create_database(
//!     &CreateDatabaseRequest::new("orders", "db.m1.small", "mysql")
//!         .with_master_user("admin", "change-me"),
//! )?;
//! println!("{} is at {}:{}", db.name, db.host, db.port);
//!
//! for db in driver.list_databases()? {
//!     println!("{} ({})", db.name, db.engine);
//! }
//! # Ok::<(), cloudwire_provider::ProviderError>(())
//! ```
//!
//! ## Running Commands
//!
//! ```rust,no_run
//! use cloudwire_provider::{
//!     Connection, ProcessConnection, Request, Response, ResponseRules, ErrorContext,
//! };
//!
//! let mut conn = ProcessConnection::builder("process").build();
//! let outcome = conn.request(&Request::command_line("pg_dump --version")?)?;
//! let response = Response::new(outcome, &ResponseRules::process("process"), &ErrorContext::default())?;
//! println!("{:?}", response.object().as_text());
//! # Ok::<(), cloudwire_provider::ProviderError>(())
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`Result<T, ProviderError>`](ProviderError):
//!
//! - [`ProviderError::TransportError`]: the channel failed or timed out
//! - [`ProviderError::AuthenticationError`]: credentials were rejected
//! - [`ProviderError::ResourceNotFound`]: no resource with that id
//! - [`ProviderError::MalformedKey`]: a flat parameter key has the wrong shape
//! - [`ProviderError::ProtocolError`]: any other unsuccessful outcome
//!
//! Nothing is retried. See [`ProviderError`] for the full list.

mod codec;
mod connection;
mod error;
mod facade;
mod factory;
mod providers;
mod response;
mod signer;
mod traits;
mod types;
mod utils;
mod xml;

// Re-export error types
pub use error::{ProviderError, Result};

// Re-export factory functions
pub use factory::{create_driver, get_all_driver_metadata};

// Re-export traits
pub use traits::{DatabaseDriver, ErrorContext, ErrorMapper};

// Re-export the wire layers
pub use codec::{
    FlatParams, ListConvention, ParamCodec, ParamKind, ParamStruct, ParamValue, ParameterTree,
    url_encode,
};
pub use connection::{
    AuthScheme, CaptureMode, Connection, DiagnosticSink, Endpoint, Headers, HttpConnection,
    HttpConnectionBuilder, HttpRequest, HttpTransport, Method, ProcessConnection,
    ProcessConnectionBuilder, RawOutcome, ReqwestTransport, Request, Target,
};
pub use facade::{ApiCall, DriverFacade, FacadeConfig, Fetched, ResourceApi};
pub use response::{
    BodyFormat, DEFAULT_SUCCESS_CODES, GenericErrorMapper, ParsedBody, Response, ResponseRules,
    StatusErrorMapper, SuccessRule,
};
pub use signer::{
    Clock, FixedClock, RequestSigner, SIGNATURE_METHOD, SIGNATURE_VERSION, SignedRequest,
    SystemClock, TIMESTAMP_FORMAT,
};
pub use xml::{XmlDocument, XmlElement};

// Re-export types
pub use types::{
    CreateDatabaseRequest, Database, DriverCredentialField, DriverCredentials, DriverMetadata,
    DriverType, FieldType, MasterUser, Size,
};

// Re-export utils modules
pub use utils::{datetime, log_sanitizer};

// Re-export concrete drivers (behind feature flags)
#[cfg(feature = "dummy")]
pub use providers::DummyDriver;

#[cfg(feature = "rds")]
pub use providers::{
    RDS_API_VERSION, RDS_HOST, RDS_NAMESPACE, RdsApi, RdsDriver, RdsDriverBuilder, RdsErrorMapper,
};

#[cfg(feature = "heroku")]
pub use providers::{HEROKU_HOST, HerokuApi, HerokuDriver, HerokuDriverBuilder, HerokuErrorMapper};
