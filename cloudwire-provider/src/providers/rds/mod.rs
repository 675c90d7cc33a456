//! Amazon RDS driver (Query API, signature version 2, XML responses).

mod api;
mod error;
mod provider;

use std::sync::Arc;
use std::time::Duration;

use crate::codec::{ListConvention, ParamCodec};
use crate::connection::{AuthScheme, DiagnosticSink, Endpoint, HttpConnection, HttpTransport};
use crate::facade::DriverFacade;
use crate::response::{BodyFormat, ResponseRules};
use crate::signer::{Clock, RequestSigner};
use crate::types::Size;

pub use api::RdsApi;
pub use error::RdsErrorMapper;

pub const RDS_HOST: &str = "rds.amazonaws.com";
pub const RDS_API_VERSION: &str = "2013-01-10";
/// XML namespace of every response body.
pub const RDS_NAMESPACE: &str = "http://rds.amazonaws.com/doc/2013-01-10/";

pub(crate) const PROVIDER: &str = "rds";

/// Storage allocated when the request does not say otherwise (GiB).
pub(crate) const DEFAULT_ALLOCATED_STORAGE: u32 = 5;

pub(crate) const ENGINES: &[&str] = &[
    "mysql",
    "oracle-se1",
    "oracle-se",
    "oracle-ee",
    "sqlserver-ee",
    "sqlserver-se",
    "sqlserver-ex",
    "sqlserver-web",
];

pub(crate) const INSTANCE_CLASSES: &[&str] = &[
    "db.t1.micro",
    "db.m1.small",
    "db.m1.medium",
    "db.m1.large",
    "db.m1.xlarge",
    "db.m2.xlarge",
    "db.m2.2xlarge",
    "db.m2.4xlarge",
];

pub(crate) fn sizes() -> Vec<Size> {
    INSTANCE_CLASSES
        .iter()
        .map(|class| Size::new(*class, ""))
        .collect()
}

/// Amazon RDS driver.
///
/// ```rust,no_run
/// use cloudwire_provider::{DatabaseDriver, RdsDriver};
///
/// let mut driver = RdsDriver::new("your-access-key-id", "your-secret-access-key");
/// for db in driver.list_databases()? {
///     println!("{} {}:{}", db.name, db.host, db.port);
/// }
/// # Ok::<(), cloudwire_provider::ProviderError>(())
/// ```
#[derive(Debug)]
pub struct RdsDriver {
    pub(crate) facade: DriverFacade<RdsApi>,
}

/// Builder for [`RdsDriver`].
pub struct RdsDriverBuilder {
    access_key_id: String,
    secret_access_key: String,
    endpoint: Endpoint,
    clock: Option<Arc<dyn Clock>>,
    timeout: Option<Duration>,
    transport: Option<Box<dyn HttpTransport>>,
    diagnostics: Option<DiagnosticSink>,
}

impl RdsDriverBuilder {
    fn new(access_key_id: String, secret_access_key: String) -> Self {
        Self {
            access_key_id,
            secret_access_key,
            endpoint: Endpoint::https(RDS_HOST),
            clock: None,
            timeout: None,
            transport: None,
            diagnostics: None,
        }
    }

    /// Regional or test endpoint (default: `https://rds.amazonaws.com`).
    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Clock used for the signature timestamp (default: system clock).
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: Box<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn diagnostics(mut self, sink: DiagnosticSink) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    pub fn build(self) -> RdsDriver {
        let mut signer =
            RequestSigner::new(self.access_key_id, self.secret_access_key, RDS_API_VERSION);
        if let Some(clock) = self.clock {
            signer = signer.with_clock(clock);
        }

        let mut builder = HttpConnection::builder(PROVIDER, self.endpoint)
            .auth(AuthScheme::SignedQuery(signer))
            .timeout(self.timeout)
            .diagnostics(self.diagnostics);
        if let Some(transport) = self.transport {
            builder = builder.transport(transport);
        }

        let rules = ResponseRules::http(
            PROVIDER,
            BodyFormat::Xml {
                namespace: Some(RDS_NAMESPACE.to_string()),
            },
        )
        .with_error_mapper(Arc::new(RdsErrorMapper));

        RdsDriver {
            facade: DriverFacade::new(
                Box::new(builder.build()),
                rules,
                ParamCodec::new(ListConvention::member()),
                RdsApi::new(sizes()),
            ),
        }
    }
}

impl RdsDriver {
    /// Creates a driver against the default endpoint.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self::builder(access_key_id, secret_access_key).build()
    }

    pub fn builder(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> RdsDriverBuilder {
        RdsDriverBuilder::new(access_key_id.into(), secret_access_key.into())
    }
}
