//! Heroku Postgres driver (cookie session, JSON responses).

mod api;
mod error;
mod provider;
mod types;

use std::sync::Arc;
use std::time::Duration;

use crate::connection::{AuthScheme, DiagnosticSink, Endpoint, HttpTransport};
use crate::facade::{DriverFacade, FacadeConfig};
use crate::response::BodyFormat;
use crate::types::Size;

pub use api::HerokuApi;
pub use error::HerokuErrorMapper;

pub const HEROKU_HOST: &str = "postgres.heroku.com";

pub(crate) const PROVIDER: &str = "heroku";
pub(crate) const ENGINE: &str = "postgres";

const LOGIN_PATH: &str = "/login";

const PLANS: &[(&str, &str)] = &[
    ("dev", "Dev"),
    ("basic", "Basic"),
    ("zilla", "Zilla"),
    ("mecha", "Mecha"),
];

pub(crate) fn sizes() -> Vec<Size> {
    PLANS.iter().map(|(id, name)| Size::new(*id, *name)).collect()
}

/// Heroku Postgres driver.
///
/// Logs in on the first call and replays the session cookie afterwards; a
/// rejected session is dropped and the next call logs in again.
#[derive(Debug)]
pub struct HerokuDriver {
    pub(crate) facade: DriverFacade<HerokuApi>,
}

/// Builder for [`HerokuDriver`].
pub struct HerokuDriverBuilder {
    username: String,
    password: String,
    endpoint: Endpoint,
    timeout: Option<Duration>,
    transport: Option<Box<dyn HttpTransport>>,
    diagnostics: Option<DiagnosticSink>,
}

impl HerokuDriverBuilder {
    fn new(username: String, password: String) -> Self {
        Self {
            username,
            password,
            endpoint: Endpoint::https(HEROKU_HOST),
            timeout: None,
            transport: None,
            diagnostics: None,
        }
    }

    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
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

    pub fn build(self) -> HerokuDriver {
        let mut config = FacadeConfig::new(PROVIDER, self.endpoint)
            .auth(AuthScheme::SessionCookie {
                login_path: LOGIN_PATH.to_string(),
                user: self.username,
                key: self.password,
            })
            .body_format(BodyFormat::Json)
            .timeout(self.timeout)
            .error_mapper(Arc::new(HerokuErrorMapper))
            .diagnostics(self.diagnostics);
        if let Some(transport) = self.transport {
            config = config.transport(transport);
        }

        HerokuDriver {
            facade: DriverFacade::from_config(config, HerokuApi::new(sizes())),
        }
    }
}

impl HerokuDriver {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::builder(username, password).build()
    }

    pub fn builder(username: impl Into<String>, password: impl Into<String>) -> HerokuDriverBuilder {
        HerokuDriverBuilder::new(username.into(), password.into())
    }
}
