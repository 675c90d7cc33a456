//! HTTP transport.
//!
//! [`HttpConnection`] owns everything that is per-backend (endpoint, default
//! headers, authentication) and hands a fully composed [`HttpRequest`] to an
//! [`HttpTransport`]. The default transport is [`ReqwestTransport`]; tests plug
//! in mock backends at the same seam.

use std::fmt::{self, Write as _};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::{
    Connection, DiagnosticSink, Headers, Method, RawOutcome, Request, Target, append_diagnostics,
};
use crate::codec::FlatParams;
use crate::error::{ProviderError, Result};
use crate::response::SuccessRule;
use crate::signer::RequestSigner;
use crate::utils::log_sanitizer::{redact_header, truncate_for_log};

/// Connect timeout applied when a request timeout is configured.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============ Endpoint ============

/// Where requests go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    /// `None` means the scheme's default port.
    pub port: Option<u16>,
    pub secure: bool,
}

impl Endpoint {
    /// `https://host`
    pub fn https(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            secure: true,
        }
    }

    /// `http://host:port`
    pub fn http(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port: Some(port),
            secure: false,
        }
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }

    /// Value of the `Host` header: the host, plus the port when it is not the default.
    pub fn authority(&self) -> String {
        let default_port = if self.secure { 443 } else { 80 };
        match self.port {
            Some(port) if port != default_port => format!("{}:{port}", self.host),
            _ => self.host.clone(),
        }
    }

    pub fn url(&self, path: &str, query: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        if query.is_empty() {
            format!("{}://{}{path}", self.scheme(), self.authority())
        } else {
            format!("{}://{}{path}?{query}", self.scheme(), self.authority())
        }
    }
}

// ============ Authentication ============

/// How an [`HttpConnection`] authenticates.
#[derive(Debug, Clone, Default)]
pub enum AuthScheme {
    #[default]
    None,
    /// `Authorization: Basic base64(user:key)` on every request.
    Basic { user: String, key: String },
    /// Form login at `login_path`; the returned `set-cookie` is replayed as
    /// `Cookie` until the session is invalidated.
    SessionCookie {
        login_path: String,
        user: String,
        key: String,
    },
    /// Query parameters signed with signature version 2.
    SignedQuery(RequestSigner),
}

// ============ Transport seam ============

/// A fully composed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub path: String,
    /// Encoded query string, without the leading `?`.
    pub query: String,
    pub headers: Headers,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Query parameters decoded back into a map.
    pub fn query_params(&self) -> Result<FlatParams> {
        FlatParams::from_query_string(&self.query)
    }
}

/// Sends one [`HttpRequest`] and returns whatever status came back.
///
/// Implementations must not retry and must not judge the status.
pub trait HttpTransport: Send {
    /// Prepares the underlying client. Called by [`Connection::connect`].
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn send(&mut self, request: &HttpRequest) -> Result<RawOutcome>;
}

/// Blocking [`reqwest`] transport.
pub struct ReqwestTransport {
    provider: &'static str,
    timeout: Option<Duration>,
    client: Option<reqwest::blocking::Client>,
}

impl ReqwestTransport {
    /// No request timeout unless one is given.
    pub fn new(provider: &'static str, timeout: Option<Duration>) -> Self {
        Self {
            provider,
            timeout,
            client: None,
        }
    }

    fn client(&mut self) -> Result<&reqwest::blocking::Client> {
        if self.client.is_none() {
            let mut builder = reqwest::blocking::Client::builder().timeout(self.timeout);
            if let Some(timeout) = self.timeout {
                builder = builder.connect_timeout(CONNECT_TIMEOUT.min(timeout));
            }
            let client = builder.build().map_err(|e| {
                ProviderError::transport(self.provider, format!("failed to build HTTP client: {e}"))
            })?;
            self.client = Some(client);
        }
        self.client
            .as_ref()
            .ok_or_else(|| ProviderError::transport(self.provider, "HTTP client unavailable"))
    }
}

impl HttpTransport for ReqwestTransport {
    fn connect(&mut self) -> Result<()> {
        self.client().map(|_| ())
    }

    fn send(&mut self, request: &HttpRequest) -> Result<RawOutcome> {
        let provider = self.provider;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client()?.request(method, &request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                ProviderError::transport(provider, format!("request timed out: {e}"))
            } else {
                ProviderError::transport(provider, e)
            }
        })?;

        let status = i32::from(response.status().as_u16());
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            let joined = match headers.get(name.as_str()) {
                Some(previous) => format!("{previous}, {value}"),
                None => value.to_string(),
            };
            headers.insert(name.as_str(), joined);
        }

        let body = response.text().map_err(|e| {
            ProviderError::transport(provider, format!("failed to read response body: {e}"))
        })?;

        Ok(RawOutcome {
            status,
            headers,
            body,
            diagnostic: String::new(),
        })
    }
}

// ============ Connection ============

/// HTTP(S) connection to one endpoint.
pub struct HttpConnection {
    provider: &'static str,
    endpoint: Endpoint,
    default_headers: Headers,
    auth: AuthScheme,
    transport: Box<dyn HttpTransport>,
    diagnostics: Option<DiagnosticSink>,
    session: Option<String>,
    connected: bool,
}

impl fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnection")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("has_session", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`HttpConnection`].
pub struct HttpConnectionBuilder {
    provider: &'static str,
    endpoint: Endpoint,
    default_headers: Headers,
    auth: AuthScheme,
    timeout: Option<Duration>,
    transport: Option<Box<dyn HttpTransport>>,
    diagnostics: Option<DiagnosticSink>,
}

impl HttpConnectionBuilder {
    fn new(provider: &'static str, endpoint: Endpoint) -> Self {
        Self {
            provider,
            endpoint,
            default_headers: Headers::new(),
            auth: AuthScheme::None,
            timeout: None,
            transport: None,
            diagnostics: None,
        }
    }

    /// Header sent with every request unless the request overrides it.
    #[must_use]
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn default_headers(mut self, headers: Headers) -> Self {
        self.default_headers = self.default_headers.merged(&headers);
        self
    }

    #[must_use]
    pub fn auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }

    /// Request timeout for the default transport (default: none).
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the default [`ReqwestTransport`].
    #[must_use]
    pub fn transport(mut self, transport: Box<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn diagnostics(mut self, sink: Option<DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn build(self) -> HttpConnection {
        let provider = self.provider;
        let timeout = self.timeout;
        HttpConnection {
            provider,
            endpoint: self.endpoint,
            default_headers: self.default_headers,
            auth: self.auth,
            transport: self
                .transport
                .unwrap_or_else(|| Box::new(ReqwestTransport::new(provider, timeout))),
            diagnostics: self.diagnostics,
            session: None,
            connected: false,
        }
    }
}

impl HttpConnection {
    pub fn builder(provider: &'static str, endpoint: Endpoint) -> HttpConnectionBuilder {
        HttpConnectionBuilder::new(provider, endpoint)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether a session cookie is currently cached.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Logs in if the scheme needs a session and none is cached.
    fn ensure_session(&mut self, transcript: &mut String) -> Result<()> {
        let AuthScheme::SessionCookie {
            login_path,
            user,
            key,
        } = &self.auth
        else {
            return Ok(());
        };
        if self.session.is_some() {
            return Ok(());
        }

        let form: FlatParams = [("username", user.as_str()), ("password", key.as_str())]
            .into_iter()
            .collect();
        let headers: Headers = [
            ("Accept", "application/json"),
            ("Content-Type", "application/x-www-form-urlencoded"),
        ]
        .into_iter()
        .collect();
        let login = HttpRequest {
            method: Method::Post,
            url: self.endpoint.url(login_path, ""),
            path: login_path.clone(),
            query: String::new(),
            headers: self.default_headers.merged(&headers),
            body: Some(form.to_query_string()),
        };

        log::debug!("[{}] POST {} (session login)", self.provider, login.url);
        let outcome = self.transport.send(&login)?;
        let _ = writeln!(transcript, "# session login: status {}", outcome.status);

        if !SuccessRule::http_default().is_success(outcome.status) {
            log::warn!("[{}] Session login rejected: {}", self.provider, outcome.status);
            return Err(ProviderError::AuthenticationError {
                provider: self.provider.to_string(),
                raw_message: Some(outcome.body),
            });
        }
        match outcome.headers.get("set-cookie") {
            Some(cookie) if !cookie.is_empty() => {
                self.session = Some(cookie.to_string());
                Ok(())
            }
            _ => Err(ProviderError::AuthenticationError {
                provider: self.provider.to_string(),
                raw_message: Some(format!(
                    "login returned status {} without a session cookie",
                    outcome.status
                )),
            }),
        }
    }

    fn compose(&self, path: &str, request: &Request) -> HttpRequest {
        let mut defaults = self.default_headers.clone();
        match &self.auth {
            AuthScheme::Basic { user, key } => {
                let token = BASE64.encode(format!("{user}:{key}"));
                defaults.insert("Authorization", format!("Basic {token}"));
            }
            AuthScheme::SessionCookie { .. } => {
                defaults.insert("Accept", "application/json");
                if let Some(cookie) = &self.session {
                    defaults.insert("Cookie", cookie.as_str());
                }
            }
            AuthScheme::None | AuthScheme::SignedQuery(_) => {}
        }
        let headers = defaults.merged(&request.headers);

        let query = match &self.auth {
            AuthScheme::SignedQuery(signer) => signer
                .sign(
                    request.method.as_str(),
                    &self.endpoint.authority(),
                    path,
                    &request.params,
                )
                .to_query_string(),
            _ => request.params.to_query_string(),
        };

        HttpRequest {
            method: request.method,
            url: self.endpoint.url(path, &query),
            path: path.to_string(),
            query,
            headers,
            body: request.body.clone(),
        }
    }

    fn execute(
        &mut self,
        path: &str,
        request: &Request,
        transcript: &mut String,
    ) -> Result<RawOutcome> {
        self.connect()?;
        self.ensure_session(transcript)?;

        let http_request = self.compose(path, request);
        log::debug!(
            "[{}] {} {}{}",
            self.provider,
            http_request.method,
            self.endpoint.authority(),
            http_request.path
        );
        write_request(transcript, &http_request);

        let outcome = self.transport.send(&http_request)?;
        log::debug!("[{}] Response Status: {}", self.provider, outcome.status);
        log::debug!(
            "[{}] Response Body: {}",
            self.provider,
            truncate_for_log(&outcome.body)
        );
        write_outcome(transcript, &outcome);
        Ok(outcome)
    }
}

impl Connection for HttpConnection {
    fn provider(&self) -> &'static str {
        self.provider
    }

    fn connect(&mut self) -> Result<()> {
        if !self.connected {
            self.transport.connect()?;
            self.connected = true;
        }
        Ok(())
    }

    fn request(&mut self, request: &Request) -> Result<RawOutcome> {
        let Target::Path(path) = &request.target else {
            return Err(ProviderError::InvalidParameter {
                provider: self.provider.to_string(),
                param: "target".to_string(),
                detail: "HTTP connections address URL paths, not commands".to_string(),
            });
        };

        let mut transcript = String::new();
        let result = self.execute(path, request, &mut transcript);
        if let Err(e) = &result {
            log::warn!("[{}] {e}", self.provider);
            let _ = writeln!(transcript, "# failed: {e}");
        }
        append_diagnostics(&mut self.diagnostics, self.provider, &transcript);
        result
    }

    fn invalidate_session(&mut self) {
        if self.session.take().is_some() {
            log::debug!("[{}] Session invalidated", self.provider);
        }
    }
}

fn write_request(transcript: &mut String, request: &HttpRequest) {
    let _ = writeln!(transcript, "> {} {}", request.method, request.url);
    for (name, value) in request.headers.iter() {
        let _ = writeln!(transcript, "> {name}: {}", redact_header(name, value));
    }
    if let Some(body) = &request.body {
        let _ = writeln!(transcript, ">\n{body}");
    }
}

fn write_outcome(transcript: &mut String, outcome: &RawOutcome) {
    let _ = writeln!(transcript, "< {}", outcome.status);
    for (name, value) in outcome.headers.iter() {
        let _ = writeln!(transcript, "< {name}: {}", redact_header(name, value));
    }
    if !outcome.body.is_empty() {
        let _ = writeln!(transcript, "<\n{}", outcome.body);
    }
}
