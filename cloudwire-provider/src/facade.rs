//! Uniform resource operations over any backend.
//!
//! [`DriverFacade`] owns one connection plus the rules for reading its
//! responses, and delegates the backend-specific parts to a [`ResourceApi`]:
//! which wire call each operation becomes, and how a parsed body maps back to
//! a resource.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::codec::{ListConvention, ParamCodec, ParameterTree};
use crate::connection::{
    AuthScheme, CaptureMode, Connection, DiagnosticSink, Endpoint, Headers, HttpConnection,
    HttpTransport, Method, Request, Target,
};
use crate::error::{ProviderError, Result};
use crate::response::{BodyFormat, ParsedBody, Response, ResponseRules, SuccessRule};
use crate::traits::{ErrorContext, ErrorMapper};

// ============ Wire calls ============

/// Backend-level description of one call, before parameter encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub method: Method,
    pub target: Target,
    /// Encoded into flat query parameters by the facade's codec.
    pub params: ParameterTree,
    pub headers: Headers,
    pub env: BTreeMap<String, String>,
    pub body: Option<String>,
    pub capture: CaptureMode,
}

impl ApiCall {
    fn with_target(method: Method, target: Target) -> Self {
        Self {
            method,
            target,
            params: ParameterTree::new(),
            headers: Headers::new(),
            env: BTreeMap::new(),
            body: None,
            capture: CaptureMode::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::with_target(Method::Get, Target::Path(path.into()))
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::with_target(Method::Post, Target::Path(path.into()))
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::with_target(Method::Put, Target::Path(path.into()))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::with_target(Method::Delete, Target::Path(path.into()))
    }

    pub fn command<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_target(
            Method::Get,
            Target::Command(args.into_iter().map(Into::into).collect()),
        )
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params = self.params.scalar(name, value);
        self
    }

    /// Adds every node of `params`; later values win on name clashes.
    #[must_use]
    pub fn params(mut self, params: ParameterTree) -> Self {
        self.params.merge(params);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the body and sets `Content-Type: application/json`.
    pub fn json_body<T: Serialize>(self, provider: &str, value: &T) -> Result<Self> {
        let body = serde_json::to_string(value).map_err(|e| ProviderError::SerializationError {
            provider: provider.to_string(),
            detail: e.to_string(),
        })?;
        Ok(self.header("Content-Type", "application/json").body(body))
    }

    #[must_use]
    pub fn capture(mut self, capture: CaptureMode) -> Self {
        self.capture = capture;
        self
    }
}

/// A resource in a response, or only its id when a follow-up `get` is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<R> {
    Resource(R),
    Id(String),
}

/// Backend mapping between domain operations and wire calls.
pub trait ResourceApi: Send {
    type Resource;

    fn list_call(&self) -> ApiCall;

    fn get_call(&self, id: &str) -> ApiCall;

    fn create_call(&self, params: &ParameterTree) -> Result<ApiCall>;

    fn destroy_call(&self, id: &str) -> ApiCall;

    fn parse_list(&self, body: &ParsedBody) -> Result<Vec<Fetched<Self::Resource>>>;

    /// Body of a successful `get`; a body that holds no resource should map to
    /// [`ProviderError::ResourceNotFound`] with the context id.
    fn parse_get(&self, body: &ParsedBody, context: &ErrorContext) -> Result<Self::Resource>;

    fn parse_created(&self, body: &ParsedBody, context: &ErrorContext)
    -> Result<Fetched<Self::Resource>>;
}

// ============ Facade ============

/// `list / get / create / destroy` over one connection.
pub struct DriverFacade<A: ResourceApi> {
    connection: Box<dyn Connection>,
    rules: ResponseRules,
    codec: ParamCodec,
    api: A,
}

impl<A: ResourceApi> fmt::Debug for DriverFacade<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverFacade")
            .field("provider", &self.connection.provider())
            .field("rules", &self.rules)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl<A: ResourceApi> DriverFacade<A> {
    pub fn new(
        connection: Box<dyn Connection>,
        rules: ResponseRules,
        codec: ParamCodec,
        api: A,
    ) -> Self {
        Self {
            connection,
            rules,
            codec,
            api,
        }
    }

    /// An HTTP facade assembled from `config`.
    pub fn from_config(config: FacadeConfig, api: A) -> Self {
        let FacadeConfig {
            provider,
            endpoint,
            auth,
            success_codes,
            body_format,
            list_convention,
            default_headers,
            timeout,
            error_mapper,
            transport,
            diagnostics,
        } = config;

        let mut builder = HttpConnection::builder(provider, endpoint)
            .default_headers(default_headers)
            .auth(auth)
            .timeout(timeout)
            .diagnostics(diagnostics);
        if let Some(transport) = transport {
            builder = builder.transport(transport);
        }

        let rules = ResponseRules {
            provider,
            success: SuccessRule::StatusIn(success_codes),
            body_format,
            error_mapper,
        };
        Self::new(
            Box::new(builder.build()),
            rules,
            ParamCodec::new(list_convention),
            api,
        )
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn provider(&self) -> &'static str {
        self.connection.provider()
    }

    pub fn connect(&mut self) -> Result<()> {
        self.connection.connect()
    }

    pub fn list(&mut self) -> Result<Vec<A::Resource>> {
        let call = self.api.list_call();
        let response = self.execute(call, &ErrorContext::default())?;
        let listed = self.api.parse_list(response.object())?;

        let mut resources = Vec::with_capacity(listed.len());
        for entry in listed {
            match entry {
                Fetched::Resource(resource) => resources.push(resource),
                Fetched::Id(id) => resources.push(self.get(&id)?),
            }
        }
        Ok(resources)
    }

    pub fn get(&mut self, id: &str) -> Result<A::Resource> {
        let context = ErrorContext::for_id(id);
        let call = self.api.get_call(id);
        let response = self.execute(call, &context)?;
        self.api.parse_get(response.object(), &context)
    }

    pub fn create(&mut self, params: &ParameterTree) -> Result<A::Resource> {
        let context = params
            .get_scalar("name")
            .map(ErrorContext::for_name)
            .unwrap_or_default();
        self.create_with_context(params, &context)
    }

    /// [`create`](Self::create) with caller-supplied error context.
    pub fn create_with_context(
        &mut self,
        params: &ParameterTree,
        context: &ErrorContext,
    ) -> Result<A::Resource> {
        let call = self.api.create_call(params)?;
        let response = self.execute(call, context)?;
        match self.api.parse_created(response.object(), context)? {
            Fetched::Resource(resource) => Ok(resource),
            Fetched::Id(id) => self.get(&id),
        }
    }

    pub fn destroy(&mut self, id: &str) -> Result<()> {
        let call = self.api.destroy_call(id);
        self.execute(call, &ErrorContext::for_id(id)).map(|_| ())
    }

    /// Encodes, sends and interprets one call.
    ///
    /// An [`ProviderError::AuthenticationError`] drops the connection's cached
    /// session so the next call logs in again.
    pub fn execute(&mut self, call: ApiCall, context: &ErrorContext) -> Result<Response> {
        let ApiCall {
            method,
            target,
            params,
            headers,
            env,
            body,
            capture,
        } = call;
        let request = Request {
            target,
            method,
            params: self.codec.encode(&params)?,
            headers,
            env,
            body,
            capture,
        };

        let outcome = self.connection.request(&request)?;
        let result = Response::new(outcome, &self.rules, context);
        if let Err(ProviderError::AuthenticationError { .. }) = &result {
            self.connection.invalidate_session();
        }
        result
    }
}

// ============ Configuration ============

/// Everything needed to build an HTTP [`DriverFacade`].
pub struct FacadeConfig {
    pub provider: &'static str,
    pub endpoint: Endpoint,
    pub auth: AuthScheme,
    pub success_codes: Vec<i32>,
    pub body_format: BodyFormat,
    pub list_convention: ListConvention,
    pub default_headers: Headers,
    /// Request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub error_mapper: Arc<dyn ErrorMapper>,
    /// Replaces the default reqwest transport.
    pub transport: Option<Box<dyn HttpTransport>>,
    pub diagnostics: Option<DiagnosticSink>,
}

impl FacadeConfig {
    /// Defaults: no auth, statuses 200/201/202/204, JSON bodies, `.member.N`
    /// lists, status-based errors, no timeout.
    pub fn new(provider: &'static str, endpoint: Endpoint) -> Self {
        let ResponseRules {
            success,
            error_mapper,
            ..
        } = ResponseRules::http(provider, BodyFormat::Json);
        let success_codes = match success {
            SuccessRule::StatusIn(codes) => codes,
            SuccessRule::ExitCodeZero => Vec::new(),
        };
        Self {
            provider,
            endpoint,
            auth: AuthScheme::None,
            success_codes,
            body_format: BodyFormat::Json,
            list_convention: ListConvention::default(),
            default_headers: Headers::new(),
            timeout: None,
            error_mapper,
            transport: None,
            diagnostics: None,
        }
    }

    #[must_use]
    pub fn auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }

    #[must_use]
    pub fn success_codes(mut self, codes: Vec<i32>) -> Self {
        self.success_codes = codes;
        self
    }

    #[must_use]
    pub fn body_format(mut self, format: BodyFormat) -> Self {
        self.body_format = format;
        self
    }

    #[must_use]
    pub fn list_convention(mut self, convention: ListConvention) -> Self {
        self.list_convention = convention;
        self
    }

    #[must_use]
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn error_mapper(mut self, mapper: Arc<dyn ErrorMapper>) -> Self {
        self.error_mapper = mapper;
        self
    }

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
}
