//! Transport abstraction.
//!
//! A [`Connection`] turns a [`Request`] into a [`RawOutcome`] over one concrete
//! channel. Two implementations ship with the crate:
//!
//! - [`ProcessConnection`]: runs a local (or prefixed, e.g. `ssh host`) command.
//! - [`HttpConnection`]: issues an HTTP request through an [`HttpTransport`].
//!
//! Connections never retry and never interpret the outcome. Deciding whether an
//! outcome is a success is the job of [`Response`](crate::response::Response).

mod http;
mod process;

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

pub use http::{
    AuthScheme, Endpoint, HttpConnection, HttpConnectionBuilder, HttpRequest, HttpTransport,
    ReqwestTransport,
};
pub use process::{ProcessConnection, ProcessConnectionBuilder};

use crate::codec::FlatParams;
use crate::error::{ProviderError, Result};

// ============ Headers ============

/// Case-insensitive header map. Names are folded to lowercase on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing any previous value.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.as_ref().to_ascii_lowercase(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    /// `self` overlaid with `overrides`; on conflict `overrides` wins.
    #[must_use]
    pub fn merged(&self, overrides: &Self) -> Self {
        let mut merged = self.clone();
        for (name, value) in overrides.iter() {
            merged.insert(name, value);
        }
        merged
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

// ============ Request ============

/// Request verb. Process backends ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the request addresses: a URL path or a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Path on the HTTP endpoint, e.g. `/api/dbs`.
    Path(String),
    /// Argument vector, appended to the connection's command prefix.
    Command(Vec<String>),
}

/// How a process backend treats the child's output streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptureMode {
    /// stdout and stderr are piped and returned.
    #[default]
    Captured,
    /// Both streams go to the null device and only the exit code is awaited.
    ///
    /// Use this when the command leaves a background process that inherits
    /// the descriptors; a captured read would block until that process exits.
    Silent,
}

/// One call's worth of wire input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub target: Target,
    pub method: Method,
    /// Query parameters (HTTP only).
    pub params: FlatParams,
    /// Per-call headers; they override the connection defaults (HTTP only).
    pub headers: Headers,
    /// Per-call environment; overrides the connection defaults (process only).
    pub env: BTreeMap<String, String>,
    /// HTTP body, or data fed to the child's stdin.
    pub body: Option<String>,
    pub capture: CaptureMode,
}

impl Request {
    fn with_target(target: Target, method: Method) -> Self {
        Self {
            target,
            method,
            params: FlatParams::new(),
            headers: Headers::new(),
            env: BTreeMap::new(),
            body: None,
            capture: CaptureMode::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::with_target(Target::Path(path.into()), Method::Get)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::with_target(Target::Path(path.into()), Method::Post)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::with_target(Target::Path(path.into()), Method::Put)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::with_target(Target::Path(path.into()), Method::Delete)
    }

    /// A command given as an argument vector.
    pub fn command<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_target(
            Target::Command(args.into_iter().map(Into::into).collect()),
            Method::Get,
        )
    }

    /// A command given as a shell-style line. Only quoting is interpreted.
    pub fn command_line(line: &str) -> Result<Self> {
        let args = shlex::split(line).ok_or_else(|| ProviderError::InvalidParameter {
            provider: "process".to_string(),
            param: "command".to_string(),
            detail: format!("unbalanced quoting in '{line}'"),
        })?;
        Ok(Self::command(args))
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key, value);
        self
    }

    #[must_use]
    pub fn params(mut self, params: FlatParams) -> Self {
        self.params.extend(params);
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

    #[must_use]
    pub fn capture(mut self, capture: CaptureMode) -> Self {
        self.capture = capture;
        self
    }
}

// ============ Outcome ============

/// What came back from the channel, uninterpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutcome {
    /// HTTP status or process exit code (negative signal number when killed).
    pub status: i32,
    pub headers: Headers,
    /// Response body or captured stdout.
    pub body: String,
    /// Captured stderr; always empty for HTTP.
    pub diagnostic: String,
}

impl RawOutcome {
    pub fn new(status: i32, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = diagnostic.into();
        self
    }
}

// ============ Connection ============

/// A transport channel with exclusive, blocking use.
///
/// `&mut self` on [`request`](Self::request) means one request is in flight per
/// connection; callers wanting parallelism hold several connections.
pub trait Connection: Send {
    /// Backend name used in errors and log lines.
    fn provider(&self) -> &'static str;

    /// Prepares the channel. Calling it again is a no-op.
    fn connect(&mut self) -> Result<()>;

    /// Executes `request` exactly once.
    ///
    /// A channel that cannot be created, executed, or that exceeds its deadline
    /// yields [`ProviderError::TransportError`]. Any status, including failure
    /// codes, is returned as a [`RawOutcome`].
    fn request(&mut self, request: &Request) -> Result<RawOutcome>;

    /// Drops cached authentication state so the next request re-authenticates.
    fn invalidate_session(&mut self) {}
}

// ============ Diagnostics ============

/// Append-only destination for per-call transcripts.
pub type DiagnosticSink = Box<dyn Write + Send>;

/// Appends one transcript record. Failures are logged and otherwise ignored.
pub(crate) fn append_diagnostics(
    sink: &mut Option<DiagnosticSink>,
    provider: &str,
    record: &str,
) {
    let Some(sink) = sink.as_mut() else {
        return;
    };
    let written = sink
        .write_all(record.as_bytes())
        .and_then(|()| sink.flush());
    if let Err(e) = written {
        log::warn!("[{provider}] Failed to write diagnostics: {e}");
    }
}
