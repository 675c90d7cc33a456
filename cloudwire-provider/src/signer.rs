//! Signature version 2 query signing (`HmacSHA256`).
//!
//! Reference: <https://docs.aws.amazon.com/general/latest/gr/signature-version-2.html>

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::codec::{FlatParams, url_encode};

type HmacSha256 = Hmac<Sha256>;

/// Value injected as `SignatureVersion`.
pub const SIGNATURE_VERSION: &str = "2";
/// Value injected as `SignatureMethod`.
pub const SIGNATURE_METHOD: &str = "HmacSHA256";
/// Wire format of the `Timestamp` parameter.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const ACCESS_KEY_PARAM: &str = "AWSAccessKeyId";
const SIGNATURE_PARAM: &str = "Signature";

// ============ Clock ============

/// Source of the signing timestamp.
///
/// Always injected so tests can pin the instant.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ============ Signed request ============

/// A parameter set augmented with the signature fields. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    params: FlatParams,
    timestamp: String,
    signature: String,
}

impl SignedRequest {
    /// All parameters that were signed, `Signature` excluded.
    pub fn params(&self) -> &FlatParams {
        &self.params
    }

    /// The injected `Timestamp`.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Always [`SIGNATURE_VERSION`].
    pub fn signature_version(&self) -> &'static str {
        SIGNATURE_VERSION
    }

    /// Always [`SIGNATURE_METHOD`].
    pub fn signature_method(&self) -> &'static str {
        SIGNATURE_METHOD
    }

    /// Base64 HMAC-SHA256 signature.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Query string with `Signature` as the final parameter.
    pub fn to_query_string(&self) -> String {
        format!(
            "{}&{SIGNATURE_PARAM}={}",
            self.params.to_query_string(),
            url_encode(&self.signature)
        )
    }

    /// Every parameter, `Signature` included.
    pub fn into_params(self) -> FlatParams {
        let mut params = self.params;
        params.insert(SIGNATURE_PARAM, self.signature);
        params
    }
}

// ============ Signer ============

/// Signs flat query parameters with an access key / secret key pair.
#[derive(Clone)]
pub struct RequestSigner {
    access_key_id: String,
    secret_access_key: String,
    api_version: String,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Creates a signer that reads the wall clock.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            api_version: api_version.into(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The access key injected as `AWSAccessKeyId`.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Injects the signature fields into `params` and signs the result.
    ///
    /// Parameters are sorted before the signing string is built, so insertion
    /// order never affects the signature.
    pub fn sign(&self, method: &str, host: &str, path: &str, params: &FlatParams) -> SignedRequest {
        let timestamp = self.clock.now().format(TIMESTAMP_FORMAT).to_string();

        let mut params = params.clone();
        params.remove(SIGNATURE_PARAM);
        params.insert("Timestamp", timestamp.as_str());
        params.insert("SignatureVersion", SIGNATURE_VERSION);
        params.insert("SignatureMethod", SIGNATURE_METHOD);
        params.insert("Version", self.api_version.as_str());
        params.insert(ACCESS_KEY_PARAM, self.access_key_id.as_str());

        let string_to_sign = string_to_sign(method, host, path, &params);
        log::debug!("StringToSign:\n{string_to_sign}");

        let signature = BASE64.encode(self.mac(&string_to_sign).finalize().into_bytes());

        SignedRequest {
            params,
            timestamp,
            signature,
        }
    }

    /// Checks the `Signature` carried in `params` against the other parameters.
    ///
    /// Used by mock backends standing in for the remote service.
    pub fn verify(&self, method: &str, host: &str, path: &str, params: &FlatParams) -> bool {
        let Some(signature) = params.get(SIGNATURE_PARAM) else {
            return false;
        };
        let Ok(expected) = BASE64.decode(signature) else {
            return false;
        };
        if params.get(ACCESS_KEY_PARAM) != Some(self.access_key_id.as_str()) {
            return false;
        }

        let mut unsigned = params.clone();
        unsigned.remove(SIGNATURE_PARAM);
        self.mac(&string_to_sign(method, host, path, &unsigned))
            .verify_slice(&expected)
            .is_ok()
    }

    fn mac(&self, string_to_sign: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret_access_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(string_to_sign.as_bytes());
        mac
    }
}

/// `METHOD\nhost\npath\ncanonical-query`
fn string_to_sign(method: &str, host: &str, path: &str, params: &FlatParams) -> String {
    let path = if path.is_empty() { "/" } else { path };
    format!(
        "{}\n{}\n{path}\n{}",
        method.to_uppercase(),
        host.to_lowercase(),
        params.to_query_string()
    )
}
