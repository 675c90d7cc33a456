use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::ParameterTree;
use crate::utils::log_sanitizer::REDACTED;

// ============ Driver Type ============

/// Identifies which database driver implementation to use.
///
/// Each variant is gated behind its corresponding feature flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DriverType {
    /// In-memory driver. Requires feature `dummy`.
    #[cfg(feature = "dummy")]
    Dummy,
    /// Amazon RDS. Requires feature `rds`.
    #[cfg(feature = "rds")]
    Rds,
    /// Heroku Postgres. Requires feature `heroku`.
    #[cfg(feature = "heroku")]
    Heroku,
}

impl std::fmt::Display for DriverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "dummy")]
            Self::Dummy => write!(f, "dummy"),
            #[cfg(feature = "rds")]
            Self::Rds => write!(f, "rds"),
            #[cfg(feature = "heroku")]
            Self::Heroku => write!(f, "heroku"),
        }
    }
}

// ============ Database Types ============

/// An instance size offered by a driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Size {
    /// Backend identifier, e.g. `db.m1.small` or `basic`.
    pub id: String,
    /// Human-readable name.
    pub name: String,
}

impl Size {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A database instance as seen through a driver.
///
/// Connection fields are empty (or `0`) while the backend has not assigned them yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub id: String,
    pub name: String,
    pub engine: String,
    pub size: Size,
    pub host: String,
    pub port: u16,
    /// Database (schema) name inside the instance.
    pub database: String,
    pub user: String,
    pub password: String,
    /// Creation time, when the backend reports one.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::utils::datetime"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Backend-specific attributes (status, availability zone, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}

/// Parameters for creating a database instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateDatabaseRequest {
    pub name: String,
    /// Size id from [`DatabaseDriver::list_sizes`](crate::DatabaseDriver::list_sizes).
    pub size: String,
    /// Engine from [`DatabaseDriver::list_engines`](crate::DatabaseDriver::list_engines).
    pub engine: String,
    /// Master account for the new instance. RDS refuses to create without one.
    pub master_user: Option<MasterUser>,
    /// Backend parameters passed through verbatim; they win over driver defaults.
    pub extra: ParameterTree,
}

/// Administrative login created together with a database instance.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterUser {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for MasterUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterUser")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

impl CreateDatabaseRequest {
    pub fn new(name: impl Into<String>, size: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: size.into(),
            engine: engine.into(),
            master_user: None,
            extra: ParameterTree::new(),
        }
    }

    #[must_use]
    pub fn with_master_user(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.master_user = Some(MasterUser {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    #[must_use]
    pub fn with_extra(mut self, extra: ParameterTree) -> Self {
        self.extra = extra;
        self
    }
}

// ============ Driver Metadata Types ============

/// The input type of a credential field (affects UI rendering).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Plain text input.
    Text,
    /// Masked/password input.
    Password,
}

/// Definition of a single credential field required by a driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverCredentialField {
    /// Machine-readable field key (e.g., `"accessKeyId"`).
    pub key: String,
    /// Human-readable label.
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl DriverCredentialField {
    pub(crate) fn new(key: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            field_type,
        }
    }
}

/// Static metadata describing a driver.
///
/// Obtain via [`DatabaseDriver::metadata()`](crate::DatabaseDriver::metadata) or
/// [`get_all_driver_metadata()`](crate::get_all_driver_metadata).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverMetadata {
    pub id: DriverType,
    /// Human-readable driver name.
    pub name: String,
    pub website: String,
    /// Credential fields required to authenticate with this driver.
    pub required_fields: Vec<DriverCredentialField>,
}

// ============ Credential Types ============

/// Type-safe credential container for all supported drivers.
///
/// Pass this to [`create_driver()`](crate::create_driver) to instantiate a driver.
///
/// ```json
/// { "driver": "rds", "credentials": { "access_key_id": "...", "secret_access_key": "..." } }
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "driver", content = "credentials")]
pub enum DriverCredentials {
    /// No credentials. Requires feature `dummy`.
    #[cfg(feature = "dummy")]
    #[serde(rename = "dummy")]
    Dummy,

    /// Amazon RDS credentials. Requires feature `rds`.
    #[cfg(feature = "rds")]
    #[serde(rename = "rds")]
    Rds {
        access_key_id: String,
        secret_access_key: String,
    },

    /// Heroku account credentials. Requires feature `heroku`.
    #[cfg(feature = "heroku")]
    #[serde(rename = "heroku")]
    Heroku { username: String, password: String },
}

impl std::fmt::Debug for DriverCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "dummy")]
            Self::Dummy => f.write_str("Dummy"),
            #[cfg(feature = "rds")]
            Self::Rds { access_key_id, .. } => f
                .debug_struct("Rds")
                .field("access_key_id", access_key_id)
                .finish_non_exhaustive(),
            #[cfg(feature = "heroku")]
            Self::Heroku { username, .. } => f
                .debug_struct("Heroku")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

impl DriverCredentials {
    /// Which driver these credentials are for.
    pub fn driver_type(&self) -> DriverType {
        match self {
            #[cfg(feature = "dummy")]
            Self::Dummy => DriverType::Dummy,
            #[cfg(feature = "rds")]
            Self::Rds { .. } => DriverType::Rds,
            #[cfg(feature = "heroku")]
            Self::Heroku { .. } => DriverType::Heroku,
        }
    }

    /// Key of the first required field that is empty or whitespace-only.
    pub fn first_empty_field(&self) -> Option<&'static str> {
        match self {
            #[cfg(feature = "dummy")]
            Self::Dummy => None,
            #[cfg(feature = "rds")]
            Self::Rds {
                access_key_id,
                secret_access_key,
            } => [
                ("accessKeyId", access_key_id),
                ("secretAccessKey", secret_access_key),
            ]
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| key),
            #[cfg(feature = "heroku")]
            Self::Heroku { username, password } => [("username", username), ("password", password)]
                .into_iter()
                .find(|(_, value)| value.trim().is_empty())
                .map(|(key, _)| key),
        }
    }
}
