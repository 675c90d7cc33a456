//! Heroku Postgres API payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// `GET /api/dbs`
#[derive(Debug, Deserialize)]
pub struct HerokuDbList {
    #[serde(default)]
    pub dbs: Vec<HerokuDbSummary>,
}

/// List entry; connection details are only returned by `/info`.
#[derive(Debug, Deserialize)]
pub struct HerokuDbSummary {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// `GET /api/dbs/{id}/info` and `POST /api/dbs/{plan}`
#[derive(Debug, Deserialize)]
pub struct HerokuDbEnvelope {
    pub db: Option<HerokuDb>,
}

#[derive(Debug, Deserialize)]
pub struct HerokuDb {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub plan: Option<String>,
    pub color: Option<String>,
    pub app_name: Option<String>,
    #[serde(default, with = "crate::utils::datetime")]
    pub created_at: Option<DateTime<Utc>>,
    pub conn: Option<HerokuConn>,
}

#[derive(Debug, Deserialize)]
pub struct HerokuConn {
    #[serde(default)]
    pub host: String,
    #[serde(default, deserialize_with = "port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default, rename = "pass")]
    pub password: String,
    #[serde(default)]
    pub database: String,
}

/// `{"error": "..."}` bodies on failed calls.
#[derive(Debug, Deserialize)]
pub struct HerokuErrorBody {
    #[serde(alias = "message")]
    pub error: String,
    pub id: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

/// Ids come back as numbers from some endpoints and strings from others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

fn port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s
            .parse()
            .map_err(|e| D::Error::custom(format!("invalid port '{s}': {e}"))),
        StringOrNumber::Number(n) => {
            u16::try_from(n).map_err(|_| D::Error::custom(format!("port {n} out of range")))
        }
    }
}
