//! Serde helpers for optional backend timestamps.
//!
//! Serializes `Option<DateTime<Utc>>` as an RFC 3339 string. Deserializes from
//! RFC 3339, the `YYYY/MM/DD HH:MM:SS +ZZZZ` form used by older JSON APIs, or a
//! Unix timestamp in seconds or milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Offset-carrying layout emitted by Rails-era JSON APIs.
const SLASH_FORMAT: &str = "%Y/%m/%d %H:%M:%S %z";

/// Timestamps above this are taken as milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

#[allow(clippy::ref_option)]
pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        String(String),
        I64(i64),
    }

    match Option::<RawTimestamp>::deserialize(deserializer)? {
        Some(RawTimestamp::String(s)) if s.trim().is_empty() => Ok(None),
        Some(RawTimestamp::String(s)) => parse_text(&s)
            .map(Some)
            .ok_or_else(|| Error::custom(format!("Unrecognized timestamp: {s}"))),
        Some(RawTimestamp::I64(ts)) => parse_unix_timestamp(ts)
            .map(Some)
            .ok_or_else(|| Error::custom("Invalid Unix timestamp")),
        None => Ok(None),
    }
}

fn parse_text(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, SLASH_FORMAT))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_unix_timestamp(ts: i64) -> Option<DateTime<Utc>> {
    if ts > MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(ts)
    } else {
        DateTime::from_timestamp(ts, 0)
    }
}
