//! Utility modules.

/// Timestamp serde helpers for backend payloads.
pub mod datetime;

/// Keeps large bodies and secrets out of logs.
pub mod log_sanitizer;
