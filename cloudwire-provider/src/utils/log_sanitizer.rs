//! Log sanitization.
//!
//! Response bodies and process output can be arbitrarily large and may echo
//! connection strings, so only a bounded prefix reaches debug/error logs.

/// Bytes of a body kept in a log line.
const LOG_BODY_LIMIT: usize = 256;

/// Headers whose values never reach logs or transcripts.
const SECRET_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie"];

/// Placeholder substituted for secret values.
pub const REDACTED: &str = "<redacted>";

/// Bounded prefix of `body` for a log line, cut on a char boundary.
///
/// Bodies within the limit come back unchanged; longer ones end with
/// `... (N bytes)` giving the full length.
pub fn truncate_for_log(body: &str) -> String {
    if body.len() <= LOG_BODY_LIMIT {
        return body.to_string();
    }
    let cut = body
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|end| *end <= LOG_BODY_LIMIT)
        .last()
        .unwrap_or(0);
    format!("{}... ({} bytes)", &body[..cut], body.len())
}

/// `value`, or [`REDACTED`] when `name` carries credentials.
pub fn redact_header<'a>(name: &str, value: &'a str) -> &'a str {
    if SECRET_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name)) {
        REDACTED
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_within_limit_is_kept() {
        let body = "<ErrorResponse><Error><Code>DBInstanceNotFound</Code></Error></ErrorResponse>";
        assert_eq!(truncate_for_log(body), body);
        let full = "x".repeat(LOG_BODY_LIMIT);
        assert_eq!(truncate_for_log(&full), full);
    }

    #[test]
    fn long_listing_is_cut_with_total_length() {
        let listing = "db.m1.small\n".repeat(100);
        let logged = truncate_for_log(&listing);
        assert!(logged.ends_with("... (1200 bytes)"));
        assert!(logged.starts_with("db.m1.small\ndb.m1.small\n"));
        assert!(logged.len() < listing.len());
    }

    #[test]
    fn cut_never_splits_a_character() {
        // 3 bytes each, so 256 falls inside the 86th one
        let output = "€".repeat(200);
        let logged = truncate_for_log(&output);
        assert_eq!(logged, format!("{}... (600 bytes)", "€".repeat(85)));
    }

    #[test]
    fn credential_headers_redacted() {
        assert_eq!(redact_header("Authorization", "Basic abc"), REDACTED);
        assert_eq!(redact_header("cookie", "session=1"), REDACTED);
        assert_eq!(redact_header("Set-Cookie", "session=1"), REDACTED);
        assert_eq!(redact_header("accept", "application/json"), "application/json");
    }
}
