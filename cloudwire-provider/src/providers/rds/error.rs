//! RDS error mapping.

use crate::connection::RawOutcome;
use crate::error::ProviderError;
use crate::traits::{ErrorContext, ErrorMapper, RawApiError};
use crate::xml::XmlElement;

use super::PROVIDER;

/// Maps `<ErrorResponse><Error><Code>` bodies onto [`ProviderError`].
///
/// Reference: <https://docs.aws.amazon.com/AmazonRDS/latest/APIReference/CommonErrors.html>
#[derive(Debug, Clone, Copy, Default)]
pub struct RdsErrorMapper;

impl RdsErrorMapper {
    /// Error code and message from the body; error bodies are matched by local name
    /// since not every endpoint declares the namespace on them.
    fn parse(body: &str) -> Option<RawApiError> {
        let root = XmlElement::parse(PROVIDER, body).ok()?;
        let error = root.find("Error", None)?;
        let message = error.find_text("Message", None).unwrap_or_default();
        Some(match error.find_text("Code", None) {
            Some(code) => RawApiError::with_code(code, message),
            None => RawApiError::new(message),
        })
    }
}

impl ErrorMapper for RdsErrorMapper {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn map_error(&self, outcome: &RawOutcome, context: &ErrorContext) -> ProviderError {
        let Some(raw) = Self::parse(&outcome.body) else {
            return match outcome.status {
                401 | 403 => self.authentication_error(None),
                _ => self.protocol_error(outcome),
            };
        };

        match raw.code.as_deref() {
            // ============ Authentication ============
            Some(
                "InvalidClientTokenId"
                | "SignatureDoesNotMatch"
                | "AuthFailure"
                | "IncompleteSignature"
                | "MissingAuthenticationToken",
            ) => self.authentication_error(Some(raw.message)),

            // ============ Not found ============
            Some("DBInstanceNotFound" | "DBInstanceNotFoundFault") => {
                self.not_found_error(context, Some(raw.message))
            }

            // ============ Already exists ============
            Some("DBInstanceAlreadyExists" | "DBInstanceAlreadyExistsFault") => {
                ProviderError::ResourceExists {
                    provider: PROVIDER.to_string(),
                    resource_name: context.resource_name.clone().unwrap_or_default(),
                    raw_message: Some(raw.message),
                }
            }

            // ============ Rejected parameters ============
            Some(
                code @ ("InvalidParameterValue"
                | "InvalidParameterCombination"
                | "MissingParameter"
                | "InsufficientDBInstanceCapacity"),
            ) => ProviderError::InvalidParameter {
                provider: PROVIDER.to_string(),
                param: code.to_string(),
                detail: raw.message,
            },

            _ => {
                log::warn!(
                    "[{PROVIDER}] Unmapped error code {:?}: {}",
                    raw.code,
                    raw.message
                );
                self.protocol_error(outcome)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_body(code: &str, message: &str) -> String {
        format!(
            r#"<ErrorResponse xmlns="http://rds.amazonaws.com/doc/2013-01-10/">
  <Error><Type>Sender</Type><Code>{code}</Code><Message>{message}</Message></Error>
  <RequestId>5e4a4b0c-7c6d-11e2-a6d4-d7f4b5e9a1c2</RequestId>
</ErrorResponse>"#
        )
    }

    fn map(status: i32, body: &str, context: &ErrorContext) -> ProviderError {
        RdsErrorMapper.map_error(&RawOutcome::new(status, body), context)
    }

    #[test]
    fn not_found() {
        let err = map(
            404,
            &error_body("DBInstanceNotFound", "DBInstance db9 not found."),
            &ErrorContext::for_id("db9"),
        );
        match err {
            ProviderError::ResourceNotFound {
                resource_id,
                raw_message,
                ..
            } => {
                assert_eq!(resource_id, "db9");
                assert_eq!(raw_message.as_deref(), Some("DBInstance db9 not found."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_signature_is_authentication() {
        let err = map(
            403,
            &error_body("SignatureDoesNotMatch", "The request signature we calculated does not match"),
            &ErrorContext::default(),
        );
        assert!(matches!(err, ProviderError::AuthenticationError { .. }));
    }

    #[test]
    fn already_exists_uses_context_name() {
        let err = map(
            400,
            &error_body("DBInstanceAlreadyExists", "DB Instance already exists"),
            &ErrorContext::for_name("orders"),
        );
        assert!(matches!(
            err,
            ProviderError::ResourceExists { ref resource_name, .. } if resource_name == "orders"
        ));
    }

    #[test]
    fn invalid_parameter_keeps_code() {
        let err = map(
            400,
            &error_body("InvalidParameterValue", "Invalid DB instance class"),
            &ErrorContext::default(),
        );
        assert!(matches!(
            err,
            ProviderError::InvalidParameter { ref param, .. } if param == "InvalidParameterValue"
        ));
    }

    #[test]
    fn unknown_code_is_protocol_error() {
        let err = map(
            500,
            &error_body("InternalFailure", "oops"),
            &ErrorContext::default(),
        );
        assert!(matches!(err, ProviderError::ProtocolError { status: 500, .. }));
    }

    #[test]
    fn unparseable_body_falls_back_to_status() {
        assert!(matches!(
            map(403, "Forbidden", &ErrorContext::default()),
            ProviderError::AuthenticationError { .. }
        ));
        assert!(matches!(
            map(503, "", &ErrorContext::default()),
            ProviderError::ProtocolError { status: 503, .. }
        ));
    }
}
