//! Heroku error mapping

use crate::connection::RawOutcome;
use crate::error::ProviderError;
use crate::traits::{ErrorContext, ErrorMapper, RawApiError};

use super::PROVIDER;
use super::types::HerokuErrorBody;

/// Maps failed Heroku calls by HTTP status, carrying the `error` message along.
#[derive(Debug, Clone, Copy, Default)]
pub struct HerokuErrorMapper;

impl HerokuErrorMapper {
    fn parse(body: &str) -> Option<RawApiError> {
        let parsed: HerokuErrorBody = serde_json::from_str(body).ok()?;
        Some(match parsed.id {
            Some(id) => RawApiError::with_code(id, parsed.error),
            None => RawApiError::new(parsed.error),
        })
    }
}

impl ErrorMapper for HerokuErrorMapper {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn map_error(&self, outcome: &RawOutcome, context: &ErrorContext) -> ProviderError {
        let raw = Self::parse(&outcome.body);
        let message = raw.as_ref().map(|raw| raw.message.clone());

        match outcome.status {
            401 | 403 => self.authentication_error(message),
            404 => self.not_found_error(context, message),
            422 if raw.as_ref().and_then(|r| r.code.as_deref()) == Some("already_exists") => {
                ProviderError::ResourceExists {
                    provider: PROVIDER.to_string(),
                    resource_name: context.resource_name.clone().unwrap_or_default(),
                    raw_message: message,
                }
            }
            _ => self.protocol_error(outcome),
        }
    }
}
