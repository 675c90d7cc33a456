//! Driver factory functions and metadata.

use crate::error::{ProviderError, Result};
use crate::traits::DatabaseDriver;
use crate::types::{DriverCredentials, DriverMetadata};

#[cfg(feature = "dummy")]
use crate::providers::DummyDriver;
#[cfg(feature = "heroku")]
use crate::providers::HerokuDriver;
#[cfg(feature = "rds")]
use crate::providers::RdsDriver;

/// Creates a [`DatabaseDriver`] from the given credentials.
///
/// The concrete driver is picked by the [`DriverCredentials`] variant. Blank
/// credential fields are rejected here, before any request is made.
///
/// # Examples
///
/// ```rust,no_run
/// use cloudwire_provider::{create_driver, DriverCredentials};
///
/// let mut driver = create_driver(DriverCredentials::Heroku {
///     username: "me@example.com".to_string(),
///     password: "secret".to_string(),
/// })?;
/// let databases = driver.list_databases()?;
/// # Ok::<(), cloudwire_provider::ProviderError>(())
/// ```
pub fn create_driver(credentials: DriverCredentials) -> Result<Box<dyn DatabaseDriver>> {
    if let Some(field) = credentials.first_empty_field() {
        return Err(ProviderError::InvalidParameter {
            provider: credentials.driver_type().to_string(),
            param: field.to_string(),
            detail: "must not be empty".to_string(),
        });
    }

    log::debug!("Creating {} driver", credentials.driver_type());
    match credentials {
        #[cfg(feature = "dummy")]
        DriverCredentials::Dummy => Ok(Box::new(DummyDriver::new())),
        #[cfg(feature = "rds")]
        DriverCredentials::Rds {
            access_key_id,
            secret_access_key,
        } => Ok(Box::new(RdsDriver::new(access_key_id, secret_access_key))),
        #[cfg(feature = "heroku")]
        DriverCredentials::Heroku { username, password } => {
            Ok(Box::new(HerokuDriver::new(username, password)))
        }
    }
}

/// Returns metadata for all drivers enabled via feature flags.
pub fn get_all_driver_metadata() -> Vec<DriverMetadata> {
    vec![
        #[cfg(feature = "dummy")]
        DummyDriver::metadata(),
        #[cfg(feature = "rds")]
        RdsDriver::metadata(),
        #[cfg(feature = "heroku")]
        HerokuDriver::metadata(),
    ]
}
