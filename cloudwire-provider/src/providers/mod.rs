//! Database driver implementations.

/// Shared helpers used by driver implementations.
pub(crate) mod common;

#[cfg(feature = "dummy")]
mod dummy;
#[cfg(feature = "heroku")]
mod heroku;
#[cfg(feature = "rds")]
mod rds;

#[cfg(feature = "dummy")]
pub use dummy::DummyDriver;
#[cfg(feature = "heroku")]
pub use heroku::{HEROKU_HOST, HerokuApi, HerokuDriver, HerokuDriverBuilder, HerokuErrorMapper};
#[cfg(feature = "rds")]
pub use rds::{
    RDS_API_VERSION, RDS_HOST, RDS_NAMESPACE, RdsApi, RdsDriver, RdsDriverBuilder, RdsErrorMapper,
};
