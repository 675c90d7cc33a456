//! Read-only checks against the real services.
//!
//! Run with:
//! ```bash
//! RDS_ACCESS_KEY_ID=xxx RDS_SECRET_ACCESS_KEY=xxx \
//!     cargo test -p cloudwire-provider --test live_test -- --ignored --nocapture --test-threads=1
//! HEROKU_USERNAME=xxx HEROKU_PASSWORD=xxx \
//!     cargo test -p cloudwire-provider --test live_test -- --ignored --nocapture --test-threads=1
//! ```

mod common;

use std::env;

use cloudwire_provider::{DatabaseDriver, DriverCredentials, create_driver};

fn list_and_fetch(credentials: DriverCredentials) {
    let mut driver = match create_driver(credentials) {
        Ok(driver) => driver,
        Err(e) => panic!("create_driver failed: {e}"),
    };
    let databases = require_ok!(driver.list_databases(), "list_databases failed");

    if let Some(first) = databases.first() {
        let fetched = require_ok!(driver.get_database(&first.id), "get_database failed");
        assert_eq!(fetched.id, first.id);
    }
    println!("✓ {} databases listed: {}", driver.id(), databases.len());
}

#[test]
#[ignore]
fn test_rds_list_databases() {
    skip_if_no_credentials!("RDS_ACCESS_KEY_ID", "RDS_SECRET_ACCESS_KEY");

    list_and_fetch(DriverCredentials::Rds {
        access_key_id: env::var("RDS_ACCESS_KEY_ID").unwrap_or_default(),
        secret_access_key: env::var("RDS_SECRET_ACCESS_KEY").unwrap_or_default(),
    });
}

#[test]
#[ignore]
fn test_heroku_list_databases() {
    skip_if_no_credentials!("HEROKU_USERNAME", "HEROKU_PASSWORD");

    list_and_fetch(DriverCredentials::Heroku {
        username: env::var("HEROKU_USERNAME").unwrap_or_default(),
        password: env::var("HEROKU_PASSWORD").unwrap_or_default(),
    });
}
