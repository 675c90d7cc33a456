//! In-memory driver.

use std::collections::BTreeMap;

use crate::error::{ProviderError, Result};
use crate::providers::common::size_or_bare;
use crate::traits::DatabaseDriver;
use crate::types::{
    CreateDatabaseRequest, Database, DriverCredentialField, DriverMetadata, DriverType, Size,
};

const PROVIDER: &str = "dummy";

/// Keeps databases in a map; ids are allocated from `0` and never reused.
///
/// Engine and size are accepted as given, which also makes this driver the
/// state behind mock backends in tests.
///
/// ```rust
/// use cloudwire_provider::{CreateDatabaseRequest, DatabaseDriver, DummyDriver};
///
/// let mut driver = DummyDriver::new();
/// let db = driver.create_database(&CreateDatabaseRequest::new("db1", "tiny", "sqlite"))?;
/// assert_eq!(db.id, "0");
/// # Ok::<(), cloudwire_provider::ProviderError>(())
/// ```
#[derive(Debug, Default)]
pub struct DummyDriver {
    databases: BTreeMap<u64, Database>,
    next_id: u64,
}

impl DummyDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// First database called `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Database> {
        self.databases.values().find(|db| db.name == name)
    }

    fn key(database_id: &str) -> Option<u64> {
        database_id.parse().ok()
    }

    fn not_found(database_id: &str) -> ProviderError {
        ProviderError::ResourceNotFound {
            provider: PROVIDER.to_string(),
            resource_id: database_id.to_string(),
            raw_message: Some("Database requested does not exist".to_string()),
        }
    }
}

impl DatabaseDriver for DummyDriver {
    fn id(&self) -> &'static str {
        PROVIDER
    }

    fn metadata() -> DriverMetadata {
        DriverMetadata {
            id: DriverType::Dummy,
            name: "Dummy".to_string(),
            website: String::new(),
            required_fields: Vec::<DriverCredentialField>::new(),
        }
    }

    fn list_engines(&self) -> Vec<String> {
        vec!["sqlite".to_string()]
    }

    fn list_sizes(&self) -> Vec<Size> {
        vec![Size::new("tiny", "Tiny instance (512mb)")]
    }

    fn list_databases(&mut self) -> Result<Vec<Database>> {
        Ok(self.databases.values().cloned().collect())
    }

    fn get_database(&mut self, database_id: &str) -> Result<Database> {
        Self::key(database_id)
            .and_then(|key| self.databases.get(&key))
            .cloned()
            .ok_or_else(|| Self::not_found(database_id))
    }

    fn create_database(&mut self, request: &CreateDatabaseRequest) -> Result<Database> {
        let key = self.next_id;
        let db = Database {
            id: key.to_string(),
            name: request.name.clone(),
            engine: request.engine.clone(),
            size: size_or_bare(&self.list_sizes(), &request.size),
            host: "localhost".to_string(),
            port: 8080,
            database: "database1".to_string(),
            user: request
                .master_user
                .as_ref()
                .map_or_else(|| "admin".to_string(), |m| m.username.clone()),
            password: request
                .master_user
                .as_ref()
                .map_or_else(|| "password".to_string(), |m| m.password.clone()),
            created_at: None,
            extras: BTreeMap::new(),
        };
        self.next_id += 1;
        self.databases.insert(key, db.clone());
        log::debug!("[{PROVIDER}] created database {} ({})", db.id, db.name);
        Ok(db)
    }

    fn destroy_database(&mut self, database_id: &str) -> Result<()> {
        Self::key(database_id)
            .and_then(|key| self.databases.remove(&key))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(database_id))
    }
}
