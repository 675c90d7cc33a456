//! `DatabaseDriver` trait implementation.

use crate::error::Result;
use crate::providers::common::{require_engine, require_size};
use crate::traits::{DatabaseDriver, ErrorContext};
use crate::types::{
    CreateDatabaseRequest, Database, DriverCredentialField, DriverMetadata, DriverType, FieldType,
    Size,
};

use super::{ENGINE, HerokuApi, HerokuDriver, PROVIDER, sizes};

impl DatabaseDriver for HerokuDriver {
    fn id(&self) -> &'static str {
        PROVIDER
    }

    fn metadata() -> DriverMetadata {
        DriverMetadata {
            id: DriverType::Heroku,
            name: "Heroku Postgres".to_string(),
            website: "http://postgres.heroku.com/".to_string(),
            required_fields: vec![
                DriverCredentialField::new("username", "Username", FieldType::Text),
                DriverCredentialField::new("password", "Password", FieldType::Password),
            ],
        }
    }

    fn list_engines(&self) -> Vec<String> {
        vec![ENGINE.to_string()]
    }

    fn list_sizes(&self) -> Vec<Size> {
        sizes()
    }

    fn list_databases(&mut self) -> Result<Vec<Database>> {
        self.facade.list()
    }

    fn get_database(&mut self, database_id: &str) -> Result<Database> {
        self.facade.get(database_id)
    }

    fn create_database(&mut self, request: &CreateDatabaseRequest) -> Result<Database> {
        require_engine(PROVIDER, &self.list_engines(), &request.engine)?;
        require_size(PROVIDER, &self.list_sizes(), &request.size)?;

        let params = HerokuApi::create_params(request);
        self.facade
            .create_with_context(&params, &ErrorContext::for_name(&request.name))
    }

    fn destroy_database(&mut self, database_id: &str) -> Result<()> {
        self.facade.destroy(database_id)
    }
}
