use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use super::types::{HerokuDb, HerokuDbEnvelope, HerokuDbList};
use super::{ENGINE, PROVIDER};
use crate::codec::{FlatParams, ParamValue, ParameterTree, url_encode};
use crate::error::{ProviderError, Result};
use crate::facade::{ApiCall, Fetched, ResourceApi};
use crate::providers::common::{missing_field, size_or_bare};
use crate::response::ParsedBody;
use crate::traits::ErrorContext;
use crate::types::{CreateDatabaseRequest, Database, Size};

/// Create parameter naming the plan, sent in the path rather than the form body.
const PLAN: &str = "plan";

/// Maps database operations onto the Heroku Postgres REST routes.
#[derive(Debug, Clone)]
pub struct HerokuApi {
    sizes: Vec<Size>,
}

impl HerokuApi {
    pub fn new(sizes: Vec<Size>) -> Self {
        Self { sizes }
    }

    /// `plan` plus the form fields for `POST /api/dbs/{plan}`; `request.extra` wins.
    pub fn create_params(request: &CreateDatabaseRequest) -> ParameterTree {
        let mut params = ParameterTree::new()
            .scalar(PLAN, request.size.as_str())
            .scalar("name", request.name.as_str());
        params.merge(request.extra.clone());
        params
    }

    fn deserialize<T: DeserializeOwned>(body: &ParsedBody) -> Result<T> {
        let json = body.as_json().ok_or_else(|| ProviderError::ParseError {
            provider: PROVIDER.to_string(),
            detail: "expected a JSON body".to_string(),
        })?;
        serde_json::from_value(json.clone()).map_err(|e| ProviderError::ParseError {
            provider: PROVIDER.to_string(),
            detail: e.to_string(),
        })
    }

    fn to_database(&self, db: HerokuDb) -> Result<Database> {
        let conn = db.conn.ok_or_else(|| missing_field(PROVIDER, "db.conn"))?;

        let mut extras = BTreeMap::new();
        if let Some(color) = db.color {
            extras.insert("color".to_string(), color);
        }
        if let Some(app_name) = db.app_name {
            extras.insert("app_name".to_string(), app_name);
        }

        Ok(Database {
            id: db.id,
            name: db.name,
            engine: ENGINE.to_string(),
            size: size_or_bare(&self.sizes, db.plan.as_deref().unwrap_or_default()),
            host: conn.host,
            port: conn.port,
            database: conn.database,
            user: conn.user,
            password: conn.password,
            created_at: db.created_at,
            extras,
        })
    }
}

impl ResourceApi for HerokuApi {
    type Resource = Database;

    fn list_call(&self) -> ApiCall {
        ApiCall::get("/api/dbs")
    }

    fn get_call(&self, id: &str) -> ApiCall {
        ApiCall::get(format!("/api/dbs/{}/info", url_encode(id)))
    }

    fn create_call(&self, params: &ParameterTree) -> Result<ApiCall> {
        let plan = params
            .get_scalar(PLAN)
            .filter(|plan| !plan.is_empty())
            .ok_or_else(|| ProviderError::InvalidParameter {
                provider: PROVIDER.to_string(),
                param: PLAN.to_string(),
                detail: "a plan is required".to_string(),
            })?;

        let mut form = FlatParams::new();
        for (name, value) in params.iter().filter(|(name, _)| name.as_str() != PLAN) {
            let ParamValue::Scalar(value) = value else {
                return Err(ProviderError::InvalidParameter {
                    provider: PROVIDER.to_string(),
                    param: name.clone(),
                    detail: "only scalar values can be sent as form fields".to_string(),
                });
            };
            form.insert(name.as_str(), value.as_str());
        }

        Ok(ApiCall::post(format!("/api/dbs/{}", url_encode(plan)))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(form.to_query_string()))
    }

    fn destroy_call(&self, id: &str) -> ApiCall {
        ApiCall::post(format!("/api/dbs/{}/destroy", url_encode(id)))
    }

    fn parse_list(&self, body: &ParsedBody) -> Result<Vec<Fetched<Database>>> {
        if body.is_empty() {
            return Ok(Vec::new());
        }
        let list: HerokuDbList = Self::deserialize(body)?;
        Ok(list.dbs.into_iter().map(|db| Fetched::Id(db.id)).collect())
    }

    fn parse_get(&self, body: &ParsedBody, context: &ErrorContext) -> Result<Database> {
        let envelope: Option<HerokuDbEnvelope> = if body.is_empty() {
            None
        } else {
            Some(Self::deserialize(body)?)
        };
        match envelope.and_then(|e| e.db) {
            Some(db) => self.to_database(db),
            None => Err(ProviderError::ResourceNotFound {
                provider: PROVIDER.to_string(),
                resource_id: context.resource_id.clone().unwrap_or_default(),
                raw_message: None,
            }),
        }
    }

    fn parse_created(
        &self,
        body: &ParsedBody,
        _context: &ErrorContext,
    ) -> Result<Fetched<Database>> {
        let envelope: HerokuDbEnvelope = Self::deserialize(body)?;
        let db = envelope.db.ok_or_else(|| missing_field(PROVIDER, "db"))?;
        if db.conn.is_some() {
            self.to_database(db).map(Fetched::Resource)
        } else {
            Ok(Fetched::Id(db.id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Target;
    use crate::providers::heroku::sizes;

    fn json(body: &str) -> ParsedBody {
        ParsedBody::Json(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn list_returns_ids_for_follow_up() {
        let api = HerokuApi::new(sizes());
        let listed = api
            .parse_list(&json(r#"{"success":"OK","dbs":[{"id":0,"name":"a"},{"id":1,"name":"b"}]}"#))
            .unwrap();
        assert_eq!(
            listed,
            vec![Fetched::Id("0".to_string()), Fetched::Id("1".to_string())]
        );
    }

    #[test]
    fn get_maps_connection() {
        let api = HerokuApi::new(sizes());
        let db = api
            .parse_get(
                &json(
                    r#"{"success":"OK","db":{"id":3,"name":"orders","plan":"basic","color":"BLACK",
                        "conn":{"host":"h","port":5432,"user":"u","pass":"p","database":"d"}}}"#,
                ),
                &ErrorContext::for_id("3"),
            )
            .unwrap();
        assert_eq!(db.id, "3");
        assert_eq!(db.engine, "postgres");
        assert_eq!(db.size.id, "basic");
        assert_eq!(db.password, "p");
        assert_eq!(db.extras.get("color").map(String::as_str), Some("BLACK"));
    }

    #[test]
    fn get_without_db_is_not_found() {
        let api = HerokuApi::new(sizes());
        let err = api
            .parse_get(&json(r#"{"success":"OK"}"#), &ErrorContext::for_id("9"))
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::ResourceNotFound { ref resource_id, .. } if resource_id == "9"
        ));
    }

    #[test]
    fn created_without_db_is_parse_error() {
        let api = HerokuApi::new(sizes());
        let err = api
            .parse_created(&json("{}"), &ErrorContext::default())
            .unwrap_err();
        assert!(matches!(err, ProviderError::ParseError { .. }));
    }

    #[test]
    fn ids_are_encoded_in_paths() {
        let api = HerokuApi::new(sizes());
        let path = |call: ApiCall| call.target;
        assert_eq!(path(api.get_call("7")), Target::Path("/api/dbs/7/info".to_string()));
        assert_eq!(
            path(api.get_call("../login")),
            Target::Path("/api/dbs/..%2Flogin/info".to_string())
        );
        assert_eq!(
            path(api.destroy_call("a b")),
            Target::Path("/api/dbs/a%20b/destroy".to_string())
        );
    }

    #[test]
    fn create_call_puts_plan_in_path() {
        let api = HerokuApi::new(sizes());
        let request = CreateDatabaseRequest::new("my db", "dev", "postgres");
        let call = api.create_call(&HerokuApi::create_params(&request)).unwrap();
        assert_eq!(call.target, Target::Path("/api/dbs/dev".to_string()));
        assert_eq!(call.body.as_deref(), Some("name=my%20db"));
        assert!(call.params.is_empty());
    }

    #[test]
    fn create_call_requires_plan() {
        let api = HerokuApi::new(sizes());
        let err = api
            .create_call(&ParameterTree::new().scalar("name", "x"))
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::InvalidParameter { ref param, .. } if param == "plan"
        ));
    }
}
