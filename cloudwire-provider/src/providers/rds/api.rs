use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{DEFAULT_ALLOCATED_STORAGE, PROVIDER};
use crate::codec::ParameterTree;
use crate::error::{ProviderError, Result};
use crate::facade::{ApiCall, Fetched, ResourceApi};
use crate::providers::common::{missing_field, size_or_bare};
use crate::response::ParsedBody;
use crate::traits::ErrorContext;
use crate::types::{CreateDatabaseRequest, Database, Size};
use crate::xml::{XmlDocument, XmlElement};

const ROOT: &str = "/";
const DESCRIBE_PATH: &str = "DescribeDBInstancesResult/DBInstances/DBInstance";
const CREATE_PATH: &str = "CreateDBInstanceResult/DBInstance";

/// Fixed part of a `CreateDBInstance` call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateDbInstanceParams<'a> {
    #[serde(rename = "DBInstanceIdentifier")]
    db_instance_identifier: &'a str,
    #[serde(rename = "DBInstanceClass")]
    db_instance_class: &'a str,
    engine: &'a str,
    allocated_storage: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    master_username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    master_user_password: Option<&'a str>,
}

/// Maps database operations onto RDS Query API actions.
#[derive(Debug, Clone)]
pub struct RdsApi {
    sizes: Vec<Size>,
}

impl RdsApi {
    pub fn new(sizes: Vec<Size>) -> Self {
        Self { sizes }
    }

    /// Parameters for `CreateDBInstance`; entries in `request.extra` win.
    pub fn create_params(request: &CreateDatabaseRequest) -> Result<ParameterTree> {
        let mut params = ParameterTree::from_serialize(&CreateDbInstanceParams {
            db_instance_identifier: &request.name,
            db_instance_class: &request.size,
            engine: &request.engine,
            allocated_storage: DEFAULT_ALLOCATED_STORAGE,
            master_username: request.master_user.as_ref().map(|m| m.username.as_str()),
            master_user_password: request.master_user.as_ref().map(|m| m.password.as_str()),
        })?;
        params.merge(request.extra.clone());
        Ok(params)
    }

    fn document(body: &ParsedBody) -> Result<&XmlDocument> {
        body.as_xml().ok_or_else(|| ProviderError::ParseError {
            provider: PROVIDER.to_string(),
            detail: "expected an XML body".to_string(),
        })
    }

    fn to_database(&self, el: &XmlElement, namespace: Option<&str>) -> Result<Database> {
        let text = |path: &str| el.find_text(path, namespace);
        let owned = |path: &str| text(path).unwrap_or_default().to_string();

        let name = text("DBInstanceIdentifier")
            .ok_or_else(|| missing_field(PROVIDER, "DBInstanceIdentifier"))?;
        let port = match text("Endpoint/Port") {
            Some(port) => port.parse().map_err(|e| ProviderError::ParseError {
                provider: PROVIDER.to_string(),
                detail: format!("invalid port '{port}': {e}"),
            })?,
            None => 0,
        };
        let created_at = text("InstanceCreateTime")
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc));

        let mut extras = BTreeMap::new();
        for (key, path) in [
            ("status", "DBInstanceStatus"),
            ("availability_zone", "AvailabilityZone"),
        ] {
            if let Some(value) = text(path) {
                extras.insert(key.to_string(), value.to_string());
            }
        }

        Ok(Database {
            id: name.to_string(),
            name: name.to_string(),
            engine: owned("Engine"),
            size: size_or_bare(&self.sizes, text("DBInstanceClass").unwrap_or_default()),
            host: owned("Endpoint/Address"),
            port,
            database: owned("DBName"),
            user: owned("MasterUsername"),
            password: String::new(),
            created_at,
            extras,
        })
    }
}

impl ResourceApi for RdsApi {
    type Resource = Database;

    fn list_call(&self) -> ApiCall {
        ApiCall::get(ROOT).param("Action", "DescribeDBInstances")
    }

    fn get_call(&self, id: &str) -> ApiCall {
        ApiCall::get(ROOT)
            .param("Action", "DescribeDBInstances")
            .param("DBInstanceIdentifier", id)
    }

    fn create_call(&self, params: &ParameterTree) -> Result<ApiCall> {
        Ok(ApiCall::get(ROOT)
            .params(params.clone())
            .param("Action", "CreateDBInstance"))
    }

    fn destroy_call(&self, id: &str) -> ApiCall {
        ApiCall::get(ROOT)
            .param("Action", "DeleteDBInstance")
            .param("DBInstanceIdentifier", id)
            .param("SkipFinalSnapshot", "true")
    }

    fn parse_list(&self, body: &ParsedBody) -> Result<Vec<Fetched<Database>>> {
        if body.is_empty() {
            return Ok(Vec::new());
        }
        let doc = Self::document(body)?;
        doc.find_all(DESCRIBE_PATH)
            .into_iter()
            .map(|el| self.to_database(el, doc.namespace()).map(Fetched::Resource))
            .collect()
    }

    fn parse_get(&self, body: &ParsedBody, context: &ErrorContext) -> Result<Database> {
        let not_found = || ProviderError::ResourceNotFound {
            provider: PROVIDER.to_string(),
            resource_id: context.resource_id.clone().unwrap_or_default(),
            raw_message: None,
        };
        if body.is_empty() {
            return Err(not_found());
        }
        let doc = Self::document(body)?;
        let el = doc.find(DESCRIBE_PATH).ok_or_else(not_found)?;
        self.to_database(el, doc.namespace())
    }

    fn parse_created(
        &self,
        body: &ParsedBody,
        _context: &ErrorContext,
    ) -> Result<Fetched<Database>> {
        let doc = Self::document(body)?;
        let el = doc
            .find(CREATE_PATH)
            .ok_or_else(|| missing_field(PROVIDER, CREATE_PATH))?;
        self.to_database(el, doc.namespace()).map(Fetched::Resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ListConvention, ParamCodec};
    use crate::providers::rds::{RDS_NAMESPACE, sizes};

    fn xml(body: &str) -> ParsedBody {
        ParsedBody::Xml(XmlDocument::parse(PROVIDER, body, Some(RDS_NAMESPACE)).unwrap())
    }

    const DESCRIBE: &str = r#"<DescribeDBInstancesResponse xmlns="http://rds.amazonaws.com/doc/2013-01-10/">
  <DescribeDBInstancesResult>
    <DBInstances>
      <DBInstance>
        <DBInstanceIdentifier>orders</DBInstanceIdentifier>
        <Engine>mysql</Engine>
        <DBInstanceClass>db.m1.small</DBInstanceClass>
        <DBInstanceStatus>available</DBInstanceStatus>
        <MasterUsername>admin</MasterUsername>
        <DBName>orders</DBName>
        <InstanceCreateTime>2013-01-10T12:00:00Z</InstanceCreateTime>
        <Endpoint>
          <Port>3306</Port>
          <Address>orders.abc.us-east-1.rds.amazonaws.com</Address>
        </Endpoint>
      </DBInstance>
      <DBInstance>
        <DBInstanceIdentifier>pending</DBInstanceIdentifier>
        <Engine>mysql</Engine>
        <DBInstanceClass>db.t1.micro</DBInstanceClass>
        <DBInstanceStatus>creating</DBInstanceStatus>
      </DBInstance>
    </DBInstances>
  </DescribeDBInstancesResult>
</DescribeDBInstancesResponse>"#;

    #[test]
    fn parse_list_maps_every_instance() {
        let api = RdsApi::new(sizes());
        let listed = api.parse_list(&xml(DESCRIBE)).unwrap();
        assert_eq!(listed.len(), 2);

        let Fetched::Resource(first) = &listed[0] else {
            panic!("expected a resource");
        };
        assert_eq!(first.id, "orders");
        assert_eq!(first.host, "orders.abc.us-east-1.rds.amazonaws.com");
        assert_eq!(first.port, 3306);
        assert_eq!(first.user, "admin");
        assert_eq!(first.size, Size::new("db.m1.small", ""));
        assert_eq!(first.extras.get("status").map(String::as_str), Some("available"));
        assert!(first.created_at.is_some());

        // no endpoint yet while the instance is being created
        let Fetched::Resource(second) = &listed[1] else {
            panic!("expected a resource");
        };
        assert_eq!(second.host, "");
        assert_eq!(second.port, 0);
    }

    #[test]
    fn parse_get_without_instance_is_not_found() {
        let api = RdsApi::new(sizes());
        let body = xml(
            r#"<DescribeDBInstancesResponse xmlns="http://rds.amazonaws.com/doc/2013-01-10/">
                 <DescribeDBInstancesResult><DBInstances/></DescribeDBInstancesResult>
               </DescribeDBInstancesResponse>"#,
        );
        let err = api
            .parse_get(&body, &ErrorContext::for_id("ghost"))
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::ResourceNotFound { ref resource_id, .. } if resource_id == "ghost"
        ));
    }

    #[test]
    fn invalid_port_is_parse_error() {
        let api = RdsApi::new(sizes());
        let body = xml(
            r#"<CreateDBInstanceResponse xmlns="http://rds.amazonaws.com/doc/2013-01-10/">
                 <CreateDBInstanceResult><DBInstance>
                   <DBInstanceIdentifier>x</DBInstanceIdentifier>
                   <Endpoint><Port>eighty</Port></Endpoint>
                 </DBInstance></CreateDBInstanceResult>
               </CreateDBInstanceResponse>"#,
        );
        let err = api
            .parse_created(&body, &ErrorContext::default())
            .unwrap_err();
        assert!(matches!(err, ProviderError::ParseError { .. }));
    }

    #[test]
    fn create_params_carry_master_user() {
        let request = CreateDatabaseRequest::new("orders", "db.m1.small", "mysql")
            .with_master_user("admin", "s3cret");
        let params = RdsApi::create_params(&request).unwrap();
        assert_eq!(params.get_scalar("MasterUsername"), Some("admin"));
        assert_eq!(params.get_scalar("MasterUserPassword"), Some("s3cret"));
        assert_eq!(params.get_scalar("AllocatedStorage"), Some("5"));

        let bare = RdsApi::create_params(&CreateDatabaseRequest::new(
            "orders",
            "db.m1.small",
            "mysql",
        ))
        .unwrap();
        assert_eq!(bare.get_scalar("MasterUsername"), None);
        assert_eq!(bare.get_scalar("MasterUserPassword"), None);
    }

    #[test]
    fn create_params_encode_with_extras() {
        let request = CreateDatabaseRequest::new("orders", "db.m1.small", "mysql").with_extra(
            ParameterTree::new()
                .scalar("AllocatedStorage", "20")
                .scalar("MasterUsername", "admin")
                .literals("VpcSecurityGroupIds", ["sg-1", "sg-2"]),
        );
        let params = RdsApi::create_params(&request).unwrap();
        let call = RdsApi::new(sizes()).create_call(&params).unwrap();
        let flat = ParamCodec::new(ListConvention::member())
            .encode(&call.params)
            .unwrap();

        assert_eq!(flat.get("Action"), Some("CreateDBInstance"));
        assert_eq!(flat.get("DBInstanceIdentifier"), Some("orders"));
        assert_eq!(flat.get("DBInstanceClass"), Some("db.m1.small"));
        assert_eq!(flat.get("AllocatedStorage"), Some("20"));
        assert_eq!(flat.get("VpcSecurityGroupIds.member.2"), Some("sg-2"));
    }
}
