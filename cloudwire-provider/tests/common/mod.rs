//! Shared test helpers and mock backends.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};

use cloudwire_provider::{
    CreateDatabaseRequest, Database, DatabaseDriver, DummyDriver, HttpRequest, HttpTransport,
    Method, ProviderError, RDS_API_VERSION, RDS_HOST, RawOutcome, RequestSigner, Result,
};

pub const ACCESS_KEY_ID: &str = "AKIDEXAMPLE";
pub const SECRET_ACCESS_KEY: &str = "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY";

/// Skips a test when an environment variable is missing.
#[macro_export]
macro_rules! skip_if_no_credentials {
    ($($var:expr),+) => {
        $(
            if std::env::var($var).is_err() {
                eprintln!("skipping: {} is not set", $var);
                return;
            }
        )+
    };
}

/// Asserts that an `Option` is `Some` and unwraps it (failing the test otherwise).
#[macro_export]
macro_rules! require_some {
    ($expr:expr $(,)?) => {{
        let opt = $expr;
        assert!(opt.is_some(), "expected Some(..), got None");
        let Some(val) = opt else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), "{}", format_args!($($msg)+));
        let Some(val) = opt else {
            return;
        };
        val
    }};
}

/// Asserts that a `Result` is `Ok` and unwraps it (failing the test otherwise).
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// State shared between a mock and the test holding it.
#[derive(Default)]
pub struct MockState {
    pub backend: DummyDriver,
    pub sent: Vec<HttpRequest>,
    /// Answer every request with 401 while set.
    pub reject_all: bool,
}

fn lock(state: &Mutex<MockState>) -> std::sync::MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============ RDS ============

/// RDS Query API stand-in: checks every signature, then serves the request
/// from a [`DummyDriver`] keyed by instance identifier.
#[derive(Clone)]
pub struct RdsMock {
    pub state: Arc<Mutex<MockState>>,
    verifier: RequestSigner,
}

impl Default for RdsMock {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            verifier: RequestSigner::new(ACCESS_KEY_ID, SECRET_ACCESS_KEY, RDS_API_VERSION),
        }
    }
}

impl RdsMock {
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.state).sent.clone()
    }

    fn error(status: i32, code: &str, message: &str) -> RawOutcome {
        RawOutcome::new(
            status,
            format!(
                "<ErrorResponse><Error><Type>Sender</Type><Code>{code}</Code>\
                 <Message>{message}</Message></Error></ErrorResponse>"
            ),
        )
    }

    fn instance(db: &Database) -> String {
        format!(
            "<DBInstance>\
               <DBInstanceIdentifier>{}</DBInstanceIdentifier>\
               <Engine>{}</Engine>\
               <DBInstanceClass>{}</DBInstanceClass>\
               <DBInstanceStatus>available</DBInstanceStatus>\
               <MasterUsername>{}</MasterUsername>\
               <DBName>{}</DBName>\
               <Endpoint><Port>{}</Port><Address>{}</Address></Endpoint>\
             </DBInstance>",
            db.name, db.engine, db.size.id, db.user, db.database, db.port, db.host
        )
    }

    fn respond(action: &str, result: &str) -> RawOutcome {
        RawOutcome::new(
            200,
            format!(
                "<{action}Response xmlns=\"http://rds.amazonaws.com/doc/2013-01-10/\">\
                   <{action}Result>{result}</{action}Result>\
                   <ResponseMetadata><RequestId>req-1</RequestId></ResponseMetadata>\
                 </{action}Response>"
            ),
        )
    }
}

impl HttpTransport for RdsMock {
    fn send(&mut self, request: &HttpRequest) -> Result<RawOutcome> {
        let mut state = lock(&self.state);
        state.sent.push(request.clone());
        if state.reject_all {
            return Ok(Self::error(403, "InvalidClientTokenId", "The security token is invalid"));
        }

        let params = request.query_params()?;
        if !self
            .verifier
            .verify(request.method.as_str(), RDS_HOST, &request.path, &params)
        {
            return Ok(Self::error(
                403,
                "SignatureDoesNotMatch",
                "The request signature we calculated does not match the signature you provided",
            ));
        }

        let identifier = params.get("DBInstanceIdentifier").unwrap_or_default();
        let not_found = || {
            Self::error(
                404,
                "DBInstanceNotFound",
                &format!("DBInstance {identifier} not found."),
            )
        };

        let outcome = match params.get("Action").unwrap_or_default() {
            "DescribeDBInstances" if identifier.is_empty() => {
                let instances: String = state
                    .backend
                    .list_databases()?
                    .iter()
                    .map(Self::instance)
                    .collect();
                Self::respond(
                    "DescribeDBInstances",
                    &format!("<DBInstances>{instances}</DBInstances>"),
                )
            }
            "DescribeDBInstances" => match state.backend.find_by_name(identifier) {
                Some(db) => Self::respond(
                    "DescribeDBInstances",
                    &format!("<DBInstances>{}</DBInstances>", Self::instance(db)),
                ),
                None => not_found(),
            },
            "CreateDBInstance" => {
                if state.backend.find_by_name(identifier).is_some() {
                    return Ok(Self::error(
                        400,
                        "DBInstanceAlreadyExists",
                        "DB Instance already exists",
                    ));
                }
                let db = state.backend.create_database(&CreateDatabaseRequest::new(
                    identifier,
                    params.get("DBInstanceClass").unwrap_or_default(),
                    params.get("Engine").unwrap_or_default(),
                ))?;
                Self::respond("CreateDBInstance", &Self::instance(&db))
            }
            "DeleteDBInstance" => match state.backend.find_by_name(identifier).cloned() {
                Some(db) => {
                    state.backend.destroy_database(&db.id)?;
                    Self::respond("DeleteDBInstance", &Self::instance(&db))
                }
                None => not_found(),
            },
            other => Self::error(400, "InvalidAction", &format!("unknown action {other}")),
        };
        Ok(outcome)
    }
}

// ============ Heroku ============

pub const HEROKU_COOKIE: &str = "heroku_session=1; path=/";

/// Heroku Postgres stand-in: cookie login, then the `/api/dbs` routes served
/// from a [`DummyDriver`].
#[derive(Clone, Default)]
pub struct HerokuMock {
    pub state: Arc<Mutex<MockState>>,
}

impl HerokuMock {
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.state).sent.clone()
    }

    pub fn logins(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path == "/login")
            .count()
    }

    fn json(status: i32, value: &serde_json::Value) -> RawOutcome {
        RawOutcome::new(status, value.to_string()).with_header("Content-Type", "application/json")
    }

    fn info(db: &Database) -> serde_json::Value {
        serde_json::json!({
            "id": db.id.parse::<u64>().unwrap_or_default(),
            "app_name": "data-services-d3adb33f",
            "color": "BLACK",
            "name": db.name,
            "created_at": "2013-01-09T20:07:00Z",
            "plan": db.size.id,
            "conn": {
                "resource_name": "thinking-wildly-1",
                "port": db.port,
                "user": db.user,
                "pass": db.password,
                "database": db.database,
                "host": db.host,
            },
        })
    }

    fn not_found() -> RawOutcome {
        Self::json(404, &serde_json::json!({ "error": "Database not found" }))
    }
}

impl HttpTransport for HerokuMock {
    fn send(&mut self, request: &HttpRequest) -> Result<RawOutcome> {
        let mut state = lock(&self.state);
        state.sent.push(request.clone());
        if state.reject_all {
            return Ok(Self::json(401, &serde_json::json!({ "error": "Unauthorized" })));
        }

        if request.path == "/login" {
            return Ok(RawOutcome::new(200, "").with_header("Set-Cookie", HEROKU_COOKIE));
        }
        if request.headers.get("cookie") != Some(HEROKU_COOKIE) {
            return Ok(Self::json(401, &serde_json::json!({ "error": "Login required" })));
        }

        let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();
        let outcome = match (request.method, segments.as_slice()) {
            (Method::Get, ["api", "dbs"]) => {
                let dbs: Vec<serde_json::Value> = state
                    .backend
                    .list_databases()?
                    .iter()
                    .map(|db| serde_json::json!({ "id": db.id, "name": db.name }))
                    .collect();
                Self::json(200, &serde_json::json!({ "success": "OK", "dbs": dbs }))
            }
            (Method::Get, ["api", "dbs", id, "info"]) => match state.backend.get_database(id) {
                Ok(db) => Self::json(200, &serde_json::json!({ "success": "OK", "db": Self::info(&db) })),
                Err(ProviderError::ResourceNotFound { .. }) => Self::not_found(),
                Err(e) => return Err(e),
            },
            (Method::Post, ["api", "dbs", id, "destroy"]) => {
                match state.backend.destroy_database(id) {
                    Ok(()) => Self::json(200, &serde_json::json!({})),
                    Err(ProviderError::ResourceNotFound { .. }) => Self::not_found(),
                    Err(e) => return Err(e),
                }
            }
            (Method::Post, ["api", "dbs", plan]) => {
                let form = cloudwire_provider::FlatParams::from_query_string(
                    request.body.as_deref().unwrap_or_default(),
                )?;
                let db = state.backend.create_database(&CreateDatabaseRequest::new(
                    form.get("name").unwrap_or_default(),
                    *plan,
                    "postgres",
                ))?;
                Self::json(
                    202,
                    &serde_json::json!({ "success": "OK", "db": { "id": db.id, "name": db.name } }),
                )
            }
            _ => Self::json(400, &serde_json::json!({ "error": "bad route" })),
        };
        Ok(outcome)
    }
}
