use actix_web::{body::to_bytes, http::StatusCode, test, test::TestRequest, App};
use checkout_engine::{
    events::EventProducers,
    test_utils::{prepare_env::prepare_test_env, prepare_env::random_db_path, MockGateway},
    CheckoutConfig,
    SqliteDatabase,
};
use log::debug;
use serde_json::Value;

use crate::{config::ServerOptions, server::configure_app};

/// A throw-away database and a scripted payment gateway behind the full set of routes.
pub struct TestSystem {
    pub db: SqliteDatabase,
    pub gateway: MockGateway,
}

impl TestSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        Self { db, gateway: MockGateway::new() }
    }

    /// Sends a request as `caller` (no `X-User-Id` header if empty) and returns the status and JSON body.
    pub async fn send(&self, caller: &str, role: Option<&str>, req: TestRequest) -> (StatusCode, Value) {
        let mut req = req;
        if !caller.is_empty() {
            req = req.insert_header(("X-User-Id", caller));
        }
        if let Some(role) = role {
            req = req.insert_header(("X-User-Role", role));
        }
        let app = configure_app(
            App::new(),
            self.db.clone(),
            self.gateway.clone(),
            CheckoutConfig::default(),
            EventProducers::default(),
            ServerOptions::default(),
        );
        let service = test::init_service(app).await;
        let res = match test::try_call_service(&service, req.to_request()).await {
            Ok(res) => res.into_parts().1.map_into_boxed_body(),
            Err(e) => e.error_response(),
        };
        let status = res.status();
        let bytes = to_bytes(res.into_body()).await.expect("Could not read response body");
        let body = serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null);
        debug!("Response: {status} {body}");
        (status, body)
    }

    pub async fn get(&self, caller: &str, path: &str) -> (StatusCode, Value) {
        self.send(caller, None, TestRequest::get().uri(path)).await
    }

    pub async fn post(&self, caller: &str, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(caller, None, TestRequest::post().uri(path).set_json(body)).await
    }

    pub async fn patch(&self, caller: &str, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(caller, None, TestRequest::patch().uri(path).set_json(body)).await
    }
}

pub fn error_code(body: &Value) -> &str {
    body["error"].as_str().unwrap_or_default()
}
