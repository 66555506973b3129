//! Common test utilities for driving the router in-process.
//!
//! The fixture wires the real SQLite-backed registry, store, queue manager and
//! audit pipeline over a temporary database, exactly as the binary does.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use ghiseu_core::{
    create_audit_system, AuditStore, ChangeNotifier, Config, Database, DatabaseConfig,
    DeskRegistry, QueueManager, SqliteAuditStore, SqliteDeskRegistry, SqliteTicketStore,
    TicketStore,
};
use ghiseu_server::{create_router, AppState};

/// Test fixture with an in-process router over a temporary database.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state, for reaching the queue and notifier directly
    pub state: Arc<AppState>,
    /// Temporary directory holding the database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// The `result` array of the envelope.
    pub fn result(&self) -> &Vec<Value> {
        self.body["result"]
            .as_array()
            .expect("result should be an array")
    }

    /// The single item of a successful envelope.
    pub fn item(&self) -> &Value {
        let result = self.result();
        assert_eq!(result.len(), 1, "expected one item, got {:?}", result);
        &result[0]
    }

    pub fn error_message(&self) -> &str {
        self.body["errorMessage"].as_str().unwrap_or_default()
    }
}

impl TestFixture {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            ..Default::default()
        };

        let db = Database::open(&db_path).expect("Failed to open database");

        let audit_store: Arc<dyn AuditStore> =
            Arc::new(SqliteAuditStore::new(db.clone()).expect("Failed to create audit store"));
        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let notifier = ChangeNotifier::new(config.queue.notify_capacity);
        let tickets: Arc<dyn TicketStore> =
            Arc::new(SqliteTicketStore::new(db.clone()).with_notifier(notifier.clone()));
        let desks: Arc<dyn DeskRegistry> = Arc::new(SqliteDeskRegistry::new(db));
        let queue = Arc::new(QueueManager::new(desks, tickets).with_audit(audit_handle.clone()));

        let state = Arc::new(AppState::new(
            config,
            audit_handle,
            audit_store,
            queue,
            notifier,
        ));

        let router = create_router(Arc::clone(&state));

        Self {
            router,
            state,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with no body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Register an active desk and return its JSON representation.
    pub async fn register_desk(&self, code: &str) -> Value {
        let response = self
            .post("/desks", json!({ "code": code, "name": format!("Desk {}", code) }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.item().clone()
    }

    /// Issue a ticket for a desk and return it.
    pub async fn issue_ticket(&self, desk_id: i64) -> Value {
        let response = self.post("/tickets", json!({ "deskId": desk_id })).await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.item().clone()
    }

    /// Poll the audit endpoint until `count` events match `query`.
    pub async fn wait_for_audit(&self, query: &str, count: usize) -> Vec<Value> {
        for _ in 0..50 {
            let response = self.get(&format!("/audit?{}", query)).await;
            if response.result().len() >= count {
                return response.result().clone();
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("audit query '{}' never reached {} events", query, count);
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
