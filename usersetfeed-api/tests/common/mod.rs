/// Common test utilities for integration tests
///
/// Builds the router over a seeded in-memory store and mints JWTs, so the
/// HTTP tests run without a database.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value as JsonValue;
use tower::ServiceExt;
use usersetfeed_api::app::{build_router, AppState};
use usersetfeed_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use usersetfeed_shared::auth::jwt::{create_token, Claims};
use usersetfeed_shared::models::custom_field::{ContextLevel, CustomField};
use usersetfeed_shared::models::profile_field::ProfileField;
use usersetfeed_shared::store::memory::MemoryStore;
use usersetfeed_shared::userset::{UsersetSettings, CREATE_CAPABILITY};

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

pub const EXPIRY_FIELD_ID: i64 = 11;

/// Test context containing the router and the store behind it
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
}

impl TestContext {
    /// Creates a context over a store seeded with the standard fields
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        seed_fields(&store).await;
        Self::with_store(store)
    }

    /// Creates a context over the given store
    pub fn with_store(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let state = AppState::new(store.clone(), test_config());

        Self {
            store,
            app: build_router(state),
        }
    }

    /// Sends a request and returns the status and JSON body
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, JsonValue) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(JsonValue::Null);
        (status, json)
    }
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
            run_migrations: false,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        userset: UsersetSettings {
            expiry_field_id: Some(EXPIRY_FIELD_ID),
        },
    }
}

/// Returns an authorization header value for a user with the given capabilities
pub fn bearer(capabilities: &[&str]) -> String {
    let claims = Claims::new(
        2,
        capabilities.iter().map(|capability| capability.to_string()).collect(),
    );
    format!("Bearer {}", create_token(&claims, JWT_SECRET).unwrap())
}

/// Authorization header value of a caller allowed to create user sets
pub fn admin_bearer() -> String {
    bearer(&[CREATE_CAPABILITY])
}

/// Builds a `userset_create` request
pub fn userset_create_request(authorization: Option<&str>, data: JsonValue) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/v1/webservice/userset_create")
        .header("content-type", "application/json");
    if let Some(authorization) = authorization {
        builder = builder.header("authorization", authorization);
    }
    builder
        .body(Body::from(serde_json::json!({ "data": data }).to_string()))
        .unwrap()
}

async fn seed_fields(store: &MemoryStore) {
    store
        .insert_profile_field(ProfileField {
            id: 1,
            shortname: "testdropdownwithdefault".to_string(),
            name: "Test dropdown".to_string(),
            datatype: "menu".to_string(),
            param1: Some("one\ntwo\nthree".to_string()),
            defaultdata: Some("two".to_string()),
        })
        .await;
    store
        .insert_profile_field(ProfileField {
            id: 8,
            shortname: "testtext".to_string(),
            name: "Test text".to_string(),
            datatype: "text".to_string(),
            param1: None,
            defaultdata: None,
        })
        .await;
    store
        .insert_custom_field(
            CustomField {
                id: EXPIRY_FIELD_ID,
                shortname: "textfielddate".to_string(),
                name: "Expiry".to_string(),
                datatype: "datetime".to_string(),
                multivalued: false,
            },
            &[ContextLevel::Userset],
        )
        .await;
}
