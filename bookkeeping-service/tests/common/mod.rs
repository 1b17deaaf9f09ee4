//! Test helper module for bookkeeping-service integration tests.
//!
//! Provides common setup utilities for PostgreSQL-based tests. Each test app
//! gets its own schema for isolation. When no test database is reachable the
//! spawn helpers return `None` and the test exits early.

#![allow(dead_code)]

use bookkeeping_service::config::{
    Config, DatabaseConfig, HttpConfig, PdfConfig, StorageConfig, WebhookConfig,
};
use bookkeeping_service::startup::Application;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};

/// Username the test config grants admin rights to.
pub const TEST_ADMIN: &str = "admin";
/// Regular (non-admin) test user.
pub const TEST_USER: &str = "alice";

// Counter for unique schema names
static SCHEMA_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Get the database URL for testing from the environment.
pub fn get_test_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok()
}

/// Generate a unique schema name for test isolation.
fn unique_schema_name() -> String {
    let counter = SCHEMA_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("test_bookkeeping_{}_{}", std::process::id(), counter)
}

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    client: reqwest::Client,
    schema_name: String,
    base_url: String,
    // Held so the storage directory outlives the app.
    _storage_dir: tempfile::TempDir,
}

impl TestApp {
    /// Spawn a new test application on a random port, or `None` when no test
    /// database is configured.
    pub async fn spawn() -> Option<Self> {
        let base_url = get_test_database_url()?;
        let schema_name = unique_schema_name();

        // Create schema for test isolation
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&base_url)
            .await
            .ok()?;

        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema_name))
            .execute(&pool)
            .await
            .ok();
        sqlx::query(&format!("CREATE SCHEMA {}", schema_name))
            .execute(&pool)
            .await
            .expect("Failed to create test schema");
        pool.close().await;

        // Use ? or & depending on whether URL already has query parameters
        let separator = if base_url.contains('?') { "&" } else { "?" };
        let db_url_with_schema = format!(
            "{}{}options=-c search_path%3D{}",
            base_url, separator, schema_name
        );

        let storage_dir = tempfile::tempdir().expect("Failed to create storage dir");

        let config = Config {
            server: HttpConfig {
                port: 0, // Random port
            },
            database: DatabaseConfig {
                url: Secret::new(db_url_with_schema),
                max_connections: 5,
                min_connections: 1,
            },
            storage: StorageConfig {
                backend: "local".to_string(),
                bucket: "unused".to_string(),
                local_path: storage_dir.path().display().to_string(),
                presign_ttl_secs: 300,
            },
            pdf: PdfConfig {
                browser_bin: None, // Built-in renderer in tests
                template_dir: "./templates".to_string(),
            },
            webhook: WebhookConfig { endpoint: None },
            admin_users: TEST_ADMIN.to_string(),
            log_level: "warn".to_string(),
            service_name: "bookkeeping-service-test".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept requests
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        Some(TestApp {
            address,
            port,
            client,
            schema_name,
            base_url,
            _storage_dir: storage_dir,
        })
    }

    /// Execute a GraphQL request as `user` and return the raw response body.
    pub async fn graphql(&self, user: &str, query: &str, variables: Value) -> Value {
        let response = self
            .client
            .post(format!("{}/graphql", self.address))
            .header("x-forwarded-user", user)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .expect("GraphQL request failed");
        response.json().await.expect("Invalid GraphQL response")
    }

    /// Like [`graphql`](Self::graphql) but asserts the response has no errors
    /// and returns only `data`.
    pub async fn graphql_ok(&self, user: &str, query: &str, variables: Value) -> Value {
        let body = self.graphql(user, query, variables).await;
        assert!(
            body.get("errors").is_none(),
            "GraphQL errors: {}",
            body["errors"]
        );
        body["data"].clone()
    }

    /// First error extension object of a failed response.
    pub fn first_error_extensions(body: &Value) -> &Value {
        &body["errors"][0]["extensions"]
    }

    /// Register an attachment and return its ID (expense requests need one).
    pub async fn register_attachment(&self, user: &str) -> String {
        let data = self
            .graphql_ok(
                user,
                r#"mutation($input: RegisterAttachmentInput!) {
                    registerAttachment(input: $input) {
                        attachment { attachmentId }
                        uploadUrl
                    }
                }"#,
                json!({ "input": { "fileName": "receipt.pdf", "contentType": "application/pdf" } }),
            )
            .await;
        data["registerAttachment"]["attachment"]["attachmentId"]
            .as_str()
            .expect("attachment id")
            .to_string()
    }

    /// Cleanup test resources (schema).
    pub async fn cleanup(&self) {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.base_url)
            .await
            .ok();

        if let Some(pool) = pool {
            let _ = sqlx::query(&format!(
                "DROP SCHEMA IF EXISTS {} CASCADE",
                self.schema_name
            ))
            .execute(&pool)
            .await;
            pool.close().await;
        }
    }
}
