//! Application startup and lifecycle management.
//!
//! Wires the database, object storage, PDF renderer, outbox dispatcher and
//! the GraphQL schema together, then serves HTTP. Binding port 0 yields a
//! random port, which the integration tests rely on.

use crate::config::Config;
use crate::graphql::{build_schema, BookkeepingSchema};
use crate::middleware::CallerIdentity;
use crate::services::{
    get_metrics, Database, Dispatcher, EventBus, ExpenseWorkflow, HeadlessBrowserRenderer,
    Invoicing, LocalStorage, MinimalPdfRenderer, PdfRenderer, Payments, S3Storage, Storage,
    WebhookClient,
};
use axum::extract::State;
use axum::{http::StatusCode, response::IntoResponse, routing::get, routing::post, Json, Router};
use secrecy::ExposeSecret;
use serde_json::json;
use service_core::error::AppError;
use service_core::identity::AdminList;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Domain services shared by every GraphQL resolver.
#[derive(Clone)]
pub struct Services {
    pub db: Database,
    pub workflow: ExpenseWorkflow,
    pub payments: Payments,
    pub invoicing: Invoicing,
    pub dispatcher: Dispatcher,
    pub storage: Arc<dyn Storage>,
    pub presign_ttl: Duration,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub services: Services,
    pub schema: BookkeepingSchema,
    pub admin_list: Arc<AdminList>,
}

/// Health check endpoint for Docker/K8s liveness probes.
async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "bookkeeping-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness check endpoint for K8s readiness probes.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.services.db.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded" })),
        ),
    }
}

/// Prometheus metrics endpoint.
async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

/// GraphQL endpoint. The caller identity is resolved from the forwarded
/// header before execution and injected into the request data, so resolvers
/// never touch HTTP types.
async fn graphql_handler(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let request = request.data(identity.0);
    Json(state.schema.execute(request).await)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        crate::services::metrics::init_metrics();

        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        db.run_migrations().await?;
        db.bootstrap_accounts().await?;

        let presign_ttl = Duration::from_secs(config.storage.presign_ttl_secs);
        let storage: Arc<dyn Storage> = match config.storage.backend.as_str() {
            "s3" => {
                let aws_config = aws_config::load_from_env().await;
                let client = aws_sdk_s3::Client::new(&aws_config);
                tracing::info!(bucket = %config.storage.bucket, "Using S3 storage");
                Arc::new(S3Storage::new(client, config.storage.bucket.clone()))
            }
            _ => {
                tracing::info!(path = %config.storage.local_path, "Using local storage");
                Arc::new(LocalStorage::new(config.storage.local_path.clone()).await?)
            }
        };

        let pdf: Arc<dyn PdfRenderer> = match &config.pdf.browser_bin {
            Some(bin) => Arc::new(HeadlessBrowserRenderer::new(
                bin.clone(),
                config.pdf.template_dir.clone(),
            )),
            None => {
                tracing::warn!("No browser binary configured, using built-in PDF renderer");
                Arc::new(MinimalPdfRenderer::new())
            }
        };

        let webhook = WebhookClient::new(config.webhook.endpoint.clone());
        if webhook.is_configured() {
            tracing::info!("Webhook delivery enabled");
        }

        let bus = EventBus::new();
        let dispatcher = Dispatcher::new(db.clone(), webhook, bus);
        let workflow = ExpenseWorkflow::new(db.clone(), dispatcher.clone());
        let payments = Payments::new(db.clone(), dispatcher.clone(), workflow.clone());
        let invoicing = Invoicing::new(db.clone(), storage.clone(), pdf, presign_ttl);

        let services = Services {
            db,
            workflow,
            payments,
            invoicing,
            dispatcher,
            storage,
            presign_ttl,
        };

        let schema = build_schema(services.clone());
        let admin_list = Arc::new(AdminList::from_csv(&config.admin_users));

        let state = AppState {
            config: config.clone(),
            services,
            schema,
            admin_list,
        };

        // Bind listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Bookkeeping service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the application state for sharing with tests.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .route("/metrics", get(metrics_endpoint))
            .route("/graphql", post(graphql_handler))
            .layer(axum::Extension(self.state.admin_list.clone()))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state);

        axum::serve(self.listener, router).await.map_err(|e| {
            tracing::error!("HTTP server error: {}", e);
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
