//! Application startup and lifecycle management.

use crate::config::VareConfig;
use crate::handlers::{
    create_record, delete_record, generate, get_record, health_check, latest_records,
    list_records, metrics_handler, readiness_check, root, update_todo,
};
use crate::middleware::http_metrics_middleware;
use crate::services::providers::{GeminiConfig, GeminiTextProvider, MockTextProvider, TextProvider};
use crate::services::{init_metrics, Database, GenerationAdapter};
use axum::{
    middleware::from_fn,
    routing::{get, patch, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::{request_id_middleware, REQUEST_ID_HEADER};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub generator: GenerationAdapter,
}

/// Pick the text provider: Gemini when a key is configured, the mock otherwise.
///
/// Production refuses to start without a key.
pub fn build_provider(config: &VareConfig) -> Result<Arc<dyn TextProvider>, AppError> {
    if config.genai.is_configured() {
        let provider = GeminiTextProvider::new(GeminiConfig {
            api_key: config.genai.api_key.clone(),
            model: config.genai.model.clone(),
            api_base: config.genai.api_base.clone(),
            timeout: Duration::from_secs(config.genai.timeout_secs),
        })
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("{}", e)))?;

        tracing::info!(model = %config.genai.model, "Initialized Gemini text provider");
        Ok(Arc::new(provider))
    } else if config.is_prod {
        Err(AppError::ConfigError(anyhow::anyhow!(
            "GEMINI_API_KEY is required in production but not set"
        )))
    } else {
        tracing::warn!("No Gemini API key configured, using mock text provider");
        Ok(Arc::new(MockTextProvider::sample()))
    }
}

/// Build the HTTP router with all routes and layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/api", post(generate))
        .route("/db/", post(create_record).get(list_records))
        .route("/db/latest", get(latest_records))
        .route("/db/:id", get(get_record).delete(delete_record))
        .route("/db/todos/:todo_id", patch(update_todo))
        .layer(from_fn(http_metrics_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application: metrics, pool, migrations, provider and listener.
    pub async fn build(config: VareConfig) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            e
        })?;

        db.run_migrations().await?;

        let generator = GenerationAdapter::new(build_provider(&config)?);
        let state = AppState { db, generator };

        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("vare-service: HTTP on port {}", port);

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

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Serve until `shutdown` resolves, then drain requests and close the pool.
    pub async fn run_until_stopped<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let db = self.state.db.clone();
        let router = build_router(self.state);

        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown)
            .await;

        if let Err(e) = &result {
            tracing::error!("HTTP server error: {}", e);
        }

        db.close().await;
        result
    }
}
