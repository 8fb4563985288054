#![allow(clippy::result_large_err)] // Server start-up returns AppError for consistent diagnostics.

pub mod handlers;

use crate::core::config::ServiceConfig;
use crate::core::error::AppError;
use crate::core::janitor::Janitor;
use crate::core::job::JobRunner;
use crate::core::types::ErrorCategory;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Extension},
    http::{header, HeaderValue, Method, Response, StatusCode},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::util::MapResponseLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared across requests.
pub struct AppState {
    pub runner: JobRunner,
    pub health_message: String,
}

/// Build the HTTP router: the JSON API, static assets for every other path,
/// a body size cap, permissive CORS and request tracing.
pub fn build_router(config: &ServiceConfig, runner: JobRunner) -> Router {
    let state = Arc::new(AppState {
        runner,
        health_message: config.server.health_message.clone(),
    });
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/obfuscate", post(handlers::obfuscate))
        .fallback_service(ServeDir::new(&config.server.static_dir))
        .layer(Extension(state))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes))
        .layer(MapResponseLayer::new(rewrite_payload_too_large))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn rewrite_payload_too_large(mut response: Response<Body>) -> Response<Body> {
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let body = json!({ "error": handlers::PAYLOAD_TOO_LARGE_MESSAGE }).to_string();
        *response.body_mut() = Body::from(body);
        response.headers_mut().remove(header::CONTENT_LENGTH);
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }
    response
}

/// Start the service and block until it is shut down by a signal.
pub async fn serve(config: ServiceConfig) -> Result<(), AppError> {
    serve_internal(config, None).await
}

/// Start the service and notify once the bind address is known (test helper).
pub async fn serve_with_ready_notifier(
    config: ServiceConfig,
    ready_notifier: oneshot::Sender<SocketAddr>,
) -> Result<(), AppError> {
    serve_internal(config, Some(ready_notifier)).await
}

async fn serve_internal(
    config: ServiceConfig,
    ready_notifier: Option<oneshot::Sender<SocketAddr>>,
) -> Result<(), AppError> {
    let bind_addr: SocketAddr = config.server.bind.parse().map_err(|err| {
        AppError::new(
            ErrorCategory::ConfigError,
            format!("invalid bind address {}: {}", config.server.bind, err),
        )
    })?;

    let runner = JobRunner::from_config(&config);
    runner.workspace().ensure_root()?;

    // Dropping the handle also stops the sweep, so an aborted server never
    // leaves the janitor running.
    let janitor = Janitor::new(
        runner.workspace().root().to_path_buf(),
        config.workspace.sweep_interval,
        config.workspace.retention,
    )
    .spawn();

    let runner_root = runner.workspace().root().to_path_buf();
    let router = build_router(&config, runner);
    let listener = TcpListener::bind(bind_addr).await.map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to bind listener {}: {}", bind_addr, err),
        )
    })?;
    let local_addr = listener.local_addr().map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to determine listener address: {}", err),
        )
    })?;
    if let Some(tx) = ready_notifier {
        let _ = tx.send(local_addr);
    }
    info!(
        scratch_dir = %runner_root.display(),
        "obfuscator api listening on {}",
        local_addr
    );
    info!("health check: http://{}/api/health", local_addr);

    let served = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| {
            AppError::new(
                ErrorCategory::InternalError,
                format!("server terminated: {}", err),
            )
        });

    janitor.stop().await;
    info!("obfuscator api stopped");
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
