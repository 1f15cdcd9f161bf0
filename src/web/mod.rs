//! Web application for the assistant.
//!
//! Serves a small question/answer page plus a JSON API:
//! - `GET  /api/v0/generate_sql?question=`
//! - `POST /api/v0/run_sql`
//! - `GET  /api/v0/get_training_data`
//! - `POST /api/v0/train`
//! - `POST /api/v0/remove_training_data`
//! - `GET  /api/v0/generate_questions`

pub mod handlers;

use crate::assistant::Assistant;
use crate::error::{AssistantError, AssistantResult};
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Build the router for `assistant`.
pub fn router(assistant: Arc<Assistant>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/v0/generate_sql", get(handlers::generate_sql))
        .route("/api/v0/run_sql", post(handlers::run_sql))
        .route("/api/v0/get_training_data", get(handlers::get_training_data))
        .route("/api/v0/train", post(handlers::train))
        .route(
            "/api/v0/remove_training_data",
            post(handlers::remove_training_data),
        )
        .route("/api/v0/generate_questions", get(handlers::generate_questions))
        .with_state(assistant)
}

/// HTTP server hosting the web application.
pub struct WebServer {
    assistant: Arc<Assistant>,
    /// Host to bind to
    host: String,
    /// Port to bind to
    port: u16,
}

impl WebServer {
    pub fn new(assistant: Arc<Assistant>, host: impl Into<String>, port: u16) -> Self {
        Self {
            assistant,
            host: host.into(),
            port,
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn run(&self) -> AssistantResult<()> {
        let bind_addr = self.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            AssistantError::config(format!(
                "Failed to bind to {}: {}. Check that the port is available",
                bind_addr, e
            ))
        })?;
        info!("Web application listening on http://{}", bind_addr);

        // Requests waiting on a slow model may hold the server open
        const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();
        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, router(self.assistant.clone()))
            .with_graceful_shutdown(shutdown_signal);

        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("Web application stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        return Err(AssistantError::internal(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for requests to finish (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        self.assistant.store().close().await;
        Ok(())
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
