use askama::Template;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use migration::MigratorTrait;
use sea_orm::Database;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::task::{TaskState, create_task_router};

/// Error page shared by every handler.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    status_code: u16,
    reason: &'static str,
    message: String,
}

impl ErrorTemplate {
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: status_code.as_u16(),
            reason: status_code.canonical_reason().unwrap_or("Error"),
            message: message.into(),
        }
    }

    /// Renders the error page with `status_code`, or an empty body if rendering fails.
    pub fn response(status_code: StatusCode, message: impl Into<String>) -> Response {
        match Self::new(status_code, message).render() {
            Ok(rendered) => (status_code, Html(rendered)).into_response(),
            Err(err) => {
                tracing::error!("Failed to render error page: {}", err);
                status_code.into_response()
            }
        }
    }
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let task_state = Arc::new(TaskState {
        db: Arc::new(db),
        clock: Arc::new(SystemClock),
    });

    axum::serve(listener, create_app(task_state)).await?;
    Ok(())
}

/// Builds the full application router.
pub fn create_app(task_state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health_check_handler))
        .merge(create_task_router(task_state))
        .fallback(not_found_handler)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

#[tracing::instrument]
pub async fn not_found_handler() -> Response {
    ErrorTemplate::response(StatusCode::NOT_FOUND, "This page does not exist.")
}
