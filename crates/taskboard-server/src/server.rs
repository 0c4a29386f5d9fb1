use std::sync::Arc;

use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use taskboard_store::Database;

use crate::routes::{tasks, users};
use crate::service::{TaskService, UserService};

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<TaskService>,
    pub users: Arc<UserService>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            tasks: Arc::new(TaskService::new(db.clone())),
            users: Arc::new(UserService::new(db)),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/api/tasks/users", get(tasks::list_task_users))
        .route(
            "/api/tasks/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .patch(tasks::patch_task)
                .delete(tasks::delete_task),
        )
        .route("/api/tasks/{id}/assign-users", post(tasks::assign_users))
        .route("/api/tasks/{id}/status", patch(tasks::update_status))
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/users/tasks", get(users::list_user_tasks))
        .route(
            "/api/users/{id}",
            put(users::update_user)
                .patch(users::patch_user)
                .delete(users::delete_user),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle that keeps it alive.
pub async fn start(config: ServerConfig, db: Database) -> Result<ServerHandle, std::io::Error> {
    let router = build_router(AppState::new(db));
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "taskboard server started");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server,
    })
}

/// Handle returned by `start()` — keeps the serve task alive.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}

/// Health check endpoint.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
