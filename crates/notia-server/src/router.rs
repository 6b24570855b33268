use axum::http::Method;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{self, chat, emails, ingest, knowledge, stats, tasks};
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/emails", get(emails::list_emails))
        .route(
            "/api/tasks",
            get(tasks::list_tasks).post(tasks::create_task),
        )
        .route("/api/tasks/pending", get(tasks::pending_tasks))
        .route("/api/tasks/overdue", get(tasks::overdue_tasks))
        .route("/api/tasks/{id}", put(tasks::update_task_status))
        .route("/api/process-emails", post(ingest::process_emails))
        .route("/api/chat", post(chat::chat))
        .route("/api/search", get(knowledge::search))
        .route(
            "/api/knowledge",
            get(knowledge::list_knowledge).post(knowledge::add_knowledge),
        )
        .route("/api/statistics", get(stats::statistics))
        .layer(build_cors())
        .with_state(state)
}
