use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::directory::Directory;
use crate::store::Store;

pub mod error;
pub mod handlers;
pub mod pages;
pub mod session;

/// Shared request context: the store and the read-only identity table,
/// constructed once at startup and passed by reference into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub directory: Arc<Directory>,
    pub session_secret: Arc<str>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::auth::index))
        .route(
            "/login",
            get(handlers::auth::login_page).post(handlers::auth::login_submit),
        )
        .route("/logout", get(handlers::auth::logout))
        .route("/dashboard", get(handlers::auth::dashboard))
        .route(
            "/mark_attendance/{group}",
            get(handlers::attendance::mark_group_page)
                .post(handlers::attendance::mark_group_submit),
        )
        .route(
            "/mark_dept_attendance/{dept}",
            get(handlers::attendance::mark_department_page)
                .post(handlers::attendance::mark_department_submit),
        )
        .route("/export_attendance", get(handlers::export::export_attendance))
        .route("/add_student", post(handlers::admin::add_student))
        .route("/update_student", post(handlers::admin::update_student))
        .route("/delete_student/{id}", get(handlers::admin::delete_student))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
