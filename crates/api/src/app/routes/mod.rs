use axum::{
    routing::{get, put},
    Router,
};

pub mod auth;
pub mod common;
pub mod system;
pub mod workspaces;

/// Router for all application endpoints (the revocation gate and shared
/// services are layered on top in `app::build_app`).
pub fn router() -> Router {
    Router::new()
        .route("/me", get(system::me))
        .route("/me/password", put(system::change_password))
        .nest("/auth", auth::router())
        .nest("/workspaces", workspaces::router())
}
