use axum::{
    Router,
    routing::{get, post},
};

pub mod credentials;
pub mod security_logs;
pub mod system;

/// Routes behind the token-verification middleware.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/change-password", post(credentials::change_password))
        .route("/security-logs", get(security_logs::list_security_logs))
        .route("/log-stats", get(security_logs::log_stats))
}
