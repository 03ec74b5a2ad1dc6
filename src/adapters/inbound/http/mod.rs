/// HTTP adapter - axum router over the inbound ports
mod handlers;
mod models;
mod routes;

pub use models::{ApiError, ErrorResponse};
pub use routes::{create_router, AppState};
