use super::handlers::{analyze_package, get_summary_job, health, submit_summary_job};
use crate::ports::inbound::{RiskAnalysisPort, SummaryJobPort};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Shared handler state: the two inbound ports
#[derive(Clone)]
pub struct AppState {
    pub analysis: Arc<dyn RiskAnalysisPort>,
    pub jobs: Arc<dyn SummaryJobPort>,
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/analyze", post(analyze_package))
        .route("/summary-jobs", post(submit_summary_job))
        .route("/summary-jobs/{id}", get(get_summary_job));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health))
        .with_state(state)
}
