//! Thin HTTP boundary over the template registry: listing and the
//! apply-application-templates operation. Wire shapes only; all
//! behavior lives in pipeforge-host.

pub mod error;
mod template;

pub use error::{ApiError, ApiResult};
pub use template::{ApplyTemplatesRequest, AppState};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/template/build", get(template::list_build_templates))
        .route("/template/deploy", get(template::list_deployment_templates))
        .route("/template/{project_key}", post(template::apply_templates))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
