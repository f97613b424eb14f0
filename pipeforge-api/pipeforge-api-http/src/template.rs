//! Template API handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use pipeforge_common::{application::Application, template::TemplateMetadata};
use pipeforge_host::{TemplateRegistry, apply_application_templates};

use crate::error::ApiResult;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TemplateRegistry>,
}

/// POST /template/{project_key} request body. Template selection is
/// by display name, matching the listing endpoints.
#[derive(Debug, Deserialize)]
pub struct ApplyTemplatesRequest {
    pub name: String,
    pub repo: String,
    pub build_template: String,
    pub deploy_template: String,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// GET /template/build
pub async fn list_build_templates(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TemplateMetadata>>> {
    tracing::debug!("listing build templates");
    Ok(Json(state.registry.build_templates().await))
}

/// GET /template/deploy
pub async fn list_deployment_templates(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TemplateMetadata>>> {
    tracing::debug!("listing deployment templates");
    Ok(Json(state.registry.deployment_templates().await))
}

/// POST /template/{project_key}
pub async fn apply_templates(
    State(state): State<AppState>,
    Path(project_key): Path<String>,
    Json(req): Json<ApplyTemplatesRequest>,
) -> ApiResult<Json<Application>> {
    tracing::info!(project_key, application = %req.name, "applying application templates");

    let build = state.registry.get_build_template(&req.build_template).await?;
    let deploy = state
        .registry
        .get_deployment_template(&req.deploy_template)
        .await?;

    let application = apply_application_templates(
        &project_key,
        &req.name,
        &req.repo,
        &req.parameters,
        build,
        deploy,
    )
    .await?;

    Ok(Json(application))
}
