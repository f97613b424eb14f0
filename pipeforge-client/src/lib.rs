//! HTTP client for the template API: template listing, name-based
//! selection and the apply-application-templates call.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use pipeforge_common::{
    application::Application, error::Error, template::TemplateMetadata,
};

pub struct TemplateApiClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ApplyTemplatesBody<'a> {
    name: &'a str,
    repo: &'a str,
    build_template: &'a str,
    deploy_template: &'a str,
    parameters: &'a HashMap<String, String>,
}

impl TemplateApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// GET /template/build
    pub async fn get_build_templates(&self) -> Result<Vec<TemplateMetadata>, Error> {
        self.get("/template/build").await
    }

    /// GET /template/deploy
    pub async fn get_deployment_templates(&self) -> Result<Vec<TemplateMetadata>, Error> {
        self.get("/template/deploy").await
    }

    /// Resolves a build template by display name, first match wins;
    /// only the identifier is unique.
    pub async fn get_build_template(&self, name: &str) -> Result<TemplateMetadata, Error> {
        let templates = self.get_build_templates().await?;

        templates
            .into_iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::not_found("template", name))
    }

    /// POST /template/{project_key}
    pub async fn apply_application_templates(
        &self,
        project_key: &str,
        name: &str,
        repo: &str,
        build_template: &str,
        deploy_template: &str,
        parameters: &HashMap<String, String>,
    ) -> Result<Application, Error> {
        let url = format!("{}/template/{}", self.base_url, project_key);
        debug!(url, name, "applying application templates");

        let response = self
            .client
            .post(&url)
            .json(&ApplyTemplatesBody {
                name,
                repo,
                build_template,
                deploy_template,
                parameters,
            })
            .send()
            .await
            .map_err(|e| Error::Internal(format!("request to {} failed: {}", url, e)))?;

        Self::handle_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url, "template api request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("request to {} failed: {}", url, e)))?;

        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, Error> {
        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamHttp {
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Internal(format!("failed to decode response body: {}", e)))
    }
}
