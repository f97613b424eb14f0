use std::net::SocketAddr;

use tracing::info;

use pipeforge_common::{
    application::Application,
    error::Error,
    template::{ApplyOptions, TemplateMetadata},
};
use pipeforge_protobuf::{
    ERROR_KIND_PARAMETER,
    mapping::{application_from_proto, metadata_from_proto},
    v1::{
        ApplyTemplateRequest, GetTemplateMetadataRequest,
        template_plugin_service_client::TemplatePluginServiceClient,
    },
};

/// Thin RPC client for one plugin process.
#[derive(Debug)]
pub struct PluginClient {
    inner: TemplatePluginServiceClient<tonic::transport::Channel>,
    endpoint: String,
}

impl PluginClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self, Error> {
        let endpoint = format!("http://{}", addr);
        let inner = TemplatePluginServiceClient::connect(endpoint.clone())
            .await
            .map_err(|e| {
                Error::GrpcComm(format!("failed to connect to plugin at {}: {}", endpoint, e))
            })?;

        Ok(Self { inner, endpoint })
    }

    /// One call per process instance; the registry caches the result
    /// so listing never re-invokes the plugin.
    pub async fn fetch_metadata(&self) -> Result<TemplateMetadata, Error> {
        let response = self
            .inner
            .clone()
            .get_template_metadata(GetTemplateMetadataRequest::default())
            .await
            .map_err(|e| {
                Error::GrpcComm(format!(
                    "metadata call to plugin at {} failed: {}",
                    self.endpoint, e
                ))
            })?
            .into_inner();

        let metadata = metadata_from_proto(response)?;
        info!(identifier = %metadata.identifier, endpoint = %self.endpoint, "plugin metadata fetched");
        Ok(metadata)
    }

    pub async fn apply(&self, opts: &ApplyOptions) -> Result<Application, Error> {
        let request = ApplyTemplateRequest {
            application_name: opts.application_name().to_string(),
            project_key: opts.project_key().to_string(),
            parameters: opts
                .parameters()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };

        let response = self
            .inner
            .clone()
            .apply_template(request)
            .await
            .map_err(|e| {
                Error::GrpcComm(format!(
                    "apply call to plugin at {} failed: {}",
                    self.endpoint, e
                ))
            })?
            .into_inner();

        if !response.success {
            return Err(match response.error_kind.as_str() {
                ERROR_KIND_PARAMETER => Error::Parameter(response.error_message),
                _ => Error::Internal(response.error_message),
            });
        }

        let application = response.application.ok_or_else(|| {
            Error::GrpcComm(format!(
                "plugin at {} reported success without an application",
                self.endpoint
            ))
        })?;

        application_from_proto(application)
    }
}
