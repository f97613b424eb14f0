use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{info, instrument, warn};

use pipeforge_common::{
    error::Error,
    template::{ApplyOptions, Template},
};
use pipeforge_protobuf::{
    ERROR_KIND_INTERNAL, ERROR_KIND_PARAMETER,
    mapping::{application_to_proto, metadata_to_proto},
    v1::{
        ApplyTemplateRequest, ApplyTemplateResponse, GetTemplateMetadataRequest,
        GetTemplateMetadataResponse,
        template_plugin_service_server::TemplatePluginService,
    },
};

pub struct GrpcTemplatePluginService {
    template: Arc<dyn Template>,
}

impl GrpcTemplatePluginService {
    pub fn new(template: Arc<dyn Template>) -> Self {
        Self { template }
    }
}

fn failure(kind: &str, error: &Error) -> ApplyTemplateResponse {
    ApplyTemplateResponse {
        application: None,
        success: false,
        error_kind: kind.to_string(),
        error_message: error.to_string(),
    }
}

#[tonic::async_trait]
impl TemplatePluginService for GrpcTemplatePluginService {
    #[instrument(skip(self, _request))]
    async fn get_template_metadata(
        &self,
        _request: Request<GetTemplateMetadataRequest>,
    ) -> Result<Response<GetTemplateMetadataResponse>, Status> {
        let metadata = self.template.metadata();
        info!(identifier = %metadata.identifier, "GetTemplateMetadata");

        Ok(Response::new(metadata_to_proto(&metadata)))
    }

    #[instrument(skip(self, request))]
    async fn apply_template(
        &self,
        request: Request<ApplyTemplateRequest>,
    ) -> Result<Response<ApplyTemplateResponse>, Status> {
        let req = request.into_inner();
        let metadata = self.template.metadata();
        info!(
            identifier = %metadata.identifier,
            application = %req.application_name,
            project = %req.project_key,
            "ApplyTemplate"
        );

        let opts = match ApplyOptions::bind(
            req.application_name,
            req.project_key,
            &metadata.params,
            &req.parameters,
        ) {
            Ok(opts) => opts,
            Err(e) => {
                warn!(identifier = %metadata.identifier, "parameter binding failed: {}", e);
                return Ok(Response::new(failure(ERROR_KIND_PARAMETER, &e)));
            }
        };

        match self.template.apply(&opts).await {
            Ok(application) => Ok(Response::new(ApplyTemplateResponse {
                application: Some(application_to_proto(&application)),
                success: true,
                error_kind: String::new(),
                error_message: String::new(),
            })),
            Err(e @ Error::Parameter(_)) => Ok(Response::new(failure(ERROR_KIND_PARAMETER, &e))),
            Err(e) => {
                warn!(identifier = %metadata.identifier, "apply failed: {}", e);
                Ok(Response::new(failure(ERROR_KIND_INTERNAL, &e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    use pipeforge_common::{
        application::{Application, Variable},
        pipeline::{Pipeline, PipelineType, Stage},
        template::{TemplateMetadata, TemplateParam, TemplateType},
    };

    struct EchoTemplate;

    #[async_trait]
    impl Template for EchoTemplate {
        fn metadata(&self) -> TemplateMetadata {
            TemplateMetadata::new("echo", "io.pipeforge.templates.echo", TemplateType::Build)
                .with_params(vec![
                    TemplateParam::string("param1", "value1"),
                    TemplateParam::string("required", ""),
                ])
        }

        async fn apply(&self, opts: &ApplyOptions) -> Result<Application, Error> {
            Ok(Application {
                name: opts.application_name().to_string(),
                project_key: opts.project_key().to_string(),
                variables: vec![Variable::string(
                    "param1",
                    opts.parameters().get("param1").unwrap_or_default(),
                )],
                pipelines: vec![Pipeline {
                    name: "build".to_string(),
                    pipeline_type: PipelineType::Build,
                    stages: vec![Stage {
                        name: "Build".to_string(),
                        build_order: 0,
                        enabled: true,
                        jobs: vec![],
                    }],
                }],
            })
        }
    }

    fn apply_request(parameters: HashMap<String, String>) -> Request<ApplyTemplateRequest> {
        Request::new(ApplyTemplateRequest {
            application_name: "app1".to_string(),
            project_key: "PKEY".to_string(),
            parameters,
        })
    }

    #[tokio::test]
    async fn metadata_answers_from_the_contract() {
        let service = GrpcTemplatePluginService::new(Arc::new(EchoTemplate));
        let res = service
            .get_template_metadata(Request::new(GetTemplateMetadataRequest {}))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(res.identifier, "io.pipeforge.templates.echo");
        assert_eq!(res.template_type, "BUILD");
        assert_eq!(res.params.len(), 2);
    }

    #[tokio::test]
    async fn apply_binds_defaults_before_invoking_the_template() {
        let service = GrpcTemplatePluginService::new(Arc::new(EchoTemplate));
        let supplied = HashMap::from([("required".to_string(), "yes".to_string())]);

        let res = service
            .apply_template(apply_request(supplied))
            .await
            .unwrap()
            .into_inner();

        assert!(res.success);
        let app = res.application.expect("application missing");
        assert_eq!(app.name, "app1");
        assert_eq!(app.variables[0].value, "value1");
    }

    #[tokio::test]
    async fn missing_required_parameter_reports_parameter_kind() {
        let service = GrpcTemplatePluginService::new(Arc::new(EchoTemplate));

        let res = service
            .apply_template(apply_request(HashMap::new()))
            .await
            .unwrap()
            .into_inner();

        assert!(!res.success);
        assert_eq!(res.error_kind, ERROR_KIND_PARAMETER);
        assert!(res.application.is_none());
    }
}
