use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use pipeforge_common::{
    application::{Application, Variable},
    error::Error,
    template::{ApplyOptions, Template},
};

/// Builds one application from a chosen build template and a chosen
/// deploy template.
/// ---
/// The caller-declared `repo` and `name` variables take precedence
/// over template-declared defaults; pipelines are appended and a
/// `(name, type)` collision between templates is a conflict.
pub async fn apply_application_templates(
    project_key: &str,
    application_name: &str,
    repo: &str,
    parameters: &HashMap<String, String>,
    build: Arc<dyn Template>,
    deploy: Arc<dyn Template>,
) -> Result<Application, Error> {
    let mut supplied = parameters.clone();
    supplied
        .entry("repo".to_string())
        .or_insert_with(|| repo.to_string());
    supplied
        .entry("name".to_string())
        .or_insert_with(|| application_name.to_string());

    let mut application = Application {
        name: application_name.to_string(),
        project_key: project_key.to_string(),
        variables: vec![
            Variable::string("repo", repo),
            Variable::string("name", application_name),
        ],
        pipelines: Vec::new(),
    };

    for template in [build, deploy] {
        let metadata = template.metadata();
        let opts = ApplyOptions::bind(
            application_name,
            project_key,
            &metadata.params,
            &supplied,
        )?;

        let produced = template.apply(&opts).await?;
        merge_into(&mut application, produced)?;

        info!(
            identifier = %metadata.identifier,
            application = application_name,
            "template applied"
        );
    }

    application.validate()?;
    Ok(application)
}

fn merge_into(application: &mut Application, produced: Application) -> Result<(), Error> {
    for mut pipeline in produced.pipelines {
        let collides = application
            .pipelines
            .iter()
            .any(|p| p.name == pipeline.name && p.pipeline_type == pipeline.pipeline_type);
        if collides {
            return Err(Error::TemplateConflict {
                name: pipeline.name,
                pipeline_type: pipeline.pipeline_type.to_string(),
            });
        }

        pipeline.sort_stages();
        application.pipelines.push(pipeline);
    }

    for variable in produced.variables {
        // Variables merge by name; whatever is already present
        // (caller-declared first) wins.
        if application.variable(&variable.name).is_none() {
            application.variables.push(variable);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use pipeforge_common::{
        pipeline::{Pipeline, PipelineType, Stage},
        template::{TemplateMetadata, TemplateType},
    };

    struct StaticTemplate {
        metadata: TemplateMetadata,
        pipelines: Vec<(String, PipelineType, Vec<i64>)>,
        variables: Vec<Variable>,
    }

    impl StaticTemplate {
        fn new(
            identifier: &str,
            template_type: TemplateType,
            pipelines: Vec<(String, PipelineType, Vec<i64>)>,
        ) -> Arc<Self> {
            Arc::new(Self {
                metadata: TemplateMetadata::new(identifier, identifier, template_type),
                pipelines,
                variables: Vec::new(),
            })
        }
    }

    #[async_trait]
    impl Template for StaticTemplate {
        fn metadata(&self) -> TemplateMetadata {
            self.metadata.clone()
        }

        async fn apply(&self, opts: &ApplyOptions) -> Result<Application, Error> {
            Ok(Application {
                name: opts.application_name().to_string(),
                project_key: opts.project_key().to_string(),
                variables: self.variables.clone(),
                pipelines: self
                    .pipelines
                    .iter()
                    .map(|(name, pipeline_type, orders)| Pipeline {
                        name: name.clone(),
                        pipeline_type: *pipeline_type,
                        stages: orders
                            .iter()
                            .map(|o| Stage {
                                name: format!("stage-{}", o),
                                build_order: *o,
                                enabled: true,
                                jobs: vec![],
                            })
                            .collect(),
                    })
                    .collect(),
            })
        }
    }

    fn build_template() -> Arc<StaticTemplate> {
        StaticTemplate::new(
            "io.pipeforge.build",
            TemplateType::Build,
            vec![("build".to_string(), PipelineType::Build, vec![1, 0])],
        )
    }

    fn deploy_template() -> Arc<StaticTemplate> {
        StaticTemplate::new(
            "io.pipeforge.deploy",
            TemplateType::Deploy,
            vec![("deploy".to_string(), PipelineType::Deploy, vec![0])],
        )
    }

    #[tokio::test]
    async fn merges_build_and_deploy_pipelines() {
        let app = apply_application_templates(
            "PKEY",
            "app1",
            "git@example.com/app1",
            &HashMap::new(),
            build_template(),
            deploy_template(),
        )
        .await
        .unwrap();

        assert_eq!(app.name, "app1");
        assert_eq!(app.pipelines.len(), 2);
        assert_eq!(app.variable("repo").unwrap().value, "git@example.com/app1");

        // Stage order normalized on merge.
        assert!(app.pipelines.iter().all(|p| p.stages_are_ordered()));
    }

    #[tokio::test]
    async fn colliding_pipeline_identity_is_a_conflict() {
        let other_build = StaticTemplate::new(
            "io.pipeforge.other-build",
            TemplateType::Deploy,
            vec![("build".to_string(), PipelineType::Build, vec![0])],
        );

        let err = apply_application_templates(
            "PKEY",
            "app1",
            "git@example.com/app1",
            &HashMap::new(),
            build_template(),
            other_build,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::TemplateConflict { .. }));
    }

    #[tokio::test]
    async fn caller_declared_variables_beat_template_defaults() {
        let mut template = StaticTemplate::new(
            "io.pipeforge.build",
            TemplateType::Build,
            vec![("build".to_string(), PipelineType::Build, vec![0])],
        );
        Arc::get_mut(&mut template).unwrap().variables = vec![
            Variable::string("repo", "template-default"),
            Variable::string("team", "platform"),
        ];

        let app = apply_application_templates(
            "PKEY",
            "app1",
            "git@example.com/app1",
            &HashMap::new(),
            template,
            deploy_template(),
        )
        .await
        .unwrap();

        assert_eq!(app.variable("repo").unwrap().value, "git@example.com/app1");
        assert_eq!(app.variable("team").unwrap().value, "platform");
    }

    #[tokio::test]
    async fn identical_inputs_build_structurally_equal_applications() {
        let declared = HashMap::new();
        let run = || {
            apply_application_templates(
                "PKEY",
                "app1",
                "git@example.com/app1",
                &declared,
                build_template(),
                deploy_template(),
            )
        };

        let first = run().await.unwrap();
        let second = run().await.unwrap();

        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }
}
