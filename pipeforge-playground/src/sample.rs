//! Sample templates: a build template producing a two-stage BUILD
//! pipeline and a minimal deploy counterpart. The build template also
//! runs as a standalone plugin process via the `serve` subcommand.

use async_trait::async_trait;

use pipeforge_common::{
    application::{Application, Variable},
    error::Error,
    pipeline::{Job, Pipeline, PipelineType, Requirement, Stage, Step},
    template::{ApplyOptions, Template, TemplateMetadata, TemplateParam, TemplateType},
};

pub struct SampleBuildTemplate;

impl SampleBuildTemplate {
    fn clone_step() -> Step {
        Step::named(
            "git clone",
            "git clone {{.app.repo}} {{.app.name}}",
            vec![Requirement::binary("git")],
        )
    }
}

#[async_trait]
impl Template for SampleBuildTemplate {
    fn metadata(&self) -> TemplateMetadata {
        TemplateMetadata::new(
            "sample-build",
            "io.pipeforge.templates.sample-build",
            TemplateType::Build,
        )
        .with_description("Builds, tests and packages a make-based project")
        .with_author("pipeforge authors")
        .with_params(vec![
            TemplateParam::string("param1", "value1"),
            TemplateParam::string("param2", "value2"),
        ])
    }

    async fn apply(&self, opts: &ApplyOptions) -> Result<Application, Error> {
        let repo = opts.parameters().get("repo").unwrap_or_default().to_string();
        let name = opts
            .parameters()
            .get("name")
            .unwrap_or(opts.application_name())
            .to_string();

        Ok(Application {
            name: opts.application_name().to_string(),
            project_key: opts.project_key().to_string(),
            variables: vec![
                Variable::string("repo", repo),
                Variable::string("name", name),
            ],
            pipelines: vec![Pipeline {
                name: "build".to_string(),
                pipeline_type: PipelineType::Build,
                stages: vec![
                    Stage {
                        name: "Build".to_string(),
                        build_order: 0,
                        enabled: true,
                        jobs: vec![
                            Job {
                                name: "Compile".to_string(),
                                steps: vec![
                                    Self::clone_step(),
                                    Step::script(
                                        "cd {{.app.name}} && make",
                                        vec![Requirement::binary("make")],
                                    ),
                                    Step::named(
                                        "artifact upload",
                                        "upload {{.app.name}} {{.version}}",
                                        vec![],
                                    ),
                                ],
                            },
                            Job {
                                name: "Test".to_string(),
                                steps: vec![
                                    Self::clone_step(),
                                    Step::script(
                                        "cd {{.app.name}} && make test",
                                        vec![Requirement::binary("make")],
                                    ),
                                    Step::named("junit", "junit '*.xml'", vec![]),
                                ],
                            },
                        ],
                    },
                    Stage {
                        name: "Package".to_string(),
                        build_order: 1,
                        enabled: true,
                        jobs: vec![Job {
                            name: "Docker package".to_string(),
                            steps: vec![
                                Self::clone_step(),
                                Step::script(
                                    "cd {{.app.name}}\ndocker build -t {{.app.name}}-{{.version}} .\ndocker push {{.app.name}}-{{.version}}",
                                    vec![Requirement::binary("docker")],
                                ),
                            ],
                        }],
                    },
                ],
            }],
        })
    }
}

pub struct SampleDeployTemplate;

#[async_trait]
impl Template for SampleDeployTemplate {
    fn metadata(&self) -> TemplateMetadata {
        TemplateMetadata::new(
            "sample-deploy",
            "io.pipeforge.templates.sample-deploy",
            TemplateType::Deploy,
        )
        .with_description("Rolls the packaged image out to the target environment")
        .with_author("pipeforge authors")
    }

    async fn apply(&self, opts: &ApplyOptions) -> Result<Application, Error> {
        Ok(Application {
            name: opts.application_name().to_string(),
            project_key: opts.project_key().to_string(),
            variables: vec![],
            pipelines: vec![Pipeline {
                name: "deploy".to_string(),
                pipeline_type: PipelineType::Deploy,
                stages: vec![Stage {
                    name: "Deploy".to_string(),
                    build_order: 0,
                    enabled: true,
                    jobs: vec![Job {
                        name: "Rollout".to_string(),
                        steps: vec![Step::script(
                            "deploy {{.app.name}}-{{.version}}",
                            vec![Requirement::binary("kubectl")],
                        )],
                    }],
                }],
            }],
        })
    }
}
