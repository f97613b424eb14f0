//! Conversions between the wire messages and the domain model.
//! Enum-ish fields travel as their UPPERCASE string spelling; an
//! unknown spelling from the other side of the wire is an
//! `InvalidInput` error.

use std::str::FromStr;

use pipeforge_common::{
    application::{Application, Variable, VariableType},
    error::Error,
    pipeline::{Job, Pipeline, PipelineType, Requirement, RequirementType, Stage, Step},
    template::{TemplateMetadata, TemplateParam, TemplateType},
};

use crate::v1::{
    ApplicationProto, GetTemplateMetadataResponse, JobProto, PipelineProto, RequirementProto,
    StageProto, StepProto, TemplateParamProto, VariableProto,
};

fn parse_enum<T: FromStr>(value: &str, what: &str) -> Result<T, Error> {
    T::from_str(value).map_err(|_| Error::InvalidInput(format!("unknown {} '{}'", what, value)))
}

pub fn params_to_proto(params: &[TemplateParam]) -> Vec<TemplateParamProto> {
    params
        .iter()
        .map(|p| TemplateParamProto {
            name: p.name.clone(),
            param_type: p.param_type.to_string(),
            value: p.value.clone(),
            description: p.description.clone(),
        })
        .collect()
}

pub fn params_from_proto(params: Vec<TemplateParamProto>) -> Result<Vec<TemplateParam>, Error> {
    params
        .into_iter()
        .map(|p| {
            Ok(TemplateParam {
                param_type: parse_enum::<VariableType>(&p.param_type, "parameter type")?,
                name: p.name,
                value: p.value,
                description: p.description,
            })
        })
        .collect()
}

pub fn metadata_to_proto(metadata: &TemplateMetadata) -> GetTemplateMetadataResponse {
    GetTemplateMetadataResponse {
        name: metadata.name.clone(),
        description: metadata.description.clone(),
        identifier: metadata.identifier.clone(),
        author: metadata.author.clone(),
        template_type: metadata.template_type.to_string(),
        has_hook: metadata.has_hook,
        params: params_to_proto(&metadata.params),
    }
}

pub fn metadata_from_proto(proto: GetTemplateMetadataResponse) -> Result<TemplateMetadata, Error> {
    if proto.identifier.is_empty() {
        return Err(Error::InvalidInput(
            "plugin reported an empty identifier".to_string(),
        ));
    }

    let template_type = parse_enum::<TemplateType>(&proto.template_type, "template type")?;

    let metadata = TemplateMetadata::new(proto.name, proto.identifier, template_type)
        .with_description(proto.description)
        .with_author(proto.author)
        .with_params(params_from_proto(proto.params)?);

    Ok(TemplateMetadata {
        has_hook: proto.has_hook,
        ..metadata
    })
}

pub fn application_to_proto(app: &Application) -> ApplicationProto {
    ApplicationProto {
        name: app.name.clone(),
        project_key: app.project_key.clone(),
        variables: app
            .variables
            .iter()
            .map(|v| VariableProto {
                name: v.name.clone(),
                var_type: v.var_type.to_string(),
                value: v.value.clone(),
            })
            .collect(),
        pipelines: app.pipelines.iter().map(pipeline_to_proto).collect(),
    }
}

pub fn application_from_proto(proto: ApplicationProto) -> Result<Application, Error> {
    Ok(Application {
        name: proto.name,
        project_key: proto.project_key,
        variables: proto
            .variables
            .into_iter()
            .map(|v| {
                Ok(Variable {
                    var_type: parse_enum::<VariableType>(&v.var_type, "variable type")?,
                    name: v.name,
                    value: v.value,
                })
            })
            .collect::<Result<_, Error>>()?,
        pipelines: proto
            .pipelines
            .into_iter()
            .map(pipeline_from_proto)
            .collect::<Result<_, Error>>()?,
    })
}

fn pipeline_to_proto(pipeline: &Pipeline) -> PipelineProto {
    PipelineProto {
        name: pipeline.name.clone(),
        pipeline_type: pipeline.pipeline_type.to_string(),
        stages: pipeline
            .stages
            .iter()
            .map(|s| StageProto {
                name: s.name.clone(),
                build_order: s.build_order,
                enabled: s.enabled,
                jobs: s
                    .jobs
                    .iter()
                    .map(|j| JobProto {
                        name: j.name.clone(),
                        steps: j
                            .steps
                            .iter()
                            .map(|step| StepProto {
                                name: step.name.clone(),
                                script: step.script.clone(),
                                requirements: step
                                    .requirements
                                    .iter()
                                    .map(|r| RequirementProto {
                                        name: r.name.clone(),
                                        req_type: r.req_type.to_string(),
                                        value: r.value.clone(),
                                    })
                                    .collect(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn pipeline_from_proto(proto: PipelineProto) -> Result<Pipeline, Error> {
    Ok(Pipeline {
        pipeline_type: parse_enum::<PipelineType>(&proto.pipeline_type, "pipeline type")?,
        name: proto.name,
        stages: proto
            .stages
            .into_iter()
            .map(|s| {
                Ok(Stage {
                    name: s.name,
                    build_order: s.build_order,
                    enabled: s.enabled,
                    jobs: s
                        .jobs
                        .into_iter()
                        .map(|j| {
                            Ok(Job {
                                name: j.name,
                                steps: j
                                    .steps
                                    .into_iter()
                                    .map(step_from_proto)
                                    .collect::<Result<_, Error>>()?,
                            })
                        })
                        .collect::<Result<_, Error>>()?,
                })
            })
            .collect::<Result<_, Error>>()?,
    })
}

fn step_from_proto(proto: StepProto) -> Result<Step, Error> {
    Ok(Step {
        name: proto.name,
        script: proto.script,
        requirements: proto
            .requirements
            .into_iter()
            .map(|r| {
                Ok(Requirement {
                    req_type: parse_enum::<RequirementType>(&r.req_type, "requirement type")?,
                    name: r.name,
                    value: r.value,
                })
            })
            .collect::<Result<_, Error>>()?,
    })
}
