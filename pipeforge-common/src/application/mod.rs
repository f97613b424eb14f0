use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::{error::Error, pipeline::Pipeline};

/// The root of the entity graph a template produces.
/// ---
/// Ownership transfers to the caller once a template returns it;
/// persistence and scheduling are downstream concerns.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub project_key: String,
    pub variables: Vec<Variable>,
    pub pipelines: Vec<Pipeline>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub var_type: VariableType,
    pub value: String,
}

/// Shared by application variables and template parameters.
#[derive(Clone, Debug, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum VariableType {
    #[default]
    String,
    Date,
    Script,
    Url,
    Binary,
}

impl Variable {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            var_type: VariableType::String,
            value: value.into(),
        }
    }
}

impl Application {
    /// Checks the structural invariants of the DAG model:
    /// stage ordering within every pipeline, and no duplicate
    /// `(name, type)` pipeline pair.
    pub fn validate(&self) -> Result<(), Error> {
        for (idx, pipeline) in self.pipelines.iter().enumerate() {
            if !pipeline.stages_are_ordered() {
                return Err(Error::InvalidInput(format!(
                    "Pipeline '{}' has stages out of build order",
                    pipeline.name
                )));
            }

            for other in self.pipelines.iter().skip(idx + 1) {
                if other.name == pipeline.name && other.pipeline_type == pipeline.pipeline_type {
                    return Err(Error::TemplateConflict {
                        name: pipeline.name.clone(),
                        pipeline_type: pipeline.pipeline_type.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PipelineType, Stage};

    fn pipeline_with_orders(name: &str, orders: &[i64]) -> Pipeline {
        Pipeline {
            name: name.to_string(),
            pipeline_type: PipelineType::Build,
            stages: orders
                .iter()
                .map(|o| Stage {
                    name: format!("stage-{}", o),
                    build_order: *o,
                    enabled: true,
                    jobs: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn validate_accepts_ordered_stages() {
        let app = Application {
            name: "app1".to_string(),
            project_key: "PKEY".to_string(),
            variables: vec![],
            pipelines: vec![pipeline_with_orders("build", &[0, 0, 1, 3])],
        };
        assert!(app.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_order_stages() {
        let app = Application {
            pipelines: vec![pipeline_with_orders("build", &[1, 0])],
            ..Default::default()
        };
        assert!(matches!(app.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn validate_rejects_duplicate_pipeline_identity() {
        let app = Application {
            pipelines: vec![
                pipeline_with_orders("build", &[0]),
                pipeline_with_orders("build", &[0]),
            ],
            ..Default::default()
        };
        assert!(matches!(app.validate(), Err(Error::TemplateConflict { .. })));
    }
}
