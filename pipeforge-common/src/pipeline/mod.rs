use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    pub pipeline_type: PipelineType,
    pub stages: Vec<Stage>,
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum PipelineType {
    Build,
    Testing,
    Deploy,
}

/// A build-order-ranked group of jobs.
/// ---
/// Stages execute in non-decreasing `build_order`; stages sharing an
/// order value are concurrency-eligible and carry no mutual ordering.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub build_order: i64,
    pub enabled: bool,
    pub jobs: Vec<Job>,
}

/// A named unit of work composed of ordered steps.
/// ---
/// Jobs contain steps and nothing else; the two-level tree is fixed
/// by the types, jobs never nest inside jobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub steps: Vec<Step>,
}

/// The smallest executable unit: a script body plus the capabilities
/// an execution agent must satisfy to run it. Placeholder syntax in
/// the script (e.g. `{{.app.name}}`) is opaque to this model and is
/// resolved by the execution engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub script: String,
    pub requirements: Vec<Requirement>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    pub req_type: RequirementType,
    pub value: String,
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")]
#[non_exhaustive]
pub enum RequirementType {
    Binary,
    Network,
    Plugin,
    Service,
    Memory,
}

impl Requirement {
    pub fn binary(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value: name.clone(),
            name,
            req_type: RequirementType::Binary,
        }
    }
}

impl Step {
    pub fn script(body: impl Into<String>, requirements: Vec<Requirement>) -> Self {
        Self {
            name: "script".to_string(),
            script: body.into(),
            requirements,
        }
    }

    pub fn named(
        name: impl Into<String>,
        body: impl Into<String>,
        requirements: Vec<Requirement>,
    ) -> Self {
        Self {
            name: name.into(),
            script: body.into(),
            requirements,
        }
    }
}

impl Pipeline {
    pub fn new(name: impl Into<String>, pipeline_type: PipelineType) -> Self {
        Self {
            name: name.into(),
            pipeline_type,
            stages: Vec::new(),
        }
    }

    pub fn stages_are_ordered(&self) -> bool {
        self.stages
            .windows(2)
            .all(|pair| pair[0].build_order <= pair[1].build_order)
    }

    /// Normalizes stage ordering. The sort is stable so stages sharing
    /// a build order keep their declared relative position.
    pub fn sort_stages(&mut self) {
        self.stages.sort_by_key(|s| s.build_order);
    }
}
