use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Not Found: {resource_type} '{resource_id}'")]
    NotFound {
        resource_type: String,
        resource_id: String,
    },

    #[error("Parameter Error: {0}")]
    Parameter(String),

    #[error("Plugin Timeout: '{identifier}' did not respond within {timeout:?}")]
    PluginTimeout {
        identifier: String,
        timeout: Duration,
    },

    #[error("Plugin Crashed: '{identifier}': {message}")]
    PluginCrashed { identifier: String, message: String },

    #[error("Template Conflict: pipeline '{name}' of type {pipeline_type} produced twice")]
    TemplateConflict {
        name: String,
        pipeline_type: String,
    },

    #[error("Upstream HTTP Error: status {status}")]
    UpstreamHttp { status: u16 },

    #[error("Persistence Error: {0}")]
    Persistence(String),

    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("State Transition Error: {0}")]
    StateTransition(String),

    #[error("gRPC Communication Error: {0}")]
    GrpcComm(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Internal Error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Error::NotFound {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }
}
