pub mod mapping;

pub mod v1 {
    tonic::include_proto!("pipeforge.v1");
}

/// `error_kind` values carried by `ApplyTemplateResponse`.
pub const ERROR_KIND_PARAMETER: &str = "PARAMETER";
pub const ERROR_KIND_INTERNAL: &str = "INTERNAL";
