mod contract;
mod options;
mod param;

pub use contract::{TEMPLATE_NAMESPACE, Template, TemplateMetadata, TemplateType};
pub use options::{ApplyOptions, BoundParams};
pub use param::{TemplateParam, validate_params};
