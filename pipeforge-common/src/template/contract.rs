use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::{
    application::Application,
    error::Error,
    template::{ApplyOptions, TemplateParam},
};

/// Namespace for deterministic template ids, derived from the
/// globally unique identifier string.
pub const TEMPLATE_NAMESPACE: Uuid = uuid::uuid!("7c9e2f0a-5b1d-4c83-9f26-1a4708c1d9be");

#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TemplateType {
    Build,
    Deploy,
}

/// Identity metadata for API listing/selection, distinct from the
/// executable implementation behind it. For plugin-backed templates
/// this is captured once at the discovery handshake and cached.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemplateMetadata {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub author: String,

    /// Globally unique, reverse-DNS style. The only key the registry
    /// treats as unique; `name` is display-level only.
    pub identifier: String,
    pub template_type: TemplateType,
    pub params: Vec<TemplateParam>,
    pub has_hook: bool,
}

impl TemplateMetadata {
    pub fn new(
        name: impl Into<String>,
        identifier: impl Into<String>,
        template_type: TemplateType,
    ) -> Self {
        let identifier = identifier.into();
        Self {
            id: Uuid::new_v5(&TEMPLATE_NAMESPACE, identifier.as_bytes()),
            name: name.into(),
            description: String::new(),
            author: String::new(),
            identifier,
            template_type,
            params: Vec::new(),
            has_hook: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_params(mut self, params: Vec<TemplateParam>) -> Self {
        self.params = params;
        self
    }
}

/// The capability set every template implements, built-in or
/// out-of-process.
/// ---
/// `apply` is pure construction: the same options must produce a
/// structurally equivalent application graph (non-determinism is
/// allowed only in generated identifiers, never in topology), and no
/// side effects beyond building the returned graph. A remote script
/// fetch used to pre-populate a step is a declared input-resolution
/// step; its failure surfaces as an apply error, never a partial
/// result.
#[async_trait]
pub trait Template: Send + Sync {
    fn metadata(&self) -> TemplateMetadata;

    async fn apply(&self, opts: &ApplyOptions) -> Result<Application, Error>;

    /// Releases any resources behind the handle. Out-of-process
    /// implementations terminate their plugin process here.
    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template")
            .field("identifier", &self.metadata().identifier)
            .finish()
    }
}
