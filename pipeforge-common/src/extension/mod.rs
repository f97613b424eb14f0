mod memory;

pub use memory::MemoryExtensionStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

use crate::{
    error::Error,
    template::{TEMPLATE_NAMESPACE, TemplateParam, TemplateType},
};

/// Installed-plugin record, created when a plugin binary is
/// registered/uploaded and destroyed when it is removed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemplateExtension {
    pub id: Uuid,
    pub name: String,
    pub template_type: TemplateType,
    pub author: String,
    pub description: String,
    pub identifier: String,
    pub size: i64,
    pub perm: u32,
    pub checksum: String,
    pub object_path: String,
    pub params: Vec<TemplateParam>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TemplateExtension {
    pub fn new(
        name: impl Into<String>,
        identifier: impl Into<String>,
        template_type: TemplateType,
    ) -> Self {
        let identifier = identifier.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v5(&TEMPLATE_NAMESPACE, identifier.as_bytes()),
            name: name.into(),
            template_type,
            author: String::new(),
            description: String::new(),
            identifier,
            size: 0,
            perm: 0o755,
            checksum: String::new(),
            object_path: String::new(),
            params: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Storage collaborator for installed plugin records.
/// ---
/// Params are persisted as a serialized side record keyed by the
/// extension id: `save` writes row and side record together, `delete`
/// cascades the side record with the row. Implementations map their
/// backend failures to `Error::Persistence`.
#[async_trait]
pub trait ExtensionStore: Send + Sync + Debug + 'static {
    async fn save(&self, extension: &TemplateExtension) -> Result<(), Error>;

    async fn load(&self, id: Uuid) -> Result<Option<TemplateExtension>, Error>;

    async fn delete(&self, id: Uuid) -> Result<(), Error>;

    async fn list(&self) -> Result<Vec<TemplateExtension>, Error>;
}
