use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::Error,
    extension::{ExtensionStore, TemplateExtension},
    template::TemplateParam,
};

/// In-process store used by tests and the playground. Keeps the row
/// and the JSON-serialized params side record in separate maps to
/// honor the side-table contract.
#[derive(Debug, Default)]
pub struct MemoryExtensionStore {
    rows: Mutex<HashMap<Uuid, TemplateExtension>>,
    param_rows: Mutex<HashMap<Uuid, serde_json::Value>>,
}

impl MemoryExtensionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExtensionStore for MemoryExtensionStore {
    async fn save(&self, extension: &TemplateExtension) -> Result<(), Error> {
        let params = serde_json::to_value(&extension.params)?;

        let mut row = extension.clone();
        // The side record is authoritative for params.
        row.params = Vec::new();

        self.rows.lock().await.insert(extension.id, row);
        self.param_rows.lock().await.insert(extension.id, params);

        debug!(id = %extension.id, identifier = %extension.identifier, "extension saved");
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<TemplateExtension>, Error> {
        let Some(mut row) = self.rows.lock().await.get(&id).cloned() else {
            return Ok(None);
        };

        if let Some(raw) = self.param_rows.lock().await.get(&id) {
            let params: Vec<TemplateParam> = serde_json::from_value(raw.clone())?;
            row.params = params;
        }

        Ok(Some(row))
    }

    async fn delete(&self, id: Uuid) -> Result<(), Error> {
        self.param_rows.lock().await.remove(&id);

        match self.rows.lock().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(Error::Persistence(format!(
                "template extension {} not found for delete",
                id
            ))),
        }
    }

    async fn list(&self) -> Result<Vec<TemplateExtension>, Error> {
        let rows = self.rows.lock().await;
        let params = self.param_rows.lock().await;

        let mut out = Vec::with_capacity(rows.len());
        for (id, row) in rows.iter() {
            let mut row = row.clone();
            if let Some(raw) = params.get(id) {
                row.params = serde_json::from_value(raw.clone())?;
            }
            out.push(row);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateType;

    fn extension() -> TemplateExtension {
        let mut ext = TemplateExtension::new(
            "sample-build",
            "io.pipeforge.templates.sample-build",
            TemplateType::Build,
        );
        ext.params = vec![
            TemplateParam::string("param1", "value1"),
            TemplateParam::string("param2", "value2"),
        ];
        ext
    }

    #[tokio::test]
    async fn save_then_load_restores_params_from_side_record() {
        let store = MemoryExtensionStore::new();
        let ext = extension();

        store.save(&ext).await.unwrap();

        let loaded = store.load(ext.id).await.unwrap().expect("row missing");
        assert_eq!(loaded.identifier, ext.identifier);
        assert_eq!(loaded.params, ext.params);

        // Raw row holds no params, they live in the side record only.
        assert!(store.rows.lock().await.get(&ext.id).unwrap().params.is_empty());
    }

    #[tokio::test]
    async fn save_is_an_upsert() {
        let store = MemoryExtensionStore::new();
        let mut ext = extension();

        store.save(&ext).await.unwrap();
        ext.params = vec![TemplateParam::string("param1", "changed")];
        store.save(&ext).await.unwrap();

        let loaded = store.load(ext.id).await.unwrap().unwrap();
        assert_eq!(loaded.params.len(), 1);
        assert_eq!(loaded.params[0].value, "changed");
    }

    #[tokio::test]
    async fn delete_cascades_the_side_record() {
        let store = MemoryExtensionStore::new();
        let ext = extension();

        store.save(&ext).await.unwrap();
        store.delete(ext.id).await.unwrap();

        assert!(store.load(ext.id).await.unwrap().is_none());
        assert!(store.param_rows.lock().await.is_empty());

        let err = store.delete(ext.id).await.unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }
}
