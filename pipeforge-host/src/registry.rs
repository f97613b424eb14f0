use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use pipeforge_common::{
    error::Error,
    template::{Template, TemplateMetadata, TemplateType, validate_params},
};

/// Process-wide index of available templates, built-in and plugin
/// backed, keyed by the globally unique identifier.
/// ---
/// Registration is additive and idempotent on the identifier:
/// re-registering replaces the prior handle (the plugin upgrade
/// path). Reads proceed concurrently with a registration in progress
/// and observe either the old or the new handle, never a partial one.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: RwLock<HashMap<String, Arc<dyn Template>>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, template: Arc<dyn Template>) -> Result<(), Error> {
        let metadata = template.metadata();

        if metadata.identifier.is_empty() {
            return Err(Error::InvalidInput(
                "template declares an empty identifier".to_string(),
            ));
        }
        validate_params(&metadata.params)?;

        let prior = self
            .templates
            .write()
            .await
            .insert(metadata.identifier.clone(), template);

        match prior {
            Some(prior) => {
                info!(identifier = %metadata.identifier, "template handle replaced");
                if let Err(e) = prior.close().await {
                    warn!(identifier = %metadata.identifier, "failed to close replaced handle: {}", e);
                }
            }
            None => {
                info!(
                    identifier = %metadata.identifier,
                    template_type = %metadata.template_type,
                    "template registered"
                );
            }
        }

        Ok(())
    }

    pub async fn deregister(&self, identifier: &str) -> Result<(), Error> {
        let removed = self.templates.write().await.remove(identifier);

        match removed {
            Some(handle) => {
                if let Err(e) = handle.close().await {
                    warn!(identifier, "failed to close deregistered handle: {}", e);
                }
                info!(identifier, "template deregistered");
                Ok(())
            }
            None => Err(Error::not_found("template", identifier)),
        }
    }

    pub async fn get(&self, identifier: &str) -> Result<Arc<dyn Template>, Error> {
        self.templates
            .read()
            .await
            .get(identifier)
            .cloned()
            .ok_or_else(|| Error::not_found("template", identifier))
    }

    pub async fn build_templates(&self) -> Vec<TemplateMetadata> {
        self.templates_of_type(TemplateType::Build).await
    }

    pub async fn deployment_templates(&self) -> Vec<TemplateMetadata> {
        self.templates_of_type(TemplateType::Deploy).await
    }

    async fn templates_of_type(&self, template_type: TemplateType) -> Vec<TemplateMetadata> {
        let mut listed: Vec<TemplateMetadata> = self
            .templates
            .read()
            .await
            .values()
            .map(|t| t.metadata())
            .filter(|m| m.template_type == template_type)
            .collect();

        // Stable listing order for the API layer.
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        listed
    }

    /// Lookup by display name. Only the identifier is unique; when
    /// several templates claim the same name, the one with the
    /// smallest identifier wins so the answer is stable across runs.
    pub async fn get_build_template(&self, name: &str) -> Result<Arc<dyn Template>, Error> {
        self.find_by_name(name, TemplateType::Build).await
    }

    pub async fn get_deployment_template(&self, name: &str) -> Result<Arc<dyn Template>, Error> {
        self.find_by_name(name, TemplateType::Deploy).await
    }

    async fn find_by_name(
        &self,
        name: &str,
        template_type: TemplateType,
    ) -> Result<Arc<dyn Template>, Error> {
        self.templates
            .read()
            .await
            .iter()
            .filter(|(_, t)| {
                let m = t.metadata();
                m.template_type == template_type && m.name == name
            })
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, t)| Arc::clone(t))
            .ok_or_else(|| Error::not_found("template", name))
    }

    /// Explicit teardown: closes every handle, terminating any
    /// spawned plugin processes.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, Arc<dyn Template>)> =
            self.templates.write().await.drain().collect();

        for (identifier, handle) in drained {
            if let Err(e) = handle.close().await {
                warn!(identifier, "failed to close template on shutdown: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    use pipeforge_common::{
        application::Application,
        template::{ApplyOptions, TemplateParam},
    };

    struct FakeTemplate {
        metadata: TemplateMetadata,
        closed: Arc<AtomicBool>,
    }

    impl FakeTemplate {
        fn new(name: &str, identifier: &str, template_type: TemplateType) -> Arc<Self> {
            Arc::new(Self {
                metadata: TemplateMetadata::new(name, identifier, template_type),
                closed: Arc::new(AtomicBool::new(false)),
            })
        }
    }

    #[async_trait]
    impl Template for FakeTemplate {
        fn metadata(&self) -> TemplateMetadata {
            self.metadata.clone()
        }

        async fn apply(&self, opts: &ApplyOptions) -> Result<Application, Error> {
            Ok(Application {
                name: opts.application_name().to_string(),
                project_key: opts.project_key().to_string(),
                ..Default::default()
            })
        }

        async fn close(&self) -> Result<(), Error> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn registration_replaces_on_identifier_and_closes_the_prior_handle() {
        let registry = TemplateRegistry::new();

        let first = FakeTemplate::new("first", "io.pipeforge.t", TemplateType::Build);
        let second = FakeTemplate::new("second", "io.pipeforge.t", TemplateType::Build);

        registry.register(first.clone()).await.unwrap();
        registry.register(second).await.unwrap();

        let listed = registry.build_templates().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "second");
        assert!(first.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn views_filter_by_type() {
        let registry = TemplateRegistry::new();
        registry
            .register(FakeTemplate::new("b", "io.pipeforge.b", TemplateType::Build))
            .await
            .unwrap();
        registry
            .register(FakeTemplate::new("d", "io.pipeforge.d", TemplateType::Deploy))
            .await
            .unwrap();

        let builds = registry.build_templates().await;
        let deploys = registry.deployment_templates().await;
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].name, "b");
        assert_eq!(deploys.len(), 1);
        assert_eq!(deploys[0].name, "d");
    }

    #[tokio::test]
    async fn name_lookup_misses_with_not_found() {
        let registry = TemplateRegistry::new();
        registry
            .register(FakeTemplate::new("d", "io.pipeforge.d", TemplateType::Deploy))
            .await
            .unwrap();

        // Right name, wrong type.
        let err = registry.get_build_template("d").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        let err = registry.get_build_template("absent").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn colliding_display_names_resolve_to_the_smallest_identifier() {
        let registry = TemplateRegistry::new();
        registry
            .register(FakeTemplate::new("dup", "io.pipeforge.zz", TemplateType::Build))
            .await
            .unwrap();
        registry
            .register(FakeTemplate::new("dup", "io.pipeforge.aa", TemplateType::Build))
            .await
            .unwrap();

        let found = registry.get_build_template("dup").await.unwrap();
        assert_eq!(found.metadata().identifier, "io.pipeforge.aa");
    }

    #[tokio::test]
    async fn duplicate_param_schema_is_a_registration_error() {
        let registry = TemplateRegistry::new();

        let mut metadata =
            TemplateMetadata::new("dup", "io.pipeforge.dup", TemplateType::Build);
        metadata.params = vec![
            TemplateParam::string("param1", "a"),
            TemplateParam::string("param1", "b"),
        ];
        let template = Arc::new(FakeTemplate {
            metadata,
            closed: Arc::new(AtomicBool::new(false)),
        });

        let err = registry.register(template).await.unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));
    }

    #[tokio::test]
    async fn shutdown_closes_every_handle() {
        let registry = TemplateRegistry::new();
        let a = FakeTemplate::new("a", "io.pipeforge.a", TemplateType::Build);
        let b = FakeTemplate::new("b", "io.pipeforge.b", TemplateType::Deploy);
        registry.register(a.clone()).await.unwrap();
        registry.register(b.clone()).await.unwrap();

        registry.shutdown().await;

        assert!(a.closed.load(Ordering::SeqCst));
        assert!(b.closed.load(Ordering::SeqCst));
        assert!(registry.build_templates().await.is_empty());
    }

    #[tokio::test]
    async fn deregister_unknown_identifier_is_not_found() {
        let registry = TemplateRegistry::new();
        let err = registry.deregister("io.pipeforge.none").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
