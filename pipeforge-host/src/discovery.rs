use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use pipeforge_common::error::Error;

use crate::{
    config::HostConfig,
    proxy::{PluginSpawnConfig, PluginTemplate},
    registry::TemplateRegistry,
};

/// Startup scan of the configured plugin location: every executable
/// file is spawned, handshaken and registered.
pub struct PluginDiscovery {
    plugin_dir: PathBuf,
    spawn_template: PluginSpawnConfig,
    registry: Arc<TemplateRegistry>,
}

impl PluginDiscovery {
    pub fn new(config: &HostConfig, registry: Arc<TemplateRegistry>) -> Self {
        let mut spawn_template = PluginSpawnConfig::new(&config.plugin_dir);
        spawn_template.handshake_timeout = config.handshake_timeout();
        spawn_template.apply_timeout = config.apply_timeout();

        Self {
            plugin_dir: config.plugin_dir.clone(),
            spawn_template,
            registry,
        }
    }

    /// Returns the number of templates registered. A plugin that
    /// fails to start is logged and skipped, one bad binary must not
    /// block the rest of the scan.
    pub async fn scan_and_register(&self) -> Result<usize, Error> {
        let mut entries = tokio::fs::read_dir(&self.plugin_dir).await.map_err(|e| {
            Error::Config(format!(
                "failed to scan plugin directory {}: {}",
                self.plugin_dir.display(),
                e
            ))
        })?;

        let mut registered = 0usize;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            Error::Config(format!(
                "failed to scan plugin directory {}: {}",
                self.plugin_dir.display(),
                e
            ))
        })? {
            let path = entry.path();
            if !is_plugin_candidate(&entry).await {
                continue;
            }

            let mut spawn_config = self.spawn_template.clone();
            spawn_config.binary = path.clone();

            match PluginTemplate::start(spawn_config).await {
                Ok(template) => {
                    if let Err(e) = self.registry.register(Arc::new(template)).await {
                        warn!(binary = %path.display(), "plugin registration refused: {}", e);
                        continue;
                    }
                    registered += 1;
                }
                Err(e) => {
                    warn!(binary = %path.display(), "plugin failed to start: {}", e);
                }
            }
        }

        info!(
            plugin_dir = %self.plugin_dir.display(),
            registered,
            "plugin scan complete"
        );

        Ok(registered)
    }
}

async fn is_plugin_candidate(entry: &tokio::fs::DirEntry) -> bool {
    let Ok(metadata) = entry.metadata().await else {
        return false;
    };

    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}
