use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::{sync::Mutex, time::timeout};
use tracing::{info, warn};

use pipeforge_common::{
    application::Application,
    error::Error,
    template::{ApplyOptions, Template, TemplateMetadata},
};

use crate::{client::PluginClient, process::PluginProcess};

#[derive(Clone, Debug)]
pub struct PluginSpawnConfig {
    pub binary: PathBuf,
    pub args: Vec<String>,
    pub handshake_timeout: Duration,
    pub apply_timeout: Duration,
}

impl PluginSpawnConfig {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            handshake_timeout: Duration::from_secs(10),
            apply_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct Runtime {
    process: PluginProcess,
    client: PluginClient,
}

/// Template handle backed by an out-of-process plugin.
/// ---
/// Metadata is captured once at the discovery handshake and served
/// from cache. Apply calls are serialized per instance; distinct
/// plugins run in parallel, there is no shared state between them.
/// A crashed or stopped instance is replaced by a fresh spawn on the
/// next call, mid-call state is never resumed.
#[derive(Debug)]
pub struct PluginTemplate {
    metadata: TemplateMetadata,
    spawn_config: PluginSpawnConfig,
    runtime: Mutex<Option<Runtime>>,
}

impl PluginTemplate {
    /// Spawns the plugin, performs the discovery handshake and caches
    /// the reported metadata.
    pub async fn start(spawn_config: PluginSpawnConfig) -> Result<Self, Error> {
        let (runtime, metadata) = spawn_runtime(&spawn_config, None).await?;

        info!(
            identifier = %metadata.identifier,
            template_type = %metadata.template_type,
            binary = %spawn_config.binary.display(),
            "plugin template registered"
        );

        Ok(Self {
            metadata,
            spawn_config,
            runtime: Mutex::new(Some(runtime)),
        })
    }

    pub fn spawn_config(&self) -> &PluginSpawnConfig {
        &self.spawn_config
    }
}

/// Spawn + handshake for one fresh instance. When `expected` is set
/// (a respawn), the new instance must report the same identifier.
async fn spawn_runtime(
    config: &PluginSpawnConfig,
    expected: Option<&str>,
) -> Result<(Runtime, TemplateMetadata), Error> {
    let mut process =
        PluginProcess::spawn(&config.binary, &config.args, config.handshake_timeout).await?;

    let handshake = async {
        let client = PluginClient::connect(process.address()).await?;
        let metadata = client.fetch_metadata().await?;
        Ok::<_, Error>((client, metadata))
    };

    let (client, metadata) = match timeout(config.handshake_timeout, handshake).await {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => {
            process.mark_crashed(&e.to_string()).await;
            return Err(e);
        }
        Err(_elapsed) => {
            process.mark_crashed("discovery handshake timed out").await;
            return Err(Error::PluginTimeout {
                identifier: config.binary.display().to_string(),
                timeout: config.handshake_timeout,
            });
        }
    };

    if let Some(expected) = expected {
        if metadata.identifier != expected {
            let message = format!(
                "respawned plugin reports identifier '{}', expected '{}'",
                metadata.identifier, expected
            );
            process.mark_crashed(&message).await;
            return Err(Error::PluginCrashed {
                identifier: expected.to_string(),
                message,
            });
        }
    }

    process.mark_ready()?;

    Ok((Runtime { process, client }, metadata))
}

#[async_trait]
impl Template for PluginTemplate {
    fn metadata(&self) -> TemplateMetadata {
        self.metadata.clone()
    }

    async fn apply(&self, opts: &ApplyOptions) -> Result<Application, Error> {
        let identifier = self.metadata.identifier.as_str();
        let mut guard = self.runtime.lock().await;

        // One respawn is allowed for a transport-level failure against
        // a live instance; a timeout is surfaced without retry.
        let mut respawned = false;

        loop {
            let needs_spawn = guard
                .as_ref()
                .map_or(true, |r| r.process.state().is_terminal());
            if needs_spawn {
                let (runtime, _) = spawn_runtime(&self.spawn_config, Some(identifier)).await?;
                *guard = Some(runtime);
            }

            let runtime = guard
                .as_mut()
                .ok_or_else(|| Error::Internal("plugin runtime missing".to_string()))?;
            runtime.process.mark_serving()?;

            match timeout(self.spawn_config.apply_timeout, runtime.client.apply(opts)).await {
                Ok(Ok(application)) => return Ok(application),
                Ok(Err(Error::GrpcComm(message))) => {
                    runtime.process.mark_crashed(&message).await;
                    if respawned {
                        return Err(Error::PluginCrashed {
                            identifier: identifier.to_string(),
                            message,
                        });
                    }
                    warn!(identifier, "transport failure, retrying with a fresh spawn: {}", message);
                    respawned = true;
                }
                Ok(Err(e)) => return Err(e),
                Err(_elapsed) => {
                    runtime
                        .process
                        .mark_crashed("apply call exceeded its timeout")
                        .await;
                    return Err(Error::PluginTimeout {
                        identifier: identifier.to_string(),
                        timeout: self.spawn_config.apply_timeout,
                    });
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Error> {
        if let Some(mut runtime) = self.runtime.lock().await.take() {
            runtime.process.stop().await?;
        }
        Ok(())
    }
}
