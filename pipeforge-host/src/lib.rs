//! Host side of the template plugin system: spawns plugin processes,
//! performs the discovery handshake, proxies apply calls over the RPC
//! surface, and serves the template registry to the API layer.

pub mod apply;
pub mod client;
pub mod config;
pub mod discovery;
pub mod process;
pub mod proxy;
pub mod registry;

pub use apply::apply_application_templates;
pub use config::HostConfig;
pub use discovery::PluginDiscovery;
pub use proxy::{PluginSpawnConfig, PluginTemplate};
pub use registry::TemplateRegistry;
