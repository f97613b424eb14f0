mod plugin;

pub use plugin::PluginProcessState;
