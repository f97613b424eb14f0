pub mod application;
pub mod error;
pub mod extension;
pub mod handshake;
pub mod pipeline;
pub mod state;
pub mod template;
