//! Plugin-side SDK: turn any [`Template`] implementation into a
//! standalone plugin process the host can spawn and talk to.

mod script;
mod service;

pub use script::{fetch_remote_script, step_from_remote_script};
pub use service::GrpcTemplatePluginService;

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::info;

use pipeforge_common::{
    error::Error,
    handshake::format_handshake_line,
    template::{Template, validate_params},
};
use pipeforge_protobuf::v1::template_plugin_service_server::TemplatePluginServiceServer;

/// Serves `template` over the plugin RPC surface until the process is
/// terminated by the host.
/// ---
/// Binds an ephemeral loopback port when `listen_addr` is `None` and
/// announces the bound address with a single handshake line on
/// stdout; the host blocks on that line before connecting. The param
/// schema is validated here, a duplicate or unnamed declaration is a
/// registration-time error and the process refuses to serve.
pub async fn serve(
    template: Arc<dyn Template>,
    listen_addr: Option<SocketAddr>,
) -> Result<(), Error> {
    let metadata = template.metadata();

    if metadata.identifier.is_empty() {
        return Err(Error::InvalidInput(
            "template declares an empty identifier".to_string(),
        ));
    }
    validate_params(&metadata.params)?;

    let addr = listen_addr.unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 0)));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Config(format!("failed to bind plugin listener on {}: {}", addr, e)))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| Error::Config(format!("failed to resolve plugin listen address: {}", e)))?;

    // The handshake line is the host's cue; it must reach the pipe
    // before anything else blocks.
    println!("{}", format_handshake_line(local_addr));
    let _ = std::io::stdout().flush();

    info!(
        identifier = %metadata.identifier,
        template_type = %metadata.template_type,
        addr = %local_addr,
        "template plugin serving"
    );

    Server::builder()
        .add_service(TemplatePluginServiceServer::new(
            GrpcTemplatePluginService::new(template),
        ))
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await
        .map_err(|e| Error::GrpcComm(format!("plugin server terminated: {}", e)))
}
