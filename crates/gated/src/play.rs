//! Minimal play phase: keep the connection alive and drain inbound
//! packets. Gameplay belongs to another subsystem; this daemon only proves
//! the handoff.

use async_trait::async_trait;
use gate::{AuthorizedConnection, Conduit, KeepAlive, PlayHandler, PlayHandlerFactory};
use tracing::{debug, info};

pub struct KeepAlivePlayFactory;

impl PlayHandlerFactory for KeepAlivePlayFactory {
    fn create_handler(&self, _connection: &AuthorizedConnection) -> Option<Box<dyn PlayHandler>> {
        Some(Box::new(KeepAlivePlayHandler))
    }
}

struct KeepAlivePlayHandler;

#[async_trait]
impl PlayHandler for KeepAlivePlayHandler {
    async fn run(
        self: Box<Self>,
        conduit: Conduit,
        connection: AuthorizedConnection,
    ) -> gate::Result<()> {
        info!(
            "{} joined {} from {}",
            connection.profile(),
            connection.virtual_host().name(),
            connection.remote_addr()
        );

        let (mut reader, writer) = conduit.split();
        let mut keepalive = KeepAlive::attach(writer);

        let reason = loop {
            match reader.read_frame().await {
                Ok(frame) => {
                    debug!(
                        "Ignoring {} byte play packet from {}",
                        frame.len(),
                        connection.remote_addr()
                    );
                }
                Err(e) => break e,
            }
        };
        keepalive.detach();
        info!("{} disconnected: {}", connection.profile().name, reason);
        Ok(())
    }
}
