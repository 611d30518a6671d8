//! The listening server: bind, accept, dispatch, shut down.
//!
//! One accept loop runs on the accept group; every accepted connection is
//! spawned onto the I/O group and handled sequentially by a single task,
//! so per-connection state needs no locking. Failures are isolated per
//! connection and never disturb the accept loop.

use crate::conduit::Conduit;
use crate::connection::Connection;
use crate::crypto::EncryptionFactory;
use crate::error::{Error, Result};
use crate::handshake::{self, NextState};
use crate::host::VirtualHostResolver;
use crate::legacy::{self, SniffOutcome};
use crate::login::{legacy_server_id, LoginNegotiator};
use crate::play::PlayHandlerFactory;
use crate::runtime::EventLoopGroups;
use crate::status;
use session::SessionVerifier;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub port: u16,
    /// Connections that send nothing within this window are closed.
    pub read_timeout: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            port: 25565,
            read_timeout: Duration::from_secs(30),
        }
    }
}

/// The external collaborators every connection consumes.
pub struct Services {
    pub resolver: Arc<dyn VirtualHostResolver>,
    pub encryption_factory: Arc<dyn EncryptionFactory>,
    pub session_verifier: Arc<dyn SessionVerifier>,
    pub play_factory: Arc<dyn PlayHandlerFactory>,
}

/// The connection front-end server.
pub struct GateServer {
    config: GateConfig,
    services: Arc<Services>,
    groups: EventLoopGroups,
    shutdown_tx: Option<watch::Sender<bool>>,
    started: bool,
}

impl GateServer {
    pub fn new(config: GateConfig, services: Arc<Services>) -> Self {
        Self {
            config,
            services,
            groups: EventLoopGroups::new(),
            shutdown_tx: None,
            started: false,
        }
    }

    /// Bind the listener and start accepting. Returns the bound address.
    /// Starting twice is a usage error; bind failures abort startup.
    pub fn start(&mut self) -> Result<SocketAddr> {
        if self.started {
            return Err(Error::config("server already started"));
        }
        info!("Server is starting...");
        self.groups.start()?;

        // The legacy server id must exist before the first connection.
        let _ = legacy_server_id();

        let accept = self.groups.accept_handle()?;
        let io = self.groups.io_handle()?;
        let listener = accept
            .block_on(TcpListener::bind(("0.0.0.0", self.config.port)))
            .map_err(|e| {
                self.groups.shutdown();
                Error::Io(e)
            })?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);
        let services = self.services.clone();
        let config = self.config.clone();
        accept.spawn(accept_loop(listener, io, services, config, shutdown_rx));

        self.started = true;
        info!("Server started, listening on {}", local_addr);
        Ok(local_addr)
    }

    /// Stop accepting, then drain and terminate the worker groups, waiting
    /// for full termination. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if !self.started {
            return;
        }
        info!("Server is shutting down...");
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(true);
        }
        self.groups.shutdown();
        self.started = false;
        info!("Server stopped");
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// I/O group handle for subsystems that schedule auxiliary work (the
    /// session bridge, for one). The handle cannot shut the group down.
    pub fn io_handle(&self) -> Result<tokio::runtime::Handle> {
        self.groups.io_handle()
    }
}

impl Drop for GateServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn accept_loop(
    listener: TcpListener,
    io: tokio::runtime::Handle,
    services: Arc<Services>,
    config: GateConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                info!("Shutdown signal received, stopping accept loop");
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        debug!("Accepted connection from {}", peer);
                        let services = services.clone();
                        let config = config.clone();
                        io.spawn(async move {
                            if let Err(e) = serve_connection(stream, services, config).await {
                                log_connection_error(peer, &e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            }
        }
    }
}

fn log_connection_error(peer: SocketAddr, error: &Error) {
    if error.is_config() {
        error!("Connection {} failed: {}", peer, error);
    } else {
        match error {
            Error::ConnectionClosed | Error::ReadTimeout => {
                debug!("Connection {} ended: {}", peer, error)
            }
            _ => warn!(
                "Connection {} aborted ({}): {}",
                peer,
                error.category(),
                error
            ),
        }
    }
}

/// Drive one accepted connection through sniffing, handshake and the
/// status or login phase, handing off to the play handler on success.
pub async fn serve_connection(
    stream: TcpStream,
    services: Arc<Services>,
    config: GateConfig,
) -> Result<()> {
    let mut conduit = Conduit::new(stream, config.read_timeout)?;
    let base = Connection::new(conduit.peer());

    if legacy::detect(&mut conduit, &services.resolver, &base).await? == SniffOutcome::LegacyHandled
    {
        return Ok(());
    }

    let (decided, next_state) = handshake::run(&mut conduit, &services.resolver, &base).await?;
    match next_state {
        NextState::Status => status::run(&mut conduit, &decided).await,
        NextState::Login => {
            let negotiator = LoginNegotiator::new(
                services.encryption_factory.clone(),
                services.session_verifier.clone(),
                decided,
            );
            let authorized = negotiator.run(&mut conduit).await?;
            let handler = services
                .play_factory
                .create_handler(&authorized)
                .ok_or_else(|| Error::config("no play handler available"))?;
            handler.run(conduit, authorized).await
        }
    }
}
