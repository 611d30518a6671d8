//! Progressively-enriched connection snapshots.
//!
//! Each protocol stage produces a new immutable value carrying a strict
//! superset of the previous stage's facts: accept-time facts, then the
//! declared handshake fields, then the resolved virtual host, then the
//! authenticated profile and compression decision. Snapshots are never
//! mutated or downgraded; a transition borrows the previous snapshot and
//! constructs the richer one.

use crate::host::{CompressionConfig, VirtualHost};
use session::Profile;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Accept-time facts about a connection.
#[derive(Debug, Clone)]
pub struct Connection {
    remote_addr: SocketAddr,
    locally_connected: bool,
}

impl Connection {
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            remote_addr,
            locally_connected: is_local_address(remote_addr.ip()),
        }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Whether the peer connected from a loopback or any-local address.
    pub fn locally_connected(&self) -> bool {
        self.locally_connected
    }
}

fn is_local_address(addr: IpAddr) -> bool {
    addr.is_loopback() || addr.is_unspecified()
}

/// Facts known once the handshake (or legacy plugin-message ping) has been
/// parsed.
#[derive(Debug, Clone)]
pub struct InitializedConnection {
    base: Connection,
    protocol_version: i32,
    server_address: String,
    server_port: u16,
}

impl InitializedConnection {
    pub fn new(
        base: &Connection,
        protocol_version: i32,
        server_address: String,
        server_port: u16,
    ) -> Self {
        Self {
            base: base.clone(),
            protocol_version,
            server_address,
            server_port,
        }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.base.remote_addr()
    }

    pub fn locally_connected(&self) -> bool {
        self.base.locally_connected()
    }

    pub fn protocol_version(&self) -> i32 {
        self.protocol_version
    }

    pub fn server_address(&self) -> &str {
        &self.server_address
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }
}

/// Facts known once the virtual host has been resolved.
#[derive(Clone)]
pub struct DecidedConnection {
    init: InitializedConnection,
    virtual_host: Arc<dyn VirtualHost>,
}

impl DecidedConnection {
    pub fn new(init: &InitializedConnection, virtual_host: Arc<dyn VirtualHost>) -> Self {
        Self {
            init: init.clone(),
            virtual_host,
        }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.init.remote_addr()
    }

    pub fn locally_connected(&self) -> bool {
        self.init.locally_connected()
    }

    pub fn protocol_version(&self) -> i32 {
        self.init.protocol_version()
    }

    pub fn server_address(&self) -> &str {
        self.init.server_address()
    }

    pub fn server_port(&self) -> u16 {
        self.init.server_port()
    }

    pub fn virtual_host(&self) -> &Arc<dyn VirtualHost> {
        &self.virtual_host
    }
}

impl std::fmt::Debug for DecidedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecidedConnection")
            .field("init", &self.init)
            .field("virtual_host", &self.virtual_host.name())
            .finish()
    }
}

/// The fully authorized connection handed to the play phase.
#[derive(Clone)]
pub struct AuthorizedConnection {
    decided: DecidedConnection,
    profile: Profile,
    compression: Option<CompressionConfig>,
}

impl AuthorizedConnection {
    pub fn new(
        decided: &DecidedConnection,
        profile: Profile,
        compression: Option<CompressionConfig>,
    ) -> Self {
        Self {
            decided: decided.clone(),
            profile,
            compression,
        }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.decided.remote_addr()
    }

    pub fn locally_connected(&self) -> bool {
        self.decided.locally_connected()
    }

    pub fn protocol_version(&self) -> i32 {
        self.decided.protocol_version()
    }

    pub fn server_address(&self) -> &str {
        self.decided.server_address()
    }

    pub fn server_port(&self) -> u16 {
        self.decided.server_port()
    }

    pub fn virtual_host(&self) -> &Arc<dyn VirtualHost> {
        self.decided.virtual_host()
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// The negotiated compression configuration, if any was installed.
    pub fn compression(&self) -> Option<CompressionConfig> {
        self.compression
    }
}

impl std::fmt::Debug for AuthorizedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedConnection")
            .field("decided", &self.decided)
            .field("profile", &self.profile)
            .field("compression", &self.compression)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_is_locally_connected() {
        let conn = Connection::new("127.0.0.1:54321".parse().unwrap());
        assert!(conn.locally_connected());
        let conn = Connection::new("[::1]:54321".parse().unwrap());
        assert!(conn.locally_connected());
    }

    #[test]
    fn test_any_local_is_locally_connected() {
        let conn = Connection::new("0.0.0.0:54321".parse().unwrap());
        assert!(conn.locally_connected());
    }

    #[test]
    fn test_public_address_is_not_local() {
        let conn = Connection::new("198.51.100.7:25565".parse().unwrap());
        assert!(!conn.locally_connected());
    }

    #[test]
    fn test_snapshots_accumulate_facts() {
        let base = Connection::new("127.0.0.1:1234".parse().unwrap());
        let init = InitializedConnection::new(&base, 47, "play.example.com".to_string(), 25565);
        assert_eq!(init.remote_addr(), base.remote_addr());
        assert!(init.locally_connected());
        assert_eq!(init.protocol_version(), 47);
        assert_eq!(init.server_address(), "play.example.com");
        assert_eq!(init.server_port(), 25565);
    }
}
