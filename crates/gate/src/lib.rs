//! Connection front-end for a Minecraft-compatible game server.
//!
//! This crate accepts raw TCP connections and walks each one through the
//! pre-play protocol: legacy-ping detection with multi-version response
//! formatting, the handshake → {status, login} routing state machine, the
//! login negotiation (credentials, optional encryption exchange,
//! authorization, compression setup) and the handoff to an externally
//! provided play handler. A reusable keep-alive scheduler and the
//! event-loop group lifecycle hosting all connections live here too.
//!
//! Collaborators (virtual-host resolution, status content, session
//! verification, the play phase itself) are consumed through the traits
//! in [`host`], [`play`] and the `session` crate.

pub mod conduit;
pub mod connection;
pub mod crypto;
pub mod error;
pub mod handshake;
pub mod host;
pub mod keepalive;
pub mod legacy;
pub mod login;
pub mod play;
pub mod runtime;
pub mod server;
pub mod status;

pub use conduit::{Conduit, PacketReader, SharedWriter};
pub use connection::{
    AuthorizedConnection, Connection, DecidedConnection, InitializedConnection,
};
pub use crypto::{EncryptionContext, EncryptionFactory, RsaEncryptionFactory};
pub use error::{Error, Result};
pub use host::{
    BetaStatusResponse, CompressionConfig, LegacyStatusResponse, StatusPlayers, StatusProvider,
    StatusResponse, StatusVersion, VirtualHost, VirtualHostResolver,
};
pub use keepalive::KeepAlive;
pub use login::{legacy_server_id, LoginNegotiator, LoginState};
pub use play::{PlayHandler, PlayHandlerFactory};
pub use runtime::EventLoopGroups;
pub use server::{serve_connection, GateConfig, GateServer, Services};
