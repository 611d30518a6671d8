//! The handshake router: first framed packet of a modern connection.

use crate::conduit::Conduit;
use crate::connection::{Connection, DecidedConnection, InitializedConnection};
use crate::error::{Error, Result};
use crate::host::VirtualHostResolver;
use bytes::Buf;
use std::sync::Arc;
use tracing::debug;

const HANDSHAKE: i32 = 0x00;
const NEXT_STATE_STATUS: i32 = 1;
const NEXT_STATE_LOGIN: i32 = 2;
const MAX_SERVER_ADDRESS_LEN: usize = 255;

/// Where the handshake dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    Status,
    Login,
}

/// Read and parse the handshake, resolve the virtual host and decide the
/// next protocol state.
pub async fn run(
    conduit: &mut Conduit,
    resolver: &Arc<dyn VirtualHostResolver>,
    base: &Connection,
) -> Result<(DecidedConnection, NextState)> {
    let mut packet = conduit.read_frame().await?;
    let packet_id = wire::read_varint(&mut packet)?;
    if packet_id != HANDSHAKE {
        return Err(Error::protocol(format!(
            "unexpected packet {:#04x} during handshake",
            packet_id
        )));
    }

    let protocol_version = wire::read_varint(&mut packet)?;
    let server_address = wire::read_string_limited(&mut packet, MAX_SERVER_ADDRESS_LEN)?;
    if packet.remaining() < 2 {
        return Err(Error::protocol("truncated handshake"));
    }
    let server_port = packet.get_u16();
    let next_state = wire::read_varint(&mut packet)?;

    debug!(
        "Handshake from {}: protocol {}, target {}:{}, next state {}",
        conduit.peer(),
        protocol_version,
        server_address,
        server_port,
        next_state
    );

    let init = InitializedConnection::new(base, protocol_version, server_address, server_port);
    let host = match resolver.match_host(&init) {
        Some(host) => host,
        None => resolver
            .fallback_host()
            .ok_or_else(|| Error::config("no fallback host configured"))?,
    };
    let decided = DecidedConnection::new(&init, host);

    match next_state {
        NEXT_STATE_STATUS => Ok((decided, NextState::Status)),
        NEXT_STATE_LOGIN => Ok((decided, NextState::Login)),
        other => Err(Error::protocol(format!("unexpected next state {}", other))),
    }
}
