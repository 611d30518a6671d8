//! Legacy (pre-framing) server list ping detection and responses.
//!
//! The very first byte of a connection decides everything: `0xFE` marks one
//! of three historical ping formats, anything else belongs to the framed
//! protocol and is left in the buffer untouched. Replies are a `0xFF`
//! marker plus one UTF-16BE string, after which the connection is closed;
//! legacy clients expect the termination.

use crate::conduit::Conduit;
use crate::connection::{Connection, DecidedConnection, InitializedConnection};
use crate::error::{Error, Result};
use crate::host::{BetaStatusResponse, LegacyStatusResponse, VirtualHost, VirtualHostResolver};
use bytes::BytesMut;
use std::sync::Arc;
use tracing::debug;

/// First byte of every legacy probe.
pub const LEGACY_PROBE: u8 = 0xfe;
/// Second byte of 1.4+ probes ("server list ping payload").
const PING_MARKER: u8 = 0x01;
/// Packet id of the 1.6 plugin-message envelope.
const PLUGIN_MESSAGE: u8 = 0xfa;
/// Marker byte of every legacy response.
const RESPONSE_MARKER: u8 = 0xff;
/// Channel name of the 1.6 ping envelope.
const PING_HOST_CHANNEL: &str = "MC|PingHost";

const SECTION_SIGN: char = '\u{a7}';
const LEGACY_DELIMITER: &str = "\0\u{a7}\0";

/// Outcome of sniffing the first byte.
#[derive(Debug, PartialEq, Eq)]
pub enum SniffOutcome {
    /// Not a legacy probe; the first byte stays buffered for the framed
    /// protocol.
    Modern,
    /// A legacy ping was answered and the connection closed.
    LegacyHandled,
}

/// Inspect the first byte and, for legacy probes, answer and close.
pub async fn detect(
    conduit: &mut Conduit,
    resolver: &Arc<dyn VirtualHostResolver>,
    base: &Connection,
) -> Result<SniffOutcome> {
    if conduit.reader().peek_raw_u8().await? != LEGACY_PROBE {
        return Ok(SniffOutcome::Modern);
    }
    conduit.reader().advance_raw(1);

    if !conduit.reader().has_buffered() {
        // Beta 1.8 to 1.3: the probe is the whole request.
        debug!("Answering beta legacy ping from {}", conduit.peer());
        let response = fallback_host(resolver)?.status_provider().beta_status(base);
        return respond(conduit, &compose_beta_response(&response)).await;
    }

    if conduit.reader().read_raw_u8().await? != PING_MARKER {
        return Err(Error::protocol("unexpected legacy ping marker"));
    }

    if !conduit.reader().has_buffered() {
        // 1.4: no target host travels in this format, so the fallback host
        // answers.
        debug!("Answering 1.4 legacy ping from {}", conduit.peer());
        let host = fallback_host(resolver)?;
        let response = host.status_provider().legacy14_status(base);
        return respond(conduit, &compose_legacy_response(&response)).await;
    }

    // 1.6: a plugin-message envelope carrying protocol version, host and
    // port, resolved like a modern handshake.
    if conduit.reader().read_raw_u8().await? != PLUGIN_MESSAGE {
        return Err(Error::protocol("unexpected legacy envelope marker"));
    }
    let channel = conduit.reader().read_raw_legacy_string().await?;
    if channel != PING_HOST_CHANNEL {
        return Err(Error::protocol(format!(
            "unexpected legacy plugin channel {:?}",
            channel
        )));
    }
    // Length of the remaining data; present but not needed.
    conduit.reader().read_raw_u16().await?;

    let protocol_version = i32::from(conduit.reader().read_raw_u8().await?);
    let host_name = conduit.reader().read_raw_legacy_string().await?;
    let port = conduit.reader().read_raw_i32().await?;
    let port = u16::try_from(port)
        .map_err(|_| Error::protocol(format!("legacy port {} out of range", port)))?;

    debug!(
        "Answering 1.6 legacy ping from {} for {}:{} (protocol {})",
        conduit.peer(),
        host_name,
        port,
        protocol_version
    );

    let init = InitializedConnection::new(base, protocol_version, host_name, port);
    let host = resolver
        .match_host(&init)
        .map(Ok)
        .unwrap_or_else(|| fallback_host(resolver))?;
    let decided = DecidedConnection::new(&init, host);
    let response = decided
        .virtual_host()
        .status_provider()
        .legacy16_status(&decided);
    respond(conduit, &compose_legacy_response(&response)).await
}

fn fallback_host(resolver: &Arc<dyn VirtualHostResolver>) -> Result<Arc<dyn VirtualHost>> {
    resolver
        .fallback_host()
        .ok_or_else(|| Error::config("no fallback host configured"))
}

async fn respond(conduit: &mut Conduit, data: &str) -> Result<SniffOutcome> {
    let mut output = BytesMut::new();
    output.extend_from_slice(&[RESPONSE_MARKER]);
    wire::write_legacy_string(&mut output, data);
    conduit.write_raw(&output).await?;
    conduit.close().await?;
    Ok(SniffOutcome::LegacyHandled)
}

fn compose_beta_response(response: &BetaStatusResponse) -> String {
    format!(
        "{}{}{}{}{}",
        response.message_of_the_day,
        SECTION_SIGN,
        response.current_players,
        SECTION_SIGN,
        response.max_players
    )
}

fn compose_legacy_response(response: &LegacyStatusResponse) -> String {
    format!(
        "{}1\0{}{}{}{}{}{}{}{}{}",
        SECTION_SIGN,
        response.protocol_version,
        LEGACY_DELIMITER,
        response.server_version,
        LEGACY_DELIMITER,
        response.message_of_the_day,
        LEGACY_DELIMITER,
        response.current_players,
        LEGACY_DELIMITER,
        response.max_players
    )
}
