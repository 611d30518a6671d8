//! The status responder: answers status and ping queries of the framed
//! protocol.

use crate::conduit::Conduit;
use crate::connection::DecidedConnection;
use crate::error::{Error, Result};
use bytes::{Buf, BufMut, BytesMut};
use tracing::debug;

const STATUS_REQUEST: i32 = 0x00;
const PING_REQUEST: i32 = 0x01;
const STATUS_RESPONSE: i32 = 0x00;
const PONG_RESPONSE: i32 = 0x01;

/// Serve status packets until the ping-pong exchange closes the connection.
pub async fn run(conduit: &mut Conduit, connection: &DecidedConnection) -> Result<()> {
    loop {
        let mut packet = conduit.read_frame().await?;
        match wire::read_varint(&mut packet)? {
            STATUS_REQUEST => {
                let response = connection
                    .virtual_host()
                    .status_provider()
                    .status(connection);
                let serialized = serde_json::to_string(&response)?;
                debug!("Status request from {}", conduit.peer());

                let mut output = BytesMut::new();
                wire::write_varint(&mut output, STATUS_RESPONSE);
                wire::write_string(&mut output, &serialized);
                conduit.write_packet(&output).await?;
                conduit.flush().await?;
            }
            PING_REQUEST => {
                if packet.remaining() < 8 {
                    return Err(Error::protocol("truncated ping payload"));
                }
                let payload = packet.get_i64();
                debug!("Ping request from {}", conduit.peer());

                // Unlike most responses, pong terminates the connection.
                let mut output = BytesMut::new();
                wire::write_varint(&mut output, PONG_RESPONSE);
                output.put_i64(payload);
                conduit.write_packet(&output).await?;
                conduit.close().await?;
                return Ok(());
            }
            other => {
                return Err(Error::protocol(format!(
                    "unexpected packet {:#04x} during status",
                    other
                )));
            }
        }
    }
}
