//! The per-connection packet conduit.
//!
//! Layering is fixed by the wire format and must not change: the stream
//! cipher wraps the raw transport, varint length framing operates on
//! plaintext inside it, and the compression envelope sits inside the
//! framing. Cipher and compressor start out absent and are installed
//! mid-connection by the login negotiator.
//!
//! Inbound bytes are decrypted as they arrive into the read buffer, so the
//! pre-framing legacy path and the framed path both see plaintext.

use crate::error::{Error, Result};
use bytes::{Buf, Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use wire::{CompressionContext, PacketDecryptor, PacketEncryptor};

/// Largest frame the reference decoder accepts: a three-byte varint.
pub const MAX_FRAME_LEN: usize = 0x1f_ffff;
const MAX_FRAME_LEN_BYTES: usize = 3;
const READ_CHUNK: usize = 8 * 1024;

/// Shared liveness flag between the two stream halves.
#[derive(Debug, Clone)]
pub struct ConnStatus(Arc<AtomicBool>);

impl ConnStatus {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn mark_closed(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Inbound half: buffered, decrypting, de-framing.
pub struct PacketReader {
    stream: OwnedReadHalf,
    buffer: BytesMut,
    decryptor: Option<PacketDecryptor>,
    compression: Option<CompressionContext>,
    read_timeout: Duration,
    status: ConnStatus,
}

impl PacketReader {
    /// Pull at least one more byte off the wire into the buffer, applying
    /// the inactivity timeout and decrypting the new bytes in place.
    async fn fill(&mut self) -> Result<()> {
        self.buffer.reserve(READ_CHUNK);
        let start = self.buffer.len();
        let read = tokio::time::timeout(self.read_timeout, self.stream.read_buf(&mut self.buffer))
            .await
            .map_err(|_| {
                self.status.mark_closed();
                Error::ReadTimeout
            })?
            .map_err(|e| {
                self.status.mark_closed();
                Error::Io(e)
            })?;
        if read == 0 {
            self.status.mark_closed();
            return Err(Error::ConnectionClosed);
        }
        if let Some(decryptor) = self.decryptor.as_mut() {
            decryptor.decrypt(&mut self.buffer[start..]);
        }
        Ok(())
    }

    /// Peek the first buffered byte, filling the buffer once if empty.
    pub async fn peek_raw_u8(&mut self) -> Result<u8> {
        if self.buffer.is_empty() {
            self.fill().await?;
        }
        Ok(self.buffer[0])
    }

    /// Whether anything is currently buffered. Used by the legacy detector,
    /// whose Beta/1.4 decisions depend on what arrived together.
    pub fn has_buffered(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Drop `n` already-buffered bytes.
    pub fn advance_raw(&mut self, n: usize) {
        self.buffer.advance(n);
    }

    /// Read exactly `n` raw (pre-framing) bytes.
    pub async fn read_raw_exact(&mut self, n: usize) -> Result<Bytes> {
        while self.buffer.len() < n {
            self.fill().await?;
        }
        Ok(self.buffer.split_to(n).freeze())
    }

    pub async fn read_raw_u8(&mut self) -> Result<u8> {
        let byte = self.read_raw_exact(1).await?;
        Ok(byte[0])
    }

    pub async fn read_raw_u16(&mut self) -> Result<u16> {
        let mut bytes = self.read_raw_exact(2).await?;
        Ok(bytes.get_u16())
    }

    pub async fn read_raw_i32(&mut self) -> Result<i32> {
        let mut bytes = self.read_raw_exact(4).await?;
        Ok(bytes.get_i32())
    }

    /// Read a legacy UTF-16BE string from the raw stream.
    pub async fn read_raw_legacy_string(&mut self) -> Result<String> {
        let units = self.read_raw_u16().await? as usize;
        if units > wire::legacy::MAX_LEGACY_STRING_UNITS {
            return Err(Error::protocol(format!(
                "legacy string of {} code units exceeds limit",
                units
            )));
        }
        let mut bytes = self.read_raw_exact(units * 2).await?;
        let mut code_units = Vec::with_capacity(units);
        for _ in 0..units {
            code_units.push(bytes.get_u16());
        }
        String::from_utf16(&code_units).map_err(|_| Error::protocol("invalid UTF-16 string"))
    }

    /// Read one framed packet and return its plaintext payload (packet id
    /// plus body), unwrapping the compression envelope when installed.
    pub async fn read_frame(&mut self) -> Result<Bytes> {
        let frame_len = loop {
            match self.try_parse_frame_len()? {
                Some((len, consumed)) => {
                    self.buffer.advance(consumed);
                    break len;
                }
                None => self.fill().await?,
            }
        };
        while self.buffer.len() < frame_len {
            self.fill().await?;
        }
        let frame = self.buffer.split_to(frame_len).freeze();

        match self.compression.as_ref() {
            None => Ok(frame),
            Some(context) => {
                let mut frame = frame;
                let data_len = wire::read_varint(&mut frame)?;
                if data_len == 0 {
                    return Ok(frame);
                }
                if data_len < 0 || data_len as usize > MAX_FRAME_LEN {
                    return Err(Error::protocol(format!(
                        "announced uncompressed size {} out of range",
                        data_len
                    )));
                }
                let payload = context.decompress(&frame, data_len as usize)?;
                Ok(Bytes::from(payload))
            }
        }
    }

    fn try_parse_frame_len(&self) -> Result<Option<(usize, usize)>> {
        let mut value: u32 = 0;
        for i in 0..MAX_FRAME_LEN_BYTES {
            let Some(&byte) = self.buffer.get(i) else {
                return Ok(None);
            };
            value |= u32::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                let len = value as usize;
                if len == 0 {
                    return Err(Error::protocol("empty frame"));
                }
                if len > MAX_FRAME_LEN {
                    return Err(Error::protocol(format!("frame of {} bytes exceeds limit", len)));
                }
                return Ok(Some((len, i + 1)));
            }
        }
        Err(Error::protocol("frame length prefix exceeds three bytes"))
    }

    pub fn enable_encryption(&mut self, secret: &[u8]) -> Result<()> {
        self.decryptor = Some(PacketDecryptor::new(secret)?);
        Ok(())
    }

    pub fn enable_compression(&mut self, context: CompressionContext) {
        self.compression = Some(context);
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn status(&self) -> ConnStatus {
        self.status.clone()
    }
}

/// Outbound half: framing, compressing, encrypting.
pub struct PacketWriter {
    stream: OwnedWriteHalf,
    encryptor: Option<PacketEncryptor>,
    compression: Option<CompressionContext>,
    status: ConnStatus,
}

impl PacketWriter {
    /// Frame and send one packet (id plus body).
    pub async fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        let body = match self.compression.as_ref() {
            None => None,
            Some(context) => {
                let mut body = Vec::with_capacity(packet.len() + wire::varint::MAX_VARINT_LEN);
                if context.should_compress(packet.len()) {
                    wire::write_varint(&mut body, packet.len() as i32);
                    body.extend_from_slice(&context.compress(packet)?);
                } else {
                    wire::write_varint(&mut body, 0);
                    body.extend_from_slice(packet);
                }
                Some(body)
            }
        };
        let body = body.as_deref().unwrap_or(packet);

        let mut out = Vec::with_capacity(body.len() + wire::varint::MAX_VARINT_LEN);
        wire::write_varint(&mut out, body.len() as i32);
        out.extend_from_slice(body);
        self.write_raw_vec(out).await
    }

    /// Send unframed bytes (the legacy response path).
    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_raw_vec(bytes.to_vec()).await
    }

    async fn write_raw_vec(&mut self, mut bytes: Vec<u8>) -> Result<()> {
        if let Some(encryptor) = self.encryptor.as_mut() {
            encryptor.encrypt(&mut bytes);
        }
        self.stream.write_all(&bytes).await.map_err(|e| {
            self.status.mark_closed();
            Error::Io(e)
        })
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.stream.flush().await.map_err(|e| {
            self.status.mark_closed();
            Error::Io(e)
        })
    }

    /// Flush and shut the outbound stream down.
    pub async fn close(&mut self) -> Result<()> {
        let _ = self.stream.flush().await;
        let result = self.stream.shutdown().await.map_err(Error::Io);
        self.status.mark_closed();
        result
    }

    pub fn enable_encryption(&mut self, secret: &[u8]) -> Result<()> {
        self.encryptor = Some(PacketEncryptor::new(secret)?);
        Ok(())
    }

    pub fn enable_compression(&mut self, context: CompressionContext) {
        self.compression = Some(context);
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Cloneable writer handle for schedulers that outlive the read loop.
#[derive(Clone)]
pub struct SharedWriter {
    inner: Arc<tokio::sync::Mutex<PacketWriter>>,
    status: ConnStatus,
}

impl SharedWriter {
    pub async fn write_packet(&self, packet: &[u8]) -> Result<()> {
        let mut writer = self.inner.lock().await;
        writer.write_packet(packet).await?;
        writer.flush().await
    }

    pub async fn close(&self) -> Result<()> {
        self.inner.lock().await.close().await
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Both halves of one connection's transport.
pub struct Conduit {
    reader: PacketReader,
    writer: PacketWriter,
    peer: SocketAddr,
}

impl Conduit {
    pub fn new(stream: TcpStream, read_timeout: Duration) -> Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        let status = ConnStatus::new();
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: PacketReader {
                stream: read_half,
                buffer: BytesMut::with_capacity(READ_CHUNK),
                decryptor: None,
                compression: None,
                read_timeout,
                status: status.clone(),
            },
            writer: PacketWriter {
                stream: write_half,
                encryptor: None,
                compression: None,
                status,
            },
            peer,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn reader(&mut self) -> &mut PacketReader {
        &mut self.reader
    }

    pub async fn read_frame(&mut self) -> Result<Bytes> {
        self.reader.read_frame().await
    }

    pub async fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        self.writer.write_packet(packet).await
    }

    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_raw(bytes).await
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await
    }

    /// Flush, shut down the outbound stream and mark the connection closed.
    pub async fn close(&mut self) -> Result<()> {
        self.writer.close().await
    }

    /// Install the stream cipher on both paths. Framing keeps operating on
    /// plaintext inside it.
    pub fn enable_encryption(&mut self, secret: &[u8]) -> Result<()> {
        self.reader.enable_encryption(secret)?;
        self.writer.enable_encryption(secret)
    }

    /// Install the compression envelope on both paths, inside the cipher
    /// but outside framing.
    pub fn enable_compression(&mut self, threshold: usize, level: u32) {
        self.reader
            .enable_compression(CompressionContext::new(threshold, level));
        self.writer
            .enable_compression(CompressionContext::new(threshold, level));
    }

    pub fn is_active(&self) -> bool {
        self.reader.is_active() && self.writer.is_active()
    }

    /// Split into the read half and a shareable writer handle.
    pub fn split(self) -> (PacketReader, SharedWriter) {
        let status = self.writer.status.clone();
        (
            self.reader,
            SharedWriter {
                inner: Arc::new(tokio::sync::Mutex::new(self.writer)),
                status,
            },
        )
    }
}
