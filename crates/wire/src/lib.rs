//! Wire codec primitives for the Minecraft-compatible connection front-end
//!
//! This crate contains the byte-level building blocks consumed by the `gate`
//! protocol engine: variable-length integers, length-prefixed UTF-8 strings,
//! the 16-bit-length UTF-16BE strings of the legacy (pre-framing) status
//! protocol, the AES/CFB8 packet stream cipher and the zlib packet
//! compression context. Everything here operates on `bytes::Buf`/`BufMut`
//! or plain slices; no I/O happens in this crate.

pub mod cipher;
pub mod error;
pub mod legacy;
pub mod string;
pub mod varint;
pub mod zlib;

pub use cipher::{PacketDecryptor, PacketEncryptor};
pub use error::{Result, WireError};
pub use legacy::{read_legacy_string, write_legacy_string};
pub use string::{read_string, read_string_limited, write_string};
pub use varint::{read_varint, varint_len, write_varint};
pub use zlib::CompressionContext;
