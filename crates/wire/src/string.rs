//! Length-prefixed UTF-8 strings as used by the framed protocol.

use crate::error::{Result, WireError};
use crate::varint::{read_varint, write_varint};
use bytes::{Buf, BufMut};

/// Default upper bound on the byte length of a received string.
pub const DEFAULT_MAX_STRING_LEN: usize = 32767;

/// Read a varint-length-prefixed UTF-8 string with the default length cap.
pub fn read_string(buf: &mut impl Buf) -> Result<String> {
    read_string_limited(buf, DEFAULT_MAX_STRING_LEN)
}

/// Read a varint-length-prefixed UTF-8 string of at most `limit` bytes.
pub fn read_string_limited(buf: &mut impl Buf, limit: usize) -> Result<String> {
    let length = read_varint(buf)?;
    if length < 0 {
        return Err(WireError::NegativeLength);
    }
    let length = length as usize;
    if length > limit {
        return Err(WireError::StringTooLong { length, limit });
    }
    if buf.remaining() < length {
        return Err(WireError::UnexpectedEof);
    }
    let mut data = vec![0u8; length];
    buf.copy_to_slice(&mut data);
    Ok(String::from_utf8(data)?)
}

/// Write `value` as a varint-length-prefixed UTF-8 string.
pub fn write_string(buf: &mut impl BufMut, value: &str) {
    write_varint(buf, value.len() as i32);
    buf.put_slice(value.as_bytes());
}
