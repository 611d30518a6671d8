//! Variable-length integers: seven payload bits per byte, most significant
//! bit as continuation flag, least significant group first.

use crate::error::{Result, WireError};
use bytes::{Buf, BufMut};

/// Maximum encoded size of a 32-bit varint.
pub const MAX_VARINT_LEN: usize = 5;

/// Read a varint-encoded `i32` from `buf`.
///
/// Fails with [`WireError::UnexpectedEof`] if the buffer runs out before the
/// final group and with [`WireError::VarIntTooLong`] if no terminating byte
/// appears within five bytes.
pub fn read_varint(buf: &mut impl Buf) -> Result<i32> {
    let mut value: u32 = 0;
    for i in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Err(WireError::UnexpectedEof);
        }
        let byte = buf.get_u8();
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(WireError::VarIntTooLong)
}

/// Write `value` to `buf` as a varint.
pub fn write_varint(buf: &mut impl BufMut, value: i32) {
    let mut value = value as u32;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | 0x80);
    }
}

/// Encoded size of `value` in bytes.
pub fn varint_len(value: i32) -> usize {
    let mut value = value as u32;
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}
