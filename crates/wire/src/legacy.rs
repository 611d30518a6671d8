//! UTF-16BE strings of the legacy (pre-framing) status protocol: a 16-bit
//! code-unit count followed by big-endian UTF-16 code units.

use crate::error::{Result, WireError};
use bytes::{Buf, BufMut};

/// Upper bound on the code-unit count of a received legacy string. The
/// longest legitimate field is a hostname; anything bigger is garbage.
pub const MAX_LEGACY_STRING_UNITS: usize = 1024;

/// Read a legacy UTF-16BE string.
pub fn read_legacy_string(buf: &mut impl Buf) -> Result<String> {
    if buf.remaining() < 2 {
        return Err(WireError::UnexpectedEof);
    }
    let units = buf.get_u16() as usize;
    if units > MAX_LEGACY_STRING_UNITS {
        return Err(WireError::StringTooLong {
            length: units,
            limit: MAX_LEGACY_STRING_UNITS,
        });
    }
    if buf.remaining() < units * 2 {
        return Err(WireError::UnexpectedEof);
    }
    let mut code_units = Vec::with_capacity(units);
    for _ in 0..units {
        code_units.push(buf.get_u16());
    }
    String::from_utf16(&code_units).map_err(|_| WireError::InvalidUtf16)
}

/// Write `value` as a legacy UTF-16BE string.
pub fn write_legacy_string(buf: &mut impl BufMut, value: &str) {
    let code_units: Vec<u16> = value.encode_utf16().collect();
    buf.put_u16(code_units.len() as u16);
    for unit in code_units {
        buf.put_u16(unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_round_trip() {
        let mut buf = BytesMut::new();
        write_legacy_string(&mut buf, "MC|PingHost");
        assert_eq!(buf[0], 0);
        assert_eq!(buf[1], 11);
        assert_eq!(read_legacy_string(&mut buf).unwrap(), "MC|PingHost");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_section_signs_survive() {
        let mut buf = BytesMut::new();
        write_legacy_string(&mut buf, "motd\u{a7}12\u{a7}20");
        assert_eq!(read_legacy_string(&mut buf).unwrap(), "motd\u{a7}12\u{a7}20");
    }

    #[test]
    fn test_truncated_payload() {
        let mut buf = BytesMut::new();
        buf.put_u16(4);
        buf.put_u16(0x004d);
        assert!(matches!(
            read_legacy_string(&mut buf),
            Err(WireError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_unit_cap() {
        let mut buf = BytesMut::new();
        buf.put_u16(u16::MAX);
        assert!(matches!(
            read_legacy_string(&mut buf),
            Err(WireError::StringTooLong { .. })
        ));
    }
}
