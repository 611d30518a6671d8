//! The login fingerprint: a SHA-1 digest over the server id, the shared
//! secret and the encoded public key, rendered the way the session service
//! expects it: as a signed hexadecimal number in two's-complement style.

use sha1::{Digest, Sha1};

/// Compute the fingerprint keying the has-joined lookup.
pub fn login_fingerprint(server_id: &str, shared_secret: &[u8], public_key_der: &[u8]) -> String {
    let digest = Sha1::new()
        .chain_update(server_id.as_bytes())
        .chain_update(shared_secret)
        .chain_update(public_key_der)
        .finalize();
    hex_twos_complement(&digest)
}

/// Render `digest` as a signed hex string: if the leading bit is set the
/// number is negative, the magnitude is the two's complement and the string
/// gets a `-` prefix. Leading zero nibbles are stripped.
fn hex_twos_complement(digest: &[u8]) -> String {
    let negative = digest.first().is_some_and(|b| b & 0x80 != 0);
    let mut bytes = digest.to_vec();
    if negative {
        let mut carry = true;
        for byte in bytes.iter_mut().rev() {
            *byte = !*byte;
            if carry {
                let (value, overflow) = byte.overflowing_add(1);
                *byte = value;
                carry = overflow;
            }
        }
    }

    let mut out = String::with_capacity(bytes.len() * 2 + 1);
    if negative {
        out.push('-');
    }
    let mut leading = true;
    for byte in &bytes {
        for nibble in [byte >> 4, byte & 0x0f] {
            if leading && nibble == 0 {
                continue;
            }
            leading = false;
            out.push(char::from_digit(u32::from(nibble), 16).expect("nibble in range"));
        }
    }
    if leading {
        out.push('0');
    }
    out
}
