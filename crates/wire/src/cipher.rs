//! AES-128/CFB8 packet stream cipher.
//!
//! The protocol derives both the key and the IV from the 16-byte shared
//! secret negotiated during login. CFB8 is a self-synchronizing stream mode,
//! so the cipher state must persist across packets; the wrappers below keep
//! that state and process buffers in place.

use crate::error::{Result, WireError};
use aes::cipher::inout::InOutBuf;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes128;

type Cfb8Encryptor = cfb8::Encryptor<Aes128>;
type Cfb8Decryptor = cfb8::Decryptor<Aes128>;

const SECRET_LEN: usize = 16;

/// Outbound half of the packet cipher.
pub struct PacketEncryptor {
    inner: Cfb8Encryptor,
}

impl PacketEncryptor {
    pub fn new(secret: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: Cfb8Encryptor::new_from_slices(secret, secret)
                .map_err(|_| WireError::InvalidKeyLength(secret.len()))?,
        })
    }

    /// Encrypt `data` in place, advancing the cipher state.
    pub fn encrypt(&mut self, data: &mut [u8]) {
        let (blocks, rest) = InOutBuf::from(data).into_chunks();
        debug_assert!(rest.is_empty());
        self.inner.encrypt_blocks_inout_mut(blocks);
    }
}

impl std::fmt::Debug for PacketEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketEncryptor").finish()
    }
}

/// Inbound half of the packet cipher.
pub struct PacketDecryptor {
    inner: Cfb8Decryptor,
}

impl PacketDecryptor {
    pub fn new(secret: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: Cfb8Decryptor::new_from_slices(secret, secret)
                .map_err(|_| WireError::InvalidKeyLength(secret.len()))?,
        })
    }

    /// Decrypt `data` in place, advancing the cipher state.
    pub fn decrypt(&mut self, data: &mut [u8]) {
        let (blocks, rest) = InOutBuf::from(data).into_chunks();
        debug_assert!(rest.is_empty());
        self.inner.decrypt_blocks_inout_mut(blocks);
    }
}

impl std::fmt::Debug for PacketDecryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketDecryptor").finish()
    }
}

/// Check that a decrypted shared secret has the length AES-128 requires.
pub fn validate_secret(secret: &[u8]) -> Result<()> {
    if secret.len() != SECRET_LEN {
        return Err(WireError::InvalidKeyLength(secret.len()));
    }
    Ok(())
}
