//! Per-connection encryption context for the login key exchange.
//!
//! The context pairs a freshly generated RSA keypair with a random verify
//! token. The public key travels to the client as X.509/SPKI DER; the
//! client answers with the shared secret and the token, both encrypted
//! under PKCS#1 v1.5.

use crate::connection::DecidedConnection;
use crate::error::{Error, Result};
use rand::RngCore;
use rsa::pkcs8::EncodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

const KEY_BITS: usize = 1024;
const VERIFY_TOKEN_LEN: usize = 4;

/// Keypair + verify token for one login exchange.
pub struct EncryptionContext {
    private_key: RsaPrivateKey,
    public_key_der: Vec<u8>,
    verify_token: [u8; VERIFY_TOKEN_LEN],
}

impl EncryptionContext {
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    pub fn verify_token(&self) -> &[u8] {
        &self.verify_token
    }

    /// Decrypt a client payload with the context's private key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.private_key
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map_err(|_| Error::protocol("undecipherable encryption response payload"))
    }
}

impl std::fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("public_key_der_len", &self.public_key_der.len())
            .finish()
    }
}

/// Factory seam for encryption contexts.
pub trait EncryptionFactory: Send + Sync {
    fn create(&self, connection: &DecidedConnection, login_name: &str)
        -> Result<EncryptionContext>;
}

/// Default factory generating a fresh RSA keypair per login.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaEncryptionFactory;

impl EncryptionFactory for RsaEncryptionFactory {
    fn create(
        &self,
        _connection: &DecidedConnection,
        _login_name: &str,
    ) -> Result<EncryptionContext> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, KEY_BITS)
            .map_err(|e| Error::config(format!("RSA key generation failed: {}", e)))?;
        let public_key_der = RsaPublicKey::from(&private_key)
            .to_public_key_der()
            .map_err(|e| Error::config(format!("public key encoding failed: {}", e)))?
            .as_bytes()
            .to_vec();
        let mut verify_token = [0u8; VERIFY_TOKEN_LEN];
        rng.fill_bytes(&mut verify_token);
        Ok(EncryptionContext {
            private_key,
            public_key_der,
            verify_token,
        })
    }
}
