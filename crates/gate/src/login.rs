//! The login negotiator.
//!
//! A per-connection state machine: `AwaitStart` takes the declared
//! username and either starts the encryption exchange (online-mode) or
//! jumps straight to authorization; `AwaitEncryptionResponse` verifies the
//! token, derives the shared secret and installs the stream cipher;
//! `Authorizing` resolves the profile (asynchronously for online-mode);
//! finalization negotiates compression, announces success and produces the
//! [`AuthorizedConnection`] handed to the play phase.

use crate::conduit::Conduit;
use crate::connection::{AuthorizedConnection, DecidedConnection};
use crate::crypto::{EncryptionContext, EncryptionFactory};
use crate::error::{Error, Result};
use crate::host::CompressionConfig;
use bytes::{Buf, Bytes, BytesMut};
use rand::Rng;
use session::{Profile, SessionVerifier};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

const LOGIN_START: i32 = 0x00;
const ENCRYPTION_RESPONSE: i32 = 0x01;
const ENCRYPTION_REQUEST: i32 = 0x01;
const LOGIN_SUCCESS: i32 = 0x02;
const SET_COMPRESSION: i32 = 0x03;

/// Last protocol version that expects the legacy server id in the
/// encryption request (Minecraft 1.7.x); newer versions get an empty one.
const MC_1_7_PROTOCOL_VERSION: i32 = 5;

/// Upper bound on the encrypted shared-secret and verify-token payloads.
/// Covers RSA-2048 ciphertexts with room to spare.
const MAX_SHARED_SECRET_LEN: usize = 256;

const MAX_USERNAME_LEN: usize = 16;
const LEGACY_SERVER_ID_LEN: usize = 17;

static LEGACY_SERVER_ID: OnceLock<String> = OnceLock::new();

/// The process-wide server id used for legacy-protocol encryption requests.
/// Generated once, before the first connection, and reused for all of them;
/// the legacy protocol shares it by design.
pub fn legacy_server_id() -> &'static str {
    LEGACY_SERVER_ID.get_or_init(|| {
        let mut rng = rand::thread_rng();
        (0..LEGACY_SERVER_ID_LEN)
            .map(|_| char::from(rng.sample(rand::distributions::Alphanumeric)))
            .collect()
    })
}

/// Login protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    AwaitStart,
    AwaitEncryptionResponse,
    Authorizing,
    Complete,
}

/// Per-connection login state machine. Never shared: the verify token and
/// shared secret are the integrity anchor of the encryption handshake.
pub struct LoginNegotiator {
    encryption_factory: Arc<dyn EncryptionFactory>,
    session_verifier: Arc<dyn SessionVerifier>,
    connection: DecidedConnection,
    state: LoginState,
    login_name: Option<String>,
    authenticated: bool,
    encryption: Option<EncryptionContext>,
    encrypted: bool,
    shared_secret: Option<Vec<u8>>,
}

impl LoginNegotiator {
    pub fn new(
        encryption_factory: Arc<dyn EncryptionFactory>,
        session_verifier: Arc<dyn SessionVerifier>,
        connection: DecidedConnection,
    ) -> Self {
        Self {
            encryption_factory,
            session_verifier,
            connection,
            state: LoginState::AwaitStart,
            login_name: None,
            authenticated: false,
            encryption: None,
            encrypted: false,
            shared_secret: None,
        }
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    /// Drive the negotiation to completion.
    pub async fn run(mut self, conduit: &mut Conduit) -> Result<AuthorizedConnection> {
        loop {
            match self.state {
                LoginState::AwaitStart | LoginState::AwaitEncryptionResponse => {
                    let mut packet = conduit.read_frame().await?;
                    let packet_id = wire::read_varint(&mut packet)?;
                    self.handle_packet(conduit, packet_id, packet).await?;
                }
                LoginState::Authorizing => {
                    let profile = self.authorize(conduit).await?;
                    return self.finalize(conduit, profile).await;
                }
                LoginState::Complete => {
                    return Err(Error::protocol("login already complete"));
                }
            }
        }
    }

    async fn handle_packet(
        &mut self,
        conduit: &mut Conduit,
        packet_id: i32,
        packet: Bytes,
    ) -> Result<()> {
        match (self.state, packet_id) {
            (LoginState::AwaitStart, LOGIN_START) => {
                self.handle_login_start(conduit, packet).await
            }
            (_, LOGIN_START) if self.login_name.is_some() => {
                Err(Error::protocol("login already started"))
            }
            (LoginState::AwaitEncryptionResponse, ENCRYPTION_RESPONSE) => {
                self.handle_encryption_response(conduit, packet)
            }
            (state, id) => Err(Error::protocol(format!(
                "unexpected packet {:#04x} in login state {:?}",
                id, state
            ))),
        }
    }

    async fn handle_login_start(&mut self, conduit: &mut Conduit, mut packet: Bytes) -> Result<()> {
        let name = wire::read_string_limited(&mut packet, MAX_USERNAME_LEN)?;
        debug!("Login start of {} from {}", name, conduit.peer());
        self.authenticated = self
            .connection
            .virtual_host()
            .is_authenticated(&self.connection);

        if self.authenticated {
            let context = self.encryption_factory.create(&self.connection, &name)?;

            let mut output = BytesMut::new();
            wire::write_varint(&mut output, ENCRYPTION_REQUEST);
            wire::write_string(&mut output, self.server_id());
            wire::write_varint(&mut output, context.public_key_der().len() as i32);
            output.extend_from_slice(context.public_key_der());
            wire::write_varint(&mut output, context.verify_token().len() as i32);
            output.extend_from_slice(context.verify_token());
            conduit.write_packet(&output).await?;
            conduit.flush().await?;

            self.encryption = Some(context);
            self.login_name = Some(name);
            self.state = LoginState::AwaitEncryptionResponse;
        } else {
            self.login_name = Some(name);
            self.state = LoginState::Authorizing;
        }
        Ok(())
    }

    fn handle_encryption_response(&mut self, conduit: &mut Conduit, mut packet: Bytes) -> Result<()> {
        let context = self
            .encryption
            .as_ref()
            .ok_or_else(|| Error::protocol("expect login start before encryption response"))?;
        if self.encrypted {
            return Err(Error::protocol("already encrypted"));
        }

        let shared_secret = read_bounded_bytes(&mut packet, MAX_SHARED_SECRET_LEN)?;
        let verify_token = read_bounded_bytes(&mut packet, MAX_SHARED_SECRET_LEN)?;

        let decrypted_token = context.decrypt(&verify_token)?;
        if !constant_time_eq(context.verify_token(), &decrypted_token) {
            return Err(Error::protocol("verify token does not match"));
        }

        let decrypted_secret = context.decrypt(&shared_secret)?;
        wire::cipher::validate_secret(&decrypted_secret)
            .map_err(|_| Error::protocol("invalid shared secret length"))?;

        conduit.enable_encryption(&decrypted_secret)?;
        self.encrypted = true;
        self.shared_secret = Some(decrypted_secret);
        self.state = LoginState::Authorizing;
        debug!("Encryption enabled for {}", conduit.peer());
        Ok(())
    }

    async fn authorize(&mut self, conduit: &mut Conduit) -> Result<Profile> {
        let name = self
            .login_name
            .clone()
            .ok_or_else(|| Error::protocol("login not started"))?;
        if !self.authenticated {
            return Ok(Profile::offline(&name));
        }

        let context = self
            .encryption
            .as_ref()
            .ok_or_else(|| Error::protocol("missing encryption context"))?;
        let secret = self
            .shared_secret
            .as_deref()
            .ok_or_else(|| Error::protocol("missing shared secret"))?;

        let profile = self
            .session_verifier
            .verify_join(&name, self.server_id(), secret, context.public_key_der())
            .await?;

        // The peer may have vanished while the lookup was in flight; do not
        // write further packets to a dead connection.
        if !conduit.is_active() {
            return Err(Error::ConnectionClosed);
        }
        Ok(profile)
    }

    async fn finalize(
        mut self,
        conduit: &mut Conduit,
        profile: Profile,
    ) -> Result<AuthorizedConnection> {
        let compression = self.setup_compression(conduit, &profile).await?;

        let mut output = BytesMut::new();
        wire::write_varint(&mut output, LOGIN_SUCCESS);
        wire::write_string(&mut output, &profile.id);
        wire::write_string(&mut output, &profile.name);
        conduit.write_packet(&output).await?;
        conduit.flush().await?;

        debug!("{} logged in from {}", profile, conduit.peer());
        self.state = LoginState::Complete;
        Ok(AuthorizedConnection::new(
            &self.connection,
            profile,
            compression,
        ))
    }

    async fn setup_compression(
        &self,
        conduit: &mut Conduit,
        profile: &Profile,
    ) -> Result<Option<CompressionConfig>> {
        let Some(config) = self
            .connection
            .virtual_host()
            .compression(&self.connection, profile)
        else {
            return Ok(None);
        };
        if config.threshold < 0 {
            return Ok(None);
        }
        let level = config.level;
        if !wire::zlib::is_valid_level(level) {
            warn!(
                "Invalid compression level {} on connection {} {}",
                level,
                conduit.peer(),
                profile
            );
            return Ok(None);
        }
        if level <= wire::zlib::NO_COMPRESSION {
            // The default sentinel validates but never enables compression.
            return Ok(None);
        }

        debug!(
            "Compress packets for connection {} {} with threshold >= {} bytes and compression level {}",
            conduit.peer(),
            profile,
            config.threshold,
            level
        );
        let mut output = BytesMut::new();
        wire::write_varint(&mut output, SET_COMPRESSION);
        wire::write_varint(&mut output, config.threshold);
        conduit.write_packet(&output).await?;
        conduit.flush().await?;
        conduit.enable_compression(config.threshold as usize, level as u32);
        Ok(Some(config))
    }

    fn server_id(&self) -> &'static str {
        if self.connection.protocol_version() <= MC_1_7_PROTOCOL_VERSION {
            legacy_server_id()
        } else {
            ""
        }
    }
}

fn read_bounded_bytes(packet: &mut Bytes, limit: usize) -> Result<Vec<u8>> {
    let length = wire::read_varint(packet)?;
    if length < 0 {
        return Err(Error::protocol("negative payload length"));
    }
    let length = length as usize;
    if length > limit {
        return Err(Error::protocol(format!(
            "payload of {} bytes exceeds maximum size {}",
            length, limit
        )));
    }
    if packet.remaining() < length {
        return Err(Error::protocol("truncated payload"));
    }
    let mut data = vec![0u8; length];
    packet.copy_to_slice(&mut data);
    Ok(data)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}
