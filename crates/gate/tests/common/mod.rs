//! Shared stubs and a minimal protocol client for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use gate::{
    BetaStatusResponse, CompressionConfig, Conduit, GateConfig, LegacyStatusResponse,
    PlayHandler, PlayHandlerFactory, RsaEncryptionFactory, Services, StatusPlayers,
    StatusProvider, StatusResponse, StatusVersion, VirtualHost, VirtualHostResolver,
};
use session::{Profile, SessionError, SessionVerifier};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// A virtual host with canned status content and configurable policy.
pub struct TestHost {
    pub authenticated: bool,
    pub compression: Option<CompressionConfig>,
}

impl TestHost {
    pub fn offline() -> Self {
        Self {
            authenticated: false,
            compression: None,
        }
    }

    pub fn online() -> Self {
        Self {
            authenticated: true,
            compression: None,
        }
    }

    pub fn with_compression(mut self, threshold: i32, level: i32) -> Self {
        self.compression = Some(CompressionConfig { threshold, level });
        self
    }
}

impl StatusProvider for TestHost {
    fn status(&self, _connection: &gate::DecidedConnection) -> StatusResponse {
        StatusResponse {
            version: StatusVersion {
                name: "1.8.9".to_string(),
                protocol: 47,
            },
            players: StatusPlayers { max: 20, online: 3 },
            description: serde_json::json!({ "text": "A test server" }),
            favicon: None,
        }
    }

    fn legacy16_status(&self, _connection: &gate::DecidedConnection) -> LegacyStatusResponse {
        LegacyStatusResponse {
            protocol_version: 74,
            server_version: "1.6.2".to_string(),
            message_of_the_day: "A legacy server".to_string(),
            current_players: 3,
            max_players: 20,
        }
    }

    fn legacy14_status(&self, _connection: &gate::Connection) -> LegacyStatusResponse {
        LegacyStatusResponse {
            protocol_version: 61,
            server_version: "1.4.7".to_string(),
            message_of_the_day: "A legacy server".to_string(),
            current_players: 3,
            max_players: 20,
        }
    }

    fn beta_status(&self, _connection: &gate::Connection) -> BetaStatusResponse {
        BetaStatusResponse {
            message_of_the_day: "A beta server".to_string(),
            current_players: 3,
            max_players: 20,
        }
    }
}

impl VirtualHost for TestHost {
    fn name(&self) -> &str {
        "test"
    }

    fn is_authenticated(&self, _connection: &gate::DecidedConnection) -> bool {
        self.authenticated
    }

    fn compression(
        &self,
        _connection: &gate::DecidedConnection,
        _profile: &Profile,
    ) -> Option<CompressionConfig> {
        self.compression
    }

    fn status_provider(&self) -> &dyn StatusProvider {
        self
    }
}

/// Resolver that records the arguments of every match call.
pub struct RecordingResolver {
    pub host: Arc<TestHost>,
    pub matched: Mutex<Vec<(i32, String, u16)>>,
}

impl VirtualHostResolver for RecordingResolver {
    fn match_host(
        &self,
        connection: &gate::InitializedConnection,
    ) -> Option<Arc<dyn VirtualHost>> {
        self.matched.lock().unwrap().push((
            connection.protocol_version(),
            connection.server_address().to_string(),
            connection.server_port(),
        ));
        let host: Arc<dyn VirtualHost> = self.host.clone();
        Some(host)
    }

    fn fallback_host(&self) -> Option<Arc<dyn VirtualHost>> {
        let host: Arc<dyn VirtualHost> = self.host.clone();
        Some(host)
    }
}

/// Session verifier that records calls and answers from a can.
pub struct StubVerifier {
    pub profile: Profile,
    pub fail: bool,
    pub calls: Mutex<Vec<(String, String, Vec<u8>, Vec<u8>)>>,
}

impl StubVerifier {
    pub fn accepting(profile: Profile) -> Self {
        Self {
            profile,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            profile: Profile::new("", ""),
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SessionVerifier for StubVerifier {
    async fn verify_join(
        &self,
        username: &str,
        server_id: &str,
        shared_secret: &[u8],
        public_key_der: &[u8],
    ) -> session::Result<Profile> {
        self.calls.lock().unwrap().push((
            username.to_string(),
            server_id.to_string(),
            shared_secret.to_vec(),
            public_key_der.to_vec(),
        ));
        if self.fail {
            Err(SessionError::NoContent)
        } else {
            Ok(self.profile.clone())
        }
    }
}

/// Play handler that just keeps the connection drained.
pub struct DrainHandler;

#[async_trait]
impl PlayHandler for DrainHandler {
    async fn run(
        self: Box<Self>,
        mut conduit: Conduit,
        _connection: gate::AuthorizedConnection,
    ) -> gate::Result<()> {
        while conduit.read_frame().await.is_ok() {}
        Ok(())
    }
}

/// Factory that records every handoff.
pub struct RecordingPlayFactory {
    pub handoffs: Mutex<Vec<(String, Option<CompressionConfig>)>>,
}

impl RecordingPlayFactory {
    pub fn new() -> Self {
        Self {
            handoffs: Mutex::new(Vec::new()),
        }
    }
}

impl PlayHandlerFactory for RecordingPlayFactory {
    fn create_handler(
        &self,
        connection: &gate::AuthorizedConnection,
    ) -> Option<Box<dyn PlayHandler>> {
        self.handoffs.lock().unwrap().push((
            connection.profile().name.clone(),
            connection.compression(),
        ));
        Some(Box::new(DrainHandler))
    }
}

pub struct TestContext {
    pub services: Arc<Services>,
    pub resolver: Arc<RecordingResolver>,
    pub verifier: Arc<StubVerifier>,
    pub play: Arc<RecordingPlayFactory>,
}

pub fn test_context(host: TestHost, verifier: StubVerifier) -> TestContext {
    let resolver = Arc::new(RecordingResolver {
        host: Arc::new(host),
        matched: Mutex::new(Vec::new()),
    });
    let verifier = Arc::new(verifier);
    let play = Arc::new(RecordingPlayFactory::new());
    let services = Arc::new(Services {
        resolver: resolver.clone(),
        encryption_factory: Arc::new(RsaEncryptionFactory),
        session_verifier: verifier.clone(),
        play_factory: play.clone(),
    });
    TestContext {
        services,
        resolver,
        verifier,
        play,
    }
}

pub fn offline_context() -> TestContext {
    test_context(
        TestHost::offline(),
        StubVerifier::accepting(Profile::new("stub", "stub")),
    )
}

/// Bind an ephemeral listener serving connections through the engine.
pub async fn spawn_gate(context: &TestContext) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let services = context.services.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let services = services.clone();
            tokio::spawn(async move {
                let config = GateConfig {
                    port: 0,
                    read_timeout: Duration::from_secs(5),
                };
                let _ = gate::serve_connection(stream, services, config).await;
            });
        }
    });
    addr
}

/// A hand-rolled protocol client mirroring the layering from the outside.
pub struct TestClient {
    stream: TcpStream,
    buffer: BytesMut,
    encryptor: Option<wire::PacketEncryptor>,
    decryptor: Option<wire::PacketDecryptor>,
    compression: bool,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
            buffer: BytesMut::new(),
            encryptor: None,
            decryptor: None,
            compression: false,
        }
    }

    pub fn enable_encryption(&mut self, secret: &[u8]) {
        self.encryptor = Some(wire::PacketEncryptor::new(secret).unwrap());
        self.decryptor = Some(wire::PacketDecryptor::new(secret).unwrap());
    }

    pub fn enable_compression(&mut self) {
        self.compression = true;
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        let mut bytes = bytes.to_vec();
        if let Some(encryptor) = self.encryptor.as_mut() {
            encryptor.encrypt(&mut bytes);
        }
        self.stream.write_all(&bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    pub async fn send_packet(&mut self, packet: &[u8]) {
        let mut body = Vec::new();
        if self.compression {
            wire::write_varint(&mut body, 0);
        }
        body.extend_from_slice(packet);
        let mut framed = Vec::new();
        wire::write_varint(&mut framed, body.len() as i32);
        framed.extend_from_slice(&body);
        self.send_raw(&framed).await;
    }

    async fn fill(&mut self) -> bool {
        let start = self.buffer.len();
        let read = tokio::time::timeout(
            Duration::from_secs(5),
            self.stream.read_buf(&mut self.buffer),
        )
        .await
        .expect("read timed out")
        .unwrap();
        if read == 0 {
            return false;
        }
        if let Some(decryptor) = self.decryptor.as_mut() {
            decryptor.decrypt(&mut self.buffer[start..]);
        }
        true
    }

    pub async fn recv_exact_raw(&mut self, n: usize) -> Option<Bytes> {
        while self.buffer.len() < n {
            if !self.fill().await {
                return None;
            }
        }
        Some(self.buffer.split_to(n).freeze())
    }

    /// Receive one framed packet, unwrapping the compression envelope when
    /// enabled. `None` means the server closed the connection.
    pub async fn recv_frame(&mut self) -> Option<Bytes> {
        let mut length = 0u32;
        let mut consumed = 0;
        loop {
            if consumed >= self.buffer.len() && !self.fill().await {
                return None;
            }
            let byte = self.buffer[consumed];
            length |= u32::from(byte & 0x7f) << (7 * consumed);
            consumed += 1;
            if byte & 0x80 == 0 {
                break;
            }
            assert!(consumed < 3, "frame length too long");
        }
        self.buffer.advance(consumed);
        let mut frame = self.recv_exact_raw(length as usize).await?;
        if self.compression {
            let data_len = wire::read_varint(&mut frame).unwrap();
            if data_len > 0 {
                let context = wire::CompressionContext::new(0, 6);
                let payload = context.decompress(&frame, data_len as usize).unwrap();
                return Some(Bytes::from(payload));
            }
        }
        Some(frame)
    }

    /// True if the server has closed the connection.
    pub async fn at_eof(&mut self) -> bool {
        if !self.buffer.is_empty() {
            return false;
        }
        match tokio::time::timeout(Duration::from_secs(2), self.stream.read_buf(&mut self.buffer))
            .await
        {
            Ok(Ok(0)) => true,
            Ok(Ok(_)) => false,
            Ok(Err(_)) => true,
            Err(_) => false,
        }
    }

    /// Read a legacy reply: the 0xff marker plus one UTF-16BE string.
    pub async fn recv_legacy_response(&mut self) -> String {
        let marker = self.recv_exact_raw(1).await.expect("missing response");
        assert_eq!(marker[0], 0xff, "bad legacy response marker");
        let mut units = self.recv_exact_raw(2).await.expect("missing length");
        let units = units.get_u16() as usize;
        let mut bytes = self
            .recv_exact_raw(units * 2)
            .await
            .expect("missing payload");
        let mut code_units = Vec::with_capacity(units);
        for _ in 0..units {
            code_units.push(bytes.get_u16());
        }
        String::from_utf16(&code_units).unwrap()
    }

    pub async fn handshake(&mut self, protocol: i32, host: &str, port: u16, next_state: i32) {
        let mut packet = BytesMut::new();
        wire::write_varint(&mut packet, 0x00);
        wire::write_varint(&mut packet, protocol);
        wire::write_string(&mut packet, host);
        packet.put_u16(port);
        wire::write_varint(&mut packet, next_state);
        self.send_packet(&packet).await;
    }

    pub async fn login_start(&mut self, name: &str) {
        let mut packet = BytesMut::new();
        wire::write_varint(&mut packet, 0x00);
        wire::write_string(&mut packet, name);
        self.send_packet(&packet).await;
    }
}
