//! Daemon configuration, loaded from a TOML file with embedded defaults.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_PORT: u16 = 25565;
const DEFAULT_TIMEOUT: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
    /// Read inactivity timeout in seconds.
    pub timeout: u64,
    /// Whether logins must authenticate against the session service.
    pub online_mode: bool,
    pub motd: String,
    pub max_players: u32,
    pub server_version: String,
    pub protocol_version: i32,
    /// Override of the session verification endpoint.
    pub session_url: Option<String>,
    pub compression: Option<CompressionSettings>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompressionSettings {
    pub threshold: i32,
    #[serde(default = "default_compression_level")]
    pub level: i32,
}

fn default_compression_level() -> i32 {
    6
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            online_mode: true,
            motd: "A Minecraft Server".to_string(),
            max_players: 20,
            server_version: "1.8.9".to_string(),
            protocol_version: 47,
            session_url: None,
            compression: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }
}
