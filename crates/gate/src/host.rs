//! Virtual host interfaces consumed by the protocol engine.
//!
//! A virtual host is the logical server identity selected per connection
//! from the declared target address, port and protocol version. Matching
//! *policy* lives behind [`VirtualHostResolver`]; the engine only asks.

use crate::connection::{Connection, DecidedConnection, InitializedConnection};
use serde::{Deserialize, Serialize};
use session::Profile;
use std::sync::Arc;

/// Per-host packet compression policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Minimum payload size in bytes that gets compressed. Negative
    /// disables compression outright.
    pub threshold: i32,
    /// Zlib level: -1 for the library default, 0..=9 otherwise.
    pub level: i32,
}

/// Modern status payload, serialized verbatim as the status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: StatusVersion,
    pub players: StatusPlayers,
    pub description: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusVersion {
    pub name: String,
    pub protocol: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPlayers {
    pub max: u32,
    pub online: u32,
}

/// Payload of the 1.4/1.6 legacy responses.
#[derive(Debug, Clone)]
pub struct LegacyStatusResponse {
    pub protocol_version: i32,
    pub server_version: String,
    pub message_of_the_day: String,
    pub current_players: u32,
    pub max_players: u32,
}

/// Payload of the pre-1.4 (Beta) legacy response.
#[derive(Debug, Clone)]
pub struct BetaStatusResponse {
    pub message_of_the_day: String,
    pub current_players: u32,
    pub max_players: u32,
}

/// Status content generation for one virtual host.
pub trait StatusProvider: Send + Sync {
    fn status(&self, connection: &DecidedConnection) -> StatusResponse;
    fn legacy16_status(&self, connection: &DecidedConnection) -> LegacyStatusResponse;
    fn legacy14_status(&self, connection: &Connection) -> LegacyStatusResponse;
    fn beta_status(&self, connection: &Connection) -> BetaStatusResponse;
}

/// One logical server instance.
pub trait VirtualHost: Send + Sync {
    fn name(&self) -> &str;

    /// Whether connections to this host must authenticate online.
    fn is_authenticated(&self, connection: &DecidedConnection) -> bool;

    /// Compression policy for an authorized connection, if any.
    fn compression(
        &self,
        connection: &DecidedConnection,
        profile: &Profile,
    ) -> Option<CompressionConfig>;

    fn status_provider(&self) -> &dyn StatusProvider;
}

/// Virtual host selection.
pub trait VirtualHostResolver: Send + Sync {
    /// Match a host for the declared target, or `None`.
    fn match_host(&self, connection: &InitializedConnection) -> Option<Arc<dyn VirtualHost>>;

    /// The configured default host, or `None` if there is none.
    fn fallback_host(&self) -> Option<Arc<dyn VirtualHost>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_shape() {
        let response = StatusResponse {
            version: StatusVersion {
                name: "1.8.9".to_string(),
                protocol: 47,
            },
            players: StatusPlayers { max: 20, online: 3 },
            description: serde_json::json!({ "text": "A server" }),
            favicon: None,
        };
        let serialized = serde_json::to_value(&response).unwrap();
        assert_eq!(serialized["version"]["protocol"], 47);
        assert_eq!(serialized["players"]["max"], 20);
        assert_eq!(serialized["description"]["text"], "A server");
        assert!(serialized.get("favicon").is_none());
    }
}
