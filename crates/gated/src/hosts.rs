//! Static single-host wiring: one virtual host answering for every
//! declared target, with status content taken from the configuration.

use crate::config::ServerConfig;
use gate::{
    BetaStatusResponse, CompressionConfig, Connection, DecidedConnection,
    InitializedConnection, LegacyStatusResponse, StatusPlayers, StatusProvider, StatusResponse,
    StatusVersion, VirtualHost, VirtualHostResolver,
};
use session::Profile;
use std::sync::Arc;

pub struct StaticVirtualHost {
    config: ServerConfig,
}

impl StaticVirtualHost {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }
}

impl StatusProvider for StaticVirtualHost {
    fn status(&self, _connection: &DecidedConnection) -> StatusResponse {
        StatusResponse {
            version: StatusVersion {
                name: self.config.server_version.clone(),
                protocol: self.config.protocol_version,
            },
            players: StatusPlayers {
                max: self.config.max_players,
                online: 0,
            },
            description: serde_json::json!({ "text": self.config.motd }),
            favicon: None,
        }
    }

    fn legacy16_status(&self, _connection: &DecidedConnection) -> LegacyStatusResponse {
        self.legacy_status()
    }

    fn legacy14_status(&self, _connection: &Connection) -> LegacyStatusResponse {
        self.legacy_status()
    }

    fn beta_status(&self, _connection: &Connection) -> BetaStatusResponse {
        BetaStatusResponse {
            message_of_the_day: self.config.motd.clone(),
            current_players: 0,
            max_players: self.config.max_players,
        }
    }
}

impl StaticVirtualHost {
    fn legacy_status(&self) -> LegacyStatusResponse {
        LegacyStatusResponse {
            protocol_version: self.config.protocol_version,
            server_version: self.config.server_version.clone(),
            message_of_the_day: self.config.motd.clone(),
            current_players: 0,
            max_players: self.config.max_players,
        }
    }
}

impl VirtualHost for StaticVirtualHost {
    fn name(&self) -> &str {
        "default"
    }

    fn is_authenticated(&self, _connection: &DecidedConnection) -> bool {
        self.config.online_mode
    }

    fn compression(
        &self,
        _connection: &DecidedConnection,
        _profile: &Profile,
    ) -> Option<CompressionConfig> {
        self.config.compression.map(|settings| CompressionConfig {
            threshold: settings.threshold,
            level: settings.level,
        })
    }

    fn status_provider(&self) -> &dyn StatusProvider {
        self
    }
}

pub struct StaticHostResolver {
    host: Arc<StaticVirtualHost>,
}

impl StaticHostResolver {
    pub fn new(host: Arc<StaticVirtualHost>) -> Self {
        Self { host }
    }
}

impl VirtualHostResolver for StaticHostResolver {
    fn match_host(&self, _connection: &InitializedConnection) -> Option<Arc<dyn VirtualHost>> {
        let host: Arc<dyn VirtualHost> = self.host.clone();
        Some(host)
    }

    fn fallback_host(&self) -> Option<Arc<dyn VirtualHost>> {
        let host: Arc<dyn VirtualHost> = self.host.clone();
        Some(host)
    }
}
