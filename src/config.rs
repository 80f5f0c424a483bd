//! Runtime configuration assembled from command-line flags with environment
//! fallbacks.

use std::path::PathBuf;
use std::time::Duration;

use crate::api::transport::{ConnectionInfo, ConnectionStatus, TransportConfig, WireFormat};
use crate::db;

pub const DEFAULT_API_PORT: u16 = 5505;
pub const HOST_ENV: &str = "FREESHOW_HOST";
pub const API_PORT_ENV: &str = "FREESHOW_API_PORT";
pub const WIRE_ENV: &str = "FREESHOW_WIRE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no host configured (pass --host or set FREESHOW_HOST)")]
    MissingHost,
    #[error("API port is 0, the host has its command API disabled")]
    ApiDisabled,
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Values given explicitly on the command line. `None` falls back to the
/// environment, then to defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigArgs {
    pub host: Option<String>,
    pub api_port: Option<u16>,
    pub wire_format: Option<WireFormat>,
    pub reconnect_attempts: Option<u32>,
    pub reconnect_delay_ms: Option<u64>,
    pub database: Option<PathBuf>,
    pub schema: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub host: Option<String>,
    pub api_port: u16,
    pub transport: TransportConfig,
    pub database: PathBuf,
    /// Raw schema file replacing the built-in catalog.
    pub schema: Option<PathBuf>,
}

impl RemoteConfig {
    pub fn from_env(args: ConfigArgs) -> Result<Self, ConfigError> {
        Self::resolve(args, |name| std::env::var(name).ok())
    }

    pub fn resolve(
        args: ConfigArgs,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let host = args
            .host
            .or_else(|| env(HOST_ENV))
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());

        let api_port = match args.api_port {
            Some(port) => port,
            None => match env(API_PORT_ENV) {
                Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                    ConfigError::InvalidValue {
                        name: API_PORT_ENV,
                        reason: e.to_string(),
                    }
                })?,
                None => DEFAULT_API_PORT,
            },
        };

        let wire_format = match args.wire_format {
            Some(wire) => wire,
            None => match env(WIRE_ENV) {
                Some(raw) => raw
                    .parse::<WireFormat>()
                    .map_err(|reason| ConfigError::InvalidValue {
                        name: WIRE_ENV,
                        reason,
                    })?,
                None => WireFormat::default(),
            },
        };

        let defaults = TransportConfig::default();
        let transport = TransportConfig {
            wire_format,
            reconnect_attempts: args
                .reconnect_attempts
                .unwrap_or(defaults.reconnect_attempts),
            reconnect_delay: args
                .reconnect_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_delay),
            ..defaults
        };

        let database = match args.database {
            Some(path) => db::resolve_database_path(&path.to_string_lossy()),
            None => match env(db::DATABASE_URL_ENV) {
                Some(url) => db::resolve_database_path(&url),
                None => db::resolve_database_path(db::DEFAULT_DATABASE_PATH),
            },
        };

        let config = RemoteConfig {
            host,
            api_port,
            transport,
            database,
            schema: args.schema,
        };
        tracing::debug!(?config, "configuration resolved");
        Ok(config)
    }

    /// Connection inputs for a session the user asked for. Fails when there is
    /// nothing to connect to.
    pub fn connection_info(&self) -> Result<ConnectionInfo, ConfigError> {
        let host = self.host.clone().ok_or(ConfigError::MissingHost)?;
        if self.api_port == 0 {
            return Err(ConfigError::ApiDisabled);
        }
        Ok(ConnectionInfo {
            host: Some(host),
            status: ConnectionStatus::Connected,
            api_port: Some(self.api_port),
        })
    }
}
