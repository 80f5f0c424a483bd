//! Connection inputs, observable transport state and events.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Status of the session with the host application, as reported by whatever
/// owns the connection screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// External connection inputs the transport follows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub host: Option<String>,
    pub status: ConnectionStatus,
    /// Command API port advertised by the host; 0 or absent disables the API.
    pub api_port: Option<u16>,
}

impl ConnectionInfo {
    pub fn connected(host: impl Into<String>, api_port: u16) -> Self {
        Self {
            host: Some(host.into()),
            status: ConnectionStatus::Connected,
            api_port: Some(api_port),
        }
    }

    pub fn is_api_available(&self) -> bool {
        self.api_port.is_some_and(|p| p > 0)
    }

    /// The endpoint to connect to, or `None` when the API link should be down.
    pub fn target(&self) -> Option<ConnectionTarget> {
        if self.status != ConnectionStatus::Connected {
            return None;
        }
        let host = self.host.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
        let port = self.api_port.filter(|p| *p > 0)?;
        Some(ConnectionTarget::new(host, port))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
}

impl ConnectionTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Snapshot of the transport, reset whenever the connection target changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportState {
    pub link: LinkState,
    pub connected: bool,
    pub is_sending: bool,
    /// Most recent inbound message; not correlated with any particular send.
    pub last_response: Option<Value>,
    pub error: Option<String>,
    /// Frames written to the socket on the current link.
    pub sent_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Response(Value),
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_requires_connected_host_and_port() {
        assert_eq!(
            ConnectionInfo::connected("10.0.0.2", 5505).target(),
            Some(ConnectionTarget::new("10.0.0.2", 5505))
        );

        let mut info = ConnectionInfo::connected("10.0.0.2", 0);
        assert!(!info.is_api_available());
        assert_eq!(info.target(), None);

        info.api_port = None;
        assert_eq!(info.target(), None);

        let mut info = ConnectionInfo::connected("  ", 5505);
        assert_eq!(info.target(), None);

        info.host = Some("10.0.0.2".into());
        info.status = ConnectionStatus::Connecting;
        assert_eq!(info.target(), None);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let state = TransportState {
            is_sending: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["isSending"], Value::Bool(true));
        assert_eq!(json["lastResponse"], Value::Null);
        assert_eq!(json["link"], Value::String("disconnected".into()));
    }
}
