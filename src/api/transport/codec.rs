//! Framing for command and response messages.
//!
//! `Json` sends each command as one JSON text frame. `SocketIo` wraps the same
//! payload in Engine.IO v4 / Socket.IO packets as a `data` event.

use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use url::Url;

use super::types::ConnectionTarget;

const SOCKET_IO_EVENT: &str = "data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    #[default]
    Json,
    SocketIo,
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Json => write!(f, "json"),
            WireFormat::SocketIo => write!(f, "socket-io"),
        }
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" | "raw" => Ok(WireFormat::Json),
            "socket-io" | "socketio" | "socket.io" => Ok(WireFormat::SocketIo),
            other => Err(format!("unknown wire format `{}` (expected json or socket-io)", other)),
        }
    }
}

/// What an inbound text frame means to the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Engine.IO handshake; the client must join the default namespace.
    Open,
    /// Namespace joined, commands may be sent.
    Connected,
    Ping,
    Response(Value),
    Error(String),
    Disconnect,
    Ignored,
}

impl Inbound {
    /// Frame the client must answer with, if any.
    pub fn reply(&self) -> Option<&'static str> {
        match self {
            Inbound::Open => Some("40"),
            Inbound::Ping => Some("3"),
            _ => None,
        }
    }
}

/// `{action, ...data}` as one JSON object. An `action` key inside `data` is
/// replaced by the explicit action.
pub fn command_payload(action: &str, data: &Map<String, Value>) -> Value {
    let mut payload = data.clone();
    payload.insert("action".to_string(), Value::String(action.to_string()));
    Value::Object(payload)
}

/// JSON text is parsed, anything else is kept as a string.
pub fn parse_response(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn format_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}

impl WireFormat {
    pub fn endpoint_url(&self, target: &ConnectionTarget) -> Result<Url, url::ParseError> {
        let base = format!("ws://{}:{}/", format_host(target.host.trim()), target.port);
        let mut url = Url::parse(&base)?;
        if *self == WireFormat::SocketIo {
            url.set_path("/socket.io/");
            url.query_pairs_mut()
                .append_pair("EIO", "4")
                .append_pair("transport", "websocket");
        }
        Ok(url)
    }

    /// Whether the link counts as connected as soon as the WebSocket handshake
    /// completes, rather than after a protocol-level acknowledgement.
    pub fn connected_on_handshake(&self) -> bool {
        *self == WireFormat::Json
    }

    pub fn encode_command(&self, action: &str, data: &Map<String, Value>) -> String {
        let payload = command_payload(action, data).to_string();
        match self {
            WireFormat::Json => payload,
            WireFormat::SocketIo => {
                let event = Value::from(vec![Value::from(SOCKET_IO_EVENT), Value::from(payload)]);
                format!("42{}", event)
            }
        }
    }

    pub fn decode(&self, text: &str) -> Inbound {
        match self {
            WireFormat::Json => Inbound::Response(parse_response(text)),
            WireFormat::SocketIo => decode_socket_io(text),
        }
    }
}

fn decode_socket_io(text: &str) -> Inbound {
    let mut chars = text.chars();
    match chars.next() {
        Some('0') => Inbound::Open,
        Some('1') => Inbound::Disconnect,
        Some('2') => Inbound::Ping,
        Some('4') => decode_socket_io_packet(chars.as_str()),
        _ => Inbound::Ignored,
    }
}

// Socket.IO packet inside an Engine.IO message frame.
fn decode_socket_io_packet(packet: &str) -> Inbound {
    let mut chars = packet.chars();
    let kind = chars.next();
    let body = chars.as_str();
    match kind {
        Some('0') => Inbound::Connected,
        Some('1') => Inbound::Disconnect,
        Some('2') => decode_event(body),
        Some('4') => {
            let message = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| "Connection error".to_string());
            Inbound::Error(message)
        }
        _ => Inbound::Ignored,
    }
}

fn decode_event(body: &str) -> Inbound {
    // optional ack id precedes the argument array
    let args = body.trim_start_matches(|c: char| c.is_ascii_digit());
    let Ok(Value::Array(mut items)) = serde_json::from_str::<Value>(args) else {
        return Inbound::Ignored;
    };
    if items.first().and_then(Value::as_str) != Some(SOCKET_IO_EVENT) || items.len() < 2 {
        return Inbound::Ignored;
    }
    match items.swap_remove(1) {
        Value::String(text) => Inbound::Response(parse_response(&text)),
        other => Inbound::Response(other),
    }
}
