//! Command transport to the host application's API socket.
//!
//! An [`ApiTransport`] owns at most one live connection. Each connection runs
//! in its own task; replacing or dropping the link stops that task, and a
//! generation counter keeps a stale task from touching the shared state.

mod codec;
mod types;

pub use codec::{Inbound, WireFormat, command_payload, parse_response};
pub use types::{
    ConnectionInfo, ConnectionStatus, ConnectionTarget, LinkState, TransportEvent, TransportState,
};

use futures_util::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::{WebSocketStream, connect_async};
use tungstenite::Message;
use url::Url;

use crate::api::favorites::SendArgs;

pub const NOT_CONNECTED: &str = "Not connected to host";

const OUTBOUND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub wire_format: WireFormat,
    /// Reconnection attempts after a failed or lost connection.
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            wire_format: WireFormat::default(),
            reconnect_attempts: 5,
            reconnect_delay: Duration::from_millis(1500),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Upper bound on how long the first connection can take before the link
    /// gives up, counting every retry.
    pub fn max_connect_wait(&self) -> Duration {
        let attempts = self.reconnect_attempts.saturating_add(1);
        self.connect_timeout
            .saturating_mul(attempts)
            .saturating_add(self.reconnect_delay.saturating_mul(self.reconnect_attempts))
    }
}

struct Inner {
    generation: u64,
    state: TransportState,
}

struct Shared {
    inner: Mutex<Inner>,
    events: broadcast::Sender<TransportEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset the state for a new link. Tasks holding an older generation lose
    /// write access.
    fn advance(&self, link: LinkState) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = TransportState {
            link,
            ..TransportState::default()
        };
        inner.generation
    }

    fn current(&self) -> u64 {
        self.lock().generation
    }

    fn update(
        &self,
        generation: u64,
        f: impl FnOnce(&mut TransportState) -> Option<TransportEvent>,
    ) -> bool {
        let event = {
            let mut inner = self.lock();
            if inner.generation != generation {
                return false;
            }
            f(&mut inner.state)
        };
        if let Some(event) = event {
            let _ = self.events.send(event);
        }
        true
    }

    fn set_link(&self, generation: u64, link: LinkState) {
        self.update(generation, |state| {
            let was_connected = state.connected;
            state.link = link;
            state.connected = link == LinkState::Connected;
            match (was_connected, state.connected) {
                (false, true) => {
                    state.error = None;
                    Some(TransportEvent::Connected)
                }
                (true, false) => Some(TransportEvent::Disconnected),
                _ => None,
            }
        });
    }

    fn fail(&self, generation: u64, message: String) {
        self.update(generation, |state| {
            state.error = Some(message.clone());
            Some(TransportEvent::Error(message))
        });
    }

    fn respond(&self, generation: u64, value: Value) {
        self.update(generation, |state| {
            state.last_response = Some(value.clone());
            Some(TransportEvent::Response(value))
        });
    }

    fn record_sent(&self, generation: u64) {
        self.update(generation, |state| {
            state.sent_count += 1;
            None
        });
    }

    fn set_sending(&self, generation: u64, sending: bool) {
        self.update(generation, |state| {
            state.is_sending = sending;
            None
        });
    }
}

struct Link {
    target: ConnectionTarget,
    outbound: mpsc::Sender<String>,
    // dropping this stops the connection task
    _shutdown: oneshot::Sender<()>,
}

/// Owner of the single API connection.
pub struct ApiTransport {
    config: TransportConfig,
    shared: Arc<Shared>,
    link: Option<Link>,
}

impl ApiTransport {
    pub fn new(config: TransportConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            config,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    generation: 0,
                    state: TransportState::default(),
                }),
                events,
            }),
            link: None,
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.shared.events.subscribe()
    }

    pub fn state(&self) -> TransportState {
        self.shared.lock().state.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().state.connected
    }

    pub fn target(&self) -> Option<&ConnectionTarget> {
        self.link.as_ref().map(|link| &link.target)
    }

    /// Follow the external connection state: connect when the host session is
    /// up and advertises an API port, replace the link when the endpoint
    /// changes, and tear it down otherwise.
    pub fn sync(&mut self, info: &ConnectionInfo) {
        match info.target() {
            Some(target) if self.target() == Some(&target) => {}
            Some(target) => self.connect(target),
            None => {
                if self.link.is_some() {
                    self.disconnect();
                }
            }
        }
    }

    /// Open a link to `target`, tearing down any existing one first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&mut self, target: ConnectionTarget) {
        self.teardown();
        let generation = self.shared.advance(LinkState::Connecting);

        let url = match self.config.wire_format.endpoint_url(&target) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(endpoint = %target, error = %e, "invalid API address");
                self.shared.set_link(generation, LinkState::Disconnected);
                self.shared
                    .fail(generation, format!("Invalid API address {}: {}", target, e));
                return;
            }
        };

        let wire = self.config.wire_format;
        tracing::info!(endpoint = %target, %wire, "connecting to host API");
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(run_link(
            Arc::clone(&self.shared),
            generation,
            url,
            self.config.clone(),
            outbound_rx,
            shutdown_rx,
        ));

        self.link = Some(Link {
            target,
            outbound: outbound_tx,
            _shutdown: shutdown_tx,
        });
    }

    pub fn disconnect(&mut self) {
        if let Some(link) = &self.link {
            tracing::info!(endpoint = %link.target, "disconnecting from host API");
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.link.take().is_some() {
            let was_connected = self.is_connected();
            self.shared.advance(LinkState::Disconnected);
            if was_connected {
                let _ = self.shared.events.send(TransportEvent::Disconnected);
            }
        }
    }

    /// Send one command. Without a connected socket this only records an
    /// error; nothing is queued for later.
    pub async fn send(&self, action: &str, data: Map<String, Value>) {
        let link = match &self.link {
            Some(link) if self.is_connected() => link,
            _ => {
                tracing::warn!(action, "API command dropped, socket not connected");
                let generation = self.shared.current();
                self.shared.fail(generation, NOT_CONNECTED.to_string());
                return;
            }
        };

        let generation = self.shared.current();
        let frame = self.config.wire_format.encode_command(action, &data);
        self.shared.set_sending(generation, true);
        tracing::debug!(action, payload = %frame, "sending API command");

        if link.outbound.send(frame).await.is_err() {
            self.shared.fail(
                generation,
                "Connection closed before the command was sent".to_string(),
            );
        }
        self.shared.set_sending(generation, false);
    }

    pub async fn send_args(&self, args: &SendArgs) {
        self.send(&args.action, args.data.clone().unwrap_or_default())
            .await;
    }
}

impl Drop for ApiTransport {
    fn drop(&mut self) {
        self.teardown();
    }
}

enum LinkEnd {
    Shutdown,
    /// `active` is false when the socket closed before any command or
    /// response went through it.
    Lost { active: bool },
}

async fn run_link(
    shared: Arc<Shared>,
    generation: u64,
    url: Url,
    config: TransportConfig,
    mut outbound: mpsc::Receiver<String>,
    mut shutdown: oneshot::Receiver<()>,
) {
    // consecutive attempts that failed or closed without traffic
    let mut failures: u32 = 0;

    loop {
        shared.set_link(generation, LinkState::Connecting);
        let attempt = tokio::time::timeout(config.connect_timeout, connect_async(url.as_str()));
        let result = tokio::select! {
            _ = &mut shutdown => return,
            result = attempt => result,
        };

        match result {
            Ok(Ok((stream, _))) => {
                tracing::debug!(%url, "API socket open");
                let end =
                    drive_link(&shared, generation, &config, stream, &mut outbound, &mut shutdown)
                        .await;
                let LinkEnd::Lost { active } = end else {
                    return;
                };
                tracing::warn!(%url, active, "API socket lost");
                shared.set_link(generation, LinkState::Disconnected);
                // commands queued for the lost socket are dropped
                while outbound.try_recv().is_ok() {}
                failures = if active { 0 } else { failures.saturating_add(1) };
            }
            Ok(Err(e)) => {
                tracing::error!(%url, error = %e, "API connection failed");
                shared.set_link(generation, LinkState::Disconnected);
                shared.fail(generation, e.to_string());
                failures = failures.saturating_add(1);
            }
            Err(_) => {
                tracing::error!(%url, "API connection timed out");
                shared.set_link(generation, LinkState::Disconnected);
                shared.fail(generation, "Connection timed out".to_string());
                failures = failures.saturating_add(1);
            }
        }

        if failures > config.reconnect_attempts {
            tracing::warn!(%url, failures, "giving up on API connection");
            return;
        }

        let delay_ms = config.reconnect_delay.as_millis() as u64;
        tracing::info!(%url, delay_ms, "reconnecting to host API");
        tokio::select! {
            _ = &mut shutdown => return,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }
}

async fn drive_link<S>(
    shared: &Shared,
    generation: u64,
    config: &TransportConfig,
    stream: WebSocketStream<S>,
    outbound: &mut mpsc::Receiver<String>,
    shutdown: &mut oneshot::Receiver<()>,
) -> LinkEnd
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let wire = config.wire_format;
    let (mut write, mut read) = stream.split();
    let mut active = false;

    if wire.connected_on_handshake() {
        shared.set_link(generation, LinkState::Connected);
    }

    loop {
        tokio::select! {
            _ = &mut *shutdown => {
                let _ = tokio::time::timeout(CLOSE_TIMEOUT, write.close()).await;
                return LinkEnd::Shutdown;
            }
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    let _ = tokio::time::timeout(CLOSE_TIMEOUT, write.close()).await;
                    return LinkEnd::Shutdown;
                };
                if let Err(e) = write.send(Message::Text(frame)).await {
                    shared.fail(generation, format!("Send failed: {}", e));
                    return LinkEnd::Lost { active };
                }
                active = true;
                shared.record_sent(generation);
            }
            message = read.next() => {
                let text = match message {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Binary(bytes))) => {
                        let text = String::from_utf8_lossy(&bytes).into_owned();
                        active = true;
                        shared.respond(generation, Value::String(text));
                        continue;
                    }
                    Some(Ok(Message::Close(_))) | None => return LinkEnd::Lost { active },
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        shared.fail(generation, e.to_string());
                        return LinkEnd::Lost { active };
                    }
                };

                let inbound = wire.decode(&text);
                if let Some(reply) = inbound.reply()
                    && let Err(e) = write.send(Message::Text(reply.to_string())).await
                {
                    shared.fail(generation, format!("Send failed: {}", e));
                    return LinkEnd::Lost { active };
                }

                match inbound {
                    Inbound::Connected => shared.set_link(generation, LinkState::Connected),
                    Inbound::Response(value) => {
                        active = true;
                        shared.respond(generation, value);
                    }
                    Inbound::Error(message) => shared.fail(generation, message),
                    Inbound::Disconnect => return LinkEnd::Lost { active },
                    Inbound::Open | Inbound::Ping | Inbound::Ignored => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::broadcast::error::RecvError;
    use tokio_tungstenite::accept_async;

    const WAIT: Duration = Duration::from_secs(5);

    async fn wait_for(
        events: &mut broadcast::Receiver<TransportEvent>,
        pred: impl Fn(&TransportEvent) -> bool,
    ) -> TransportEvent {
        tokio::time::timeout(WAIT, async {
            loop {
                match events.recv().await {
                    Ok(event) if pred(&event) => return event,
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => panic!("event channel closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for transport event")
    }

    async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> Option<String> {
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                return Some(text);
            }
        }
        None
    }

    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    fn quick_config(wire_format: WireFormat, reconnect_attempts: u32) -> TransportConfig {
        TransportConfig {
            wire_format,
            reconnect_attempts,
            reconnect_delay: Duration::from_millis(50),
            connect_timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_send_without_connection_sets_error() {
        let transport = ApiTransport::new(TransportConfig::default());
        transport.send("next_slide", Map::new()).await;

        let state = transport.state();
        assert_eq!(state.sent_count, 0);
        assert!(!state.connected);
        assert!(!state.is_sending);
        assert_eq!(state.error.as_deref(), Some(NOT_CONNECTED));
    }

    #[tokio::test]
    async fn test_send_while_connecting_is_rejected() {
        // accepts TCP but never completes the WebSocket handshake
        let (listener, port) = listener().await;
        let _server = tokio::spawn(async move {
            let (_tcp, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let mut transport = ApiTransport::new(quick_config(WireFormat::Json, 0));
        transport.connect(ConnectionTarget::new("127.0.0.1", port));
        assert_eq!(transport.state().link, LinkState::Connecting);

        transport.send("next_slide", Map::new()).await;
        let state = transport.state();
        assert_eq!(state.sent_count, 0);
        assert_eq!(state.error.as_deref(), Some(NOT_CONNECTED));
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            let command = next_text(&mut ws).await.unwrap();
            ws.send(Message::Text(r#"{"status":"ok"}"#.to_string())).await.unwrap();
            ws.send(Message::Text("plain text".to_string())).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
            command
        });

        let mut transport = ApiTransport::new(quick_config(WireFormat::Json, 0));
        let mut events = transport.subscribe();
        transport.sync(&ConnectionInfo::connected("127.0.0.1", port));
        wait_for(&mut events, |e| *e == TransportEvent::Connected).await;
        assert!(transport.state().connected);

        let data = json!({"index": 2}).as_object().cloned().unwrap();
        transport.send("index_select_slide", data).await;

        let first = wait_for(&mut events, |e| matches!(e, TransportEvent::Response(_))).await;
        assert_eq!(first, TransportEvent::Response(json!({"status": "ok"})));
        wait_for(&mut events, |e| *e == TransportEvent::Response(json!("plain text"))).await;

        let state = transport.state();
        assert_eq!(state.last_response, Some(json!("plain text")));
        assert_eq!(state.sent_count, 1);
        assert!(state.error.is_none());

        transport.disconnect();
        assert!(!transport.state().connected);
        assert!(transport.target().is_none());

        let command = tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&command).unwrap(),
            json!({"action": "index_select_slide", "index": 2})
        );
    }

    #[tokio::test]
    async fn test_socket_io_round_trip() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.send(Message::Text(
                r#"0{"sid":"s1","pingInterval":25000,"pingTimeout":20000}"#.to_string(),
            ))
            .await
            .unwrap();
            assert_eq!(next_text(&mut ws).await.as_deref(), Some("40"));
            ws.send(Message::Text("2".to_string())).await.unwrap();
            assert_eq!(next_text(&mut ws).await.as_deref(), Some("3"));
            ws.send(Message::Text(r#"40{"sid":"n1"}"#.to_string())).await.unwrap();

            let command = next_text(&mut ws).await.unwrap();
            ws.send(Message::Text(r#"42["data","{\"ok\":1}"]"#.to_string()))
                .await
                .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
            command
        });

        let mut transport = ApiTransport::new(quick_config(WireFormat::SocketIo, 0));
        let mut events = transport.subscribe();
        transport.connect(ConnectionTarget::new("127.0.0.1", port));
        wait_for(&mut events, |e| *e == TransportEvent::Connected).await;

        transport.send("next_slide", Map::new()).await;
        wait_for(&mut events, |e| matches!(e, TransportEvent::Response(_))).await;
        assert_eq!(transport.state().last_response, Some(json!({"ok": 1})));

        transport.disconnect();
        let command = tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
        assert_eq!(command, r#"42["data","{\"action\":\"next_slide\"}"]"#);
    }

    #[tokio::test]
    async fn test_connect_failure_sets_error_without_connecting() {
        // bind then drop to get a port nothing listens on
        let (listener, port) = listener().await;
        drop(listener);

        let mut transport = ApiTransport::new(quick_config(WireFormat::Json, 0));
        let mut events = transport.subscribe();
        transport.connect(ConnectionTarget::new("127.0.0.1", port));

        wait_for(&mut events, |e| matches!(e, TransportEvent::Error(_))).await;
        let state = transport.state();
        assert!(!state.connected);
        assert_eq!(state.link, LinkState::Disconnected);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_reconnects_after_lost_connection() {
        let (listener, port) = listener().await;
        let _server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.close(None).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}

            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut transport = ApiTransport::new(quick_config(WireFormat::Json, 3));
        let mut events = transport.subscribe();
        transport.connect(ConnectionTarget::new("127.0.0.1", port));

        wait_for(&mut events, |e| *e == TransportEvent::Connected).await;
        wait_for(&mut events, |e| *e == TransportEvent::Disconnected).await;
        wait_for(&mut events, |e| *e == TransportEvent::Connected).await;
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn test_target_change_replaces_connection() {
        let (listener_a, port_a) = listener().await;
        let (listener_b, port_b) = listener().await;

        let (closed_tx, closed_rx) = oneshot::channel();
        let _server_a = tokio::spawn(async move {
            let (tcp, _) = listener_a.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
            let _ = closed_tx.send(());
        });
        let _server_b = tokio::spawn(async move {
            let (tcp, _) = listener_b.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.send(Message::Text(r#"{"from":"b"}"#.to_string())).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut transport = ApiTransport::new(quick_config(WireFormat::Json, 0));
        let mut events = transport.subscribe();

        transport.sync(&ConnectionInfo::connected("127.0.0.1", port_a));
        wait_for(&mut events, |e| *e == TransportEvent::Connected).await;

        // same target again keeps the existing link
        transport.sync(&ConnectionInfo::connected("127.0.0.1", port_a));
        assert!(transport.is_connected());

        transport.sync(&ConnectionInfo::connected("127.0.0.1", port_b));
        assert_eq!(transport.target(), Some(&ConnectionTarget::new("127.0.0.1", port_b)));
        wait_for(&mut events, |e| *e == TransportEvent::Response(json!({"from": "b"}))).await;
        assert!(transport.is_connected());

        tokio::time::timeout(WAIT, closed_rx).await.unwrap().unwrap();
        // the old link closing must not disturb the new one
        assert!(transport.is_connected());
        assert_eq!(transport.target().map(|t| t.port), Some(port_b));

        transport.sync(&ConnectionInfo {
            status: ConnectionStatus::Disconnected,
            ..ConnectionInfo::connected("127.0.0.1", port_b)
        });
        assert!(transport.target().is_none());
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_sync_ignores_disabled_api() {
        let mut transport = ApiTransport::new(TransportConfig::default());
        transport.sync(&ConnectionInfo::connected("127.0.0.1", 0));
        assert!(transport.target().is_none());
        assert_eq!(transport.state(), TransportState::default());
    }

    #[tokio::test]
    async fn test_invalid_host_reports_error() {
        let mut transport = ApiTransport::new(TransportConfig::default());
        transport.connect(ConnectionTarget::new("not a host", 5505));

        let state = transport.state();
        assert!(!state.connected);
        assert_eq!(state.link, LinkState::Disconnected);
        assert!(state.error.unwrap().starts_with("Invalid API address"));
    }

    #[test]
    fn test_max_connect_wait_saturates() {
        let config = TransportConfig {
            reconnect_attempts: u32::MAX,
            ..Default::default()
        };
        assert!(config.max_connect_wait() > Duration::from_secs(u64::from(u32::MAX)));

        let config = TransportConfig {
            reconnect_attempts: u32::MAX,
            connect_timeout: Duration::MAX,
            ..Default::default()
        };
        assert_eq!(config.max_connect_wait(), Duration::MAX);

        let defaults = TransportConfig::default();
        assert_eq!(
            defaults.max_connect_wait(),
            Duration::from_secs(60) + Duration::from_millis(7500)
        );
    }

    #[tokio::test]
    async fn test_dropping_transport_closes_socket() {
        let (listener, port) = listener().await;
        let (closed_tx, closed_rx) = oneshot::channel();
        let _server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
            let _ = closed_tx.send(());
        });

        let mut transport = ApiTransport::new(quick_config(WireFormat::Json, 0));
        let mut events = transport.subscribe();
        transport.connect(ConnectionTarget::new("127.0.0.1", port));
        wait_for(&mut events, |e| *e == TransportEvent::Connected).await;

        drop(transport);
        tokio::time::timeout(WAIT, closed_rx).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_gives_up_on_host_that_closes_without_traffic() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (listener, port) = listener().await;
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        let _server = tokio::spawn(async move {
            loop {
                let (tcp, _) = listener.accept().await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
                let Ok(mut ws) = accept_async(tcp).await else {
                    continue;
                };
                let _ = ws.close(None).await;
                while let Some(Ok(_)) = ws.next().await {}
            }
        });

        let mut transport = ApiTransport::new(quick_config(WireFormat::Json, 2));
        transport.connect(ConnectionTarget::new("127.0.0.1", port));

        tokio::time::timeout(WAIT, async {
            while accepted.load(Ordering::SeqCst) < 3 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();
        // well past the 50ms retry delay
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(accepted.load(Ordering::SeqCst), 3);
        let state = transport.state();
        assert!(!state.connected);
        assert_eq!(state.link, LinkState::Disconnected);
    }
}
