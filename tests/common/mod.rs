//! Shared harness: an in-process mock market-data provider, a relay bound
//! to an ephemeral port, and browser-like WebSocket clients.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use price_relay::api::build_app;
use price_relay::app_state::AppState;
use price_relay::domain::DeliveryMode;
use price_relay::relay::{RelayHandle, RelayHub};
use price_relay::upstream::{UpstreamSettings, UpstreamSupervisor};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, accept_async, connect_async};
use url::Url;

/// How long to wait for something that should happen.
pub const WAIT: Duration = Duration::from_secs(5);

/// How long to watch for something that should not happen.
pub const QUIET: Duration = Duration::from_millis(250);

/// Browser-side socket.
pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum ProviderAction {
    Send(String),
    Ping(Vec<u8>),
    Close,
}

/// One relay connection accepted by the mock provider.
pub struct ProviderConn {
    inbound: mpsc::UnboundedReceiver<String>,
    control: mpsc::UnboundedReceiver<Message>,
    actions: mpsc::UnboundedSender<ProviderAction>,
}

impl ProviderConn {
    /// Next text frame the relay sent on this connection.
    pub async fn next_frame(&mut self) -> String {
        match timeout(WAIT, self.inbound.recv()).await {
            Ok(Some(frame)) => frame,
            Ok(None) => panic!("provider connection closed while waiting for a frame"),
            Err(_) => panic!("timed out waiting for a frame from the relay"),
        }
    }

    /// Asserts the relay sends nothing for a short while.
    pub async fn expect_no_frame(&mut self) {
        if let Ok(Some(frame)) = timeout(QUIET, self.inbound.recv()).await {
            panic!("unexpected frame from relay: {frame}");
        }
    }

    /// Next ping or pong the relay sent on this connection.
    pub async fn next_control(&mut self) -> Message {
        match timeout(WAIT, self.control.recv()).await {
            Ok(Some(frame)) => frame,
            Ok(None) => panic!("provider connection closed while waiting for a control frame"),
            Err(_) => panic!("timed out waiting for a control frame from the relay"),
        }
    }

    /// Sends a WebSocket ping carrying `payload` to the relay.
    pub fn ping(&self, payload: &[u8]) {
        let _ = self.actions.send(ProviderAction::Ping(payload.to_vec()));
    }

    /// Pushes a text frame to the relay.
    pub fn push(&self, text: &str) {
        let _ = self.actions.send(ProviderAction::Send(text.to_string()));
    }

    /// Closes this connection from the provider side.
    pub fn close(&self) {
        let _ = self.actions.send(ProviderAction::Close);
    }
}

/// Minimal stand-in for the provider's WebSocket endpoint.
pub struct MockProvider {
    pub url: Url,
    connections: mpsc::UnboundedReceiver<ProviderConn>,
}

impl MockProvider {
    pub async fn start() -> Self {
        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind mock provider");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("mock provider address");
        };
        let (conn_tx, connections) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let Ok((tcp, _)) = listener.accept().await else {
                    break;
                };
                let Ok(ws) = accept_async(tcp).await else {
                    continue;
                };
                let (inbound_tx, inbound) = mpsc::unbounded_channel();
                let (control_tx, control) = mpsc::unbounded_channel();
                let (actions, action_rx) = mpsc::unbounded_channel();
                tokio::spawn(serve_provider_conn(ws, inbound_tx, control_tx, action_rx));
                let conn = ProviderConn {
                    inbound,
                    control,
                    actions,
                };
                if conn_tx.send(conn).is_err() {
                    break;
                }
            }
        });

        let Ok(url) = Url::parse(&format!("ws://{addr}/?token=test")) else {
            panic!("mock provider url");
        };
        Self { url, connections }
    }

    /// Waits for the relay to (re)connect.
    pub async fn next_connection(&mut self) -> ProviderConn {
        match timeout(WAIT, self.connections.recv()).await {
            Ok(Some(conn)) => conn,
            _ => panic!("relay did not connect to the provider"),
        }
    }
}

async fn serve_provider_conn(
    ws: WebSocketStream<TcpStream>,
    inbound: mpsc::UnboundedSender<String>,
    control: mpsc::UnboundedSender<Message>,
    mut actions: mpsc::UnboundedReceiver<ProviderAction>,
) {
    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let _ = inbound.send(text.to_string());
                }
                Some(Ok(frame @ (Message::Ping(_) | Message::Pong(_)))) => {
                    let _ = control.send(frame);
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            action = actions.recv() => match action {
                Some(ProviderAction::Send(text)) => {
                    if write.send(Message::text(text)).await.is_err() {
                        break;
                    }
                }
                Some(ProviderAction::Ping(payload)) => {
                    if write.send(Message::Ping(payload.into())).await.is_err() {
                        break;
                    }
                }
                Some(ProviderAction::Close) | None => {
                    let _ = write.close().await;
                    break;
                }
            },
        }
    }
}

/// A relay wired to a mock provider and serving on an ephemeral port.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub handle: RelayHandle,
    shutdown: broadcast::Sender<()>,
}

impl TestRelay {
    pub async fn start(provider_url: Url, mode: DeliveryMode) -> Self {
        Self::start_with_ping(provider_url, mode, None).await
    }

    /// Like [`TestRelay::start`], with keepalive pings every `ping_interval`.
    pub async fn start_with_ping(
        provider_url: Url,
        mode: DeliveryMode,
        ping_interval: Option<Duration>,
    ) -> Self {
        let (handle, upstream_commands) = RelayHub::spawn(mode, 256, 256);

        let settings = UpstreamSettings {
            endpoint: provider_url,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
            ping_interval,
        };
        let (shutdown, shutdown_rx) = broadcast::channel(1);
        let supervisor = UpstreamSupervisor::new(settings, handle.clone());
        tokio::spawn(supervisor.run(upstream_commands, shutdown_rx));

        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind relay");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("relay address");
        };
        let app = build_app(AppState {
            relay: handle.clone(),
        });
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            handle,
            shutdown,
        }
    }

    /// Opens a browser-like connection on the given path (`/` or `/ws`).
    pub async fn connect(&self, path: &str) -> Client {
        match connect_async(format!("ws://{}{path}", self.addr)).await {
            Ok((client, _)) => client,
            Err(e) => panic!("client connect failed: {e}"),
        }
    }

    /// Polls the hub until the registry holds exactly `expected` clients.
    pub async fn wait_for_clients(&self, expected: usize) {
        let polled = timeout(WAIT, async {
            loop {
                if let Ok(stats) = self.handle.stats().await
                    && stats.connected_clients == expected
                {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        if polled.is_err() {
            panic!("registry never reached {expected} clients");
        }
    }

    pub fn stop(&self) {
        let _ = self.shutdown.send(());
    }
}

/// Sends a subscribe command for `symbols`.
pub async fn subscribe(client: &mut Client, symbols: &[&str]) {
    let frame = serde_json::json!({ "type": "subscribe", "symbols": symbols }).to_string();
    send_raw(client, &frame).await;
}

/// Sends an arbitrary text frame.
pub async fn send_raw(client: &mut Client, text: &str) {
    if let Err(e) = client.send(Message::text(text.to_string())).await {
        panic!("client send failed: {e}");
    }
}

/// Sends `text` as a binary frame.
pub async fn send_binary(client: &mut Client, text: &str) {
    if let Err(e) = client.send(Message::binary(text.as_bytes().to_vec())).await {
        panic!("client send failed: {e}");
    }
}

/// Next text frame relayed to the client.
pub async fn recv_text(client: &mut Client) -> String {
    let received = timeout(WAIT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return Some(text.to_string()),
                Some(Ok(_)) => continue,
                _ => return None,
            }
        }
    })
    .await;
    match received {
        Ok(Some(text)) => text,
        Ok(None) => panic!("client socket closed"),
        Err(_) => panic!("timed out waiting for a relayed batch"),
    }
}

/// Asserts the client receives no text frame for a short while.
pub async fn expect_silence(client: &mut Client) {
    let received = timeout(QUIET, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return Some(text.to_string()),
                Some(Ok(_)) => continue,
                _ => return None,
            }
        }
    })
    .await;
    if let Ok(Some(text)) = received {
        panic!("unexpected batch delivered: {text}");
    }
}

/// Decodes an upstream subscribe frame and returns its symbol.
pub fn subscribed_symbol(frame: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(frame) else {
        panic!("relay sent invalid JSON upstream: {frame}");
    };
    assert_eq!(value.get("type").and_then(|t| t.as_str()), Some("subscribe"));
    match value.get("symbol").and_then(|s| s.as_str()) {
        Some(symbol) => symbol.to_string(),
        None => panic!("subscribe frame without symbol: {frame}"),
    }
}
