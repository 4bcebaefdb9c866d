//! Supervised connection to the market-data provider.
//!
//! [`UpstreamSupervisor`] keeps one provider WebSocket alive for as long as
//! the process runs:
//! - reconnects with exponential backoff after any failure
//! - re-sends the full subscription set on every new connection
//! - forwards new subscriptions from the hub while connected
//! - relays `data` batches to the hub and drops malformed frames
//! - answers provider pings and sends its own keepalive pings

use std::collections::HashSet;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Interval, MissedTickBehavior, interval};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::messages::{ProviderRequest, UpstreamCommand};
use crate::config::RelayConfig;
use crate::domain::{PriceBatch, Symbol};
use crate::error::RelayError;
use crate::relay::RelayHandle;

/// Connection settings for the supervisor.
#[derive(Clone)]
pub struct UpstreamSettings {
    /// Full provider endpoint, credentials included.
    pub endpoint: Url,
    /// First reconnect delay.
    pub initial_delay: Duration,
    /// Reconnect delay cap.
    pub max_delay: Duration,
    /// Keepalive ping interval; `None` disables pings.
    pub ping_interval: Option<Duration>,
}

impl std::fmt::Debug for UpstreamSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamSettings")
            .field("endpoint", &redacted(&self.endpoint))
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("ping_interval", &self.ping_interval)
            .finish()
    }
}

impl From<&RelayConfig> for UpstreamSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            endpoint: config.upstream_endpoint(),
            initial_delay: config.reconnect_initial_delay,
            max_delay: config.reconnect_max_delay,
            ping_interval: config.upstream_ping_interval,
        }
    }
}

/// How a single provider session ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Shutdown was requested or the hub went away; stop for good.
    Stop,
    /// The provider closed the socket; reconnect.
    Closed,
}

/// Owner of the provider connection.
#[derive(Debug)]
pub struct UpstreamSupervisor {
    settings: UpstreamSettings,
    relay: RelayHandle,
}

impl UpstreamSupervisor {
    /// Creates a supervisor that reports to `relay`.
    #[must_use]
    pub fn new(settings: UpstreamSettings, relay: RelayHandle) -> Self {
        Self { settings, relay }
    }

    /// Backoff before reconnect attempt `attempt` (0-based): the initial
    /// delay doubled per attempt, capped at the maximum.
    #[must_use]
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.settings
            .initial_delay
            .saturating_mul(factor)
            .min(self.settings.max_delay)
    }

    /// Runs until `shutdown` fires or the hub stops.
    ///
    /// Subscriptions queued on `commands` while disconnected are not lost:
    /// the hub already holds them, and the next session re-sends the whole
    /// set before draining the queue.
    pub async fn run(
        self,
        mut commands: mpsc::UnboundedReceiver<UpstreamCommand>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let endpoint = redacted(&self.settings.endpoint);
        let mut attempt: u32 = 0;

        loop {
            tracing::info!(%endpoint, "connecting to market-data provider");
            let connected = tokio::select! {
                _ = shutdown.recv() => return,
                result = connect_async(self.settings.endpoint.as_str()) => result,
            };

            match connected {
                Ok((stream, _response)) => {
                    tracing::info!(%endpoint, "market-data provider connected");
                    attempt = 0;

                    let outcome = self
                        .run_session(stream, &mut commands, &mut shutdown)
                        .await;
                    if self.relay.upstream_disconnected().await.is_err() {
                        return;
                    }
                    match outcome {
                        Ok(SessionEnd::Stop) => return,
                        Ok(SessionEnd::Closed) => {
                            tracing::warn!("market-data provider closed the connection");
                        }
                        Err(RelayError::RelayUnavailable) => return,
                        Err(e) => {
                            tracing::warn!(error = %e, "market-data connection failed");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        attempt = attempt.saturating_add(1),
                        "market-data connect failed"
                    );
                }
            }

            let delay = self.reconnect_delay(attempt);
            attempt = attempt.saturating_add(1);
            tracing::info!(
                delay_ms = delay.as_millis() as u64,
                attempt,
                "reconnecting to market-data provider"
            );
            tokio::select! {
                _ = shutdown.recv() => return,
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Drives one provider connection until it fails, closes, or shutdown.
    async fn run_session<S>(
        &self,
        stream: S,
        commands: &mut mpsc::UnboundedReceiver<UpstreamCommand>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<SessionEnd, RelayError>
    where
        S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
            + futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        let (mut write, mut read) = stream.split();

        // Symbols already requested on this connection.
        let mut sent: HashSet<Symbol> = HashSet::new();
        for symbol in self.relay.upstream_connected().await? {
            send_subscribe(&mut write, &mut sent, symbol).await?;
        }
        tracing::info!(symbols = sent.len(), "subscriptions restored on provider");

        let mut ping = self.settings.ping_interval.map(keepalive);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::debug!("shutdown signal received, closing provider socket");
                    let _ = write.close().await;
                    return Ok(SessionEnd::Stop);
                }

                command = commands.recv() => match command {
                    Some(UpstreamCommand::Subscribe(symbol)) => {
                        send_subscribe(&mut write, &mut sent, symbol).await?;
                    }
                    None => {
                        let _ = write.close().await;
                        return Ok(SessionEnd::Stop);
                    }
                },

                () = tick(ping.as_mut()) => {
                    write.send(Message::Ping(Default::default())).await?;
                }

                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.on_text(text.as_str()).await?,
                    Some(Ok(Message::Ping(data))) => write.send(Message::Pong(data)).await?,
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!(?frame, "provider sent close frame");
                        return Ok(SessionEnd::Closed);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(SessionEnd::Closed),
                },
            }
        }
    }

    /// Handles one provider text frame. Only a stopped hub is an error.
    async fn on_text(&self, text: &str) -> Result<(), RelayError> {
        match PriceBatch::from_upstream_text(text) {
            Ok(Some(batch)) => self.relay.publish(batch).await,
            Ok(None) => {
                tracing::trace!("provider frame without data ignored");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed provider frame");
                Ok(())
            }
        }
    }
}

/// Sends a subscribe frame unless this connection already carried one for
/// the symbol.
async fn send_subscribe<W>(
    write: &mut W,
    sent: &mut HashSet<Symbol>,
    symbol: Symbol,
) -> Result<(), RelayError>
where
    W: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    if sent.contains(&symbol) {
        return Ok(());
    }
    let frame = ProviderRequest::Subscribe { symbol: &symbol }
        .to_json()
        .map_err(|e| RelayError::UpstreamProtocol(e.to_string()))?;
    write.send(Message::text(frame)).await?;
    tracing::debug!(%symbol, "subscribe sent to provider");
    sent.insert(symbol);
    Ok(())
}

fn keepalive(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.reset();
    ticker
}

/// Waits for the next keepalive tick, or forever when pings are disabled.
async fn tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Endpoint with the query string (API token) removed, for logs.
fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
