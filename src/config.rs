//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use crate::domain::DeliveryMode;
use crate::error::RelayError;

/// Default provider endpoint.
const DEFAULT_UPSTREAM_URL: &str = "wss://ws.finnhub.io";

/// Floor for the reconnect backoff; a zero delay would retry in a hot loop.
const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(1);

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP/WebSocket server to.
    pub listen_addr: SocketAddr,

    /// Market-data provider endpoint, without credentials.
    pub upstream_url: Url,

    /// Provider API token, sent as the `token` query parameter.
    pub finnhub_token: Option<String>,

    /// How batches are distributed to clients.
    pub delivery_mode: DeliveryMode,

    /// First reconnect delay after an upstream failure.
    pub reconnect_initial_delay: Duration,

    /// Upper bound for the exponential reconnect delay.
    pub reconnect_max_delay: Duration,

    /// Interval between keepalive pings to the provider. `None` disables them.
    pub upstream_ping_interval: Option<Duration>,

    /// Capacity of each client's outbound queue.
    pub client_queue_capacity: usize,

    /// Capacity of the relay hub's command channel.
    pub hub_command_capacity: usize,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("listen_addr", &self.listen_addr)
            .field("upstream_url", &self.upstream_url.as_str())
            .field(
                "finnhub_token",
                &self.finnhub_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("delivery_mode", &self.delivery_mode)
            .field("reconnect_initial_delay", &self.reconnect_initial_delay)
            .field("reconnect_max_delay", &self.reconnect_max_delay)
            .field("upstream_ping_interval", &self.upstream_ping_interval)
            .field("client_queue_capacity", &self.client_queue_capacity)
            .field("hub_command_capacity", &self.hub_command_capacity)
            .finish()
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file, then
    /// defers to [`RelayConfig::from_lookup`].
    ///
    /// # Errors
    ///
    /// See [`RelayConfig::from_lookup`].
    pub fn from_env() -> Result<Self, RelayError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Numeric settings fall back to their defaults when missing or
    /// unparsable.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if `LISTEN_ADDR`, `UPSTREAM_URL` or
    /// `DELIVERY_MODE` is set but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8081".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| RelayError::Config(format!("LISTEN_ADDR: {e}")))?;

        let upstream_raw =
            lookup("UPSTREAM_URL").unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        let upstream_url = Url::parse(&upstream_raw)
            .map_err(|e| RelayError::Config(format!("UPSTREAM_URL: {e}")))?;
        if !matches!(upstream_url.scheme(), "ws" | "wss") {
            return Err(RelayError::Config(format!(
                "UPSTREAM_URL: unsupported scheme {:?}",
                upstream_url.scheme()
            )));
        }

        let finnhub_token = lookup("FINNHUB_TOKEN").filter(|t| !t.trim().is_empty());

        let delivery_mode = match lookup("DELIVERY_MODE") {
            Some(raw) => raw.parse()?,
            None => DeliveryMode::default(),
        };

        let reconnect_initial_delay =
            Duration::from_millis(parse_value(&lookup, "RECONNECT_INITIAL_DELAY_MS", 1_000))
                .max(MIN_RECONNECT_DELAY);
        let reconnect_max_delay =
            Duration::from_millis(parse_value(&lookup, "RECONNECT_MAX_DELAY_MS", 30_000))
                .max(reconnect_initial_delay);

        let ping_secs: u64 = parse_value(&lookup, "UPSTREAM_PING_INTERVAL_SECS", 25);
        let upstream_ping_interval = (ping_secs > 0).then(|| Duration::from_secs(ping_secs));

        let client_queue_capacity: usize =
            parse_value(&lookup, "CLIENT_QUEUE_CAPACITY", 1_024_usize).max(1);
        let hub_command_capacity: usize =
            parse_value(&lookup, "HUB_COMMAND_CAPACITY", 4_096_usize).max(1);

        Ok(Self {
            listen_addr,
            upstream_url,
            finnhub_token,
            delivery_mode,
            reconnect_initial_delay,
            reconnect_max_delay,
            upstream_ping_interval,
            client_queue_capacity,
            hub_command_capacity,
        })
    }

    /// Returns the provider endpoint with the API token attached.
    #[must_use]
    pub fn upstream_endpoint(&self) -> Url {
        let mut url = self.upstream_url.clone();
        if let Some(token) = &self.finnhub_token {
            url.query_pairs_mut().append_pair("token", token);
        }
        url
    }
}

/// Parses a lookup value as `T`, returning `default` on missing or invalid
/// values.
fn parse_value<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<RelayConfig, RelayError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        RelayConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let Ok(config) = load(&[]) else {
            panic!("defaults should load");
        };
        assert_eq!(config.listen_addr.port(), 8081);
        assert_eq!(config.upstream_url.as_str(), "wss://ws.finnhub.io/");
        assert_eq!(config.delivery_mode, DeliveryMode::Broadcast);
        assert_eq!(config.reconnect_initial_delay, Duration::from_secs(1));
        assert_eq!(config.reconnect_max_delay, Duration::from_secs(30));
        assert_eq!(config.upstream_ping_interval, Some(Duration::from_secs(25)));
        assert_eq!(config.client_queue_capacity, 1_024);
        assert!(config.finnhub_token.is_none());
    }

    #[test]
    fn token_is_appended_to_endpoint() {
        let Ok(config) = load(&[("FINNHUB_TOKEN", "abc123")]) else {
            panic!("config should load");
        };
        assert_eq!(
            config.upstream_endpoint().as_str(),
            "wss://ws.finnhub.io/?token=abc123"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let Ok(config) = load(&[("FINNHUB_TOKEN", "secret-token")]) else {
            panic!("config should load");
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn invalid_listen_addr_is_error() {
        assert!(matches!(
            load(&[("LISTEN_ADDR", "not-an-addr")]),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn http_upstream_is_rejected() {
        assert!(matches!(
            load(&[("UPSTREAM_URL", "https://ws.finnhub.io")]),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn routed_mode_and_disabled_ping() {
        let Ok(config) = load(&[
            ("DELIVERY_MODE", "routed"),
            ("UPSTREAM_PING_INTERVAL_SECS", "0"),
        ]) else {
            panic!("config should load");
        };
        assert_eq!(config.delivery_mode, DeliveryMode::Routed);
        assert!(config.upstream_ping_interval.is_none());
    }

    #[test]
    fn zero_reconnect_delay_is_raised_to_floor() {
        let Ok(config) = load(&[
            ("RECONNECT_INITIAL_DELAY_MS", "0"),
            ("RECONNECT_MAX_DELAY_MS", "0"),
        ]) else {
            panic!("config should load");
        };
        assert_eq!(config.reconnect_initial_delay, Duration::from_millis(1));
        assert_eq!(config.reconnect_max_delay, Duration::from_millis(1));
    }

    #[test]
    fn garbage_numbers_fall_back_to_defaults() {
        let Ok(config) = load(&[
            ("RECONNECT_INITIAL_DELAY_MS", "soon"),
            ("CLIENT_QUEUE_CAPACITY", "0"),
        ]) else {
            panic!("config should load");
        };
        assert_eq!(config.reconnect_initial_delay, Duration::from_secs(1));
        assert_eq!(config.client_queue_capacity, 1);
    }
}
