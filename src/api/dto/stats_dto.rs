//! Relay statistics response.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::DeliveryMode;
use crate::relay::RelayStats;

/// Response body for `GET /stats`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Downstream clients currently connected.
    pub connected_clients: usize,
    /// Per-client symbol requests summed over connected clients.
    pub client_subscriptions: usize,
    /// Symbols subscribed on the provider feed, sorted.
    pub subscribed_symbols: Vec<String>,
    /// Whether the provider connection is up.
    pub upstream_connected: bool,
    /// Provider connections established since start.
    pub upstream_connections: u64,
    /// Provider batches fanned out since start.
    pub batches_relayed: u64,
    /// Active delivery policy.
    pub delivery_mode: DeliveryMode,
    /// Relay start time.
    pub started_at: DateTime<Utc>,
}

impl From<RelayStats> for StatsResponse {
    fn from(stats: RelayStats) -> Self {
        Self {
            connected_clients: stats.connected_clients,
            client_subscriptions: stats.client_subscriptions,
            subscribed_symbols: stats
                .subscribed_symbols
                .iter()
                .map(ToString::to_string)
                .collect(),
            upstream_connected: stats.upstream_connected,
            upstream_connections: stats.upstream_connections,
            batches_relayed: stats.batches_relayed,
            delivery_mode: stats.delivery_mode,
            started_at: stats.started_at,
        }
    }
}
