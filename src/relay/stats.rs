//! Point-in-time view of the relay hub.

use chrono::{DateTime, Utc};

use crate::domain::{DeliveryMode, Symbol};

/// Snapshot of relay state, produced by the hub on request.
#[derive(Debug, Clone)]
pub struct RelayStats {
    /// Clients currently in the registry.
    pub connected_clients: usize,
    /// Sum over clients of the distinct symbols each one requested.
    pub client_subscriptions: usize,
    /// Every symbol subscribed upstream, sorted.
    pub subscribed_symbols: Vec<Symbol>,
    /// Whether the provider connection is currently up.
    pub upstream_connected: bool,
    /// Provider connections established since start.
    pub upstream_connections: u64,
    /// Batches received from the provider and fanned out.
    pub batches_relayed: u64,
    /// Active delivery policy.
    pub delivery_mode: DeliveryMode,
    /// When the hub started.
    pub started_at: DateTime<Utc>,
}
