//! The relay hub actor.
//!
//! [`RelayHub`] is the single owner of the client registry and the
//! process-wide [`SubscriptionSet`]. All other tasks reach it through a
//! [`RelayHandle`], so every mutation happens on one task and no lock
//! guards relay state.
//!
//! Nothing in the hub awaits another task: client queues are fed with
//! `try_send` and upstream commands go through an unbounded channel (its
//! depth is bounded by the number of distinct symbols, since each symbol is
//! queued at most once).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use super::handle::RelayHandle;
use super::stats::RelayStats;
use crate::domain::{ClientId, DeliveryMode, PriceBatch, SubscriptionSet, Symbol};
use crate::upstream::UpstreamCommand;
use crate::ws::subscription::SubscriptionManager;

/// Commands processed by the hub, in arrival order.
#[derive(Debug)]
pub(crate) enum HubCommand {
    Connect {
        client_id: ClientId,
        outbound: mpsc::Sender<Arc<str>>,
    },
    Disconnect {
        client_id: ClientId,
    },
    Subscribe {
        client_id: ClientId,
        symbols: Vec<Symbol>,
    },
    Publish(PriceBatch),
    UpstreamConnected {
        reply: oneshot::Sender<Vec<Symbol>>,
    },
    UpstreamDisconnected,
    Stats {
        reply: oneshot::Sender<RelayStats>,
    },
}

/// A registered downstream client.
#[derive(Debug)]
struct ClientEntry {
    outbound: mpsc::Sender<Arc<str>>,
    interest: SubscriptionManager,
}

/// Owner of all relay state.
#[derive(Debug)]
pub struct RelayHub {
    clients: HashMap<ClientId, ClientEntry>,
    subscriptions: SubscriptionSet,
    mode: DeliveryMode,
    upstream_tx: mpsc::UnboundedSender<UpstreamCommand>,
    upstream_connected: bool,
    upstream_connections: u64,
    batches_relayed: u64,
    started_at: DateTime<Utc>,
}

impl RelayHub {
    /// Creates a hub that forwards new upstream subscriptions to `upstream_tx`.
    #[must_use]
    pub fn new(mode: DeliveryMode, upstream_tx: mpsc::UnboundedSender<UpstreamCommand>) -> Self {
        Self {
            clients: HashMap::new(),
            subscriptions: SubscriptionSet::new(),
            mode,
            upstream_tx,
            upstream_connected: false,
            upstream_connections: 0,
            batches_relayed: 0,
            started_at: Utc::now(),
        }
    }

    /// Spawns the hub on the current runtime.
    ///
    /// Returns the handle used by every other task and the receiver the
    /// upstream supervisor drains for subscribe work. The hub stops once
    /// every handle has been dropped.
    #[must_use]
    pub fn spawn(
        mode: DeliveryMode,
        command_capacity: usize,
        client_queue_capacity: usize,
    ) -> (RelayHandle, mpsc::UnboundedReceiver<UpstreamCommand>) {
        let (upstream_tx, upstream_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(command_capacity.max(1));

        let hub = Self::new(mode, upstream_tx);
        tokio::spawn(hub.run(command_rx));

        (
            RelayHandle::new(command_tx, client_queue_capacity),
            upstream_rx,
        )
    }

    /// Processes commands until the channel closes.
    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<HubCommand>) {
        tracing::info!(mode = %self.mode, "relay hub started");
        while let Some(command) = commands.recv().await {
            self.handle(command);
        }
        tracing::debug!("relay hub stopped");
    }

    pub(crate) fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Connect {
                client_id,
                outbound,
            } => self.register(client_id, outbound),
            HubCommand::Disconnect { client_id } => self.deregister(client_id),
            HubCommand::Subscribe { client_id, symbols } => self.subscribe(client_id, symbols),
            HubCommand::Publish(batch) => self.publish(&batch),
            HubCommand::UpstreamConnected { reply } => {
                self.upstream_connected = true;
                self.upstream_connections = self.upstream_connections.saturating_add(1);
                let _ = reply.send(self.subscriptions.snapshot());
            }
            HubCommand::UpstreamDisconnected => {
                self.upstream_connected = false;
            }
            HubCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    fn register(&mut self, client_id: ClientId, outbound: mpsc::Sender<Arc<str>>) {
        self.clients.insert(
            client_id,
            ClientEntry {
                outbound,
                interest: SubscriptionManager::new(),
            },
        );
        tracing::info!(%client_id, clients = self.clients.len(), "client registered");
    }

    fn deregister(&mut self, client_id: ClientId) {
        if self.clients.remove(&client_id).is_some() {
            tracing::info!(%client_id, clients = self.clients.len(), "client removed");
        }
    }

    fn subscribe(&mut self, client_id: ClientId, symbols: Vec<Symbol>) {
        let Some(client) = self.clients.get_mut(&client_id) else {
            tracing::debug!(%client_id, "subscribe from unregistered client ignored");
            return;
        };
        client.interest.subscribe(&symbols);

        for symbol in self.subscriptions.insert_new(symbols) {
            tracing::info!(%client_id, %symbol, "new upstream subscription");
            if self
                .upstream_tx
                .send(UpstreamCommand::Subscribe(symbol))
                .is_err()
            {
                tracing::warn!("upstream supervisor gone; subscription kept for stats only");
            }
        }
    }

    fn publish(&mut self, batch: &PriceBatch) {
        self.batches_relayed = self.batches_relayed.saturating_add(1);
        tracing::trace!(entries = batch.entry_count(), "fanning out batch");

        let mut closed = Vec::new();
        for (client_id, client) in &self.clients {
            let payload = match self.mode {
                DeliveryMode::Broadcast => Some(batch.payload()),
                DeliveryMode::Routed => batch.filtered(|symbol| client.interest.matches(symbol)),
            };
            let Some(payload) = payload else {
                continue;
            };
            match client.outbound.try_send(payload) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(%client_id, "client queue full; batch dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*client_id),
            }
        }

        for client_id in closed {
            self.deregister(client_id);
        }
    }

    fn stats(&self) -> RelayStats {
        RelayStats {
            connected_clients: self.clients.len(),
            client_subscriptions: self
                .clients
                .values()
                .map(|client| client.interest.count())
                .sum(),
            subscribed_symbols: self.subscriptions.snapshot(),
            upstream_connected: self.upstream_connected,
            upstream_connections: self.upstream_connections,
            batches_relayed: self.batches_relayed,
            delivery_mode: self.mode,
            started_at: self.started_at,
        }
    }
}
