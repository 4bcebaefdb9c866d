//! Cloneable front door to the relay hub.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::hub::HubCommand;
use super::stats::RelayStats;
use crate::domain::{ClientId, PriceBatch, Symbol};
use crate::error::RelayError;

/// Handle for sending commands to the [`super::RelayHub`].
///
/// Cheap to clone; every downstream connection, the upstream supervisor and
/// the HTTP handlers hold one. All methods fail with
/// [`RelayError::RelayUnavailable`] once the hub has stopped.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    commands: mpsc::Sender<HubCommand>,
    client_queue_capacity: usize,
}

impl RelayHandle {
    pub(crate) fn new(commands: mpsc::Sender<HubCommand>, client_queue_capacity: usize) -> Self {
        Self {
            commands,
            client_queue_capacity: client_queue_capacity.max(1),
        }
    }

    /// Registers a client and returns the queue its batches arrive on.
    ///
    /// The client sees only batches published after registration.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RelayUnavailable`] if the hub has stopped.
    pub async fn connect(&self, client_id: ClientId) -> Result<mpsc::Receiver<Arc<str>>, RelayError> {
        let (outbound, rx) = mpsc::channel(self.client_queue_capacity);
        self.send(HubCommand::Connect {
            client_id,
            outbound,
        })
        .await?;
        Ok(rx)
    }

    /// Removes a client from the registry. Its upstream subscriptions stay.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RelayUnavailable`] if the hub has stopped.
    pub async fn disconnect(&self, client_id: ClientId) -> Result<(), RelayError> {
        self.send(HubCommand::Disconnect { client_id }).await
    }

    /// Records a client's interest and subscribes new symbols upstream.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RelayUnavailable`] if the hub has stopped.
    pub async fn subscribe(&self, client_id: ClientId, symbols: Vec<Symbol>) -> Result<(), RelayError> {
        self.send(HubCommand::Subscribe { client_id, symbols }).await
    }

    /// Fans a provider batch out to the registered clients.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RelayUnavailable`] if the hub has stopped.
    pub async fn publish(&self, batch: PriceBatch) -> Result<(), RelayError> {
        self.send(HubCommand::Publish(batch)).await
    }

    /// Marks the provider link as up and returns every symbol that must be
    /// (re)subscribed on it.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RelayUnavailable`] if the hub has stopped.
    pub async fn upstream_connected(&self) -> Result<Vec<Symbol>, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::UpstreamConnected { reply }).await?;
        rx.await.map_err(|_| RelayError::RelayUnavailable)
    }

    /// Marks the provider link as down.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RelayUnavailable`] if the hub has stopped.
    pub async fn upstream_disconnected(&self) -> Result<(), RelayError> {
        self.send(HubCommand::UpstreamDisconnected).await
    }

    /// Returns a snapshot of relay state.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RelayUnavailable`] if the hub has stopped.
    pub async fn stats(&self) -> Result<RelayStats, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Stats { reply }).await?;
        rx.await.map_err(|_| RelayError::RelayUnavailable)
    }

    async fn send(&self, command: HubCommand) -> Result<(), RelayError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RelayError::RelayUnavailable)
    }
}
