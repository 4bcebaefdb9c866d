//! Provider-facing message types.

use serde::Serialize;

use crate::domain::Symbol;

/// Work the relay hub hands to the upstream supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamCommand {
    /// Send a subscribe frame for a symbol not yet requested from the provider.
    Subscribe(Symbol),
}

/// Outbound subscribe frame: `{"type":"subscribe","symbol":"AAPL"}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderRequest<'a> {
    /// Subscribe to trades for one symbol.
    Subscribe {
        /// The ticker to subscribe to.
        symbol: &'a Symbol,
    },
}

impl ProviderRequest<'_> {
    /// Serializes the request as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
