//! Downstream WebSocket message types.
//!
//! Clients send a single kind of frame:
//! `{"type":"subscribe","symbols":["AAPL","KO"]}`. Outbound frames are the
//! raw provider `data` arrays and have no envelope.

use serde::Deserialize;

use crate::domain::Symbol;

/// Commands a browser client can send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Declare interest in a list of symbols.
    Subscribe {
        /// Requested tickers. Non-string and blank entries are skipped.
        symbols: Vec<serde_json::Value>,
    },
}

impl ClientCommand {
    /// Parses a client text frame.
    ///
    /// # Errors
    ///
    /// Returns the JSON error for malformed frames, unknown `type` values and
    /// subscribe frames whose `symbols` is not an array.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Returns the valid symbols of a subscribe command, in request order.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        match self {
            Self::Subscribe { symbols } => symbols
                .iter()
                .filter_map(serde_json::Value::as_str)
                .filter_map(Symbol::parse)
                .collect(),
        }
    }
}
