//! Price update batches received from the market-data provider.
//!
//! The provider sends frames shaped like
//! `{"type":"trade","data":[{"s":"AAPL","p":150.1,"t":...,"v":...}, ...]}`.
//! A [`PriceBatch`] keeps the `data` array exactly as received so that it
//! can be relayed to clients byte-for-byte, while also indexing each entry
//! by its `"s"` field for routed delivery.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::value::RawValue;

use super::Symbol;
use crate::error::RelayError;

/// Envelope of an inbound provider frame. Only `data` is inspected.
#[derive(Debug, Deserialize)]
struct UpstreamFrame {
    #[serde(default)]
    data: Option<Box<RawValue>>,
}

/// The one field of an entry the relay needs for routing.
#[derive(Debug, Deserialize)]
struct EntryKey {
    #[serde(default)]
    s: Option<String>,
}

/// A single element of the batch, kept as raw JSON.
#[derive(Debug, Clone)]
struct BatchEntry {
    symbol: Option<Symbol>,
    raw: Box<RawValue>,
}

/// One batch of price updates, ready to be fanned out.
///
/// The full payload is serialized once and shared between all recipients
/// as an `Arc<str>`.
#[derive(Debug, Clone)]
pub struct PriceBatch {
    entries: Vec<BatchEntry>,
    payload: Arc<str>,
}

impl PriceBatch {
    /// Parses an inbound provider text frame.
    ///
    /// Returns `Ok(None)` for well-formed frames that carry no `data` array
    /// (the provider's `{"type":"ping"}` heartbeats, for instance). A frame
    /// that is valid JSON but not an object has no `data` field either.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::UpstreamProtocol`] if the frame is not valid
    /// JSON or `data` is an array that cannot be decoded.
    pub fn from_upstream_text(text: &str) -> Result<Option<Self>, RelayError> {
        // Derived struct impls also accept sequences, so only objects go on.
        if !text.trim_start().starts_with('{') {
            serde_json::from_str::<IgnoredAny>(text)
                .map_err(|e| RelayError::UpstreamProtocol(e.to_string()))?;
            return Ok(None);
        }

        let frame: UpstreamFrame = serde_json::from_str(text)
            .map_err(|e| RelayError::UpstreamProtocol(e.to_string()))?;

        let Some(data) = frame.data else {
            return Ok(None);
        };
        if !data.get().trim_start().starts_with('[') {
            return Ok(None);
        }

        let raw_entries: Vec<Box<RawValue>> = serde_json::from_str(data.get())
            .map_err(|e| RelayError::UpstreamProtocol(e.to_string()))?;

        let entries = raw_entries
            .into_iter()
            .map(|raw| {
                let symbol = serde_json::from_str::<EntryKey>(raw.get())
                    .ok()
                    .and_then(|key| key.s)
                    .and_then(|s| Symbol::parse(&s));
                BatchEntry { symbol, raw }
            })
            .collect();

        Ok(Some(Self {
            entries,
            payload: Arc::from(data.get()),
        }))
    }

    /// Returns the whole batch as received.
    #[must_use]
    pub fn payload(&self) -> Arc<str> {
        Arc::clone(&self.payload)
    }

    /// Returns a JSON array holding only the entries whose symbol satisfies
    /// `wanted`, in their original order.
    ///
    /// Returns `None` when no entry matches. Entries without a symbol never
    /// match.
    #[must_use]
    pub fn filtered<F>(&self, wanted: F) -> Option<Arc<str>>
    where
        F: Fn(&Symbol) -> bool,
    {
        let selected: Vec<&str> = self
            .entries
            .iter()
            .filter(|entry| entry.symbol.as_ref().is_some_and(&wanted))
            .map(|entry| entry.raw.get())
            .collect();

        if selected.is_empty() {
            return None;
        }
        if selected.len() == self.entries.len() {
            return Some(self.payload());
        }
        Some(Arc::from(format!("[{}]", selected.join(","))))
    }

    /// Number of entries in the batch.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
