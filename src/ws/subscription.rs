//! Per-connection subscription manager.
//!
//! Tracks which symbols a WebSocket client asked for. The relay hub keeps
//! one of these per registered client and consults it in routed delivery.

use std::collections::HashSet;

use crate::domain::Symbol;

/// The set of symbols requested by a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    symbols: HashSet<Symbol>,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds symbols to the client's interest set.
    pub fn subscribe(&mut self, symbols: &[Symbol]) {
        self.symbols.extend(symbols.iter().cloned());
    }

    /// Returns `true` if the client asked for this symbol.
    #[must_use]
    pub fn matches(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    /// Returns the number of distinct symbols requested.
    #[must_use]
    pub fn count(&self) -> usize {
        self.symbols.len()
    }
}
