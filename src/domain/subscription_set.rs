//! Process-wide set of symbols subscribed on the provider feed.
//!
//! [`SubscriptionSet`] is the deduplication point between many clients and
//! the single upstream connection: a symbol enters the set once and stays
//! for the life of the process.

use std::collections::BTreeSet;

use super::Symbol;

/// Deduplicated set of every symbol any client has requested.
///
/// Symbols are never removed; disconnecting clients do not retract their
/// upstream subscriptions.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    symbols: BTreeSet<Symbol>,
}

impl SubscriptionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `symbols`, returning those that were not already present.
    ///
    /// The result keeps request order and contains each new symbol once,
    /// even if the request repeats it. Exactly these symbols need a
    /// subscribe frame upstream.
    pub fn insert_new<I>(&mut self, symbols: I) -> Vec<Symbol>
    where
        I: IntoIterator<Item = Symbol>,
    {
        let mut added = Vec::new();
        for symbol in symbols {
            if self.symbols.insert(symbol.clone()) {
                added.push(symbol);
            }
        }
        added
    }

    /// Returns every subscribed symbol in sorted order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Symbol> {
        self.symbols.iter().cloned().collect()
    }
}
