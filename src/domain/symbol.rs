//! Type-safe ticker symbol.
//!
//! [`Symbol`] is a newtype wrapper around the provider's ticker string so that
//! symbols cannot be confused with client identifiers or raw payload text.

use std::borrow::Borrow;
use std::fmt;

use serde::Serialize;

/// Ticker symbol as understood by the market-data provider
/// (e.g. `"AAPL"`, `"BINANCE:BTCUSDT"`).
///
/// Symbols are compared exactly. Construction trims surrounding whitespace
/// and rejects empty strings; case is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a symbol from raw client or provider input.
    ///
    /// Returns `None` if the input is empty after trimming.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
