//! How price batches are distributed to clients.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::RelayError;

/// Delivery policy applied when a batch arrives from the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Every connected client receives every batch, whatever it subscribed to.
    #[default]
    Broadcast,
    /// Each client receives only the entries for symbols it requested.
    Routed,
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadcast => f.write_str("broadcast"),
            Self::Routed => f.write_str("routed"),
        }
    }
}

impl FromStr for DeliveryMode {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "broadcast" => Ok(Self::Broadcast),
            "routed" => Ok(Self::Routed),
            other => Err(RelayError::Config(format!(
                "invalid delivery mode {other:?}; expected \"broadcast\" or \"routed\""
            ))),
        }
    }
}
