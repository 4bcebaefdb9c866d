//! Relay layer: the hub actor that owns the client registry and the
//! subscription set, and the handle other tasks use to reach it.

pub mod handle;
pub mod hub;
pub mod stats;

pub use handle::RelayHandle;
pub use hub::RelayHub;
pub use stats::RelayStats;
