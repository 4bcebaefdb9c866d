//! Upstream layer: the single shared connection to the market-data provider.

pub mod messages;
pub mod supervisor;

pub use messages::UpstreamCommand;
pub use supervisor::{UpstreamSettings, UpstreamSupervisor};
