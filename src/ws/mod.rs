//! Downstream WebSocket layer: browser connections, their subscribe
//! commands, and per-client interest tracking.
//!
//! The endpoint is mounted at `/` (where existing frontends connect) and
//! at `/ws`.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
