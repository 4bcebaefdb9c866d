//! # price-relay
//!
//! Real-time stock price relay. One WebSocket connection to the
//! market-data provider (Finnhub) is shared by any number of browser
//! clients; symbol subscriptions are deduplicated process-wide so each
//! symbol is requested upstream once per provider connection.
//!
//! ## Architecture
//!
//! ```text
//! Browser clients (WebSocket)        HTTP (/health, /stats, docs)
//!     │                                   │
//!     ├── WS Handler (ws/)                ├── api/
//!     │                                   │
//!     └──────────────┬────────────────────┘
//!                    │ RelayHandle (mpsc)
//!              RelayHub actor (relay/)
//!          client registry + SubscriptionSet
//!                    │
//!        UpstreamSupervisor (upstream/)
//!                    │  reconnect with backoff
//!          Market-data provider WebSocket
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod relay;
pub mod upstream;
pub mod ws;
