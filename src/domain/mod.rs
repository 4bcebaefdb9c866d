//! Domain layer: identifiers, price batches, and subscription bookkeeping.
//!
//! These types carry no I/O. The relay hub combines them into the live
//! client registry; the WebSocket layers only parse into and serialize out
//! of them.

pub mod client_id;
pub mod delivery_mode;
pub mod price_batch;
pub mod subscription_set;
pub mod symbol;

pub use client_id::ClientId;
pub use delivery_mode::DeliveryMode;
pub use price_batch::PriceBatch;
pub use subscription_set::SubscriptionSet;
pub use symbol::Symbol;
