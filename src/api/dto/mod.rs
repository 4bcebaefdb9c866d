//! Response bodies for the HTTP endpoints.

pub mod stats_dto;

pub use stats_dto::StatsResponse;
