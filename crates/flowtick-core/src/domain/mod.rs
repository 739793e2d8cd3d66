//! # Domain Models
//!
//! Upstream flow types and the UTC timestamp used across the pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RawTradeRecord`] | One flow event as decoded from the upstream JSON |
//! | [`RawTradeId`] | Composite `{timestamp, creationTime}` identifier |
//! | [`UtcDateTime`] | RFC 3339 timestamp guaranteed to be UTC |
//!
//! The stored form of a trade, `PersistedTrade`, lives in
//! `flowtick-warehouse` next to the table it maps to.

mod timestamp;
mod trade;

pub use timestamp::{TimestampNotUtc, UtcDateTime};
pub use trade::{trade_id, RawTradeId, RawTradeRecord};
