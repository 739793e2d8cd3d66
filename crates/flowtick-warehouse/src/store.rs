use crate::models::{InsertOutcome, PersistedTrade, TradePage, TradeQuery};
use crate::WarehouseError;

/// Storage contract consumed by the ingestion writer and the read commands.
///
/// Implementations must enforce uniqueness of `trade_id` at insert time, so
/// concurrent writers racing past `contains` still store one row.
pub trait TradeStore: Send + Sync {
    /// Whether a trade with this natural key is already stored.
    fn contains(&self, trade_id: &str) -> Result<bool, WarehouseError>;

    /// Insert one trade; a natural-key collision yields `InsertOutcome::Duplicate`.
    fn insert(&self, trade: &PersistedTrade) -> Result<InsertOutcome, WarehouseError>;

    /// Filtered, paginated read ordered by creation date, newest first.
    fn query_trades(&self, query: &TradeQuery) -> Result<TradePage, WarehouseError>;
}
