use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

/// Number of GICS sector buckets the upstream flow feed distinguishes.
pub const SECTOR_BUCKETS: usize = 10;

/// Fractional digits kept by the `DECIMAL(38, 10)` price columns. Writers
/// round to this scale before insert; DuckDB would otherwise round silently.
pub const DECIMAL_SCALE: u32 = 10;

/// Default page size for trade queries.
pub const DEFAULT_QUERY_LIMIT: i64 = 100;

/// Canonical stored option trade (table `option_trades`).
///
/// `trade_id` is the natural key; once a row is written its business fields
/// never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedTrade {
    /// Store-assigned surrogate key; `None` until the row is inserted.
    pub id: Option<i64>,
    pub trade_id: String,
    pub timestamp: i64,
    /// Creation instant in milliseconds since the Unix epoch.
    pub creation_date: i64,
    pub order_id: i64,
    pub symbol: String,
    pub trade_type: String,
    pub details: String,
    pub bid_ask: String,
    pub contract_price: Decimal,
    pub volume: i64,
    pub option_type: String,
    pub strike: Decimal,
    pub spot: Decimal,
    pub premium: Decimal,
    /// Expiration in milliseconds since the Unix epoch, absent when upstream
    /// sent an unparseable value.
    pub expiration: Option<i64>,
    pub color: String,
    pub implied_volatility: Decimal,
    pub dte: i64,
    pub earnings_report: String,
    pub security_type: String,
    pub sector: String,
    pub unusual_activity: String,
    pub weekly_option: String,
    pub market_cap: i64,
    pub open_interest: i64,
    pub itm: String,
    pub ex_div: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Result of an insert attempt against the natural-key constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Filter and pagination for the trade read path.
///
/// Empty collections and `false` flags mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeQuery {
    /// Substring match on the symbol.
    pub symbol: Option<String>,
    pub option_types: Vec<String>,
    pub flow_colors: Vec<String>,
    pub security_types: Vec<String>,
    /// Sector filter. `"None"` is implicitly included; selecting every bucket
    /// disables the filter.
    pub sectors: Vec<String>,
    pub bid_ask: Vec<String>,
    /// Lower bound on premium; the smallest of the supplied thresholds wins.
    pub min_premiums: Vec<Decimal>,
    pub weekly_only: bool,
    pub earnings: bool,
    pub unusual: bool,
    pub ex_div: bool,
    pub market_cap_below_750b: bool,
    /// Only trades created strictly after this instant (ms since epoch).
    pub after_creation_date: Option<i64>,
    /// Only trades whose surrogate id is strictly greater.
    pub after_id: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

impl TradeQuery {
    /// Page size after defaulting non-positive limits.
    pub fn effective_limit(&self) -> i64 {
        if self.limit <= 0 {
            DEFAULT_QUERY_LIMIT
        } else {
            self.limit
        }
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.max(0)
    }

    pub fn min_premium(&self) -> Option<Decimal> {
        self.min_premiums.iter().copied().min()
    }

    pub fn sector_filter(&self) -> Option<Vec<String>> {
        if self.sectors.is_empty() || self.sectors.len() == SECTOR_BUCKETS {
            return None;
        }
        let mut sectors = self.sectors.clone();
        sectors.push(String::from("None"));
        Some(sectors)
    }
}

/// One page of trades plus the unpaginated match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradePage {
    pub trades: Vec<PersistedTrade>,
    pub total: i64,
}

/// Summary counters over the whole store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TradeStats {
    pub total: i64,
    pub today_count: i64,
    pub call_count: i64,
    pub put_count: i64,
}
