//! # Flowtick Warehouse
//!
//! DuckDB-backed trade store for the flowtick ingestion pipeline.
//!
//! ## Overview
//!
//! The warehouse persists options flow events into the `option_trades` table,
//! keyed by a natural `trade_id`, and serves the read paths used by the CLI:
//!
//! - **Idempotent inserts**: `trade_id` carries a UNIQUE constraint; a
//!   colliding insert reports [`InsertOutcome::Duplicate`] instead of failing
//! - **Fixed-point money**: decimal columns are `DECIMAL(38, 10)` and are read
//!   back normalized, so `1234.5` renders as `"1234.5"`; digits beyond
//!   [`DECIMAL_SCALE`] are not kept
//! - **Parameterized SQL**: every filter value is bound, never interpolated
//! - **Connection pooling**: cloned connections over one database instance
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowtick_warehouse::{TradeQuery, TradeStore, Warehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!
//!     let page = warehouse.query_trades(&TradeQuery {
//!         symbol: Some(String::from("SPY")),
//!         limit: 20,
//!         ..TradeQuery::default()
//!     })?;
//!
//!     println!("{} of {} trades", page.trades.len(), page.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `option_trades` | One row per upstream flow event |
//! | `schema_migrations` | Applied migration versions |

pub mod duckdb;
pub mod error;
pub mod migrations;
pub mod models;
pub mod store;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ::duckdb::types::Type;
use ::duckdb::{Connection, ToSql};
use rust_decimal::Decimal;
use time::{OffsetDateTime, Time};

pub use duckdb::{DuckDbConnectionManager, PooledConnection};
pub use error::WarehouseError;
pub use models::{
    InsertOutcome, PersistedTrade, TradePage, TradeQuery, TradeStats, DECIMAL_SCALE,
    DEFAULT_QUERY_LIMIT, SECTOR_BUCKETS,
};
pub use store::TradeStore;

const TRADE_COLUMNS: &str = "id, trade_id, timestamp, creation_date, order_id, symbol, \
     trade_type, details, bid_ask, CAST(contract_price AS VARCHAR), volume, option_type, \
     CAST(strike AS VARCHAR), CAST(spot AS VARCHAR), CAST(premium AS VARCHAR), expiration, \
     color, CAST(implied_volatility AS VARCHAR), dte, earnings_report, security_type, sector, \
     unusual_activity, weekly_option, market_cap, open_interest, itm, ex_div, \
     epoch_ms(created_at), epoch_ms(updated_at)";

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            db_path: resolve_flowtick_home().join("flowtick.duckdb"),
            max_pool_size: 4,
        }
    }
}

/// DuckDB implementation of [`TradeStore`].
#[derive(Clone)]
pub struct Warehouse {
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open (creating if needed) the database file and apply migrations.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = DuckDbConnectionManager::open(config.db_path, config.max_pool_size)?;
        let warehouse = Self { manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Open a private in-memory warehouse.
    pub fn open_in_memory() -> Result<Self, WarehouseError> {
        let manager = DuckDbConnectionManager::open_in_memory(2)?;
        let warehouse = Self { manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Apply pending schema migrations.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Path to the database file, `None` for in-memory warehouses.
    pub fn db_path(&self) -> Option<&Path> {
        self.manager.db_path()
    }

    /// Whole-store counters: total rows, rows ingested since UTC midnight,
    /// calls, puts.
    pub fn stats(&self) -> Result<TradeStats, WarehouseError> {
        let today_start = unix_micros(OffsetDateTime::now_utc().replace_time(Time::MIDNIGHT));
        let connection = self.manager.acquire()?;
        let (total, today_count, call_count, put_count) = connection.query_row(
            "SELECT \
                 COUNT(*), \
                 COUNT(*) FILTER (WHERE created_at >= make_timestamp(?)), \
                 COUNT(*) FILTER (WHERE option_type = 'CALL'), \
                 COUNT(*) FILTER (WHERE option_type = 'PUT') \
             FROM option_trades",
            [today_start],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        Ok(TradeStats {
            total,
            today_count,
            call_count,
            put_count,
        })
    }

    /// Distinct symbols present in the store, sorted.
    pub fn symbols(&self) -> Result<Vec<String>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement =
            connection.prepare("SELECT DISTINCT symbol FROM option_trades ORDER BY symbol")?;
        let symbols = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(symbols)
    }
}

impl TradeStore for Warehouse {
    fn contains(&self, trade_id: &str) -> Result<bool, WarehouseError> {
        let connection = self.manager.acquire()?;
        let count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM option_trades WHERE trade_id = ?",
            [trade_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn insert(&self, trade: &PersistedTrade) -> Result<InsertOutcome, WarehouseError> {
        let connection = self.manager.acquire()?;
        insert_trade(&connection, trade)
    }

    fn query_trades(&self, query: &TradeQuery) -> Result<TradePage, WarehouseError> {
        let connection = self.manager.acquire()?;
        let filter = TradeFilter::from_query(query);

        let count_sql = format!("SELECT COUNT(*) FROM option_trades{}", filter.where_sql());
        let total: i64 =
            connection.query_row(count_sql.as_str(), filter.params().as_slice(), |row| row.get(0))?;

        let page_sql = format!(
            "SELECT {TRADE_COLUMNS} FROM option_trades{} \
             ORDER BY creation_date DESC, id DESC LIMIT ? OFFSET ?",
            filter.where_sql()
        );
        let limit = query.effective_limit();
        let offset = query.effective_offset();
        let mut params = filter.params();
        params.push(&limit);
        params.push(&offset);

        let mut statement = connection.prepare(page_sql.as_str())?;
        let trades = statement
            .query_map(params.as_slice(), read_trade)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TradePage { trades, total })
    }
}

fn insert_trade(
    connection: &Connection,
    trade: &PersistedTrade,
) -> Result<InsertOutcome, WarehouseError> {
    if trade.trade_id.trim().is_empty() {
        return Err(WarehouseError::InvalidData(String::from(
            "trade_id must not be empty",
        )));
    }

    let contract_price = trade.contract_price.to_string();
    let strike = trade.strike.to_string();
    let spot = trade.spot.to_string();
    let premium = trade.premium.to_string();
    let implied_volatility = trade.implied_volatility.to_string();
    let created_at = unix_micros(trade.created_at);
    let updated_at = unix_micros(trade.updated_at);

    // SECURITY: all values are bound as parameters
    let params: [&dyn ToSql; 29] = [
        &trade.trade_id,
        &trade.timestamp,
        &trade.creation_date,
        &trade.order_id,
        &trade.symbol,
        &trade.trade_type,
        &trade.details,
        &trade.bid_ask,
        &contract_price,
        &trade.volume,
        &trade.option_type,
        &strike,
        &spot,
        &premium,
        &trade.expiration,
        &trade.color,
        &implied_volatility,
        &trade.dte,
        &trade.earnings_report,
        &trade.security_type,
        &trade.sector,
        &trade.unusual_activity,
        &trade.weekly_option,
        &trade.market_cap,
        &trade.open_interest,
        &trade.itm,
        &trade.ex_div,
        &created_at,
        &updated_at,
    ];

    let inserted = connection.execute(
        "INSERT INTO option_trades \
         (trade_id, timestamp, creation_date, order_id, symbol, trade_type, details, bid_ask, \
          contract_price, volume, option_type, strike, spot, premium, expiration, color, \
          implied_volatility, dte, earnings_report, security_type, sector, unusual_activity, \
          weekly_option, market_cap, open_interest, itm, ex_div, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, \
                 CAST(? AS DECIMAL(38, 10)), ?, ?, CAST(? AS DECIMAL(38, 10)), \
                 CAST(? AS DECIMAL(38, 10)), CAST(? AS DECIMAL(38, 10)), ?, ?, \
                 CAST(? AS DECIMAL(38, 10)), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
                 make_timestamp(?), make_timestamp(?)) \
         ON CONFLICT (trade_id) DO NOTHING",
        params.as_slice(),
    )?;

    Ok(if inserted == 0 {
        InsertOutcome::Duplicate
    } else {
        InsertOutcome::Inserted
    })
}

/// WHERE-clause builder that keeps SQL text and bound values in lockstep.
struct TradeFilter {
    clauses: Vec<String>,
    values: Vec<Box<dyn ToSql>>,
}

impl TradeFilter {
    fn from_query(query: &TradeQuery) -> Self {
        let mut filter = Self {
            clauses: Vec::new(),
            values: Vec::new(),
        };

        if let Some(min_premium) = query.min_premium() {
            filter.push_bound(
                "premium >= CAST(? AS DECIMAL(38, 10))",
                Box::new(min_premium.to_string()),
            );
        }
        if let Some(symbol) = query.symbol.as_deref().filter(|symbol| !symbol.is_empty()) {
            filter.push_bound("symbol LIKE ?", Box::new(format!("%{symbol}%")));
        }
        filter.push_in("option_type", &query.option_types);
        filter.push_in("color", &query.flow_colors);
        filter.push_in("security_type", &query.security_types);
        if query.weekly_only {
            filter.push("weekly_option = 'T'");
        }
        if query.earnings {
            filter.push("earnings_report = 'T'");
        }
        if query.unusual {
            filter.push("unusual_activity = 'T'");
        }
        if query.ex_div {
            filter.push("ex_div = '1'");
        }
        if let Some(after) = query.after_creation_date {
            filter.push_bound("creation_date > ?", Box::new(after));
        }
        if let Some(sectors) = query.sector_filter() {
            filter.push_in("sector", &sectors);
        }
        filter.push_in("bid_ask", &query.bid_ask);
        if query.market_cap_below_750b {
            filter.push("market_cap < 750000000000");
        }
        if let Some(after_id) = query.after_id.filter(|id| *id > 0) {
            filter.push_bound("id > ?", Box::new(after_id));
        }

        filter
    }

    fn push(&mut self, clause: &str) {
        self.clauses.push(clause.to_owned());
    }

    fn push_bound(&mut self, clause: &str, value: Box<dyn ToSql>) {
        self.clauses.push(clause.to_owned());
        self.values.push(value);
    }

    fn push_in(&mut self, column: &str, values: &[String]) {
        if values.is_empty() {
            return;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.clauses.push(format!("{column} IN ({placeholders})"));
        self.values.extend(
            values
                .iter()
                .map(|value| Box::new(value.clone()) as Box<dyn ToSql>),
        );
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    fn params(&self) -> Vec<&dyn ToSql> {
        self.values.iter().map(|value| value.as_ref()).collect()
    }
}

fn read_trade(row: &::duckdb::Row<'_>) -> Result<PersistedTrade, ::duckdb::Error> {
    Ok(PersistedTrade {
        id: Some(row.get(0)?),
        trade_id: row.get(1)?,
        timestamp: row.get(2)?,
        creation_date: row.get(3)?,
        order_id: row.get(4)?,
        symbol: row.get(5)?,
        trade_type: row.get(6)?,
        details: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        bid_ask: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        contract_price: decimal_column(row, 9)?,
        volume: row.get(10)?,
        option_type: row.get(11)?,
        strike: decimal_column(row, 12)?,
        spot: decimal_column(row, 13)?,
        premium: decimal_column(row, 14)?,
        expiration: row.get(15)?,
        color: row.get(16)?,
        implied_volatility: decimal_column(row, 17)?,
        dte: row.get(18)?,
        earnings_report: row.get(19)?,
        security_type: row.get(20)?,
        sector: row.get(21)?,
        unusual_activity: row.get(22)?,
        weekly_option: row.get(23)?,
        market_cap: row.get(24)?,
        open_interest: row.get(25)?,
        itm: row.get(26)?,
        ex_div: row.get(27)?,
        created_at: timestamp_column(row, 28)?,
        updated_at: timestamp_column(row, 29)?,
    })
}

/// Read a `CAST(... AS VARCHAR)` decimal column, dropping trailing zeros.
fn decimal_column(row: &::duckdb::Row<'_>, index: usize) -> Result<Decimal, ::duckdb::Error> {
    let raw: String = row.get(index)?;
    Decimal::from_str(raw.trim())
        .map(|value| value.normalize())
        .map_err(|error| ::duckdb::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

fn timestamp_column(
    row: &::duckdb::Row<'_>,
    index: usize,
) -> Result<OffsetDateTime, ::duckdb::Error> {
    let millis: i64 = row.get(index)?;
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).map_err(|error| {
        ::duckdb::Error::FromSqlConversionFailure(index, Type::BigInt, Box::new(error))
    })
}

fn unix_micros(value: OffsetDateTime) -> i64 {
    (value.unix_timestamp_nanos() / 1_000) as i64
}

/// Resolve the flowtick data directory.
fn resolve_flowtick_home() -> PathBuf {
    if let Some(path) = env::var_os("FLOWTICK_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".flowtick");
    }

    PathBuf::from(".flowtick")
}
