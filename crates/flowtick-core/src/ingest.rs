//! Converts decoded flow events into stored trades, skipping ones already held.

use std::str::FromStr;
use std::sync::Arc;

use flowtick_warehouse::{InsertOutcome, PersistedTrade, TradeStore, DECIMAL_SCALE};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, error, warn};

use crate::config::ExpirationPolicy;
use crate::domain::{RawTradeRecord, UtcDateTime};
use crate::error::RecordError;

/// Per-batch counters. A record lands in exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub saved: usize,
    /// Already present in the store.
    pub skipped: usize,
    /// Unusable upstream data.
    pub rejected: usize,
    /// Store failures.
    pub failed: usize,
}

impl IngestSummary {
    pub fn total(&self) -> usize {
        self.saved + self.skipped + self.rejected + self.failed
    }
}

enum RecordOutcome {
    Saved,
    Skipped,
}

/// Sole writer of `option_trades` rows. Clones share the same store.
#[derive(Clone)]
pub struct IngestionWriter {
    store: Arc<dyn TradeStore>,
    expiration_policy: ExpirationPolicy,
}

impl IngestionWriter {
    pub fn new(store: Arc<dyn TradeStore>, expiration_policy: ExpirationPolicy) -> Self {
        Self {
            store,
            expiration_policy,
        }
    }

    /// Persist a batch stamped with the current time.
    pub fn persist(&self, records: &[RawTradeRecord]) -> IngestSummary {
        self.persist_at(records, OffsetDateTime::now_utc())
    }

    /// Persist a batch, stamping new rows with `now`. Never fails as a unit.
    pub fn persist_at(&self, records: &[RawTradeRecord], now: OffsetDateTime) -> IngestSummary {
        let mut summary = IngestSummary::default();

        for record in records {
            match self.persist_record(record, now) {
                Ok(RecordOutcome::Saved) => summary.saved += 1,
                Ok(RecordOutcome::Skipped) => summary.skipped += 1,
                Err(RecordError::Store(store_error)) => {
                    error!(trade_id = %record.trade_id(), error = %store_error, "failed to store trade");
                    summary.failed += 1;
                }
                Err(record_error) => {
                    warn!(trade_id = %record.trade_id(), error = %record_error, "dropping trade");
                    summary.rejected += 1;
                }
            }
        }

        summary
    }

    fn persist_record(
        &self,
        record: &RawTradeRecord,
        now: OffsetDateTime,
    ) -> Result<RecordOutcome, RecordError> {
        let trade = self.to_persisted(record, now)?;

        if self.store.contains(&trade.trade_id)? {
            debug!(trade_id = %trade.trade_id, "trade already stored");
            return Ok(RecordOutcome::Skipped);
        }

        match self.store.insert(&trade)? {
            InsertOutcome::Inserted => Ok(RecordOutcome::Saved),
            InsertOutcome::Duplicate => {
                debug!(trade_id = %trade.trade_id, "trade stored concurrently");
                Ok(RecordOutcome::Skipped)
            }
        }
    }

    fn to_persisted(
        &self,
        record: &RawTradeRecord,
        now: OffsetDateTime,
    ) -> Result<PersistedTrade, RecordError> {
        let creation_date = UtcDateTime::parse(&record.created_date)
            .map_err(|_| RecordError::InvalidCreationDate {
                value: record.created_date.clone(),
            })?
            .unix_millis();

        let expiration = match UtcDateTime::parse(&record.expiration) {
            Ok(expiration) => Some(expiration.unix_millis()),
            Err(_) if self.expiration_policy == ExpirationPolicy::Tolerate => {
                debug!(
                    trade_id = %record.trade_id(),
                    expiration = %record.expiration,
                    "unparseable expiration stored as empty"
                );
                None
            }
            Err(_) => {
                return Err(RecordError::InvalidExpiration {
                    value: record.expiration.clone(),
                })
            }
        };

        Ok(PersistedTrade {
            id: None,
            trade_id: record.trade_id(),
            timestamp: record.id.timestamp,
            creation_date,
            order_id: record.order,
            symbol: record.symbol.clone(),
            trade_type: record.trade_type.clone(),
            details: record.details.clone(),
            bid_ask: record.bid_ask.clone(),
            contract_price: to_decimal(record.contract_price, "contractPrice")?,
            volume: record.volume,
            option_type: record.call_put.clone(),
            strike: to_decimal(record.strike, "strike")?,
            spot: to_decimal(record.spot, "spot")?,
            premium: to_decimal(record.premium, "premium")?,
            expiration,
            color: record.color.clone(),
            implied_volatility: to_decimal(record.implied_volatility, "impliedVolatility")?,
            dte: record.dte,
            earnings_report: record.er.clone(),
            security_type: record.stock_etf.clone(),
            sector: record.sector.clone(),
            unusual_activity: record.uoa.clone(),
            weekly_option: record.weekly.clone(),
            market_cap: record.mkt_cap,
            open_interest: record.oi,
            itm: record.itm.to_string(),
            ex_div: record.ex.to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Shortest decimal that round-trips `value`, so `1234.5` stays `1234.5`.
///
/// Digits past [`DECIMAL_SCALE`] are rounded half away from zero here, so the
/// row written is the row read back.
pub fn to_decimal(value: f64, field: &'static str) -> Result<Decimal, RecordError> {
    if !value.is_finite() {
        return Err(RecordError::NonFiniteNumber { field });
    }
    let decimal = Decimal::from_str(&value.to_string())
        .map_err(|_| RecordError::NumberOutOfRange { field, value })?;
    Ok(decimal
        .round_dp_with_strategy(DECIMAL_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use flowtick_warehouse::{TradePage, TradeQuery, WarehouseError};
    use time::macros::datetime;

    use crate::domain::RawTradeId;

    #[derive(Default)]
    struct MemoryStore {
        trades: Mutex<Vec<PersistedTrade>>,
        fail_inserts: bool,
        race_on_insert: bool,
    }

    impl TradeStore for MemoryStore {
        fn contains(&self, trade_id: &str) -> Result<bool, WarehouseError> {
            Ok(self
                .trades
                .lock()
                .expect("store mutex poisoned")
                .iter()
                .any(|trade| trade.trade_id == trade_id))
        }

        fn insert(&self, trade: &PersistedTrade) -> Result<InsertOutcome, WarehouseError> {
            if self.fail_inserts {
                return Err(WarehouseError::InvalidData(String::from("disk full")));
            }
            if self.race_on_insert {
                return Ok(InsertOutcome::Duplicate);
            }
            self.trades
                .lock()
                .expect("store mutex poisoned")
                .push(trade.clone());
            Ok(InsertOutcome::Inserted)
        }

        fn query_trades(&self, _query: &TradeQuery) -> Result<TradePage, WarehouseError> {
            let trades = self.trades.lock().expect("store mutex poisoned").clone();
            let total = trades.len() as i64;
            Ok(TradePage { trades, total })
        }
    }

    fn record(creation_time: &str) -> RawTradeRecord {
        RawTradeRecord {
            id: RawTradeId {
                timestamp: 1_736_177_400,
                creation_time: creation_time.to_owned(),
            },
            order: 9,
            created_date: String::from("2025-01-06T15:30:00Z"),
            symbol: String::from("SPY"),
            trade_type: String::from("SWEEP"),
            call_put: String::from("CALL"),
            premium: 1234.5,
            contract_price: 2.47,
            strike: 600.0,
            spot: 598.12,
            implied_volatility: 0.1834,
            expiration: String::from("2025-01-10T00:00:00Z"),
            itm: 1,
            ex: 0,
            ..RawTradeRecord::default()
        }
    }

    fn writer(store: Arc<MemoryStore>, policy: ExpirationPolicy) -> IngestionWriter {
        IngestionWriter::new(store, policy)
    }

    const NOW: OffsetDateTime = datetime!(2025-01-06 15:30:05 UTC);

    #[test]
    fn second_persist_of_same_record_is_skipped() {
        let store = Arc::new(MemoryStore::default());
        let writer = writer(store.clone(), ExpirationPolicy::Tolerate);

        let first = writer.persist_at(&[record("a")], NOW);
        let second = writer.persist_at(&[record("a")], NOW);

        assert_eq!(first, IngestSummary { saved: 1, ..IngestSummary::default() });
        assert_eq!(second, IngestSummary { skipped: 1, ..IngestSummary::default() });
        assert_eq!(store.trades.lock().expect("lock").len(), 1);
    }

    #[test]
    fn persist_stamps_rows_with_the_current_time() {
        let store = Arc::new(MemoryStore::default());
        let writer = writer(store.clone(), ExpirationPolicy::Tolerate);

        let before = OffsetDateTime::now_utc();
        let first = writer.persist(&[record("a"), record("b")]);
        let again = writer.persist(&[record("a")]);
        let after = OffsetDateTime::now_utc();

        assert_eq!(first, IngestSummary { saved: 2, ..IngestSummary::default() });
        assert_eq!(again, IngestSummary { skipped: 1, ..IngestSummary::default() });
        let trades = store.trades.lock().expect("lock");
        for trade in trades.iter() {
            assert!(trade.created_at >= before && trade.created_at <= after);
            assert_eq!(trade.created_at, trade.updated_at);
        }
    }

    #[test]
    fn records_sharing_natural_key_collide() {
        let store = Arc::new(MemoryStore::default());
        let writer = writer(store.clone(), ExpirationPolicy::Tolerate);
        let mut variant = record("a");
        variant.premium = 1.0;
        variant.symbol = String::from("QQQ");

        let summary = writer.persist_at(&[record("a"), variant], NOW);
        assert_eq!(summary.saved, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(store.trades.lock().expect("lock")[0].symbol, "SPY");
    }

    #[test]
    fn bad_creation_date_is_rejected_not_skipped() {
        let store = Arc::new(MemoryStore::default());
        let writer = writer(store, ExpirationPolicy::Tolerate);
        let mut bad = record("bad");
        bad.created_date = String::from("yesterday");

        let summary = writer.persist_at(&[bad, record("good")], NOW);
        assert_eq!(
            summary,
            IngestSummary {
                saved: 1,
                skipped: 0,
                rejected: 1,
                failed: 0
            }
        );
    }

    #[test]
    fn expiration_policy_controls_unparseable_expiration() {
        let mut odd = record("odd");
        odd.expiration = String::from("2025-01-10");

        let tolerant_store = Arc::new(MemoryStore::default());
        let tolerant = writer(tolerant_store.clone(), ExpirationPolicy::Tolerate);
        assert_eq!(tolerant.persist_at(&[odd.clone()], NOW).saved, 1);
        assert_eq!(tolerant_store.trades.lock().expect("lock")[0].expiration, None);

        let strict = writer(Arc::new(MemoryStore::default()), ExpirationPolicy::Drop);
        let summary = strict.persist_at(&[odd], NOW);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.saved, 0);
    }

    #[test]
    fn maps_fields_into_persisted_trade() {
        let store = Arc::new(MemoryStore::default());
        writer(store.clone(), ExpirationPolicy::Tolerate).persist_at(&[record("a")], NOW);

        let trades = store.trades.lock().expect("lock");
        let trade = &trades[0];
        assert_eq!(trade.trade_id, "1736177400_a");
        assert_eq!(trade.creation_date, 1_736_177_400_000);
        assert_eq!(trade.expiration, Some(1_736_467_200_000));
        assert_eq!(trade.premium.to_string(), "1234.5");
        assert_eq!(trade.contract_price.to_string(), "2.47");
        assert_eq!(trade.strike.to_string(), "600");
        assert_eq!(trade.option_type, "CALL");
        assert_eq!(trade.itm, "1");
        assert_eq!(trade.ex_div, "0");
        assert_eq!(trade.created_at, NOW);
        assert_eq!(trade.updated_at, NOW);
    }

    #[test]
    fn store_failures_and_races_are_counted_separately() {
        let failing = Arc::new(MemoryStore {
            fail_inserts: true,
            ..MemoryStore::default()
        });
        let summary = writer(failing, ExpirationPolicy::Tolerate).persist_at(&[record("a")], NOW);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 1);

        let racing = Arc::new(MemoryStore {
            race_on_insert: true,
            ..MemoryStore::default()
        });
        let summary = writer(racing, ExpirationPolicy::Tolerate).persist_at(&[record("a")], NOW);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.saved, 0);
    }

    #[test]
    fn non_finite_numbers_reject_the_record() {
        let mut broken = record("nan");
        broken.spot = f64::NAN;
        assert!(matches!(
            to_decimal(broken.spot, "spot"),
            Err(RecordError::NonFiniteNumber { field: "spot" })
        ));

        let summary =
            writer(Arc::new(MemoryStore::default()), ExpirationPolicy::Tolerate).persist_at(&[broken], NOW);
        assert_eq!(summary.rejected, 1);
    }

    #[test]
    fn finite_values_beyond_decimal_range_are_out_of_range() {
        assert!(matches!(
            to_decimal(1e30, "premium"),
            Err(RecordError::NumberOutOfRange { field: "premium", .. })
        ));

        let mut huge = record("huge");
        huge.premium = -1e30;
        let summary =
            writer(Arc::new(MemoryStore::default()), ExpirationPolicy::Tolerate).persist_at(&[huge], NOW);
        assert_eq!(summary.rejected, 1);
    }

    #[test]
    fn decimal_conversion_rounds_to_stored_scale() {
        assert_eq!(
            to_decimal(0.123456789012345, "impliedVolatility")
                .expect("decimal")
                .to_string(),
            "0.123456789"
        );
        assert_eq!(
            to_decimal(1.00000000005, "impliedVolatility")
                .expect("decimal")
                .to_string(),
            "1.0000000001"
        );
    }

    #[test]
    fn decimal_conversion_keeps_shortest_form() {
        assert_eq!(to_decimal(1234.5, "premium").expect("decimal").to_string(), "1234.5");
        assert_eq!(to_decimal(0.1, "premium").expect("decimal").to_string(), "0.1");
        assert_eq!(to_decimal(25_000.0, "premium").expect("decimal").to_string(), "25000");
    }
}
