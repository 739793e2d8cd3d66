use flowtick_warehouse::{PersistedTrade, TradeQuery, TradeStore, Warehouse};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use serde_json::Value;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::cli::TradesArgs;
use crate::config::AppConfig;
use crate::error::CliError;

/// Listing row: display-formatted fields plus the keys needed to page.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct TradeRow {
    id: Option<i64>,
    trade_id: String,
    time: String,
    symbol: String,
    exp: String,
    strike: String,
    cp: String,
    spot: String,
    details: String,
    creation_date: String,
    #[serde(rename = "type")]
    trade_type: String,
    value: String,
    iv: String,
    color: String,
}

#[derive(Debug, Serialize)]
struct TradesResponse {
    trades: Vec<TradeRow>,
    total: i64,
}

pub fn run(args: &TradesArgs, config: &AppConfig) -> Result<Value, CliError> {
    let warehouse = Warehouse::open(config.warehouse_config())?;
    let page = warehouse.query_trades(&to_query(args))?;

    let response = TradesResponse {
        trades: page.trades.iter().map(to_row).collect(),
        total: page.total,
    };
    Ok(serde_json::to_value(response)?)
}

fn to_query(args: &TradesArgs) -> TradeQuery {
    TradeQuery {
        symbol: args.symbol.clone(),
        option_types: args.option_types.clone(),
        flow_colors: args.colors.clone(),
        security_types: args.security_types.clone(),
        sectors: args.sectors.clone(),
        bid_ask: args.bid_ask.clone(),
        min_premiums: args.min_premiums.clone(),
        weekly_only: args.weekly,
        earnings: args.earnings,
        unusual: args.unusual,
        ex_div: args.ex_div,
        market_cap_below_750b: args.below_750b,
        after_creation_date: args.after,
        after_id: args.after_id,
        limit: args.limit,
        offset: args.offset,
    }
}

fn to_row(trade: &PersistedTrade) -> TradeRow {
    TradeRow {
        id: trade.id,
        trade_id: trade.trade_id.clone(),
        time: format_millis(trade.creation_date, TimeStyle::Clock),
        symbol: trade.symbol.clone(),
        exp: trade
            .expiration
            .map(|millis| format_millis(millis, TimeStyle::ShortDate))
            .unwrap_or_default(),
        strike: trade.strike.to_string(),
        cp: trade.option_type.clone(),
        spot: trade.spot.to_string(),
        details: trade.details.clone(),
        creation_date: trade.creation_date.to_string(),
        trade_type: trade.trade_type.clone(),
        value: trade.premium.to_string(),
        iv: (trade.implied_volatility * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
            .to_string(),
        color: trade.color.clone(),
    }
}

#[derive(Clone, Copy)]
enum TimeStyle {
    /// `HH:MM:SS`
    Clock,
    /// `MM/DD/YY`
    ShortDate,
}

fn format_millis(millis: i64, style: TimeStyle) -> String {
    let Ok(instant) =
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
    else {
        return String::new();
    };

    let formatted = match style {
        TimeStyle::Clock => instant.format(format_description!("[hour]:[minute]:[second]")),
        TimeStyle::ShortDate => instant.format(format_description!(
            "[month]/[day]/[year repr:last_two]"
        )),
    };
    formatted.unwrap_or_default()
}
