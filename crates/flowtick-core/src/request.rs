use serde::Serialize;

use crate::domain::UtcDateTime;

/// Maximum number of events requested per poll.
pub const FLOW_PAGE_SIZE: u32 = 300;

/// Upstream filter bitmask matching the toggles in [`FlowFilters::standard`].
pub const FLOW_FILTER_MASK: i64 = 2_198_487_171_391;

/// `start`/`end` pair; both ends carry the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub end: UtcDateTime,
    pub start: UtcDateTime,
}

impl DateWindow {
    pub fn at(instant: UtcDateTime) -> Self {
        Self {
            end: instant,
            start: instant,
        }
    }
}

/// Filter toggles sent with every flow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowFilters {
    pub options_date: DateWindow,
    pub expire_options_date: DateWindow,
    pub options_flow_puts: bool,
    pub options_flow_calls: bool,
    pub options_flow_yellow: bool,
    pub options_flow_white: bool,
    pub options_flow_magenta: bool,
    pub options_flow_above_ask_only: bool,
    pub options_flow_below_bid_only: bool,
    pub options_flow_at_or_above_ask: bool,
    pub options_flow_at_or_below_bid: bool,
    pub options_flow_multileg: bool,
    #[serde(rename = "optionsFlowOnlyMultiLeg")]
    pub options_flow_only_multi_leg: bool,
    #[serde(rename = "optionsFlowBelowPoint5")]
    pub options_flow_below_point5: bool,
    #[serde(rename = "optionsFlowBelow5")]
    pub options_flow_below5: bool,
    #[serde(rename = "optionsFlow100Contracts")]
    pub options_flow_100_contracts: bool,
    #[serde(rename = "optionsFlow500Contracts")]
    pub options_flow_500_contracts: bool,
    #[serde(rename = "optionsFlow5000Contracts")]
    pub options_flow_5000_contracts: bool,
    pub options_flow_stock: bool,
    pub options_flow_etf: bool,
    #[serde(rename = "optionsFlowAbove50k")]
    pub options_flow_above_50k: bool,
    #[serde(rename = "optionsFlowAbove100k")]
    pub options_flow_above_100k: bool,
    #[serde(rename = "optionsFlowAbove200k")]
    pub options_flow_above_200k: bool,
    #[serde(rename = "optionsFlowAbove500k")]
    pub options_flow_above_500k: bool,
    #[serde(rename = "optionsFlowAbove1m")]
    pub options_flow_above_1m: bool,
    #[serde(rename = "marketCapAbove750B")]
    pub market_cap_above_750b: bool,
    pub options_flow_in_the_money: bool,
    pub options_flow_out_of_the_money: bool,
    pub options_flow_sweep_only: bool,
    pub options_flow_weekly_only: bool,
    pub options_flow_earnings_report_only: bool,
    pub options_flow_unusual_only: bool,
    pub options_flow_ex_div: bool,
    pub options_flow_consumer_discretionary: bool,
    pub options_flow_industrials: bool,
    pub options_flow_information_technology: bool,
    pub options_flow_real_estate: bool,
    pub options_flow_health_care: bool,
    pub options_flow_energy: bool,
    pub options_flow_financials: bool,
    pub options_flow_materials: bool,
    pub options_flow_consumer_staples: bool,
    pub options_flow_communication_services: bool,
    pub options_flow_utilities: bool,
    pub options_expiration_range: bool,
    pub options_flow_sector_none: bool,
}

impl FlowFilters {
    /// The fixed toggle set: every side, colour, security type, and sector on;
    /// every narrowing filter off.
    pub fn standard(now: UtcDateTime) -> Self {
        Self {
            options_date: DateWindow::at(now),
            expire_options_date: DateWindow::at(now),
            options_flow_puts: true,
            options_flow_calls: true,
            options_flow_yellow: true,
            options_flow_white: true,
            options_flow_magenta: true,
            options_flow_above_ask_only: true,
            options_flow_below_bid_only: false,
            options_flow_at_or_above_ask: true,
            options_flow_at_or_below_bid: false,
            options_flow_multileg: false,
            options_flow_only_multi_leg: false,
            options_flow_below_point5: false,
            options_flow_below5: false,
            options_flow_100_contracts: false,
            options_flow_500_contracts: false,
            options_flow_5000_contracts: false,
            options_flow_stock: true,
            options_flow_etf: true,
            options_flow_above_50k: false,
            options_flow_above_100k: false,
            options_flow_above_200k: false,
            options_flow_above_500k: false,
            options_flow_above_1m: false,
            market_cap_above_750b: false,
            options_flow_in_the_money: false,
            options_flow_out_of_the_money: false,
            options_flow_sweep_only: false,
            options_flow_weekly_only: false,
            options_flow_earnings_report_only: false,
            options_flow_unusual_only: false,
            options_flow_ex_div: false,
            options_flow_consumer_discretionary: true,
            options_flow_industrials: true,
            options_flow_information_technology: true,
            options_flow_real_estate: true,
            options_flow_health_care: true,
            options_flow_energy: true,
            options_flow_financials: true,
            options_flow_materials: true,
            options_flow_consumer_staples: true,
            options_flow_communication_services: true,
            options_flow_utilities: true,
            options_expiration_range: false,
            options_flow_sector_none: true,
        }
    }
}

/// Body of one flow request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRequestSpec {
    pub historical: bool,
    pub symbol: String,
    pub strike: i64,
    pub count: u32,
    pub filter: i64,
    pub filters: FlowFilters,
    pub from_date: UtcDateTime,
    pub to_date: UtcDateTime,
}

/// Builds the request body for "everything up to now".
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowRequestBuilder;

impl FlowRequestBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Pure function of `now`; offset instants are normalized to UTC.
    pub fn build(&self, now: time::OffsetDateTime) -> FlowRequestSpec {
        let now = UtcDateTime::from_offset_datetime(now);
        FlowRequestSpec {
            historical: false,
            symbol: String::new(),
            strike: 0,
            count: FLOW_PAGE_SIZE,
            filter: FLOW_FILTER_MASK,
            filters: FlowFilters::standard(now),
            from_date: now,
            to_date: now,
        }
    }
}
