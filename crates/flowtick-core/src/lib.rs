//! # Flowtick Core
//!
//! Ingestion pipeline for an authenticated options flow feed.
//!
//! ## Overview
//!
//! Every cycle the poller asks the upstream endpoint for "everything up to
//! now", decodes the returned flow events, and hands them to a writer that
//! stores the ones it has not seen before:
//!
//! - **Credentials** are held by [`CredentialManager`] and replaced wholesale
//!   on every successful login
//! - **Fetches** retry exactly once after a 401, behind a re-login
//! - **Ingestion** dedupes on the natural key `"{timestamp}_{creationTime}"`
//! - **Scheduling** is a free-running timer; a failed cycle never stops the loop
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Upstream and poller settings |
//! | [`credential`] | Login and bearer credential ownership |
//! | [`domain`] | Upstream flow records and UTC timestamps |
//! | [`error`] | Error types per pipeline stage |
//! | [`flow_client`] | Authenticated flow fetch with single re-login |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`ingest`] | Dedupe and persistence of flow records |
//! | [`request`] | Flow request body construction |
//! | [`scheduler`] | Poll loop |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use flowtick_core::{
//!     CredentialManager, FlowClient, IngestionWriter, PollerConfig, ReqwestHttpClient,
//!     Scheduler, UpstreamConfig,
//! };
//! use flowtick_warehouse::Warehouse;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let upstream = UpstreamConfig {
//!         username: String::from("trader"),
//!         password: String::from("secret"),
//!         ..UpstreamConfig::default()
//!     };
//!     let poller = PollerConfig::default();
//!
//!     let http = Arc::new(ReqwestHttpClient::new(&upstream.user_agent));
//!     let credentials = Arc::new(CredentialManager::new(http.clone(), upstream.clone()));
//!     let client = FlowClient::new(http, credentials, upstream);
//!     let writer = IngestionWriter::new(
//!         Arc::new(Warehouse::open_default()?),
//!         poller.expiration_policy,
//!     );
//!
//!     let scheduler = Scheduler::new(client, writer, poller.interval());
//!     let cycles = scheduler
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     println!("ran {cycles} cycles");
//!     Ok(())
//! }
//! ```
//!
//! ## Security
//!
//! - Passwords and bearer tokens never appear in `Debug` output or logs
//! - All store access goes through parameterized SQL

pub mod config;
pub mod credential;
pub mod domain;
pub mod error;
pub mod flow_client;
pub mod http_client;
pub mod ingest;
pub mod request;
pub mod scheduler;

pub use config::{ExpirationPolicy, PollerConfig, UpstreamConfig};
pub use credential::{Credential, CredentialManager};
pub use domain::{trade_id, RawTradeId, RawTradeRecord, TimestampNotUtc, UtcDateTime};
pub use error::{AuthError, FetchError, RecordError, StartupError};
pub use flow_client::FlowClient;
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, RecordedRequest,
    ReqwestHttpClient, ScriptedHttpClient,
};
pub use ingest::{to_decimal, IngestSummary, IngestionWriter};
pub use request::{DateWindow, FlowFilters, FlowRequestBuilder, FlowRequestSpec};
pub use scheduler::{Clock, CycleReport, FixedClock, Scheduler, SystemClock};

// Store types, re-exported from flowtick-warehouse
pub use flowtick_warehouse::{
    InsertOutcome, PersistedTrade, TradePage, TradeQuery, TradeStats, TradeStore, Warehouse,
    WarehouseConfig, WarehouseError,
};
