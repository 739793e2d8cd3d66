//! Behavior-driven tests for the ingestion pipeline
//!
//! These tests drive the poller end to end against a scripted upstream and a
//! real DuckDB warehouse, checking what ends up stored and what gets sent.

use std::sync::Arc;
use std::time::Duration;

use flowtick_core::{
    AuthError, CredentialManager, ExpirationPolicy, FetchError, FixedClock, FlowClient,
    HttpResponse, IngestSummary, IngestionWriter, RawTradeRecord, Scheduler, ScriptedHttpClient,
    StartupError, TradeQuery, TradeStore, UpstreamConfig, Warehouse,
};
use time::macros::datetime;

const LOGIN_PATH: &str = "/account/login";
const FLOW_PATH: &str = "/options/getFlowMobile";

fn login_ok(token: &str) -> HttpResponse {
    HttpResponse::ok_json(format!(
        r#"{{"success":true,"data":{{"accessToken":"{token}","refreshToken":"r","expiresIn":3600,"tokenType":"Bearer"}},"error":null}}"#
    ))
}

fn flow_event(timestamp: i64, creation_time: &str, created_date: &str, premium: f64) -> String {
    format!(
        r#"{{"id":{{"timestamp":{timestamp},"creationTime":"{creation_time}"}},"order":1,"createdDate":"{created_date}","symbol":"SPY","type":"SWEEP","details":"100@2.47_A","bidAsk":"A","contractPrice":2.47,"volume":100,"callPut":"CALL","strike":600,"spot":598.12,"premium":{premium},"expiration":"2025-01-10T00:00:00Z","color":"YELLOW","impliedVolatility":0.1834,"dte":4,"er":"F","stockEtf":"ETF","sector":"None","uoa":"T","weekly":"T","mktCap":0,"oi":12000,"itm":0,"ex":0}}"#
    )
}

fn flow_ok(events: &[String]) -> HttpResponse {
    HttpResponse::ok_json(format!("[{}]", events.join(",")))
}

struct Pipeline {
    upstream: Arc<ScriptedHttpClient>,
    warehouse: Arc<Warehouse>,
    scheduler: Scheduler,
}

fn pipeline(upstream: ScriptedHttpClient) -> Pipeline {
    pipeline_with_backoff(upstream, 10_000)
}

fn pipeline_with_backoff(upstream: ScriptedHttpClient, auth_backoff_ms: u64) -> Pipeline {
    let upstream = Arc::new(upstream);
    let warehouse = Arc::new(Warehouse::open_in_memory().expect("warehouse"));
    let config = UpstreamConfig {
        base_url: String::from("https://flow.example.test/api/v2"),
        username: String::from("trader"),
        password: String::from("secret"),
        auth_backoff_ms,
        ..UpstreamConfig::default()
    };

    let credentials = Arc::new(CredentialManager::new(upstream.clone(), config.clone()));
    let client = FlowClient::new(upstream.clone(), credentials, config);
    let writer = IngestionWriter::new(warehouse.clone(), ExpirationPolicy::Tolerate);
    let scheduler = Scheduler::new(client, writer, Duration::from_secs(10))
        .with_clock(Arc::new(FixedClock(datetime!(2025-01-06 15:30:05 UTC))));

    Pipeline {
        upstream,
        warehouse,
        scheduler,
    }
}

// =============================================================================
// Ingestion: Idempotency
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_the_same_events_arrive_every_cycle_they_are_stored_once() {
    // Given: An upstream that returns the same two events on every poll
    let events = [
        flow_event(1_736_177_400, "a", "2025-01-06T15:30:00Z", 1234.5),
        flow_event(1_736_177_401, "b", "2025-01-06T15:30:01Z", 800.0),
    ];
    let pipeline = pipeline(
        ScriptedHttpClient::new()
            .route(LOGIN_PATH, [Ok(login_ok("tok"))])
            .route(FLOW_PATH, [Ok(flow_ok(&events))]),
    );

    // When: The poller runs three cycles
    let cycles = pipeline
        .scheduler
        .run_until(tokio::time::sleep(Duration::from_secs(25)))
        .await
        .expect("poller runs");

    // Then: Each event is stored exactly once
    assert_eq!(cycles, 3);
    let page = pipeline
        .warehouse
        .query_trades(&TradeQuery::default())
        .expect("query");
    assert_eq!(page.total, 2);
    assert_eq!(page.trades[0].trade_id, "1736177401_b", "newest first");
    assert_eq!(page.trades[1].premium.to_string(), "1234.5");
}

#[tokio::test]
async fn when_a_cycle_repeats_the_second_report_counts_only_skips() {
    // Given: One event upstream
    let pipeline = pipeline(
        ScriptedHttpClient::new()
            .route(LOGIN_PATH, [Ok(login_ok("tok"))])
            .route(
                FLOW_PATH,
                [Ok(flow_ok(&[flow_event(
                    1_736_177_400,
                    "a",
                    "2025-01-06T15:30:00Z",
                    10.0,
                )]))],
            ),
    );

    // When: The poller logs in (shutdown already resolved) and two cycles run
    let startup = pipeline
        .scheduler
        .run_until(std::future::ready(()))
        .await
        .expect("startup login");
    let first = pipeline.scheduler.run_cycle().await.expect("first cycle");
    let second = pipeline.scheduler.run_cycle().await.expect("second cycle");

    // Then: Only the first cycle saved anything
    assert_eq!(startup, 0, "shutdown was already resolved");
    assert_eq!(
        first.summary,
        IngestSummary {
            saved: 1,
            ..IngestSummary::default()
        }
    );
    assert_eq!(
        second.summary,
        IngestSummary {
            skipped: 1,
            ..IngestSummary::default()
        }
    );
}

#[tokio::test]
async fn when_one_event_has_a_bad_creation_date_the_rest_of_the_batch_is_kept() {
    // Given: A batch with one unparseable creation date
    let pipeline = pipeline(
        ScriptedHttpClient::new()
            .route(LOGIN_PATH, [Ok(login_ok("tok"))])
            .route(
                FLOW_PATH,
                [Ok(flow_ok(&[
                    flow_event(1, "bad", "06/01/2025 15:30", 10.0),
                    flow_event(2, "good", "2025-01-06T15:30:00Z", 10.0),
                ]))],
            ),
    );
    pipeline
        .scheduler
        .run_until(std::future::ready(()))
        .await
        .expect("startup login");

    // When: One cycle runs
    let report = pipeline.scheduler.run_cycle().await.expect("cycle");

    // Then: The good event is saved and the bad one is not mistaken for a duplicate
    assert_eq!(report.fetched, 2);
    assert_eq!(report.summary.saved, 1);
    assert_eq!(report.summary.skipped, 0);
    assert_eq!(report.summary.rejected, 1);
    assert!(pipeline.warehouse.contains("2_good").expect("contains"));
    assert!(!pipeline.warehouse.contains("1_bad").expect("contains"));
}

// =============================================================================
// Ingestion: Authentication
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_the_startup_login_fails_no_flow_request_is_sent() {
    // Given: An upstream that rejects the login
    let pipeline = pipeline(
        ScriptedHttpClient::new()
            .route(
                LOGIN_PATH,
                [Ok(HttpResponse::ok_json(
                    r#"{"success":false,"data":null,"error":"invalid credentials"}"#,
                ))],
            )
            .route(FLOW_PATH, [Ok(flow_ok(&[]))]),
    );

    // When: The poller starts
    let result = pipeline
        .scheduler
        .run_until(std::future::pending::<()>())
        .await;

    // Then: Startup fails and the flow endpoint is never contacted
    match result {
        Err(StartupError::Login(AuthError::Rejected { message, .. })) => {
            assert_eq!(message, "invalid credentials");
        }
        other => panic!("expected startup login failure, got {other:?}"),
    }
    assert!(pipeline.upstream.requests_to(FLOW_PATH).is_empty());
}

#[tokio::test(start_paused = true)]
async fn when_the_token_expires_the_poller_relogs_once_and_recovers() {
    // Given: The first flow request is rejected, the retry succeeds
    let pipeline = pipeline(
        ScriptedHttpClient::new()
            .route(LOGIN_PATH, [Ok(login_ok("tok-1")), Ok(login_ok("tok-2"))])
            .route(
                FLOW_PATH,
                [
                    Ok(HttpResponse::new(401, "")),
                    Ok(flow_ok(&[flow_event(
                        5,
                        "x",
                        "2025-01-06T15:30:00Z",
                        10.0,
                    )])),
                ],
            ),
    );
    pipeline
        .scheduler
        .run_until(std::future::ready(()))
        .await
        .expect("startup login");

    // When: A cycle runs
    let report = pipeline.scheduler.run_cycle().await.expect("cycle recovers");

    // Then: Exactly one re-login happened and the retry carried the new token
    assert_eq!(report.summary.saved, 1);
    assert_eq!(pipeline.upstream.requests_to(LOGIN_PATH).len(), 2);
    let flow = pipeline.upstream.requests_to(FLOW_PATH);
    assert_eq!(flow.len(), 2);
    assert_eq!(
        flow[1].request.headers.get("authorization").map(String::as_str),
        Some("Bearer tok-2")
    );
}

#[tokio::test(start_paused = true)]
async fn when_the_token_is_rejected_twice_the_cycle_fails_without_a_third_attempt() {
    // Given: The flow endpoint rejects every token
    let pipeline = pipeline(
        ScriptedHttpClient::new()
            .route(LOGIN_PATH, [Ok(login_ok("tok"))])
            .route(FLOW_PATH, [Ok(HttpResponse::new(401, ""))]),
    );
    pipeline
        .scheduler
        .run_until(std::future::ready(()))
        .await
        .expect("startup login");

    // When: A cycle runs
    let result = pipeline.scheduler.run_cycle().await;

    // Then: The cycle reports Unauthorized after exactly two flow requests
    assert!(matches!(result, Err(FetchError::Unauthorized)));
    assert_eq!(pipeline.upstream.requests_to(FLOW_PATH).len(), 2);
}

// =============================================================================
// Ingestion: Request shape and cadence
// =============================================================================

#[tokio::test(start_paused = true)]
async fn every_cycle_requests_the_window_ending_now() {
    // Given: A pipeline with a fixed clock
    let pipeline = pipeline(
        ScriptedHttpClient::new()
            .route(LOGIN_PATH, [Ok(login_ok("tok"))])
            .route(FLOW_PATH, [Ok(flow_ok(&[]))]),
    );

    // When: The poller runs for two intervals
    pipeline
        .scheduler
        .run_until(tokio::time::sleep(Duration::from_secs(15)))
        .await
        .expect("poller runs");

    // Then: Requests are 10 s apart and carry a collapsed window at "now"
    let flow = pipeline.upstream.requests_to(FLOW_PATH);
    assert_eq!(flow.len(), 2);
    assert_eq!(flow[1].at - flow[0].at, Duration::from_secs(10));

    let body: serde_json::Value =
        serde_json::from_str(flow[0].request.body.as_deref().expect("body")).expect("json");
    assert_eq!(body["fromDate"], "2025-01-06T15:30:05.000Z");
    assert_eq!(body["toDate"], body["fromDate"]);
    assert_eq!(body["count"], 300);
    assert_eq!(body["historical"], false);
}

#[tokio::test(start_paused = true)]
async fn when_a_cycle_overruns_the_interval_missed_ticks_fire_back_to_back() {
    // Given: A first cycle that stalls 25 s in re-auth back-off, twice rejected
    let pipeline = pipeline_with_backoff(
        ScriptedHttpClient::new()
            .route(LOGIN_PATH, [Ok(login_ok("tok"))])
            .route(
                FLOW_PATH,
                [
                    Ok(HttpResponse::new(401, "")),
                    Ok(HttpResponse::new(401, "")),
                    Ok(flow_ok(&[])),
                ],
            ),
        25_000,
    );

    // When: The poller runs for 41 s on a 10 s interval
    let cycles = pipeline
        .scheduler
        .run_until(tokio::time::sleep(Duration::from_secs(41)))
        .await
        .expect("poller runs");

    // Then: The ticks missed at 10 s and 20 s fire at 25 s, then the original
    // schedule resumes at 30 s and 40 s
    assert_eq!(cycles, 5);
    let flow = pipeline.upstream.requests_to(FLOW_PATH);
    let offsets: Vec<u64> = flow
        .iter()
        .map(|recorded| (recorded.at - flow[0].at).as_secs())
        .collect();
    assert_eq!(offsets, vec![0, 25, 25, 25, 30, 40]);
}

#[test]
fn upstream_records_decode_leniently() {
    // Given: An event with only its identifier
    let raw = r#"[{"id":{"timestamp":9,"creationTime":"z"}}]"#;

    // When: It is decoded
    let records: Vec<RawTradeRecord> = serde_json::from_str(raw).expect("decode");

    // Then: Missing fields take zero values and the natural key is still derived
    assert_eq!(records[0].trade_id(), "9_z");
    assert_eq!(records[0].premium, 0.0);
    assert_eq!(records[0].symbol, "");
}

#[tokio::test]
async fn when_upstream_sends_nulls_the_batch_is_still_ingested() {
    // Given: One event with null fields next to a complete one
    let with_nulls = r#"{"id":{"timestamp":1,"creationTime":"a"},"createdDate":"2025-01-06T15:30:00Z","symbol":"SPY","expiration":null,"er":null,"sector":null,"premium":null}"#;
    let pipeline = pipeline(
        ScriptedHttpClient::new()
            .route(LOGIN_PATH, [Ok(login_ok("tok"))])
            .route(
                FLOW_PATH,
                [Ok(HttpResponse::ok_json(format!(
                    "[{with_nulls},{}]",
                    flow_event(2, "b", "2025-01-06T15:30:01Z", 10.0)
                )))],
            ),
    );
    pipeline
        .scheduler
        .run_until(std::future::ready(()))
        .await
        .expect("startup login");

    // When: One cycle runs
    let report = pipeline.scheduler.run_cycle().await.expect("cycle");

    // Then: Both events are stored; the nulls became empty values
    assert_eq!(report.summary.saved, 2);
    let page = pipeline
        .warehouse
        .query_trades(&TradeQuery::default())
        .expect("query");
    let stored = page
        .trades
        .iter()
        .find(|trade| trade.trade_id == "1_a")
        .expect("null-bearing trade stored");
    assert_eq!(stored.expiration, None);
    assert_eq!(stored.earnings_report, "");
    assert_eq!(stored.premium.to_string(), "0");
}
