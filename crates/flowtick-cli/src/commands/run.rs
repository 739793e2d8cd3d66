use std::sync::Arc;

use flowtick_core::{CredentialManager, FlowClient, IngestionWriter, ReqwestHttpClient, Scheduler};
use flowtick_warehouse::Warehouse;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::CliError;

pub async fn run(config: &AppConfig) -> Result<Value, CliError> {
    config.require_credentials()?;

    let warehouse = Arc::new(Warehouse::open(config.warehouse_config())?);
    info!(
        db_path = ?warehouse.db_path(),
        base_url = %config.upstream.base_url,
        "starting flow poller"
    );

    let http = Arc::new(ReqwestHttpClient::new(&config.upstream.user_agent));
    let credentials = Arc::new(CredentialManager::new(
        http.clone(),
        config.upstream.clone(),
    ));
    let client = FlowClient::new(http, credentials, config.upstream.clone());
    let writer = IngestionWriter::new(warehouse, config.poller.expiration_policy);
    let scheduler = Scheduler::new(client, writer, config.poller.interval());

    let cycles = scheduler
        .run_until(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                warn!(%error, "failed to listen for ctrl-c; stopping");
            }
        })
        .await?;

    Ok(json!({ "cycles": cycles }))
}
