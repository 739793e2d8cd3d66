use flowtick_warehouse::Warehouse;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::CliError;

pub fn run(config: &AppConfig) -> Result<Value, CliError> {
    let warehouse = Warehouse::open(config.warehouse_config())?;
    Ok(serde_json::to_value(warehouse.stats()?)?)
}
