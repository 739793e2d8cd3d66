use flowtick_warehouse::Warehouse;
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::error::CliError;

pub fn run(config: &AppConfig) -> Result<Value, CliError> {
    let warehouse = Warehouse::open(config.warehouse_config())?;
    let symbols = warehouse.symbols()?;
    Ok(json!({ "count": symbols.len(), "symbols": symbols }))
}
