use serde_json::json;

use db_log_sink::backend::{BackendConfig, ConsoleConfig};
use db_log_sink::factory::DatabaseLogger;
use db_log_sink::init::init_diagnostics;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_diagnostics()?;

    let factory = DatabaseLogger::new();
    let logger = factory
        .get_instance(&BackendConfig::Console(ConsoleConfig {
            service: "console-demo".into(),
        }))
        .await?;

    logger.log("service started", None).await;
    logger
        .error("order failed", Some(json!({ "order_id": 123 })))
        .await;

    // The second configuration is ignored; the console sink is reused.
    let same = factory
        .get_instance_from_value(json!({ "type": "bogus", "config": {} }))
        .await?;
    same.log("still the console sink", Some(json!({ "x": 1 }))).await;
    Ok(())
}
