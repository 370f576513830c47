use triggerd::core::config::BridgeConfig;
use triggerd::core::handler::TriggerHandler;
use triggerd::core::r#loop::bridge_loop;
use triggerd::io::store::RtdbClient;

use anyhow::{Context, Result};
use colored::*;

#[tokio::main]
async fn main() -> Result<()> {
    let config = BridgeConfig::default();

    // Startup is fail-fast: a bad credential file or database URL ends the
    // process here, before anything is subscribed.
    let store = RtdbClient::connect(&config.credential_path, &config.database_url)
        .context("Failed to connect to the realtime database")?;
    println!("{} Connected to the realtime database.", "✅".green());

    let events = store.subscribe(&config.trigger_path, config.reconnect_delay());
    let handler = TriggerHandler::new(
        store,
        &config.target_url,
        &config.trigger_path,
        config.wait_bound(),
    );

    println!(
        "{} Listening for changes on '{}'...",
        "🎧".cyan(),
        config.trigger_path
    );

    tokio::select! {
        _ = bridge_loop(events, handler) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("\n{}", "👋 Stopping listener...".green());
        }
    }

    Ok(())
}
