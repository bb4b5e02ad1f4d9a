mod config;
mod controller;
mod error;
mod minecraft;
mod mqtt;
mod render;
mod types;

use controller::QueryController;
use minecraft::StatusClient;
use std::{env, sync::Arc};

use log::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    env_logger::builder()
        .filter_module("mcstatus_mqtt", log::LevelFilter::Debug)
        .parse_default_env()
        .init();
    if dotenv.is_err() {
        info!(".env not found, using env variables...");
    }

    let config = config::Config::from_env();
    let controller = Arc::new(QueryController::new(StatusClient::new(&config.api)?));

    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("usage: mcstatus-mqtt [ADDRESS]");
        println!("  with ADDRESS: query it once and print the panel");
        println!("  without: serve the panel over MQTT");
        return Ok(());
    }

    // One-shot: query the given address and print the panel.
    if let Some(address) = address_arg(args) {
        controller.set_query(address);
        controller.submit().await?;
        println!("{}", render::render(&controller.state()));
        return Ok(());
    }

    let topics = mqtt::Topics::new(&config.mqtt.topic_prefix);
    let (mqtt, ev) = mqtt::setup(&config.mqtt, controller.clone());
    let publisher = tokio::spawn(mqtt::publish_panel(
        mqtt.clone(),
        topics,
        controller.subscribe(),
    ));

    if let Err(e) = ev.await {
        error!("MQTT loop stopped: {}", e);
    }
    publisher.abort();
    Ok(())
}

/// First argument that is not a flag.
fn address_arg(args: impl IntoIterator<Item = String>) -> Option<String> {
    args.into_iter().find(|a| !a.starts_with('-'))
}
