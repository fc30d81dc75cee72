//! eno-bridge - EnOcean serial gateway to MQTT
//!
//! Usage:
//!   eno-bridge                          Run with ./config.toml
//!   eno-bridge --config /etc/eno.toml   Run with an explicit config file
//!   eno-bridge --port /dev/ttyUSB1      Override the serial port
//!   eno-bridge --learn                  Start with teach-in mode enabled

use anyhow::Result;
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use enocean_mqtt_bridge::cli::Cli;
use enocean_mqtt_bridge::codec::EnoceanAddress;
use enocean_mqtt_bridge::config::{self, Config};
use enocean_mqtt_bridge::gateway::{EquipmentRegistry, EquipmentTranslator, Gateway};
use enocean_mqtt_bridge::mqtt;
use enocean_mqtt_bridge::profile::catalog;
use enocean_mqtt_bridge::transport::{SerialTransport, Transport};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = config::load(&cli.config)?;
    if let Some(port) = cli.port {
        config.serial.port = port;
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config, cli.learn))
}

async fn run(config: Config, learn: bool) -> Result<()> {
    // Registry construction errors are fatal: a malformed catalog must not
    // silently serve wrong data.
    let profiles = catalog::builtin()?;
    info!("profile catalog ready, {} profiles", profiles.len());

    let equipment = EquipmentRegistry::from_config(&config.equipment, &profiles);
    if equipment.is_empty() {
        warn!("no equipment configured; inbound telegrams will be disregarded");
    } else {
        info!("{} equipment configured", equipment.len());
    }

    let sender: EnoceanAddress = config
        .gateway
        .sender_address
        .parse()
        .map_err(|reason: String| anyhow::anyhow!("gateway.sender_address: {}", reason))?;
    let translator = Arc::new(EquipmentTranslator::new(equipment, sender));
    translator.set_learn_enabled(learn);

    // Shutdown flag, set by SIGINT/SIGTERM
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_signal = shutdown.clone();

    #[cfg(unix)]
    tokio::spawn(async move {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).unwrap();
        let mut sigint =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).unwrap();
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
        shutdown_signal.store(true, Ordering::SeqCst);
    });

    #[cfg(not(unix))]
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown_signal.store(true, Ordering::SeqCst);
    });

    info!(
        "starting gateway: {} @ {} baud <-> mqtt://{}:{}",
        config.serial.port, config.serial.baud_rate, config.mqtt.host, config.mqtt.port
    );

    let serial = SerialTransport::new(&config.serial.port, config.serial.baud_rate)
        .spawn(shutdown.clone())?;
    let (mqtt_client, commands) = mqtt::connect(&config.mqtt, shutdown.clone());

    let gateway = Gateway::new(translator, &config.gateway);
    gateway.run(serial, mqtt_client, commands, shutdown).await?;
    Ok(())
}
