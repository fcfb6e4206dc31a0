use anyhow::Context;
use clap::Parser;
use comfortd::mqtt::Bridge;
use comfortd::mqtt::RumqttcClient;
use comfortd::mqtt::Topics;
use comfortd::Cli;
use comfortd::Config;
use comfortd::Service;
use comfortd_cloud::HttpSession;
use tokio::sync::oneshot;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // File values first, then flags and environment on top
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(config.logging.targets())
        .init();

    tracing::info!("comfortd starting");
    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from: {}", path.display());
    }
    tracing::info!(
        "MQTT broker {}:{}, discovery prefix '{}', polling every {}s",
        config.mqtt.broker,
        config.mqtt.port,
        config.mqtt.discovery_prefix,
        config.cloud.update_interval
    );

    let template = HttpSession::new(config.cloud.session_config())
        .context("Failed to build Comfort Cloud HTTP client")?;
    let bus = Bridge::new(
        RumqttcClient::new(&config.mqtt),
        Topics::new(config.mqtt.discovery_prefix.clone()),
    );
    let mut service = Service::new(
        Box::new(move || template.fresh()),
        bus,
        config.cloud.update_interval(),
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received shutdown signal"),
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    service.run(shutdown_rx).await.context("comfortd stopped")?;

    tracing::info!("comfortd shutdown complete");
    Ok(())
}
