use anyhow::{Context, Result};
use roomsync::config::{load_config, load_setup_document, RoomsyncConfig};
use roomsync::session::{self, Session};
use roomsync::transport::NatsTransport;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomsync=info".into()),
        )
        .init();

    info!("roomsync starting...");

    // Optional config path as first argument, env vars on top
    let mut config = match std::env::args().nth(1) {
        Some(path) => load_config(&path)?,
        None => RoomsyncConfig::default(),
    };
    config.apply_env();
    config.validate()?;

    let (events_tx, events_rx) = session::channel(config.client.event_buffer);
    let transport =
        NatsTransport::connect(&config.nats, &config.client.inbound_topics, events_tx.clone())
            .await?;

    let mut session = Session::new(&config, transport, &events_tx, events_rx);

    if let Some(path) = &config.setup.file {
        match load_setup_document(path) {
            Ok(setup) => session.apply_setup(&setup),
            Err(e) => warn!(error = %e, "Startup setup document not applied"),
        }
    }

    let handle = session
        .handle()
        .context("Session channel closed before start")?;
    // From here on the transport and the handle keep the channel open
    drop(events_tx);
    let runner = tokio::spawn(session.run());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    handle.shutdown().await?;
    runner.await.context("Session task failed")?;

    info!("roomsync stopped");
    Ok(())
}
