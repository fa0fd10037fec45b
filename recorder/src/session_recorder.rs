use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::signal;

use lib_telemetry::capture::source::JsonLinesSource;
use lib_telemetry::retrieve::CollectorClient;
use lib_telemetry::TelemetryPipeline;

mod recorder_logic;
use recorder_logic::{config, logger};

type EventReader = Box<dyn AsyncBufRead + Unpin + Send>;

async fn open_events(config: &config::Config) -> Result<EventReader> {
    match &config.events_path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open events file {}", path.display()))?;
            log::info!("Reading events from {}", path.display());
            Ok(Box::new(BufReader::new(file)))
        }
        None => {
            log::info!("Reading events from stdin");
            Ok(Box::new(BufReader::new(tokio::io::stdin())))
        }
    }
}

async fn wait_for_shutdown() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::warn!("Cannot listen for SIGTERM: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let (config, notices) = config::load_config();
    logger::setup_logging(config.log_dir(), config.log_level())?;
    for (level, message) in notices {
        log::log!(level, "{}", message);
    }

    let pipeline_config = config
        .pipeline_config()
        .context("Invalid pipeline configuration")?;
    log::info!(
        "Collector {} (namespace {}), flush every {} ms, dedup {}",
        pipeline_config.collector_url,
        pipeline_config.collector_namespace,
        pipeline_config.flush_interval_ms,
        pipeline_config.dedup
    );

    let capability = config.capability();
    if !capability.is_interactive() {
        log::info!("Headless mode: telemetry is disabled, waiting for shutdown.");
    }

    let sink = CollectorClient::from_config(&pipeline_config)
        .context("Failed to build collector client")?;
    let source = JsonLinesSource::new(open_events(&config).await?);

    let active = TelemetryPipeline::activate(capability, &pipeline_config, source, sink);

    wait_for_shutdown().await;

    if let Some(active) = active {
        let recorder = active.recorder();
        let buffered = recorder.buffered();
        let ledger = recorder.ledger_len();
        log::info!(
            "Client {}: {} records buffered, {} entered the ledger, {} never uploaded.",
            active.client_id(),
            buffered,
            ledger,
            buffered.saturating_sub(ledger)
        );
    }

    log::info!("Shutdown complete.");
    Ok(())
}
