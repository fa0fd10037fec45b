//! # Live Collector Probe
//!
//! Posts one small hand-made batch to a real collector and prints the
//! resulting status. Useful for checking reachability and the record path
//! before pointing a recorder at it.

use std::time::Duration;

use clap::Parser;
use lib_telemetry::retrieve::CollectorClient;
use lib_telemetry::{PipelineConfig, UploadBatch};
use project_tests::event;

#[derive(Parser, Debug)]
#[clap(about = "Send a probe batch to a telemetry collector")]
struct Args {
    /// Collector base URL.
    #[clap(long, default_value_t = PipelineConfig::default().collector_url)]
    collector_url: String,

    /// Namespace path segment.
    #[clap(long, default_value = "rrweb")]
    namespace: String,

    /// Site host to tag the batch with.
    #[clap(long, default_value = "probe.localhost")]
    site_host: String,

    /// Client id to tag the batch with.
    #[clap(long, default_value = "probe-client")]
    client_id: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply()?;

    let args = Args::parse();
    let client = CollectorClient::new(&args.collector_url, &args.namespace, Duration::from_secs(10))?;
    let url = client.record_url(&args.site_host, &args.client_id)?;

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_millis() as i64;
    let batch = UploadBatch {
        client_id: args.client_id,
        site_host: args.site_host,
        tick: 1,
        records: vec![event(now)],
    };

    println!("[*] POST {}", url);
    match client.post_batch(&batch).await {
        Ok(status) => println!("[SUCCESS] Collector answered {}", status),
        Err(e) => {
            eprintln!("[ERROR] Upload failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
