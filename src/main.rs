use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use wikiwatch::{
    config::AppConfig,
    persistence::{FileAlertSink, FileSnapshotPublisher},
    providers::SseStreamSource,
    supervisor::Supervisor,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing app.yaml.
    #[arg(long)]
    config_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();

    tracing::debug!("Loading application configuration...");
    let config = AppConfig::new(cli.config_dir.as_deref())?;
    tracing::debug!(stream_url = %config.stream_url, watchlist = ?config.watchlist, "Configuration loaded.");

    std::fs::create_dir_all(&config.output_dir)?;

    let stream_source = Arc::new(SseStreamSource::new(
        config.stream_url.clone(),
        config.stream_retry.connect_timeout,
    )?);
    let snapshot_publisher = Arc::new(FileSnapshotPublisher::new(
        config.metrics_csv_path(),
        config.snapshot_json_path(),
    ));
    let alert_sink = Arc::new(FileAlertSink::open(config.alert_log_path())?);

    let supervisor = Supervisor::builder()
        .config(config)
        .stream_source(stream_source)
        .snapshot_publisher(snapshot_publisher)
        .alert_sink(alert_sink)
        .build()?;

    tracing::info!("Supervisor initialized, starting stream ingestion...");

    supervisor.run().await?;

    Ok(())
}
