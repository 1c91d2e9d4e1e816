use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fleet_monitor::{
    actors::fleet::FleetHandle,
    config::{Config, ProbeMode, ResolvedConfig, read_config_file},
    monitors::{
        metrics,
        probe::{HttpProber, Prober, TcpProber},
    },
    storage::open_store,
};
use tracing::{debug, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(about = "Probe a fixed set of local ports and serve their status")]
struct Args {
    /// Config file (JSON). Built-in defaults are used when omitted.
    #[arg(short, long)]
    file: Option<String>,

    /// Log level for the monitor
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn init(level: LevelFilter) {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("fleet_monitor", level),
        ("fleet_hub", level),
        ("tower_http", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn build_prober(mode: ProbeMode) -> anyhow::Result<Arc<dyn Prober>> {
    Ok(match mode {
        ProbeMode::Tcp => Arc::new(TcpProber::new()),
        ProbeMode::Http => Arc::new(HttpProber::new().context("failed to build HTTP client")?),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init(args.log_level);
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => {
            debug!("no config file given, using defaults");
            Config::default()
        }
    };

    let ResolvedConfig {
        monitor,
        probe_mode,
        metrics: metrics_config,
        storage,
        api,
    } = config.resolve()?;

    info!(
        targets = monitor.targets.len(),
        timeout_ms = monitor.probe_timeout.as_millis() as u64,
        interval_secs = monitor.poll_interval.as_secs(),
        "starting fleet monitor"
    );

    let store = open_store(&storage).await?;
    let prober = build_prober(probe_mode)?;
    let metrics_source = metrics::from_config(&metrics_config);

    let fleet = FleetHandle::spawn(monitor, prober, metrics_source, store.clone());

    #[cfg(feature = "api")]
    {
        use fleet_monitor::api::{ApiConfig, ApiState, spawn_api_server};

        let api_config = ApiConfig::from(&api);
        let state = ApiState::new(store.clone(), fleet.clone());
        spawn_api_server(api_config, state).await?;
    }
    #[cfg(not(feature = "api"))]
    {
        let _ = api;
        warn!("built without the api feature, status is not served");
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutting down");
    if let Err(e) = fleet.shutdown().await {
        warn!("fleet monitor already stopped: {e:#}");
    }
    store.close().await?;

    Ok(())
}
