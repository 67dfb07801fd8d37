use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tamper_proxy::config::{ConfigStore, ConfigWatcher};
use tamper_proxy::intercept::{InterceptMode, Interceptor};
use tamper_proxy::proxy::{MetricsServer, ProxyServer};
use tamper_proxy::recording::RecordWriter;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tamper-proxy", version, about = "Intercepting HTTP reverse proxy")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8443, env = "TAMPER_PORT")]
    port: u16,

    /// Path to the YAML configuration file
    #[arg(short = 'f', long = "file", default_value = "tamper.yaml", env = "TAMPER_CONFIG")]
    file: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Record matched upstream responses instead of patching them
    #[arg(long)]
    record: bool,

    /// Directory relative recording file names are written into
    #[arg(long, default_value = ".")]
    record_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "tamper_proxy=debug"
    } else {
        "tamper_proxy=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("tamper-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(
        ConfigStore::load(&args.file)
            .with_context(|| format!("Failed to load config from {}", args.file.display()))?,
    );

    // Dropping the watcher stops hot reload, so it lives as long as main.
    let _watcher = match ConfigWatcher::spawn(Arc::clone(&store)) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!("Config hot reload disabled: {}", e);
            None
        }
    };

    let metrics_port = store.snapshot().config.metrics.as_ref().map(|m| m.port);
    if let Some(port) = metrics_port {
        let server = MetricsServer::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server stopped: {}", e);
            }
        });
    }

    let mode = InterceptMode::from_record_flag(args.record);
    let interceptor = Interceptor::new(mode, store, RecordWriter::new(&args.record_dir));
    if mode == InterceptMode::Record {
        info!("Recording matched responses into {}", args.record_dir.display());
    }

    let server = ProxyServer::bind(SocketAddr::from(([0, 0, 0, 0], args.port)), interceptor).await?;
    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
