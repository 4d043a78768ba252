use aggregator::{load_hosts, start_server, ClusterStore, FetcherHeartbeats, NodeFetcher};
use anyhow::Result;
use clap::Parser;
use log::{error, info, LevelFilter};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
struct Args {
    /// Path to the newline-delimited list of hosts to poll
    #[arg(short = 'c', long)]
    hosts: String,

    /// Port for the cluster status endpoint
    #[arg(short = 'p', long, default_value = "7070")]
    port: u16,

    /// Port the node agents listen on
    #[arg(long, default_value = "7080")]
    node_port: u16,

    /// Seconds between polls of each host
    #[arg(long, default_value = "4")]
    fetch_interval: u64,

    /// Seconds after the last successful poll before a host counts as down
    #[arg(long, default_value = "60")]
    expire_timeout: u64,

    /// Shared secret expected by the node agents
    #[arg(long, default_value = "8888")]
    password: String,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = match args.log_level.as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let hosts = load_hosts(&args.hosts)?;
    info!("Polling {} hosts every {}s", hosts.len(), args.fetch_interval);

    let store = Arc::new(ClusterStore::new(hosts.clone()));
    let heartbeats = Arc::new(FetcherHeartbeats::new(&hosts));
    let expire_timeout = chrono::Duration::seconds(args.expire_timeout as i64);

    let cancellation_token = CancellationToken::new();
    let mut tasks: JoinSet<()> = JoinSet::new();
    for host in &hosts {
        let fetcher = NodeFetcher::new(
            host.clone(),
            args.node_port,
            args.password.clone(),
            Duration::from_secs(args.fetch_interval),
            store.clone(),
            heartbeats.clone(),
        )?;
        let fetcher_token = cancellation_token.clone();
        tasks.spawn(async move {
            fetcher.run(fetcher_token).await;
        });
    }

    tokio::select! {
        res = start_server("0.0.0.0", args.port, store.clone(), expire_timeout, heartbeats.clone()) => {
            if let Err(e) = res {
                error!("Server error: {e}");
            }
        }
        Some(_) = tasks.join_next() => {
            error!("A fetcher exited unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    cancellation_token.cancel();
    tasks.shutdown().await;
    Ok(())
}
