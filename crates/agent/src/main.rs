use agent::{start_server, LoopHeartbeats, NodeCollector, NvmlProvider, SystemProcessResolver};
use anyhow::Result;
use clap::Parser;
use log::{error, info, LevelFilter};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
struct Args {
    /// Port for the status endpoint
    #[arg(short = 'p', long, default_value = "7080")]
    port: u16,

    /// Device telemetry refresh interval in seconds
    #[arg(long, default_value = "4")]
    interval: u64,

    /// Process attribution refresh interval in seconds
    #[arg(long, default_value = "10")]
    process_interval: u64,

    /// Shared secret required by the status endpoint
    #[arg(long, default_value = "8888")]
    password: String,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Sample once, print the node status as JSON and exit without serving
    #[arg(long)]
    debug: bool,
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

    let provider = Arc::new(NvmlProvider::new().unwrap_or_else(|err| {
        error!("Failed to initialize GPU telemetry: {err}");
        std::process::exit(1);
    }));
    let resolver = Arc::new(SystemProcessResolver::new());
    let heartbeats = Arc::new(LoopHeartbeats::new());
    let collector = Arc::new(NodeCollector::new(
        provider,
        resolver,
        Duration::from_secs(args.interval),
        Duration::from_secs(args.process_interval),
        heartbeats.clone(),
    ));

    if args.debug {
        let status = collector.sample_once().await?;
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let cancellation_token = CancellationToken::new();
    let mut tasks: JoinSet<()> = JoinSet::new();

    let device_collector = collector.clone();
    let device_token = cancellation_token.clone();
    tasks.spawn(async move {
        device_collector.run_device_loop(device_token).await;
    });

    let attribution_collector = collector.clone();
    let attribution_token = cancellation_token.clone();
    tasks.spawn(async move {
        attribution_collector
            .run_attribution_loop(attribution_token)
            .await;
    });

    tokio::select! {
        res = start_server("0.0.0.0", args.port, collector.clone(), args.password, heartbeats.clone()) => {
            if let Err(e) = res {
                error!("Server error: {e}");
            }
        }
        Some(_) = tasks.join_next() => {
            error!("A refresh loop exited unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    cancellation_token.cancel();
    tasks.shutdown().await;
    Ok(())
}
