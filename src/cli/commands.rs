use crate::aggregator::{Aggregator, NodeNames};
use crate::cli::Commands;
use crate::config::AgentConfig;
use crate::events::EventChannel;
use crate::maps::Tables;
use crate::metrics::{ProcStatCpu, PrometheusExporter};
use crate::probe::{node, Probes, SyntheticLoad};
use crate::{EbtelError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            config,
            interval,
            node_name,
            synthetic,
        } => handle_run(config, interval, node_name, synthetic).await,
        Commands::Config { config } => handle_config(config),
    }
}

async fn handle_run(
    config_path: Option<PathBuf>,
    interval: Option<u64>,
    node_name: Option<String>,
    synthetic: bool,
) -> Result<()> {
    let mut config = AgentConfig::load(config_path.as_deref())?;
    if let Some(secs) = interval {
        config.interval_secs = secs;
    }
    if node_name.is_some() {
        config.node_name = node_name;
    }
    config.validate()?;

    let host = config.resolve_node_name();
    info!("Node name: {}", host);

    let tables = Arc::new(Tables::from_config(&config));
    let (publisher, receiver) = EventChannel::bounded(config.channel_capacity);
    let shutdown = CancellationToken::new();

    let load = if synthetic {
        let probes = Probes::new(
            Arc::clone(&tables),
            publisher,
            config.sampling,
            node::cpu_hash(config.node_slots),
        );
        Some(SyntheticLoad::spawn(
            probes,
            config.synthetic_producers,
            shutdown.clone(),
        ))
    } else {
        warn!("No instrumentation source attached, metrics will stay empty");
        drop(publisher);
        None
    };

    let cpu = Box::new(ProcStatCpu::with_path(config.proc_stat_path.clone()));
    let mut aggregator = Aggregator::new(tables, receiver, cpu, NodeNames::new(host), &config);

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    let token = shutdown.clone();
    tokio::task::spawn_blocking(move || {
        let mut exporter = PrometheusExporter::stdout();
        aggregator.run(&mut exporter, &token);
    })
    .await
    .map_err(|e| EbtelError::Task(e.to_string()))?;

    shutdown.cancel();
    if let Some(load) = load {
        let issued = tokio::task::spawn_blocking(move || load.join())
            .await
            .map_err(|e| EbtelError::Task(e.to_string()))?;
        info!("Synthetic producers issued {} callbacks", issued);
    }

    info!("Shutdown complete");
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>) -> Result<()> {
    let config = AgentConfig::load(config_path.as_deref())?;
    print!("{}", config.to_yaml()?);
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
