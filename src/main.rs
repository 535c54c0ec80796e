//! snapcast-mpris entry point

use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use snapcast_mpris::{
    AppError, Result,
    bridge::{self, BridgeHandle, BridgeState, ChangedProperties, Coordinator, Published},
    cli::{Cli, formatting::format_error},
    config::Config,
    services::{MprisEndpoint, SnapcastLink, TcpLink},
    tracing_config,
};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, instrument};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.print_config_schema {
        return match Config::json_schema() {
            Ok(schema) => {
                println!("{schema}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", format_error(&e.to_string()));
                ExitCode::FAILURE
            }
        };
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{}", format_error(&e.to_string()));
            e.exit_code()
        }
    }
}

#[instrument(skip_all)]
async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    tracing_config::init(&config.general)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting snapcast-mpris");

    let selector = config.snapcast.selector();
    let address = config.snapcast.address();
    let mut settings = config.bridge.coordinator_settings(address.clone());
    let link = Arc::new(TcpLink::new(config.snapcast.request_timeout()));

    let snapshot = tokio::select! {
        result = bridge::bootstrap(link.as_ref(), &address, &selector, &mut settings.backoff) => result?,
        () = shutdown_signal() => {
            info!("Interrupted before the first connection");
            return Ok(());
        }
    };

    let state = BridgeState::new(selector.clone(), snapshot);
    let (handle, inbox) = BridgeHandle::channel();
    let initial = Published {
        revision: state.revision(),
        projection: state.projection().clone(),
        changed: ChangedProperties::all(),
    };

    let endpoint_settings = config.mpris.endpoint_settings(selector.as_str());
    let endpoint = match MprisEndpoint::start(&endpoint_settings, initial, handle.clone()).await {
        Ok(endpoint) => Arc::new(endpoint),
        Err(e) => {
            link.disconnect().await;
            return Err(e.into());
        }
    };

    let coordinator = Coordinator::new(link, endpoint, (handle.clone(), inbox), settings, state);
    let mut task = tokio::spawn(coordinator.run());

    tokio::select! {
        joined = &mut task => {
            return joined.map_err(|e| AppError::Fault(e.to_string()));
        }
        () = shutdown_signal() => info!("Shutdown requested"),
    }

    handle.shutdown().await;
    task.await.map_err(|e| AppError::Fault(e.to_string()))?;
    info!("Stopped");
    Ok(())
}

async fn shutdown_signal() {
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            error!("Cannot listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}
