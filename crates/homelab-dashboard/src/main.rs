use std::{collections::HashMap, sync::Arc};

use clap::Parser;
use tracing::{debug, error, info, warn};

use homelab_dashboard::{
    Result, commands,
    config::{Args, Command, Config, check_and_create_config},
    context::Context,
    grid::{CameraGrid, Roster},
    metrics::start_metrics_server,
    task, telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args<Config> = Args::parse();

    // Only prompt for config setup if no config file was provided via --config
    if args.config.is_none() {
        check_and_create_config()
            .await
            .inspect_err(|err| error!(err = ?err, "Error checking for (or creating) config"))?;
    }

    let config = args
        .get_config()
        .inspect_err(|err| error!(err = ?err, "Error getting config"))?;

    if args.validate {
        println!("Configuration is valid");
        return Ok(());
    }

    let maybe_loki_task = telemetry::init(&config);
    debug!(config = ?config, "Parsed config successfully");

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let context = Arc::new(Context::new(config)?);

    match args.command() {
        Command::List => commands::list(&context).await,
        Command::Hls { action } => commands::hls(&context, action).await,
        Command::Watch => watch(context, maybe_loki_task).await,
    }
}

async fn watch(
    context: Arc<Context>,
    maybe_loki_task: Option<tokio::task::JoinHandle<()>>,
) -> Result<()> {
    let mut grid = CameraGrid::new(context.metrics.clone());
    commands::load_with_retry(&mut grid, &context.directory, commands::confirm_retry).await?;

    let targets = match grid.roster() {
        Roster::Ready(cameras) => context.render_targets(cameras).await,
        _ => HashMap::new(),
    };

    grid.mount(
        &context.config.stream,
        |_| context.decoder(),
        |camera| targets.get(&camera.id).cloned(),
    );

    let printer = task::GridPrinter::new(context.config.dashboard.refresh_interval);

    tokio::select! {
        res = printer.run(&grid) => {
            warn!("Grid Printer stopped: {:?}", res);
        }
        res = async {
            match &context.config.metrics {
                Some(metrics) => {
                    start_metrics_server(context.metrics.clone(), &metrics.address, metrics.port).await
                }
                None => std::future::pending().await,
            }
        } => {
            warn!("Metrics server stopped: {:?}", res);
        }
        res = async {
            if let Some(loki_task) = maybe_loki_task {
                loki_task.await
            } else {
                std::future::pending().await
            }
        } => {
            warn!("Loki task stopped: {:?}", res);
        }
        res = tokio::signal::ctrl_c() => {
            if let Err(err) = res {
                error!(err = ?err, "Failed to listen for shutdown signal");
            }
        }
    }

    info!("Stopping camera streams...");
    grid.unmount().await;
    print!("{}", grid.render());

    info!("Exiting...");
    Ok(())
}
