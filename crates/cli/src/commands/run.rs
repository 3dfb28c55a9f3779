//! `run` command implementation.

use config_loader::ConfigLoader;
use contracts::FeedBlueprint;
use factory::{ComponentRegistry, ResolveOptions};
use observability::FeedSummary;
use tracing::{error, info, warn};

use super::{load_blueprint, FeedPlan};
use crate::cli::RunArgs;
use crate::error::Result;

/// Execute the `run` command
pub async fn run_feed(args: &RunArgs) -> Result<()> {
    let mut blueprint = load_blueprint(args.config.as_deref())?;
    apply_overrides(&mut blueprint, args)?;

    info!(
        sensors = blueprint.sensors.len(),
        sinks = blueprint.sinks.len(),
        plant_control = blueprint.plant_control.is_some(),
        period = ?blueprint.feed.sensor_period(),
        "configuration loaded"
    );

    let registry = ComponentRegistry::with_builtins();

    // Dry run: resolve without touching hardware outputs, then exit
    if args.dry_run {
        let options = ResolveOptions {
            simulate_outputs: true,
        };
        let resolved = registry.resolve_with(&blueprint, options)?;
        info!("dry run, configuration is usable, exiting");
        FeedPlan::from_resolved(&resolved).print();
        return Ok(());
    }

    let mut controller = registry.resolve(&blueprint)?.into_controller();

    info!("starting feed, press Ctrl+C to stop");
    let served = controller.serve(shutdown_signal()).await;

    let summary = FeedSummary::from_controller(&controller);
    println!("{summary}");
    if summary.sink_failures() > 0 {
        warn!(failures = summary.sink_failures(), "some readings were not processed");
    }

    served?;
    info!("sensor feed finished");
    Ok(())
}

/// Apply command line timing overrides and re-validate
fn apply_overrides(blueprint: &mut FeedBlueprint, args: &RunArgs) -> Result<()> {
    if let Some(secs) = args.sensor_period {
        info!(secs, "overriding sensor period from CLI");
        blueprint.feed.sensor_period_secs = secs;
    }
    if let Some(secs) = args.poll_wait {
        info!(secs, "overriding poll wait from CLI");
        blueprint.feed.poll_wait_secs = secs;
    }
    ConfigLoader::validate(blueprint)?;
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves; the other one still
/// works.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("received shutdown signal, stopping feed");
}
