//! Standalone runner binary for the Civitas simulation.
//!
//! # Startup Sequence
//!
//! 1. Resolve the config path (`CIVITAS_CONFIG` or `civitas-config.yaml`)
//! 2. Load and validate the configuration
//! 3. Initialize structured logging from `RUST_LOG` or `logging.level`
//! 4. Run the simulation, forwarding every civilization event to `tracing`
//! 5. Log the result

mod error;

use anyhow::Context;
use civitas_core::config::{LoggingConfig, SimulationConfig};
use civitas_core::runner::{self, TickCallback};
use civitas_society::{TickSummary, TracingSink};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Ticks between progress lines at `INFO`.
const PROGRESS_INTERVAL: u64 = 100;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or is invalid.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = SimulationConfig::resolve_path();
    let config = SimulationConfig::load_or_default(&path)
        .map_err(EngineError::from)
        .with_context(|| format!("loading {}", path.display()))?;
    config.validate().map_err(EngineError::from)?;

    init_logging(&config.logging)?;
    info!(
        path = %path.display(),
        world_name = %config.world.name,
        seed = config.world.seed,
        max_ticks = config.world.max_ticks,
        tick_interval_ms = config.world.tick_interval_ms,
        "Configuration loaded"
    );

    let mut sink = TracingSink;
    let mut progress = ProgressLog;
    let result = runner::run_simulation(&config, &mut sink, &mut progress)
        .await
        .map_err(EngineError::from)?;

    info!(
        ticks_run = result.ticks_run,
        surviving_tribes = result.surviving_tribes,
        "civitas-engine finished"
    );
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| EngineError::Logging {
            message: format!("invalid log level {:?}: {e}", logging.level),
        })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| EngineError::Logging {
        message: format!("{e}"),
    })
}

/// Logs a one-line summary every [`PROGRESS_INTERVAL`] ticks.
struct ProgressLog;

impl TickCallback for ProgressLog {
    fn on_tick(&mut self, summary: &TickSummary) {
        if summary.tick.checked_rem(PROGRESS_INTERVAL) == Some(0) {
            info!(
                tick = summary.tick,
                tribes = summary.tribes,
                structures = summary.structures,
                active_trades = summary.active_trades,
                "Progress"
            );
        } else {
            debug!(
                tick = summary.tick,
                disbanded = summary.disbanded.len(),
                destroyed = summary.destroyed.len(),
                trade_transitions = summary.trades.len(),
                "Tick"
            );
        }
    }
}
