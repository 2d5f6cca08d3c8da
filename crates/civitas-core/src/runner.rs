//! Bounded simulation loop.
//!
//! [`run_simulation`] drives a standalone Civitas run end to end:
//!
//! 1. Validate the configuration and seed one [`StdRng`] from `world.seed`.
//! 2. Spawn the [`Population`].
//! 3. Form one tribe per consecutive group of `population.tribe_size`
//!    entities and grant each its starting resources.
//! 4. Each tick: roll mortality, advance the civilization, then let every
//!    tribe's leader build the cheapest structure the tribe can afford.
//! 5. Stop after `world.max_ticks`, or earlier once no tribe remains.
//!
//! Every random draw comes from the single seeded RNG, so two runs with the
//! same configuration produce the same event stream.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use civitas_society::{
    CivilizationSystem, CountingSink, EntityRegistry, EventSink, TickSummary, blueprint,
};
use civitas_types::{EntityId, StructureType, TribeId};

use crate::config::{ConfigError, SimulationConfig};
use crate::population::Population;

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The configuration failed validation.
    #[error("invalid configuration: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },
}

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEndReason {
    /// `world.max_ticks` ticks were executed.
    MaxTicksReached,
    /// Every tribe disbanded.
    NoTribesRemain,
}

/// Result of the simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// Total number of ticks executed.
    pub ticks_run: u64,
    /// Tribes alive at the end.
    pub surviving_tribes: usize,
    /// Structures registered at the end.
    pub structures: usize,
    /// Entities alive at the end.
    pub entities_alive: usize,
    /// Events emitted over the whole run.
    pub events: u64,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
}

/// Callback invoked after each tick completes.
pub trait TickCallback {
    /// Called after a tick completes.
    fn on_tick(&mut self, summary: &TickSummary);
}

/// A no-op tick callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary) {}
}

/// Collects every tick summary.
impl TickCallback for Vec<TickSummary> {
    fn on_tick(&mut self, summary: &TickSummary) {
        self.push(summary.clone());
    }
}

/// Run a complete standalone simulation.
///
/// Events go to `sink`; `callback` sees every tick summary. When
/// `world.tick_interval_ms` is non-zero the loop sleeps that long between
/// ticks.
///
/// # Errors
///
/// Returns [`RunnerError::Config`] if the configuration fails
/// [`SimulationConfig::validate`]. Nothing runs in that case.
pub async fn run_simulation<S: EventSink>(
    config: &SimulationConfig,
    sink: &mut S,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.world.seed);
    let mut population = Population::spawn(&config.population, &mut rng);
    let mut civ = CivilizationSystem::with_sink(config.rules.clone(), CountingSink::new(sink));
    form_initial_tribes(config, &population, &mut civ);

    info!(
        world_name = %config.world.name,
        seed = config.world.seed,
        max_ticks = config.world.max_ticks,
        tribes = civ.tribes().len(),
        "Simulation starting"
    );

    let mut ticks_run: u64 = 0;
    let mut final_summary = None;
    let mut end_reason = SimulationEndReason::MaxTicksReached;

    for tick in 1..=config.world.max_ticks {
        population.step(tick, &mut rng);
        let summary = civ.update(tick, &population, &mut rng);
        build_phase(tick, &population, &mut civ);

        ticks_run = ticks_run.saturating_add(1);
        callback.on_tick(&summary);
        final_summary = Some(summary);

        if civ.tribes().is_empty() {
            info!(tick, "No tribes remain");
            end_reason = SimulationEndReason::NoTribesRemain;
            break;
        }

        if config.world.tick_interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.world.tick_interval_ms)).await;
        }
    }

    let result = SimulationResult {
        end_reason,
        ticks_run,
        surviving_tribes: civ.tribes().len(),
        structures: civ.structures().len(),
        entities_alive: population.alive_count(),
        events: civ.sink().total(),
        final_summary,
    };
    log_simulation_end(&result);
    Ok(result)
}

/// Group living entities into tribes of `tribe_size` and endow them.
///
/// A group whose best member scores too low to found a tribe is skipped.
fn form_initial_tribes<S: EventSink>(
    config: &SimulationConfig,
    population: &Population,
    civ: &mut CivilizationSystem<S>,
) {
    let size = usize::try_from(config.population.tribe_size)
        .unwrap_or(usize::MAX)
        .max(1);
    for (index, group) in population.alive_ids().chunks(size).enumerate() {
        let name = format!("Tribe {}", index.saturating_add(1));
        match civ.form_tribe(group, &name, 0, population) {
            Ok(id) => {
                if let Some(tribe) = civ.tribe_mut(id) {
                    for (&resource, &amount) in &config.population.starting_resources {
                        tribe.add_resource(resource, amount);
                    }
                }
            }
            Err(err) => warn!(tribe_name = %name, error = %err, "Initial tribe not formed"),
        }
    }
}

/// Let each tribe's living leader build the cheapest affordable structure.
fn build_phase<S: EventSink>(
    tick: u64,
    population: &Population,
    civ: &mut CivilizationSystem<S>,
) {
    let plans: Vec<(TribeId, StructureType, EntityId)> = civ
        .tribes()
        .values()
        .filter_map(|tribe| {
            let leader = tribe.living_leader(population)?;
            let choice = cheapest_affordable(|kind| tribe.can_build(kind))?;
            Some((tribe.id(), choice, leader))
        })
        .collect();

    for (tribe_id, structure_type, leader) in plans {
        let position = population.position(leader).unwrap_or_default();
        if let Err(err) = civ.build_structure(tribe_id, structure_type, position, leader, tick) {
            warn!(tick, tribe_id = %tribe_id, error = %err, "Planned build failed");
        }
    }
}

/// The affordable structure type with the lowest total resource cost.
/// Ties go to the earlier type in [`StructureType::ALL`].
fn cheapest_affordable(can_build: impl Fn(StructureType) -> bool) -> Option<StructureType> {
    let mut best: Option<(StructureType, f64)> = None;
    for kind in StructureType::ALL {
        if !can_build(kind) {
            continue;
        }
        let cost: f64 = blueprint(kind).cost.iter().map(|(_, amount)| amount).sum();
        if best.is_none_or(|(_, lowest)| cost < lowest) {
            best = Some((kind, cost));
        }
    }
    best.map(|(kind, _)| kind)
}

/// Log the outcome of a run.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        ticks_run = result.ticks_run,
        surviving_tribes = result.surviving_tribes,
        structures = result.structures,
        entities_alive = result.entities_alive,
        events = result.events,
        "Simulation ended"
    );
}
