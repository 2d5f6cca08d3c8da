//! Structures: blueprints, per-tick decay and production, and repair.
//!
//! - [`blueprint`] returns the fixed stats, construction cost, and tech tier
//!   of each [`StructureType`].
//! - [`Structure::update`] applies natural decay and the type-specific effect
//!   (farm yield, cache spoilage, trap catches) of an active structure.
//! - [`Structure::repair`] lets a qualifying entity trade energy for health.
//!
//! A structure deactivates when its health reaches zero and earns nothing
//! afterwards. Registries must drop a structure once it is both inactive and
//! at or below zero health, and keep an inactive structure with positive
//! health around for repair.

use std::collections::BTreeMap;

use rand::Rng;
use serde::Serialize;

use civitas_types::{EntityId, Position, Resource, ResourceMap, StructureId, StructureType, TribeId};

use crate::entity::{EntityRegistry, traits};
use crate::error::RepairError;
use crate::rules::StructureRules;

/// Flat registry of structures keyed by ID.
pub type StructureRegistry = BTreeMap<StructureId, Structure>;

// ---------------------------------------------------------------------------
// Blueprints
// ---------------------------------------------------------------------------

/// Static properties of a structure type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blueprint {
    /// Health of a freshly built structure.
    pub max_health: f64,
    /// Upper bound for stored production.
    pub capacity: f64,
    /// Food paid by the owning tribe every tick.
    pub maintenance_cost: f64,
    /// Minimum tribe tech level able to build it.
    pub tier: u32,
    /// Resources consumed by construction.
    pub cost: &'static [(Resource, f64)],
}

/// Return the canonical blueprint for a given [`StructureType`].
pub const fn blueprint(structure_type: StructureType) -> Blueprint {
    const fn stats(
        max_health: f64,
        capacity: f64,
        maintenance_cost: f64,
        tier: u32,
        cost: &'static [(Resource, f64)],
    ) -> Blueprint {
        Blueprint {
            max_health,
            capacity,
            maintenance_cost,
            tier,
            cost,
        }
    }

    match structure_type {
        // ---- Tier 1 ----
        StructureType::Nest => stats(150.0, 20.0, 0.5, 1, &[(Resource::Wood, 20.0)]),
        StructureType::Cache => stats(
            80.0,
            100.0,
            0.3,
            1,
            &[(Resource::Wood, 15.0), (Resource::Stone, 5.0)],
        ),

        // ---- Tier 2 ----
        StructureType::Barrier => stats(
            200.0,
            0.0,
            0.2,
            2,
            &[(Resource::Stone, 30.0), (Resource::Wood, 10.0)],
        ),
        StructureType::Trap => stats(100.0, 50.0, 1.0, 2, &[(Resource::Wood, 25.0)]),

        // ---- Tier 3 ----
        StructureType::Farm => stats(
            60.0,
            30.0,
            2.0,
            3,
            &[(Resource::Wood, 10.0), (Resource::Food, 20.0)],
        ),
        StructureType::Well => stats(100.0, 50.0, 1.0, 3, &[(Resource::Stone, 40.0)]),

        // ---- Tier 4 ----
        StructureType::Tower => stats(
            100.0,
            50.0,
            1.0,
            4,
            &[(Resource::Stone, 50.0), (Resource::Wood, 30.0)],
        ),
        StructureType::Market => stats(
            120.0,
            200.0,
            1.5,
            4,
            &[(Resource::Wood, 60.0), (Resource::Stone, 40.0)],
        ),
    }
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

/// A built installation owned by a tribe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Structure {
    /// Unique structure identifier.
    pub id: StructureId,
    /// The type of structure.
    pub structure_type: StructureType,
    /// Where it stands.
    pub position: Position,
    /// Entity that built it. May no longer exist.
    pub builder: EntityId,
    /// Owning tribe. May have disbanded since.
    pub tribe: TribeId,
    /// Current health; may dip below zero on the tick it collapses.
    pub health: f64,
    /// Health ceiling for repairs.
    pub max_health: f64,
    /// Stored production waiting to be collected.
    pub resources: ResourceMap,
    /// Upper bound on stored farm output.
    pub capacity: f64,
    /// Whether the structure still decays and produces.
    pub active: bool,
    /// Food the owning tribe pays each tick.
    pub maintenance_cost: f64,
    /// Tick when construction finished.
    pub created_at_tick: u64,
}

impl Structure {
    /// Instantiate a structure at full health from its blueprint.
    pub fn new(
        id: StructureId,
        structure_type: StructureType,
        position: Position,
        builder: EntityId,
        tribe: TribeId,
        created_at_tick: u64,
    ) -> Self {
        let bp = blueprint(structure_type);
        Self {
            id,
            structure_type,
            position,
            builder,
            tribe,
            health: bp.max_health,
            max_health: bp.max_health,
            resources: BTreeMap::new(),
            capacity: bp.capacity,
            active: true,
            maintenance_cost: bp.maintenance_cost,
            created_at_tick,
        }
    }

    /// Whether a registry must drop this structure permanently.
    pub const fn is_destroyed(&self) -> bool {
        !self.active && self.health <= 0.0
    }

    /// Stored amount of one resource.
    pub fn stored(&self, resource: Resource) -> f64 {
        self.resources.get(&resource).copied().unwrap_or(0.0)
    }

    /// Advance the structure by one tick.
    ///
    /// Inactive structures are untouched. Active ones lose
    /// `decay_per_tick` health, then apply their type effect:
    ///
    /// - **Farm**: above `farm_min_health_ratio` of max health, stores
    ///   `farm_base_yield + U(0, farm_yield_spread)` food, capped at capacity.
    /// - **Cache**: stored food shrinks to `cache_retention` of itself.
    /// - **Trap**: with `trap_chance`, stores
    ///   `trap_base_yield + U(0, trap_yield_spread)` food.
    ///
    /// Returns `true` if the structure deactivated during this call.
    pub fn update(&mut self, rules: &StructureRules, rng: &mut impl Rng) -> bool {
        if !self.active {
            return false;
        }

        self.health -= rules.decay_per_tick;

        match self.structure_type {
            StructureType::Farm => {
                if self.health > rules.farm_min_health_ratio * self.max_health {
                    let harvest = rng
                        .random::<f64>()
                        .mul_add(rules.farm_yield_spread, rules.farm_base_yield);
                    let food = self.resources.entry(Resource::Food).or_insert(0.0);
                    *food = (*food + harvest).min(self.capacity);
                }
            }
            StructureType::Cache => {
                if let Some(food) = self.resources.get_mut(&Resource::Food) {
                    *food *= rules.cache_retention;
                }
            }
            StructureType::Trap => {
                if rng.random::<f64>() < rules.trap_chance {
                    let catch = rng
                        .random::<f64>()
                        .mul_add(rules.trap_yield_spread, rules.trap_base_yield);
                    *self.resources.entry(Resource::Food).or_insert(0.0) += catch;
                }
            }
            StructureType::Nest
            | StructureType::Barrier
            | StructureType::Well
            | StructureType::Tower
            | StructureType::Market => {}
        }

        if self.health <= 0.0 {
            self.active = false;
            return true;
        }
        false
    }

    /// Restore `amount` health at a cost of `amount * repair_energy_per_point`
    /// energy to `actor`.
    ///
    /// Refused without touching the actor or the structure if the actor is
    /// dead or unknown, below `repair_min_intelligence`, or short on energy.
    /// Health never exceeds `max_health`. Returns the health actually gained.
    pub fn repair(
        &mut self,
        entities: &mut dyn EntityRegistry,
        actor: EntityId,
        amount: f64,
        rules: &StructureRules,
    ) -> Result<f64, RepairError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(RepairError::InvalidAmount(amount));
        }
        if !entities.is_alive(actor) {
            return Err(RepairError::ActorUnavailable(actor));
        }

        let intelligence = entities
            .trait_value(actor, traits::INTELLIGENCE)
            .ok_or(RepairError::ActorUnavailable(actor))?;
        if intelligence < rules.repair_min_intelligence {
            return Err(RepairError::Unqualified {
                actor,
                intelligence,
                required: rules.repair_min_intelligence,
            });
        }

        let energy = entities
            .energy(actor)
            .ok_or(RepairError::ActorUnavailable(actor))?;
        let cost = amount * rules.repair_energy_per_point;
        if energy < cost {
            return Err(RepairError::InsufficientEnergy {
                actor,
                needed: cost,
                available: energy,
            });
        }

        if !entities.set_energy(actor, energy - cost) {
            return Err(RepairError::ActorUnavailable(actor));
        }
        let before = self.health;
        self.health = (self.health + amount).min(self.max_health);
        Ok(self.health - before)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
