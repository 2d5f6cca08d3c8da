//! A simulated entity population for standalone runs.
//!
//! The civilization layer only sees entities through the
//! [`EntityRegistry`] contract. When Civitas runs on its own, this module
//! supplies that contract: entities are scattered over a square grid with
//! uniformly drawn traits and die off at a fixed per-tick rate.

use rand::Rng;

use civitas_society::{EntityRecord, EntityRegistry, EntityTable, traits};
use civitas_types::{EntityId, Position};

use crate::config::PopulationConfig;

/// Living and dead entities for a standalone simulation.
#[derive(Debug, Clone)]
pub struct Population {
    table: EntityTable,
    death_chance: f64,
}

impl Population {
    /// Spawn `config.initial_count` entities.
    ///
    /// Each entity gets a random grid position and intelligence,
    /// cooperation, and aggression drawn uniformly from `[0, 1)`.
    pub fn spawn(config: &PopulationConfig, rng: &mut impl Rng) -> Self {
        let side = i32::try_from(config.grid_size).unwrap_or(i32::MAX).max(1);
        let mut table = EntityTable::new();
        for _ in 0..config.initial_count {
            let position = Position::new(rng.random_range(0..side), rng.random_range(0..side));
            let mut record = EntityRecord::new(position, config.starting_energy);
            for name in [traits::INTELLIGENCE, traits::COOPERATION, traits::AGGRESSION] {
                record = record.with_trait(name, rng.random::<f64>());
            }
            table.insert(record);
        }
        tracing::info!(
            count = config.initial_count,
            grid_size = config.grid_size,
            "Population spawned"
        );
        Self {
            table,
            death_chance: config.death_chance,
        }
    }

    /// Wrap an existing table, e.g. a hand-built test scenario.
    pub const fn from_table(table: EntityTable, death_chance: f64) -> Self {
        Self {
            table,
            death_chance,
        }
    }

    /// The underlying table.
    pub const fn table(&self) -> &EntityTable {
        &self.table
    }

    /// IDs of living entities, ascending.
    pub fn alive_ids(&self) -> Vec<EntityId> {
        self.table.alive_ids().collect()
    }

    /// Number of living entities.
    pub fn alive_count(&self) -> usize {
        self.table.alive_count()
    }

    /// Roll mortality for every living entity. Returns the entities that
    /// died, ascending.
    ///
    /// One roll is drawn per living entity, in ID order, so the RNG stream
    /// stays aligned across runs with the same seed.
    pub fn step(&mut self, tick: u64, rng: &mut impl Rng) -> Vec<EntityId> {
        let mut deaths = Vec::new();
        for id in self.alive_ids() {
            if rng.random::<f64>() < self.death_chance {
                self.table.kill(id);
                deaths.push(id);
            }
        }
        if !deaths.is_empty() {
            tracing::debug!(tick, deaths = deaths.len(), alive = self.alive_count(), "Entities died");
        }
        deaths
    }
}

impl EntityRegistry for Population {
    fn is_alive(&self, id: EntityId) -> bool {
        self.table.is_alive(id)
    }

    fn trait_value(&self, id: EntityId, name: &str) -> Option<f64> {
        self.table.trait_value(id, name)
    }

    fn set_trait(&mut self, id: EntityId, name: &str, value: f64) -> bool {
        self.table.set_trait(id, name, value)
    }

    fn energy(&self, id: EntityId) -> Option<f64> {
        self.table.energy(id)
    }

    fn set_energy(&mut self, id: EntityId, value: f64) -> bool {
        self.table.set_energy(id, value)
    }

    fn position(&self, id: EntityId) -> Option<Position> {
        self.table.position(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn config(count: u32, death_chance: f64) -> PopulationConfig {
        PopulationConfig {
            initial_count: count,
            death_chance,
            grid_size: 8,
            ..PopulationConfig::default()
        }
    }

    #[test]
    fn spawned_traits_and_positions_are_in_range() {
        let mut rng = SmallRng::seed_from_u64(9);
        let population = Population::spawn(&config(50, 0.0), &mut rng);

        assert_eq!(population.alive_count(), 50);
        for id in population.alive_ids() {
            for name in [traits::INTELLIGENCE, traits::COOPERATION, traits::AGGRESSION] {
                let value = population.trait_value(id, name).unwrap();
                assert!((0.0..1.0).contains(&value));
            }
            let position = population.position(id).unwrap();
            assert!((0..8).contains(&position.x) && (0..8).contains(&position.y));
            assert!((population.energy(id).unwrap() - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn certain_death_empties_population() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut population = Population::spawn(&config(10, 1.0), &mut rng);
        let deaths = population.step(1, &mut rng);
        assert_eq!(deaths.len(), 10);
        assert_eq!(population.alive_count(), 0);
        assert!(population.step(2, &mut rng).is_empty());
    }

    #[test]
    fn no_mortality_keeps_everyone() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut population = Population::spawn(&config(10, 0.0), &mut rng);
        for tick in 1..100 {
            assert!(population.step(tick, &mut rng).is_empty());
        }
    }

    #[test]
    fn set_trait_is_delegated() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut population = Population::spawn(&config(1, 0.0), &mut rng);
        let id = population.alive_ids()[0];
        assert!(population.set_trait(id, traits::INTELLIGENCE, 0.75));
        assert_eq!(population.trait_value(id, traits::INTELLIGENCE), Some(0.75));
    }
}
