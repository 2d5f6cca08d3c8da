//! The entity registry contract consumed by the civilization layer.
//!
//! Entities (traits, genetics, energy, lifecycle) are owned by the outer
//! simulation. This layer only holds [`EntityId`]s and resolves them through
//! an [`EntityRegistry`] on every access, so a cached ID never outlives the
//! entity it names.
//!
//! [`EntityTable`] is a plain in-memory registry used by the engine's
//! simulated population and by tests.

use std::collections::BTreeMap;

use civitas_types::{EntityId, Position};

/// Trait names read by the civilization layer.
pub mod traits {
    /// Drives leadership, research, and the innovation culture channel.
    pub const INTELLIGENCE: &str = "intelligence";
    /// Drives leadership and the cooperation culture channel.
    pub const COOPERATION: &str = "cooperation";
    /// Feeds the aggression culture channel.
    pub const AGGRESSION: &str = "aggression";
}

/// Value reported by [`EntityTable`] for a trait that was never set.
pub const DEFAULT_TRAIT_VALUE: f64 = 0.5;

/// Lookup capability over the outer simulation's entities.
///
/// Every accessor returns `None` (or `false`) for unknown IDs so callers can
/// treat vanished entities as absent rather than failing.
pub trait EntityRegistry {
    /// Whether the entity exists and is alive.
    fn is_alive(&self, id: EntityId) -> bool;

    /// Current value of a named trait.
    fn trait_value(&self, id: EntityId, name: &str) -> Option<f64>;

    /// Overwrite a named trait. Returns `false` for unknown entities.
    fn set_trait(&mut self, id: EntityId, name: &str, value: f64) -> bool;

    /// Current energy.
    fn energy(&self, id: EntityId) -> Option<f64>;

    /// Overwrite energy. Returns `false` for unknown entities.
    fn set_energy(&mut self, id: EntityId, energy: f64) -> bool;

    /// Current grid position.
    fn position(&self, id: EntityId) -> Option<Position>;
}

/// Read a trait, treating unknown entities as `0.0`.
pub fn trait_or_zero(registry: &dyn EntityRegistry, id: EntityId, name: &str) -> f64 {
    registry.trait_value(id, name).unwrap_or(0.0)
}

/// Weighted leadership score used for founding and succession.
pub fn leadership_score(
    registry: &dyn EntityRegistry,
    id: EntityId,
    intelligence_weight: f64,
    cooperation_weight: f64,
) -> f64 {
    intelligence_weight.mul_add(
        trait_or_zero(registry, id, traits::INTELLIGENCE),
        cooperation_weight * trait_or_zero(registry, id, traits::COOPERATION),
    )
}

// ---------------------------------------------------------------------------
// EntityTable
// ---------------------------------------------------------------------------

/// Mutable state of one entity in an [`EntityTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// Grid position.
    pub position: Position,
    /// Current energy.
    pub energy: f64,
    /// Whether the entity is alive.
    pub alive: bool,
    /// Named traits; unset traits read as [`DEFAULT_TRAIT_VALUE`].
    pub traits: BTreeMap<String, f64>,
}

impl EntityRecord {
    /// A living entity with no explicit traits.
    pub const fn new(position: Position, energy: f64) -> Self {
        Self {
            position,
            energy,
            alive: true,
            traits: BTreeMap::new(),
        }
    }

    /// Builder-style trait assignment.
    #[must_use]
    pub fn with_trait(mut self, name: &str, value: f64) -> Self {
        self.traits.insert(name.to_owned(), value);
        self
    }
}

/// In-memory [`EntityRegistry`] keyed by sequential IDs.
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    entities: BTreeMap<EntityId, EntityRecord>,
    next_id: EntityId,
}

impl EntityTable {
    /// Create an empty table. The first inserted entity gets ID 1.
    pub const fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: EntityId(1),
        }
    }

    /// Insert a record and return its freshly assigned ID.
    pub fn insert(&mut self, record: EntityRecord) -> EntityId {
        let id = self.next_id;
        self.next_id = id.next();
        self.entities.insert(id, record);
        id
    }

    /// Look up a record.
    pub fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.get(&id)
    }

    /// Look up a record mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        self.entities.get_mut(&id)
    }

    /// Mark an entity dead. Returns `false` if it was unknown or already dead.
    pub fn kill(&mut self, id: EntityId) -> bool {
        match self.entities.get_mut(&id) {
            Some(record) if record.alive => {
                record.alive = false;
                true
            }
            _ => false,
        }
    }

    /// All IDs in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// IDs of living entities in ascending order.
    pub fn alive_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .iter()
            .filter(|(_, record)| record.alive)
            .map(|(id, _)| *id)
    }

    /// Number of living entities.
    pub fn alive_count(&self) -> usize {
        self.entities.values().filter(|record| record.alive).count()
    }

    /// Total number of entities, dead or alive.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the table holds no entities at all.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntityRegistry for EntityTable {
    fn is_alive(&self, id: EntityId) -> bool {
        self.entities.get(&id).is_some_and(|record| record.alive)
    }

    fn trait_value(&self, id: EntityId, name: &str) -> Option<f64> {
        self.entities
            .get(&id)
            .map(|record| record.traits.get(name).copied().unwrap_or(DEFAULT_TRAIT_VALUE))
    }

    fn set_trait(&mut self, id: EntityId, name: &str, value: f64) -> bool {
        self.entities.get_mut(&id).is_some_and(|record| {
            record.traits.insert(name.to_owned(), value);
            true
        })
    }

    fn energy(&self, id: EntityId) -> Option<f64> {
        self.entities.get(&id).map(|record| record.energy)
    }

    fn set_energy(&mut self, id: EntityId, energy: f64) -> bool {
        self.entities.get_mut(&id).is_some_and(|record| {
            record.energy = energy;
            true
        })
    }

    fn position(&self, id: EntityId) -> Option<Position> {
        self.entities.get(&id).map(|record| record.position)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unset_traits_read_as_default() {
        let mut table = EntityTable::new();
        let id = table.insert(EntityRecord::new(Position::new(0, 0), 10.0));
        assert_eq!(table.trait_value(id, traits::COOPERATION), Some(DEFAULT_TRAIT_VALUE));
        assert_eq!(table.trait_value(EntityId(99), traits::COOPERATION), None);
    }

    #[test]
    fn ids_are_sequential_from_one() {
        let mut table = EntityTable::new();
        let a = table.insert(EntityRecord::new(Position::default(), 0.0));
        let b = table.insert(EntityRecord::new(Position::default(), 0.0));
        assert_eq!(a, EntityId(1));
        assert_eq!(b, EntityId(2));
    }

    #[test]
    fn kill_only_reports_transitions() {
        let mut table = EntityTable::new();
        let id = table.insert(EntityRecord::new(Position::default(), 0.0));
        assert!(table.kill(id));
        assert!(!table.kill(id));
        assert!(!table.is_alive(id));
        assert_eq!(table.alive_count(), 0);
    }

    #[test]
    fn leadership_score_weights_traits() {
        let mut table = EntityTable::new();
        let id = table.insert(
            EntityRecord::new(Position::default(), 0.0)
                .with_trait(traits::INTELLIGENCE, 1.0)
                .with_trait(traits::COOPERATION, 0.5),
        );
        let score = leadership_score(&table, id, 0.6, 0.4);
        assert!((score - 0.8).abs() < 1e-12);
    }

    #[test]
    fn set_energy_on_unknown_entity_fails() {
        let mut table = EntityTable::new();
        assert!(!table.set_energy(EntityId(5), 1.0));
        assert!(!table.set_trait(EntityId(5), traits::AGGRESSION, 1.0));
    }
}
