//! Tribes: membership, governance, culture, building, and per-tick upkeep.
//!
//! A tribe is a governed collection of entities. It owns a shared resource
//! pool, a list of structures, a tech level that gates which structures it
//! may build, and three culture channels maintained as running averages of
//! member traits at the moment each member joined.
//!
//! # Per-tick update
//!
//! [`Tribe::update`] runs, in order:
//!
//! 1. Drop dead members.
//! 2. Disband if nobody is left.
//! 3. Elect a new leader if the current one is missing or dead.
//! 4. Collect the stores of every owned structure into the pool.
//! 5. Roll for a tech advancement.
//! 6. Pay structure upkeep in food, damaging structures it cannot pay for.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use serde::Serialize;

use civitas_types::{
    CivEvent, CivEventKind, CultureTrait, EntityId, Position, Resource, ResourceMap, StructureId,
    StructureType, TribeId,
};

use crate::entity::{self, EntityRegistry, traits};
use crate::error::BuildError;
use crate::events::EventSink;
use crate::rules::TribeRules;
use crate::structure::{Structure, StructureRegistry, blueprint};

/// Source name attached to events raised by tribes.
const EVENT_SOURCE: &str = "tribe";

/// Outcome of a tribe's per-tick update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TribeStatus {
    /// The tribe still has members.
    Active,
    /// The last member died; the tribe must be removed.
    Disbanded,
}

/// A governed collection of entities.
#[derive(Debug, Clone, Serialize)]
pub struct Tribe {
    id: TribeId,
    name: String,
    members: Vec<EntityId>,
    leader: Option<EntityId>,
    structures: Vec<StructureId>,
    territory: BTreeSet<Position>,
    resources: ResourceMap,
    tech_level: u32,
    culture: BTreeMap<CultureTrait, f64>,
    allies: BTreeSet<TribeId>,
    enemies: BTreeSet<TribeId>,
    founded_at_tick: u64,
}

impl Tribe {
    /// Create an empty tribe at tech level 1 with neutral culture.
    pub fn new(id: TribeId, name: impl Into<String>, founded_at_tick: u64, rules: &TribeRules) -> Self {
        Self {
            id,
            name: name.into(),
            members: Vec::new(),
            leader: None,
            structures: Vec::new(),
            territory: BTreeSet::new(),
            resources: BTreeMap::new(),
            tech_level: 1,
            culture: CultureTrait::ALL
                .into_iter()
                .map(|channel| (channel, rules.initial_culture))
                .collect(),
            allies: BTreeSet::new(),
            enemies: BTreeSet::new(),
            founded_at_tick,
        }
    }

    /// Create a tribe whose first member and leader is `founder`.
    pub fn found(
        id: TribeId,
        name: impl Into<String>,
        founder: EntityId,
        founded_at_tick: u64,
        entities: &dyn EntityRegistry,
        rules: &TribeRules,
    ) -> Self {
        let mut tribe = Self::new(id, name, founded_at_tick, rules);
        tribe.add_member(founder, entities);
        tribe.leader = Some(founder);
        tribe
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Tribe identifier.
    pub const fn id(&self) -> TribeId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in joining order.
    pub fn members(&self) -> &[EntityId] {
        &self.members
    }

    /// Number of members.
    pub const fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Whether `entity` is a member.
    pub fn is_member(&self, entity: EntityId) -> bool {
        self.members.contains(&entity)
    }

    /// The leader recorded at the end of the last update.
    ///
    /// The entity may have died since; use [`Tribe::living_leader`] before
    /// acting on it.
    pub const fn leader(&self) -> Option<EntityId> {
        self.leader
    }

    /// The leader, only if it is still a living member.
    pub fn living_leader(&self, entities: &dyn EntityRegistry) -> Option<EntityId> {
        self.leader
            .filter(|leader| self.is_member(*leader) && entities.is_alive(*leader))
    }

    /// IDs of structures this tribe still maintains.
    pub fn structures(&self) -> &[StructureId] {
        &self.structures
    }

    /// Positions claimed by building.
    pub const fn territory(&self) -> &BTreeSet<Position> {
        &self.territory
    }

    /// The shared resource pool.
    pub const fn resources(&self) -> &ResourceMap {
        &self.resources
    }

    /// Amount held of one resource.
    pub fn resource(&self, resource: Resource) -> f64 {
        self.resources.get(&resource).copied().unwrap_or(0.0)
    }

    /// Current tech level (always at least 1).
    pub const fn tech_level(&self) -> u32 {
        self.tech_level
    }

    /// Current value of one culture channel.
    pub fn culture(&self, channel: CultureTrait) -> f64 {
        self.culture.get(&channel).copied().unwrap_or(0.0)
    }

    /// Allied tribes.
    pub const fn allies(&self) -> &BTreeSet<TribeId> {
        &self.allies
    }

    /// Enemy tribes.
    pub const fn enemies(&self) -> &BTreeSet<TribeId> {
        &self.enemies
    }

    /// Tick the tribe was founded.
    pub const fn founded_at_tick(&self) -> u64 {
        self.founded_at_tick
    }

    /// Mean intelligence of current members, `0.0` for an empty tribe.
    pub fn average_intelligence(&self, entities: &dyn EntityRegistry) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .members
            .iter()
            .map(|member| entity::trait_or_zero(entities, *member, traits::INTELLIGENCE))
            .sum();
        total / count_as_f64(self.members.len())
    }

    // -----------------------------------------------------------------------
    // Resources
    // -----------------------------------------------------------------------

    /// Add to the pool. Non-positive or non-finite amounts are ignored.
    pub fn add_resource(&mut self, resource: Resource, amount: f64) {
        if amount.is_finite() && amount > 0.0 {
            *self.resources.entry(resource).or_insert(0.0) += amount;
        }
    }

    /// Remove from the pool if enough is held. Returns whether it happened.
    pub fn remove_resource(&mut self, resource: Resource, amount: f64) -> bool {
        if !amount.is_finite() || amount < 0.0 || self.resource(resource) < amount {
            return false;
        }
        *self.resources.entry(resource).or_insert(0.0) -= amount;
        true
    }

    /// Whether the pool covers every amount in `bundle`.
    pub fn has_resources(&self, bundle: &ResourceMap) -> bool {
        bundle
            .iter()
            .all(|(resource, amount)| self.resource(*resource) >= *amount)
    }

    /// Set the tech level directly, e.g. when seeding a scenario.
    pub fn set_tech_level(&mut self, level: u32) {
        self.tech_level = level.max(1);
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Append `entity` and fold its traits into the culture averages.
    ///
    /// With `n` members after the append, each channel becomes
    /// `(old * (n - 1) + value) / n`. Values are read once, at insertion;
    /// later trait changes do not move the average. Returns `false` without
    /// changes if the entity is already a member.
    pub fn add_member(&mut self, entity: EntityId, entities: &dyn EntityRegistry) -> bool {
        if self.is_member(entity) {
            return false;
        }
        self.members.push(entity);

        let n = count_as_f64(self.members.len());
        for channel in CultureTrait::ALL {
            let value = entity::trait_or_zero(entities, entity, channel.source_trait());
            let mean = self.culture.entry(channel).or_insert(0.0);
            *mean = mean.mul_add(n - 1.0, value) / n;
        }
        true
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    /// Explain why `structure_type` cannot be built, if it cannot.
    ///
    /// The tech gate is checked first, so a tribe below the tier is refused
    /// no matter how rich it is.
    pub fn check_buildable(&self, structure_type: StructureType) -> Result<(), BuildError> {
        let bp = blueprint(structure_type);
        if self.tech_level < bp.tier {
            return Err(BuildError::TechTooLow {
                structure_type,
                required: bp.tier,
                current: self.tech_level,
            });
        }
        for &(resource, needed) in bp.cost {
            let available = self.resource(resource);
            if available < needed {
                return Err(BuildError::InsufficientResources {
                    structure_type,
                    resource,
                    needed,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Whether the tribe has the tech level and resources for `structure_type`.
    pub fn can_build(&self, structure_type: StructureType) -> bool {
        self.check_buildable(structure_type).is_ok()
    }

    /// Pay for and instantiate a structure owned by this tribe.
    ///
    /// On success the cost is deducted, the structure ID is recorded, the
    /// position is claimed as territory, and a `structure_built` event is
    /// emitted. The caller registers the returned [`Structure`]. On failure
    /// nothing changes.
    pub fn build_structure(
        &mut self,
        id: StructureId,
        structure_type: StructureType,
        position: Position,
        builder: EntityId,
        tick: u64,
        sink: &mut dyn EventSink,
    ) -> Result<Structure, BuildError> {
        self.check_buildable(structure_type)?;

        let bp = blueprint(structure_type);
        let mut cost = serde_json::Map::new();
        for &(resource, amount) in bp.cost {
            if let Some(held) = self.resources.get_mut(&resource) {
                *held -= amount;
            }
            cost.insert(resource.as_str().to_owned(), serde_json::json!(amount));
        }

        let structure = Structure::new(id, structure_type, position, builder, self.id, tick);
        self.structures.push(id);
        self.territory.insert(position);

        sink.record(
            CivEvent::new(
                tick,
                CivEventKind::StructureBuilt,
                EVENT_SOURCE,
                format!("Tribe {} built a {structure_type}", self.name),
            )
            .at(position)
            .with("tribe_id", self.id.into_inner())
            .with("structure_id", id.into_inner())
            .with("structure_type", structure_type.as_str())
            .with("builder", builder.into_inner())
            .with("cost", serde_json::Value::Object(cost))
            .with("tech_level", self.tech_level)
            .with("capacity", structure.capacity),
        );

        Ok(structure)
    }

    // -----------------------------------------------------------------------
    // Diplomacy bookkeeping
    // -----------------------------------------------------------------------

    /// Record `other` as an ally, clearing any enmity.
    pub(crate) fn ally_with(&mut self, other: TribeId) {
        self.enemies.remove(&other);
        self.allies.insert(other);
    }

    /// Record `other` as an enemy, clearing any alliance.
    pub(crate) fn oppose(&mut self, other: TribeId) {
        self.allies.remove(&other);
        self.enemies.insert(other);
    }

    /// Stop tracking a structure that no longer exists.
    pub(crate) fn release_structure(&mut self, id: StructureId) {
        self.structures.retain(|owned| *owned != id);
    }

    /// Drop every relation with `other`.
    pub(crate) fn forget(&mut self, other: TribeId) {
        self.allies.remove(&other);
        self.enemies.remove(&other);
    }

    // -----------------------------------------------------------------------
    // Per-tick update
    // -----------------------------------------------------------------------

    /// Advance the tribe by one tick. See the module docs for the phases.
    pub fn update(
        &mut self,
        tick: u64,
        entities: &dyn EntityRegistry,
        structures: &mut StructureRegistry,
        rules: &TribeRules,
        rng: &mut impl Rng,
        sink: &mut dyn EventSink,
    ) -> TribeStatus {
        self.members.retain(|member| entities.is_alive(*member));

        if self.members.is_empty() {
            tracing::info!(tick, tribe_id = %self.id, name = %self.name, "Tribe disbanded");
            sink.record(
                CivEvent::new(
                    tick,
                    CivEventKind::TribeDisbanded,
                    EVENT_SOURCE,
                    format!("Tribe {} disbanded", self.name),
                )
                .with("tribe_id", self.id.into_inner())
                .with("structures", self.structures.len())
                .with("tech_level", self.tech_level),
            );
            self.leader = None;
            return TribeStatus::Disbanded;
        }

        if self.living_leader(entities).is_none() {
            self.elect_leader(tick, entities, rules, sink);
        }

        self.collect_production(structures);
        self.attempt_research(tick, entities, rules, rng, sink);
        self.maintain_structures(structures, rules);

        TribeStatus::Active
    }

    /// Pick the member with the best leadership score; first maximum wins.
    fn elect_leader(
        &mut self,
        tick: u64,
        entities: &dyn EntityRegistry,
        rules: &TribeRules,
        sink: &mut dyn EventSink,
    ) {
        let mut best: Option<(EntityId, f64)> = None;
        for &member in &self.members {
            let score = entity::leadership_score(
                entities,
                member,
                rules.leader_intelligence_weight,
                rules.leader_cooperation_weight,
            );
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((member, score));
            }
        }

        let previous = self.leader;
        self.leader = best.map(|(member, _)| member);

        let Some((leader, score)) = best else {
            return;
        };
        if previous != Some(leader) {
            tracing::info!(tick, tribe_id = %self.id, leader = %leader, "Tribe leader changed");
            sink.record(
                CivEvent::new(
                    tick,
                    CivEventKind::TribeLeaderChanged,
                    EVENT_SOURCE,
                    format!("Entity {leader} now leads tribe {}", self.name),
                )
                .with("tribe_id", self.id.into_inner())
                .with("previous_leader", previous.map(EntityId::into_inner))
                .with("new_leader", leader.into_inner())
                .with("score", score),
            );
        }
    }

    /// Move every owned structure's stored resources into the pool.
    fn collect_production(&mut self, structures: &mut StructureRegistry) {
        for id in &self.structures {
            if let Some(structure) = structures.get_mut(id) {
                for (resource, amount) in std::mem::take(&mut structure.resources) {
                    if amount > 0.0 {
                        *self.resources.entry(resource).or_insert(0.0) += amount;
                    }
                }
            }
        }
    }

    /// Roll `avg intelligence * innovation * research_rate` for a tech level.
    fn attempt_research(
        &mut self,
        tick: u64,
        entities: &dyn EntityRegistry,
        rules: &TribeRules,
        rng: &mut impl Rng,
        sink: &mut dyn EventSink,
    ) {
        let chance = self.average_intelligence(entities)
            * self.culture(CultureTrait::Innovation)
            * rules.research_rate;
        if rng.random::<f64>() >= chance {
            return;
        }

        self.tech_level = self.tech_level.saturating_add(1);
        tracing::info!(tick, tribe_id = %self.id, tech_level = self.tech_level, "Tech advancement");
        sink.record(
            CivEvent::new(
                tick,
                CivEventKind::TechAdvancement,
                EVENT_SOURCE,
                format!("Tribe {} reached tech level {}", self.name, self.tech_level),
            )
            .with("tribe_id", self.id.into_inner())
            .with("tech_level", self.tech_level)
            .with("chance", chance),
        );
    }

    /// Pay food upkeep for active structures and forget dead ones.
    ///
    /// Active structures are always kept; those the tribe cannot pay for
    /// take `unpaid_upkeep_damage`. Inactive structures are kept only while
    /// they still have health to repair.
    fn maintain_structures(&mut self, structures: &mut StructureRegistry, rules: &TribeRules) {
        let mut food = self.resource(Resource::Food);
        let mut paid = false;

        self.structures.retain(|id| match structures.get_mut(id) {
            None => false,
            Some(structure) if structure.active => {
                if food >= structure.maintenance_cost {
                    food -= structure.maintenance_cost;
                    paid = true;
                } else {
                    structure.health -= rules.unpaid_upkeep_damage;
                }
                true
            }
            Some(structure) => structure.health > 0.0,
        });

        if paid {
            self.resources.insert(Resource::Food, food);
        }
    }
}

/// Convert a collection length to `f64` without a lossy cast.
fn count_as_f64(count: usize) -> f64 {
    u32::try_from(count).map_or_else(|_| f64::from(u32::MAX), f64::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use crate::entity::{EntityRecord, EntityTable};

    use super::*;

    fn spawn(table: &mut EntityTable, intelligence: f64, cooperation: f64) -> EntityId {
        table.insert(
            EntityRecord::new(Position::default(), 100.0)
                .with_trait(traits::INTELLIGENCE, intelligence)
                .with_trait(traits::COOPERATION, cooperation),
        )
    }

    fn founded(table: &EntityTable, founder: EntityId) -> Tribe {
        Tribe::found(TribeId(1), "Ash", founder, 0, table, &TribeRules::default())
    }

    #[test]
    fn culture_is_the_insertion_time_mean() {
        let mut table = EntityTable::new();
        let founder = table.insert(EntityRecord::new(Position::default(), 10.0));
        let a = table.insert(
            EntityRecord::new(Position::default(), 10.0).with_trait(traits::COOPERATION, 0.9),
        );
        let b = table.insert(
            EntityRecord::new(Position::default(), 10.0).with_trait(traits::COOPERATION, 0.1),
        );

        let mut tribe = founded(&table, founder);
        tribe.add_member(a, &table);
        // Later trait drift must not move the recorded average.
        table.set_trait(founder, traits::COOPERATION, 1.0);
        tribe.add_member(b, &table);

        assert!((tribe.culture(CultureTrait::Cooperation) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn innovation_tracks_intelligence() {
        let mut table = EntityTable::new();
        let founder = spawn(&mut table, 0.8, 0.5);
        let other = spawn(&mut table, 0.2, 0.5);
        let mut tribe = founded(&table, founder);
        tribe.add_member(other, &table);
        assert!((tribe.culture(CultureTrait::Innovation) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn duplicate_members_are_ignored() {
        let mut table = EntityTable::new();
        let founder = spawn(&mut table, 0.5, 0.5);
        let mut tribe = founded(&table, founder);
        assert!(!tribe.add_member(founder, &table));
        assert_eq!(tribe.member_count(), 1);
    }

    #[test]
    fn tech_gate_dominates_resources() {
        let mut table = EntityTable::new();
        let founder = spawn(&mut table, 0.5, 0.5);
        let mut tribe = founded(&table, founder);
        tribe.add_resource(Resource::Stone, 1000.0);
        tribe.add_resource(Resource::Wood, 1000.0);

        assert!(!tribe.can_build(StructureType::Tower));
        assert!(matches!(
            tribe.check_buildable(StructureType::Tower),
            Err(BuildError::TechTooLow { required: 4, current: 1, .. })
        ));

        tribe.set_tech_level(4);
        assert!(tribe.can_build(StructureType::Tower));
    }

    #[test]
    fn failed_build_has_no_side_effects() {
        let mut table = EntityTable::new();
        let founder = spawn(&mut table, 0.5, 0.5);
        let mut tribe = founded(&table, founder);
        tribe.add_resource(Resource::Wood, 19.0);
        let mut events: Vec<CivEvent> = Vec::new();

        let result = tribe.build_structure(
            StructureId(1),
            StructureType::Nest,
            Position::new(1, 1),
            founder,
            5,
            &mut events,
        );

        assert!(matches!(result, Err(BuildError::InsufficientResources { .. })));
        assert!((tribe.resource(Resource::Wood) - 19.0).abs() < f64::EPSILON);
        assert!(tribe.structures().is_empty());
        assert!(tribe.territory().is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn build_deducts_cost_and_reports() {
        let mut table = EntityTable::new();
        let founder = spawn(&mut table, 0.5, 0.5);
        let mut tribe = founded(&table, founder);
        tribe.add_resource(Resource::Wood, 30.0);
        tribe.add_resource(Resource::Stone, 5.0);
        let mut events: Vec<CivEvent> = Vec::new();

        let cache = tribe
            .build_structure(
                StructureId(9),
                StructureType::Cache,
                Position::new(2, 3),
                founder,
                5,
                &mut events,
            )
            .unwrap();

        assert_eq!(cache.tribe, TribeId(1));
        assert_eq!(tribe.structures(), &[StructureId(9)]);
        assert!((tribe.resource(Resource::Wood) - 15.0).abs() < f64::EPSILON);
        assert!(tribe.resource(Resource::Stone).abs() < f64::EPSILON);
        assert!(tribe.territory().contains(&Position::new(2, 3)));

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.kind, CivEventKind::StructureBuilt);
        assert_eq!(event.position, Some(Position::new(2, 3)));
        assert_eq!(event.metadata.get("tech_level"), Some(&serde_json::json!(1)));
        assert_eq!(
            event.metadata.get("cost"),
            Some(&serde_json::json!({"wood": 15.0, "stone": 5.0}))
        );
    }

    #[test]
    fn dead_members_are_dropped_and_leader_replaced() {
        let mut table = EntityTable::new();
        let founder = spawn(&mut table, 0.9, 0.9);
        let weak = spawn(&mut table, 0.2, 0.2);
        let strong = spawn(&mut table, 0.8, 0.5);
        let tied = spawn(&mut table, 0.8, 0.5);
        let mut tribe = founded(&table, founder);
        for member in [weak, strong, tied] {
            tribe.add_member(member, &table);
        }

        table.kill(founder);
        let mut structures = StructureRegistry::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut events: Vec<CivEvent> = Vec::new();
        let status = tribe.update(
            1,
            &table,
            &mut structures,
            &TribeRules::default(),
            &mut rng,
            &mut events,
        );

        assert_eq!(status, TribeStatus::Active);
        assert_eq!(tribe.members(), &[weak, strong, tied]);
        // First maximal candidate wins the tie.
        assert_eq!(tribe.leader(), Some(strong));
        assert!(
            events
                .iter()
                .any(|event| event.kind == CivEventKind::TribeLeaderChanged)
        );
    }

    #[test]
    fn living_leader_is_not_reelected() {
        let mut table = EntityTable::new();
        let founder = spawn(&mut table, 0.3, 0.3);
        let smarter = spawn(&mut table, 0.9, 0.9);
        let mut tribe = founded(&table, founder);
        tribe.add_member(smarter, &table);
        let rules = TribeRules {
            research_rate: 0.0,
            ..TribeRules::default()
        };

        let mut structures = StructureRegistry::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut events: Vec<CivEvent> = Vec::new();
        tribe.update(1, &table, &mut structures, &rules, &mut rng, &mut events);

        assert_eq!(tribe.leader(), Some(founder));
        assert!(events.is_empty());
    }

    #[test]
    fn empty_tribe_disbands() {
        let mut table = EntityTable::new();
        let founder = spawn(&mut table, 0.5, 0.5);
        let mut tribe = founded(&table, founder);
        table.kill(founder);

        let mut structures = StructureRegistry::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut events: Vec<CivEvent> = Vec::new();
        let status = tribe.update(3, &table, &mut structures, &TribeRules::default(), &mut rng, &mut events);

        assert_eq!(status, TribeStatus::Disbanded);
        assert_eq!(tribe.leader(), None);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, CivEventKind::TribeDisbanded);
    }

    #[test]
    fn production_is_collected_and_upkeep_paid() {
        let mut table = EntityTable::new();
        let founder = spawn(&mut table, 0.5, 0.5);
        let mut tribe = founded(&table, founder);
        tribe.add_resource(Resource::Wood, 20.0);
        let mut events: Vec<CivEvent> = Vec::new();
        let mut nest = tribe
            .build_structure(StructureId(1), StructureType::Nest, Position::default(), founder, 0, &mut events)
            .unwrap();
        nest.resources.insert(Resource::Food, 4.0);
        let mut structures = StructureRegistry::new();
        structures.insert(nest.id, nest);

        let mut rng = SmallRng::seed_from_u64(1);
        tribe.update(1, &table, &mut structures, &TribeRules::default(), &mut rng, &mut events);

        // 4 food collected, 0.5 paid for the nest's upkeep.
        assert!((tribe.resource(Resource::Food) - 3.5).abs() < 1e-9);
        let nest = &structures[&StructureId(1)];
        assert!(nest.resources.is_empty());
        assert!((nest.health - nest.max_health).abs() < f64::EPSILON);
    }

    #[test]
    fn unpaid_upkeep_damages_structure() {
        let mut table = EntityTable::new();
        let founder = spawn(&mut table, 0.5, 0.5);
        let mut tribe = founded(&table, founder);
        tribe.add_resource(Resource::Wood, 20.0);
        let mut events: Vec<CivEvent> = Vec::new();
        let nest = tribe
            .build_structure(StructureId(1), StructureType::Nest, Position::default(), founder, 0, &mut events)
            .unwrap();
        let mut structures = StructureRegistry::new();
        structures.insert(nest.id, nest);

        let mut rng = SmallRng::seed_from_u64(1);
        tribe.update(1, &table, &mut structures, &TribeRules::default(), &mut rng, &mut events);

        assert!((structures[&StructureId(1)].health - 148.0).abs() < 1e-9);
        assert_eq!(tribe.structures(), &[StructureId(1)]);
    }

    #[test]
    fn inactive_structures_kept_only_while_repairable() {
        let mut table = EntityTable::new();
        let founder = spawn(&mut table, 0.5, 0.5);
        let mut tribe = founded(&table, founder);
        tribe.add_resource(Resource::Wood, 40.0);
        let mut events: Vec<CivEvent> = Vec::new();
        let mut structures = StructureRegistry::new();
        for raw in [1, 2] {
            let mut nest = tribe
                .build_structure(StructureId(raw), StructureType::Nest, Position::default(), founder, 0, &mut events)
                .unwrap();
            nest.active = false;
            structures.insert(nest.id, nest);
        }
        if let Some(dead) = structures.get_mut(&StructureId(2)) {
            dead.health = 0.0;
        }

        let mut rng = SmallRng::seed_from_u64(1);
        tribe.update(1, &table, &mut structures, &TribeRules::default(), &mut rng, &mut events);

        assert_eq!(tribe.structures(), &[StructureId(1)]);
    }

    #[test]
    fn research_advances_with_certain_chance() {
        let mut table = EntityTable::new();
        let founder = spawn(&mut table, 1.0, 0.5);
        let mut tribe = founded(&table, founder);
        let rules = TribeRules {
            research_rate: 1.0,
            ..TribeRules::default()
        };

        let mut structures = StructureRegistry::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut events: Vec<CivEvent> = Vec::new();
        tribe.update(1, &table, &mut structures, &rules, &mut rng, &mut events);

        assert_eq!(tribe.tech_level(), 2);
        assert_eq!(events.last().map(|event| event.kind), Some(CivEventKind::TechAdvancement));
    }

    #[test]
    fn research_never_advances_without_intelligence() {
        let mut table = EntityTable::new();
        let founder = spawn(&mut table, 0.0, 1.0);
        let mut tribe = founded(&table, founder);
        let mut structures = StructureRegistry::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut events: Vec<CivEvent> = Vec::new();
        for tick in 0..500 {
            tribe.update(tick, &table, &mut structures, &TribeRules::default(), &mut rng, &mut events);
        }
        assert_eq!(tribe.tech_level(), 1);
    }
}
