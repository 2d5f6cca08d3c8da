//! The civilization orchestrator.
//!
//! [`CivilizationSystem`] owns every tribe, the flat structure registry, the
//! trade system, and the trade history. The outer world loop calls
//! [`CivilizationSystem::update`] once per tick, which runs four phases:
//!
//! 1. **Tribes** -- governance, production collection, research, upkeep.
//!    Tribes with no members left are removed and every reference to them is
//!    pruned.
//! 2. **Structures** -- decay and type effects. Structures that are both
//!    inactive and out of health are removed.
//! 3. **Trades** -- negotiation, execution, and expiry.
//! 4. **Market** -- a chance of one random trade proposal.
//!
//! Entry points for the rest of the simulation ([`form_tribe`],
//! [`build_structure`], [`repair_structure`], [`propose_trade`]) resolve
//! their arguments through the registries and fail without side effects.
//!
//! [`form_tribe`]: CivilizationSystem::form_tribe
//! [`build_structure`]: CivilizationSystem::build_structure
//! [`repair_structure`]: CivilizationSystem::repair_structure
//! [`propose_trade`]: CivilizationSystem::propose_trade

use std::collections::BTreeMap;

use rand::Rng;
use serde::Serialize;

use civitas_types::{
    CivEvent, CivEventKind, EntityId, Position, Resource, ResourceMap, StructureId, StructureType,
    TradeId, TribeId,
};

use crate::entity::{self, EntityRegistry};
use crate::error::{BuildError, DiplomacyError, FormTribeError, RepairError, TradeError};
use crate::events::{EventSink, NullSink};
use crate::history::TradeHistory;
use crate::rules::CivilizationRules;
use crate::structure::{Structure, StructureRegistry};
use crate::trade::{TradeOutcome, TradeResolution, TradeSystem};
use crate::tribe::{Tribe, TribeStatus};

/// Source name attached to events raised by the orchestrator.
const EVENT_SOURCE: &str = "civilization";

/// What happened during one [`CivilizationSystem::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// The tick that was processed.
    pub tick: u64,
    /// Tribes alive after the tick.
    pub tribes: usize,
    /// Structures registered after the tick.
    pub structures: usize,
    /// Trades active after the tick.
    pub active_trades: usize,
    /// Tribes removed this tick.
    pub disbanded: Vec<TribeId>,
    /// Structures removed this tick.
    pub destroyed: Vec<StructureId>,
    /// Trade transitions this tick.
    pub trades: Vec<TradeResolution>,
    /// Random trade proposed at the end of the tick, if any.
    pub proposed_trade: Option<TradeId>,
}

/// Owner and driver of all tribes, structures, and trades.
///
/// The event sink is optional: the default [`NullSink`] discards every
/// event.
#[derive(Debug)]
pub struct CivilizationSystem<S = NullSink> {
    rules: CivilizationRules,
    tribes: BTreeMap<TribeId, Tribe>,
    structures: StructureRegistry,
    trade_system: TradeSystem,
    history: TradeHistory,
    next_tribe_id: TribeId,
    next_structure_id: StructureId,
    sink: S,
}

impl CivilizationSystem<NullSink> {
    /// Create an empty civilization that discards events.
    pub fn new(rules: CivilizationRules) -> Self {
        Self::with_sink(rules, NullSink)
    }
}

impl<S: EventSink> CivilizationSystem<S> {
    /// Create an empty civilization reporting to `sink`.
    pub fn with_sink(rules: CivilizationRules, sink: S) -> Self {
        let trade_system = TradeSystem::new(rules.trade.clone());
        let history = TradeHistory::new(rules.trade.history_limit);
        Self {
            rules,
            tribes: BTreeMap::new(),
            structures: StructureRegistry::new(),
            trade_system,
            history,
            next_tribe_id: TribeId(1),
            next_structure_id: StructureId(1),
            sink,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Rules in force.
    pub const fn rules(&self) -> &CivilizationRules {
        &self.rules
    }

    /// All living tribes, by ID.
    pub const fn tribes(&self) -> &BTreeMap<TribeId, Tribe> {
        &self.tribes
    }

    /// Look up a tribe.
    pub fn tribe(&self, id: TribeId) -> Option<&Tribe> {
        self.tribes.get(&id)
    }

    /// Mutable tribe access, e.g. to grant starting resources.
    pub fn tribe_mut(&mut self, id: TribeId) -> Option<&mut Tribe> {
        self.tribes.get_mut(&id)
    }

    /// The tribe `entity` belongs to, if any.
    pub fn tribe_of(&self, entity: EntityId) -> Option<&Tribe> {
        self.tribes.values().find(|tribe| tribe.is_member(entity))
    }

    /// The flat structure registry.
    pub const fn structures(&self) -> &StructureRegistry {
        &self.structures
    }

    /// Look up a structure.
    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(&id)
    }

    /// The trade system.
    pub const fn trade_system(&self) -> &TradeSystem {
        &self.trade_system
    }

    /// Audit trail of finished trades.
    pub const fn history(&self) -> &TradeHistory {
        &self.history
    }

    /// The event sink.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the system and return its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Trust `from` places in `to`.
    pub fn trust(&self, from: TribeId, to: TribeId) -> f64 {
        self.trade_system.trust(from, to)
    }

    /// Set directional trust, clamped to `[0, 1]`.
    pub fn set_trust(&mut self, from: TribeId, to: TribeId, value: f64) {
        self.trade_system.set_trust(from, to, value);
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance every tribe, structure, and trade by one tick.
    pub fn update(
        &mut self,
        tick: u64,
        entities: &dyn EntityRegistry,
        rng: &mut impl Rng,
    ) -> TickSummary {
        let disbanded = self.update_tribes(tick, entities, rng);
        let destroyed = self.update_structures(tick, rng);
        let trades = self.process_trades(tick);
        let proposed_trade = self.generate_random_trade(tick, rng);

        let summary = TickSummary {
            tick,
            tribes: self.tribes.len(),
            structures: self.structures.len(),
            active_trades: self.trade_system.active_count(),
            disbanded,
            destroyed,
            trades,
            proposed_trade,
        };
        tracing::debug!(
            tick,
            tribes = summary.tribes,
            structures = summary.structures,
            active_trades = summary.active_trades,
            "Civilization tick complete"
        );
        summary
    }

    /// Phase 1: update tribes, remove empty ones, prune their references.
    fn update_tribes(
        &mut self,
        tick: u64,
        entities: &dyn EntityRegistry,
        rng: &mut impl Rng,
    ) -> Vec<TribeId> {
        let mut disbanded = Vec::new();
        for (id, tribe) in &mut self.tribes {
            let status = tribe.update(
                tick,
                entities,
                &mut self.structures,
                &self.rules.tribe,
                rng,
                &mut self.sink,
            );
            if status == TribeStatus::Disbanded {
                disbanded.push(*id);
            }
        }

        for id in &disbanded {
            self.tribes.remove(id);
            for tribe in self.tribes.values_mut() {
                tribe.forget(*id);
            }
        }
        disbanded
    }

    /// Phase 2: update structures and drop those beyond repair.
    fn update_structures(&mut self, tick: u64, rng: &mut impl Rng) -> Vec<StructureId> {
        for structure in self.structures.values_mut() {
            if structure.update(&self.rules.structure, rng) {
                tracing::debug!(
                    tick,
                    structure_id = %structure.id,
                    structure_type = %structure.structure_type,
                    tribe_id = %structure.tribe,
                    health = structure.health,
                    "Structure collapsed"
                );
            }
        }

        let destroyed: Vec<StructureId> = self
            .structures
            .values()
            .filter(|structure| structure.is_destroyed())
            .map(|structure| structure.id)
            .collect();

        for id in &destroyed {
            if let Some(structure) = self.structures.remove(id) {
                if let Some(owner) = self.tribes.get_mut(&structure.tribe) {
                    owner.release_structure(*id);
                }
                tracing::info!(
                    tick,
                    structure_id = %id,
                    tribe_id = %structure.tribe,
                    structure_type = %structure.structure_type,
                    "Structure destroyed"
                );
                self.sink.record(
                    CivEvent::new(
                        tick,
                        CivEventKind::StructureDestroyed,
                        EVENT_SOURCE,
                        format!("{} {} was destroyed", structure.structure_type, structure.id),
                    )
                    .at(structure.position)
                    .with("structure_id", structure.id.into_inner())
                    .with("structure_type", structure.structure_type.as_str())
                    .with("tribe_id", structure.tribe.into_inner())
                    .with("age", tick.saturating_sub(structure.created_at_tick)),
                );
            }
        }
        destroyed
    }

    /// Phase 3: run the trade state machine and report transitions.
    fn process_trades(&mut self, tick: u64) -> Vec<TradeResolution> {
        let resolutions = self.trade_system.process_trades(&mut self.tribes);
        for resolution in &resolutions {
            self.history.record(resolution, tick);

            let (kind, verb) = match resolution.outcome {
                TradeOutcome::Accepted => (CivEventKind::TradeAccepted, "accepted"),
                TradeOutcome::Completed => (CivEventKind::TradeCompleted, "completed"),
                TradeOutcome::Cancelled(_) => (CivEventKind::TradeCancelled, "cancelled"),
            };
            let mut event = CivEvent::new(
                tick,
                kind,
                EVENT_SOURCE,
                format!(
                    "Trade {} between tribes {} and {} {verb}",
                    resolution.trade_id, resolution.from, resolution.to
                ),
            )
            .with("trade_id", resolution.trade_id.into_inner())
            .with("from", resolution.from.into_inner())
            .with("to", resolution.to.into_inner());
            if let TradeOutcome::Cancelled(reason) = resolution.outcome {
                event = event.with("reason", reason.as_str());
            }
            if resolution.outcome == TradeOutcome::Completed {
                event = event.with("trust", self.trade_system.trust(resolution.from, resolution.to));
            }
            self.sink.record(event);
        }
        resolutions
    }

    /// Phase 4: maybe propose one random trade between two tribes.
    ///
    /// With probability `market.random_trade_chance`, and only when at least
    /// two tribes exist, pick a distinct ordered pair `(a, b)`. Tribe `a`
    /// offers a fraction of each resource it holds in surplus and asks for
    /// enough of each scarce resource to reach the shortage target. The
    /// proposal is made only when both sides of the deal are non-empty, and
    /// still needs `a` to trust `b`.
    pub fn generate_random_trade(&mut self, tick: u64, rng: &mut impl Rng) -> Option<TradeId> {
        if rng.random::<f64>() >= self.rules.market.random_trade_chance {
            return None;
        }
        let count = self.tribes.len();
        if count < 2 {
            return None;
        }

        let first = rng.random_range(0..count);
        let mut second = rng.random_range(0..count.saturating_sub(1));
        if second >= first {
            second = second.saturating_add(1);
        }
        let from = *self.tribes.keys().nth(first)?;
        let to = *self.tribes.keys().nth(second)?;

        let market = &self.rules.market;
        let proposer = self.tribes.get(&from)?;
        let mut offering = ResourceMap::new();
        let mut requesting = ResourceMap::new();
        for resource in Resource::ALL {
            let held = proposer.resource(resource);
            if held > market.surplus_threshold {
                offering.insert(resource, held * market.surplus_offer_fraction);
            } else if held < market.shortage_threshold {
                requesting.insert(resource, market.shortage_target - held);
            }
        }
        if offering.is_empty() || requesting.is_empty() {
            return None;
        }

        match self.propose_trade(tick, from, to, offering, requesting) {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::debug!(tick, from = %from, to = %to, error = %err, "Random trade not proposed");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Found a tribe from `candidates`.
    ///
    /// The living candidate with the highest leadership score founds and
    /// leads the tribe; on ties the earliest candidate wins. Every other
    /// living candidate joins, in order. Dead and repeated candidates are
    /// skipped.
    ///
    /// # Errors
    ///
    /// [`FormTribeError::NoLivingCandidate`] if no candidate is alive, and
    /// [`FormTribeError::FounderScoreTooLow`] if the best score is below
    /// `tribe.founder_min_score`. Nothing is registered on error.
    pub fn form_tribe(
        &mut self,
        candidates: &[EntityId],
        name: &str,
        tick: u64,
        entities: &dyn EntityRegistry,
    ) -> Result<TribeId, FormTribeError> {
        let rules = &self.rules.tribe;
        let mut best: Option<(EntityId, f64)> = None;
        for &candidate in candidates.iter().filter(|id| entities.is_alive(**id)) {
            let score = entity::leadership_score(
                entities,
                candidate,
                rules.leader_intelligence_weight,
                rules.leader_cooperation_weight,
            );
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((candidate, score));
            }
        }

        let (founder, score) = best.ok_or(FormTribeError::NoLivingCandidate)?;
        if score < rules.founder_min_score {
            return Err(FormTribeError::FounderScoreTooLow {
                candidate: founder,
                score,
                required: rules.founder_min_score,
            });
        }

        let id = self.next_tribe_id;
        self.next_tribe_id = id.next();
        let mut tribe = Tribe::found(id, name, founder, tick, entities, rules);
        for &candidate in candidates {
            if entities.is_alive(candidate) {
                tribe.add_member(candidate, entities);
            }
        }

        let position = entities.position(founder).unwrap_or_default();
        tracing::info!(tick, tribe_id = %id, tribe_name = name, founder = %founder, members = tribe.member_count(), "Tribe formed");
        self.sink.record(
            CivEvent::new(
                tick,
                CivEventKind::TribeFormed,
                EVENT_SOURCE,
                format!("Tribe {name} formed around entity {founder}"),
            )
            .at(position)
            .with("tribe_id", id.into_inner())
            .with("founder", founder.into_inner())
            .with("members", tribe.member_count())
            .with("score", score),
        );
        self.tribes.insert(id, tribe);
        Ok(id)
    }

    /// Have `tribe_id` build a structure and register it.
    ///
    /// # Errors
    ///
    /// [`BuildError::UnknownTribe`] for an unregistered tribe, otherwise
    /// whatever [`Tribe::check_buildable`] reports.
    pub fn build_structure(
        &mut self,
        tribe_id: TribeId,
        structure_type: StructureType,
        position: Position,
        builder: EntityId,
        tick: u64,
    ) -> Result<StructureId, BuildError> {
        let tribe = self
            .tribes
            .get_mut(&tribe_id)
            .ok_or(BuildError::UnknownTribe(tribe_id))?;

        let id = self.next_structure_id;
        let structure =
            tribe.build_structure(id, structure_type, position, builder, tick, &mut self.sink)?;
        self.next_structure_id = id.next();

        tracing::debug!(tick, tribe_id = %tribe_id, structure_id = %id, structure_type = %structure_type, "Structure built");
        self.structures.insert(id, structure);
        Ok(id)
    }

    /// Let `actor` repair a registered structure by `amount` health.
    ///
    /// Returns the health actually restored.
    ///
    /// # Errors
    ///
    /// [`RepairError::UnknownStructure`] for an unregistered structure,
    /// otherwise whatever [`Structure::repair`] reports.
    pub fn repair_structure(
        &mut self,
        structure_id: StructureId,
        actor: EntityId,
        amount: f64,
        entities: &mut dyn EntityRegistry,
    ) -> Result<f64, RepairError> {
        let structure = self
            .structures
            .get_mut(&structure_id)
            .ok_or(RepairError::UnknownStructure(structure_id))?;
        let gained = structure.repair(entities, actor, amount, &self.rules.structure)?;
        tracing::debug!(structure_id = %structure_id, actor = %actor, gained, "Structure repaired");
        Ok(gained)
    }

    /// Propose a trade between two registered tribes.
    ///
    /// # Errors
    ///
    /// [`TradeError::UnknownTribe`] if either tribe is unregistered,
    /// otherwise whatever [`TradeSystem::propose_trade`] reports.
    pub fn propose_trade(
        &mut self,
        tick: u64,
        from: TribeId,
        to: TribeId,
        offering: ResourceMap,
        requesting: ResourceMap,
    ) -> Result<TradeId, TradeError> {
        for id in [from, to] {
            if !self.tribes.contains_key(&id) {
                return Err(TradeError::UnknownTribe(id));
            }
        }

        let offered = serde_json::to_value(&offering).unwrap_or_default();
        let requested = serde_json::to_value(&requesting).unwrap_or_default();
        let id = self.trade_system.propose_trade(from, to, offering, requesting)?;
        self.sink.record(
            CivEvent::new(
                tick,
                CivEventKind::TradeProposed,
                EVENT_SOURCE,
                format!("Tribe {from} proposed trade {id} to tribe {to}"),
            )
            .with("trade_id", id.into_inner())
            .with("from", from.into_inner())
            .with("to", to.into_inner())
            .with("offering", offered)
            .with("requesting", requested),
        );
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Diplomacy
    // -----------------------------------------------------------------------

    /// Record a mutual alliance, clearing any enmity between the two.
    pub fn form_alliance(&mut self, a: TribeId, b: TribeId) -> Result<(), DiplomacyError> {
        self.check_pair(a, b)?;
        if let Some(tribe) = self.tribes.get_mut(&a) {
            tribe.ally_with(b);
        }
        if let Some(tribe) = self.tribes.get_mut(&b) {
            tribe.ally_with(a);
        }
        tracing::info!(a = %a, b = %b, "Alliance formed");
        Ok(())
    }

    /// Record mutual enmity, clearing any alliance between the two.
    pub fn declare_enemies(&mut self, a: TribeId, b: TribeId) -> Result<(), DiplomacyError> {
        self.check_pair(a, b)?;
        if let Some(tribe) = self.tribes.get_mut(&a) {
            tribe.oppose(b);
        }
        if let Some(tribe) = self.tribes.get_mut(&b) {
            tribe.oppose(a);
        }
        tracing::info!(a = %a, b = %b, "Tribes declared enemies");
        Ok(())
    }

    fn check_pair(&self, a: TribeId, b: TribeId) -> Result<(), DiplomacyError> {
        if a == b {
            return Err(DiplomacyError::SelfRelation(a));
        }
        for id in [a, b] {
            if !self.tribes.contains_key(&id) {
                return Err(DiplomacyError::UnknownTribe(id));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
