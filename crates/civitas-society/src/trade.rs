//! Inter-tribe trust ledger and trade negotiation.
//!
//! A trade moves through a small state machine:
//!
//! ```text
//! proposed --accept--> active --expire--> completed
//!     |                   |
//!     +--reject/short-----+--partner gone--> cancelled
//! ```
//!
//! 1. [`TradeSystem::propose_trade`] -- the proposer needs enough trust in
//!    the receiver; the trade is queued as `proposed`.
//! 2. [`TradeSystem::process_trades`] -- proposed trades are valued from the
//!    receiver's point of view and either accepted (and executed on the
//!    spot) or rejected. Active trades count down and complete, raising
//!    mutual trust.
//!
//! Only `active` trades survive a processing pass. Terminal trades are
//! reported through [`TradeResolution`] and then forgotten by the system.

use std::collections::BTreeMap;

use serde::Serialize;

use civitas_types::{Resource, ResourceMap, TradeId, TradeStatus, TribeId};

use crate::error::TradeError;
use crate::rules::TradeRules;
use crate::tribe::Tribe;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A resource exchange between two tribes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    /// Trade identifier.
    pub id: TradeId,
    /// Proposing tribe; gives `offering`.
    pub from: TribeId,
    /// Receiving tribe; gives `requesting`.
    pub to: TribeId,
    /// Resources the proposer hands over.
    pub offering: ResourceMap,
    /// Resources the proposer asks for.
    pub requesting: ResourceMap,
    /// Ticks left before an active trade completes.
    pub duration: u32,
    /// Current lifecycle state.
    pub status: TradeStatus,
}

/// Why a trade was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The receiver judged the offer not worth the request.
    Rejected,
    /// One side could not cover its amounts at execution time.
    Shortfall,
    /// One of the tribes no longer exists.
    PartnerMissing,
}

impl CancelReason {
    /// Returns the `snake_case` name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::Shortfall => "shortfall",
            Self::PartnerMissing => "partner_missing",
        }
    }
}

/// A state change that happened during [`TradeSystem::process_trades`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum TradeOutcome {
    /// The receiver accepted and the exchange was executed.
    Accepted,
    /// The trade ran its course; mutual trust was raised.
    Completed,
    /// The trade ended without completing.
    Cancelled(CancelReason),
}

/// One trade's transition in a processing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TradeResolution {
    /// Trade that changed state.
    pub trade_id: TradeId,
    /// Proposing tribe.
    pub from: TribeId,
    /// Receiving tribe.
    pub to: TribeId,
    /// What happened.
    pub outcome: TradeOutcome,
}

impl TradeResolution {
    /// Whether this resolution ends the trade's life.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self.outcome, TradeOutcome::Accepted)
    }

    /// Final status implied by the outcome.
    pub const fn status(&self) -> TradeStatus {
        match self.outcome {
            TradeOutcome::Accepted => TradeStatus::Active,
            TradeOutcome::Completed => TradeStatus::Completed,
            TradeOutcome::Cancelled(_) => TradeStatus::Cancelled,
        }
    }
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// Worth of one unit of `resource` to a tribe holding `held` of it.
///
/// Scarce goods are worth more; abundant ones less.
pub const fn scarcity_value(resource: Resource, held: f64) -> f64 {
    match resource {
        Resource::Food => {
            if held < 20.0 {
                2.0
            } else if held > 100.0 {
                0.5
            } else {
                1.0
            }
        }
        Resource::Wood | Resource::Stone => {
            if held < 10.0 {
                1.5
            } else if held > 50.0 {
                0.3
            } else {
                0.8
            }
        }
        Resource::Water | Resource::Ore => 1.0,
    }
}

/// Total worth of `bundle` to `tribe`.
pub fn bundle_value(tribe: &Tribe, bundle: &ResourceMap) -> f64 {
    bundle
        .iter()
        .map(|(resource, amount)| amount * scarcity_value(*resource, tribe.resource(*resource)))
        .sum()
}

// ---------------------------------------------------------------------------
// Trade system
// ---------------------------------------------------------------------------

/// Directional trust ledger plus the live trade registry.
#[derive(Debug, Clone)]
pub struct TradeSystem {
    rules: TradeRules,
    trust: BTreeMap<(TribeId, TribeId), f64>,
    trades: Vec<Trade>,
    next_id: TradeId,
}

impl TradeSystem {
    /// Create an empty system. The first trade gets ID 1.
    pub const fn new(rules: TradeRules) -> Self {
        Self {
            rules,
            trust: BTreeMap::new(),
            trades: Vec::new(),
            next_id: TradeId(1),
        }
    }

    /// Rules in force.
    pub const fn rules(&self) -> &TradeRules {
        &self.rules
    }

    /// Trust `from` places in `to`, defaulting for tribes that never traded.
    pub fn trust(&self, from: TribeId, to: TribeId) -> f64 {
        self.trust
            .get(&(from, to))
            .copied()
            .unwrap_or(self.rules.default_trust)
    }

    /// Set directional trust, clamped to `[0, 1]`. NaN is stored as 0.
    pub fn set_trust(&mut self, from: TribeId, to: TribeId, value: f64) {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        self.trust.insert((from, to), value);
    }

    /// Trades still alive after the last processing pass, plus any proposed
    /// since.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Look up a live trade.
    pub fn trade(&self, id: TradeId) -> Option<&Trade> {
        self.trades.iter().find(|trade| trade.id == id)
    }

    /// Number of trades currently `active`.
    pub fn active_count(&self) -> usize {
        self.trades
            .iter()
            .filter(|trade| trade.status == TradeStatus::Active)
            .count()
    }

    /// Queue a trade proposal.
    ///
    /// # Errors
    ///
    /// Returns [`TradeError::SelfTrade`] if both sides are the same tribe,
    /// [`TradeError::InvalidAmount`] for negative or non-finite terms, and
    /// [`TradeError::TrustTooLow`] when `from` trusts `to` less than
    /// `min_trust_to_propose`. Nothing is queued on error.
    pub fn propose_trade(
        &mut self,
        from: TribeId,
        to: TribeId,
        offering: ResourceMap,
        requesting: ResourceMap,
    ) -> Result<TradeId, TradeError> {
        if from == to {
            return Err(TradeError::SelfTrade(from));
        }
        if let Some((resource, amount)) = offering
            .iter()
            .chain(requesting.iter())
            .find(|(_, amount)| !amount.is_finite() || **amount < 0.0)
        {
            return Err(TradeError::InvalidAmount {
                resource: *resource,
                amount: *amount,
            });
        }
        let trust = self.trust(from, to);
        if trust < self.rules.min_trust_to_propose {
            return Err(TradeError::TrustTooLow {
                from,
                to,
                trust,
                required: self.rules.min_trust_to_propose,
            });
        }

        let id = self.next_id;
        self.next_id = id.next();
        self.trades.push(Trade {
            id,
            from,
            to,
            offering,
            requesting,
            duration: self.rules.duration_ticks,
            status: TradeStatus::Proposed,
        });
        tracing::debug!(trade_id = %id, from = %from, to = %to, "Trade proposed");
        Ok(id)
    }

    /// Run one negotiation and execution pass over every live trade.
    ///
    /// Trades are handled in proposal order, so an earlier execution can
    /// leave a later trade short. A trade accepted in this pass does not
    /// count down until the next one. Returns every transition that
    /// happened; afterwards only `active` trades remain.
    pub fn process_trades(&mut self, tribes: &mut BTreeMap<TribeId, Tribe>) -> Vec<TradeResolution> {
        let mut resolutions = Vec::new();

        for trade in &mut self.trades {
            let outcome = if !tribes.contains_key(&trade.from) || !tribes.contains_key(&trade.to) {
                tracing::warn!(
                    trade_id = %trade.id,
                    from = %trade.from,
                    to = %trade.to,
                    "Trade partner no longer exists, cancelling"
                );
                Some(TradeOutcome::Cancelled(CancelReason::PartnerMissing))
            } else {
                match trade.status {
                    TradeStatus::Proposed => Some(negotiate(trade, tribes, &self.rules)),
                    TradeStatus::Active => {
                        trade.duration = trade.duration.saturating_sub(1);
                        (trade.duration == 0).then(|| {
                            raise_trust(&mut self.trust, &self.rules, trade.from, trade.to);
                            TradeOutcome::Completed
                        })
                    }
                    TradeStatus::Completed | TradeStatus::Cancelled => None,
                }
            };

            if let Some(outcome) = outcome {
                let resolution = TradeResolution {
                    trade_id: trade.id,
                    from: trade.from,
                    to: trade.to,
                    outcome,
                };
                trade.status = resolution.status();
                resolutions.push(resolution);
            }
        }

        self.trades.retain(|trade| trade.status == TradeStatus::Active);
        resolutions
    }
}

/// Value a proposed trade for its receiver and execute it if accepted.
fn negotiate(trade: &Trade, tribes: &mut BTreeMap<TribeId, Tribe>, rules: &TradeRules) -> TradeOutcome {
    let Some(receiver) = tribes.get(&trade.to) else {
        return TradeOutcome::Cancelled(CancelReason::PartnerMissing);
    };
    let offer_value = bundle_value(receiver, &trade.offering);
    let request_value = bundle_value(receiver, &trade.requesting);

    if offer_value <= rules.acceptance_margin * request_value {
        tracing::debug!(trade_id = %trade.id, offer_value, request_value, "Trade rejected");
        return TradeOutcome::Cancelled(CancelReason::Rejected);
    }

    if execute(trade, tribes) {
        tracing::debug!(trade_id = %trade.id, offer_value, request_value, "Trade accepted");
        TradeOutcome::Accepted
    } else {
        tracing::debug!(trade_id = %trade.id, "Trade cancelled on shortfall");
        TradeOutcome::Cancelled(CancelReason::Shortfall)
    }
}

/// Swap the trade's resources if both sides can cover them.
///
/// Both pools are checked before either is touched, so a failed execution
/// leaves both tribes unchanged.
fn execute(trade: &Trade, tribes: &mut BTreeMap<TribeId, Tribe>) -> bool {
    let covered = tribes
        .get(&trade.from)
        .is_some_and(|from| from.has_resources(&trade.offering))
        && tribes
            .get(&trade.to)
            .is_some_and(|to| to.has_resources(&trade.requesting));
    if !covered {
        return false;
    }

    if let Some(from) = tribes.get_mut(&trade.from) {
        for (resource, amount) in &trade.offering {
            from.remove_resource(*resource, *amount);
        }
        for (resource, amount) in &trade.requesting {
            from.add_resource(*resource, *amount);
        }
    }
    if let Some(to) = tribes.get_mut(&trade.to) {
        for (resource, amount) in &trade.requesting {
            to.remove_resource(*resource, *amount);
        }
        for (resource, amount) in &trade.offering {
            to.add_resource(*resource, *amount);
        }
    }
    true
}

/// Raise trust in both directions, capped at 1.0.
fn raise_trust(
    ledger: &mut BTreeMap<(TribeId, TribeId), f64>,
    rules: &TradeRules,
    a: TribeId,
    b: TribeId,
) {
    for key in [(a, b), (b, a)] {
        let current = ledger.get(&key).copied().unwrap_or(rules.default_trust);
        ledger.insert(key, (current + rules.trust_gain).clamp(0.0, 1.0));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use civitas_types::EntityId;

    use crate::entity::{EntityRecord, EntityTable};
    use crate::rules::TribeRules;

    use super::*;

    fn bundle(items: &[(Resource, f64)]) -> ResourceMap {
        items.iter().copied().collect()
    }

    fn tribe(table: &mut EntityTable, id: u64, holdings: &[(Resource, f64)]) -> Tribe {
        let founder: EntityId = table.insert(EntityRecord::new(Default::default(), 100.0));
        let mut tribe = Tribe::found(TribeId(id), format!("T{id}"), founder, 0, &*table, &TribeRules::default());
        for &(resource, amount) in holdings {
            tribe.add_resource(resource, amount);
        }
        tribe
    }

    fn two_tribes(a: &[(Resource, f64)], b: &[(Resource, f64)]) -> BTreeMap<TribeId, Tribe> {
        let mut table = EntityTable::new();
        let mut tribes = BTreeMap::new();
        tribes.insert(TribeId(1), tribe(&mut table, 1, a));
        tribes.insert(TribeId(2), tribe(&mut table, 2, b));
        tribes
    }

    fn trusting_system() -> TradeSystem {
        let mut system = TradeSystem::new(TradeRules::default());
        system.set_trust(TribeId(1), TribeId(2), 0.5);
        system
    }

    #[test]
    fn scarcity_curve() {
        assert!((scarcity_value(Resource::Food, 10.0) - 2.0).abs() < f64::EPSILON);
        assert!((scarcity_value(Resource::Food, 20.0) - 1.0).abs() < f64::EPSILON);
        assert!((scarcity_value(Resource::Food, 101.0) - 0.5).abs() < f64::EPSILON);
        assert!((scarcity_value(Resource::Stone, 5.0) - 1.5).abs() < f64::EPSILON);
        assert!((scarcity_value(Resource::Wood, 50.0) - 0.8).abs() < f64::EPSILON);
        assert!((scarcity_value(Resource::Wood, 60.0) - 0.3).abs() < f64::EPSILON);
        assert!((scarcity_value(Resource::Ore, 0.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn default_trust_blocks_proposals() {
        let mut system = TradeSystem::new(TradeRules::default());
        let result = system.propose_trade(TribeId(1), TribeId(2), ResourceMap::new(), ResourceMap::new());
        assert!(matches!(result, Err(TradeError::TrustTooLow { .. })));
        assert!(system.trades().is_empty());
    }

    #[test]
    fn trust_is_directional_and_clamped() {
        let mut system = TradeSystem::new(TradeRules::default());
        system.set_trust(TribeId(1), TribeId(2), 7.0);
        system.set_trust(TribeId(2), TribeId(1), -1.0);
        assert!((system.trust(TribeId(1), TribeId(2)) - 1.0).abs() < f64::EPSILON);
        assert!(system.trust(TribeId(2), TribeId(1)).abs() < f64::EPSILON);
        assert!((system.trust(TribeId(1), TribeId(3)) - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn self_trade_and_bad_amounts_rejected() {
        let mut system = trusting_system();
        assert_eq!(
            system.propose_trade(TribeId(1), TribeId(1), ResourceMap::new(), ResourceMap::new()),
            Err(TradeError::SelfTrade(TribeId(1)))
        );
        let result = system.propose_trade(
            TribeId(1),
            TribeId(2),
            bundle(&[(Resource::Food, -1.0)]),
            ResourceMap::new(),
        );
        assert!(matches!(result, Err(TradeError::InvalidAmount { .. })));
        assert!(system.trades().is_empty());
    }

    #[test]
    fn favourable_trade_executes_in_same_pass() {
        let holdings = [(Resource::Food, 10.0), (Resource::Wood, 60.0)];
        let mut tribes = two_tribes(&holdings, &holdings);
        let mut system = trusting_system();
        let id = system
            .propose_trade(
                TribeId(1),
                TribeId(2),
                bundle(&[(Resource::Food, 5.0)]),
                bundle(&[(Resource::Wood, 10.0)]),
            )
            .unwrap();

        let resolutions = system.process_trades(&mut tribes);

        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].outcome, TradeOutcome::Accepted);
        assert_eq!(system.trade(id).map(|trade| trade.status), Some(TradeStatus::Active));
        assert_eq!(system.trade(id).map(|trade| trade.duration), Some(100));
        let a = &tribes[&TribeId(1)];
        let b = &tribes[&TribeId(2)];
        assert!((a.resource(Resource::Food) - 5.0).abs() < 1e-9);
        assert!((a.resource(Resource::Wood) - 70.0).abs() < 1e-9);
        assert!((b.resource(Resource::Food) - 15.0).abs() < 1e-9);
        assert!((b.resource(Resource::Wood) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn poor_offer_is_rejected_and_evicted() {
        let mut tribes = two_tribes(&[(Resource::Wood, 60.0)], &[(Resource::Food, 10.0)]);
        let mut system = trusting_system();
        system
            .propose_trade(
                TribeId(1),
                TribeId(2),
                bundle(&[(Resource::Wood, 1.0)]),
                bundle(&[(Resource::Food, 5.0)]),
            )
            .unwrap();

        let resolutions = system.process_trades(&mut tribes);

        assert_eq!(
            resolutions[0].outcome,
            TradeOutcome::Cancelled(CancelReason::Rejected)
        );
        assert!(system.trades().is_empty());
    }

    #[test]
    fn shortfall_cancels_without_transfer() {
        // Receiver values the food highly but holds no wood to pay with.
        let mut tribes = two_tribes(&[(Resource::Food, 10.0)], &[(Resource::Food, 1.0)]);
        let mut system = trusting_system();
        system
            .propose_trade(
                TribeId(1),
                TribeId(2),
                bundle(&[(Resource::Food, 5.0)]),
                bundle(&[(Resource::Wood, 1.0)]),
            )
            .unwrap();

        let resolutions = system.process_trades(&mut tribes);

        assert_eq!(
            resolutions[0].outcome,
            TradeOutcome::Cancelled(CancelReason::Shortfall)
        );
        assert!((tribes[&TribeId(1)].resource(Resource::Food) - 10.0).abs() < 1e-9);
        assert!((tribes[&TribeId(2)].resource(Resource::Food) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn completion_raises_trust_both_ways() {
        let holdings = [(Resource::Food, 10.0), (Resource::Wood, 60.0)];
        let mut tribes = two_tribes(&holdings, &holdings);
        let rules = TradeRules {
            duration_ticks: 2,
            ..TradeRules::default()
        };
        let mut system = TradeSystem::new(rules);
        system.set_trust(TribeId(1), TribeId(2), 0.95);
        system
            .propose_trade(
                TribeId(1),
                TribeId(2),
                bundle(&[(Resource::Food, 5.0)]),
                bundle(&[(Resource::Wood, 10.0)]),
            )
            .unwrap();

        system.process_trades(&mut tribes);
        assert!(system.process_trades(&mut tribes).is_empty());
        let last = system.process_trades(&mut tribes);

        assert_eq!(last[0].outcome, TradeOutcome::Completed);
        assert!(system.trades().is_empty());
        assert!((system.trust(TribeId(1), TribeId(2)) - 1.0).abs() < f64::EPSILON);
        assert!((system.trust(TribeId(2), TribeId(1)) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn missing_partner_cancels() {
        let holdings = [(Resource::Food, 10.0), (Resource::Wood, 60.0)];
        let mut tribes = two_tribes(&holdings, &holdings);
        let mut system = trusting_system();
        system
            .propose_trade(
                TribeId(1),
                TribeId(2),
                bundle(&[(Resource::Food, 5.0)]),
                bundle(&[(Resource::Wood, 10.0)]),
            )
            .unwrap();
        system.process_trades(&mut tribes);
        tribes.remove(&TribeId(2));

        let resolutions = system.process_trades(&mut tribes);

        assert_eq!(
            resolutions[0].outcome,
            TradeOutcome::Cancelled(CancelReason::PartnerMissing)
        );
        assert_eq!(system.active_count(), 0);
    }
}
