//! End-to-end tests for the civilization orchestrator.
//!
//! These drive [`CivilizationSystem::update`] over an in-memory
//! [`EntityTable`] and inspect the collected event stream, the tribes'
//! pools, and the trust ledger.

#![allow(clippy::unwrap_used)]

use civitas_society::{
    CancelReason, CivilizationRules, CivilizationSystem, EntityRecord, EntityTable, TradeOutcome,
    traits,
};
use civitas_types::{
    CivEvent, CivEventKind, EntityId, Position, Resource, ResourceMap, StructureType, TradeStatus,
    TribeId,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn spawn(table: &mut EntityTable, x: i32, intelligence: f64, cooperation: f64) -> EntityId {
    table.insert(
        EntityRecord::new(Position::new(x, 0), 200.0)
            .with_trait(traits::INTELLIGENCE, intelligence)
            .with_trait(traits::COOPERATION, cooperation),
    )
}

fn calm_rules() -> CivilizationRules {
    let mut rules = CivilizationRules::default();
    rules.tribe.research_rate = 0.0;
    rules.market.random_trade_chance = 0.0;
    rules
}

fn bundle(resource: Resource, amount: f64) -> ResourceMap {
    ResourceMap::from([(resource, amount)])
}

/// Two single-member tribes holding `a` and `b`, with A trusting B at 0.5.
fn trading_pair(
    a: &[(Resource, f64)],
    b: &[(Resource, f64)],
) -> (EntityTable, CivilizationSystem<Vec<CivEvent>>, TribeId, TribeId) {
    let mut table = EntityTable::new();
    let founder_a = spawn(&mut table, 0, 0.6, 0.6);
    let founder_b = spawn(&mut table, 10, 0.6, 0.6);
    let mut civ = CivilizationSystem::with_sink(calm_rules(), Vec::new());
    let first = civ.form_tribe(&[founder_a], "Alder", 0, &table).unwrap();
    let second = civ.form_tribe(&[founder_b], "Birch", 0, &table).unwrap();
    for (id, holdings) in [(first, a), (second, b)] {
        let tribe = civ.tribe_mut(id).unwrap();
        for &(resource, amount) in holdings {
            tribe.add_resource(resource, amount);
        }
    }
    civ.set_trust(first, second, 0.5);
    (table, civ, first, second)
}

fn kinds(events: &[CivEvent]) -> Vec<CivEventKind> {
    events.iter().map(|event| event.kind).collect()
}

#[test]
fn favourable_trade_is_accepted_executed_and_completed() {
    let holdings = [(Resource::Food, 10.0), (Resource::Wood, 60.0)];
    let (table, mut civ, a, b) = trading_pair(&holdings, &holdings);
    let mut rng = SmallRng::seed_from_u64(42);

    // Worth 10 to B against a request worth 3 (margin 3.3).
    let trade = civ
        .propose_trade(0, a, b, bundle(Resource::Food, 5.0), bundle(Resource::Wood, 10.0))
        .unwrap();

    let summary = civ.update(1, &table, &mut rng);
    assert_eq!(summary.trades.len(), 1);
    assert_eq!(summary.trades[0].outcome, TradeOutcome::Accepted);
    assert_eq!(summary.active_trades, 1);

    let tribe_a = civ.tribe(a).unwrap();
    let tribe_b = civ.tribe(b).unwrap();
    assert!((tribe_a.resource(Resource::Food) - 5.0).abs() < 1e-9);
    assert!((tribe_a.resource(Resource::Wood) - 70.0).abs() < 1e-9);
    assert!((tribe_b.resource(Resource::Food) - 15.0).abs() < 1e-9);
    assert!((tribe_b.resource(Resource::Wood) - 50.0).abs() < 1e-9);

    for tick in 2..=100 {
        let summary = civ.update(tick, &table, &mut rng);
        assert!(summary.trades.is_empty(), "trade resolved early at tick {tick}");
    }
    let summary = civ.update(101, &table, &mut rng);
    assert_eq!(summary.trades[0].outcome, TradeOutcome::Completed);
    assert!(civ.trade_system().trade(trade).is_none());

    assert!((civ.trust(a, b) - 0.6).abs() < 1e-9);
    assert!((civ.trust(b, a) - 0.2).abs() < 1e-9);

    let record = civ.history().records().next().copied().unwrap();
    assert_eq!(record.trade_id, trade);
    assert_eq!(record.status, TradeStatus::Completed);
    assert_eq!(record.tick, 101);

    let trade_kinds: Vec<_> = kinds(civ.sink())
        .into_iter()
        .filter(|kind| kind.as_str().starts_with("trade_"))
        .collect();
    assert_eq!(
        trade_kinds,
        vec![
            CivEventKind::TradeProposed,
            CivEventKind::TradeAccepted,
            CivEventKind::TradeCompleted,
        ]
    );
}

#[test]
fn uncovered_offer_is_cancelled_without_transfer() {
    let (table, mut civ, a, b) = trading_pair(
        &[(Resource::Food, 3.0)],
        &[(Resource::Food, 10.0), (Resource::Wood, 60.0)],
    );
    let mut rng = SmallRng::seed_from_u64(42);

    civ.propose_trade(0, a, b, bundle(Resource::Food, 5.0), bundle(Resource::Wood, 10.0))
        .unwrap();
    let summary = civ.update(1, &table, &mut rng);

    assert_eq!(
        summary.trades[0].outcome,
        TradeOutcome::Cancelled(CancelReason::Shortfall)
    );
    assert_eq!(summary.active_trades, 0);
    assert!((civ.tribe(a).unwrap().resource(Resource::Food) - 3.0).abs() < 1e-9);
    assert!((civ.tribe(b).unwrap().resource(Resource::Wood) - 60.0).abs() < 1e-9);

    let cancelled = civ
        .sink()
        .iter()
        .find(|event| event.kind == CivEventKind::TradeCancelled)
        .unwrap();
    assert_eq!(
        cancelled.metadata.get("reason"),
        Some(&serde_json::json!("shortfall"))
    );
}

#[test]
fn trust_never_exceeds_one() {
    let holdings = [(Resource::Food, 1000.0), (Resource::Wood, 1000.0)];
    let (table, mut civ, a, b) = trading_pair(&holdings, &holdings);
    civ.set_trust(b, a, 0.5);
    let mut rng = SmallRng::seed_from_u64(7);
    let mut tick = 0;

    for _ in 0..12 {
        // Abundant food is worth 0.5, abundant wood 0.3: 1.0 > 1.1 * 0.6.
        civ.propose_trade(tick, a, b, bundle(Resource::Food, 2.0), bundle(Resource::Wood, 2.0))
            .unwrap();
        for _ in 0..=100 {
            tick += 1;
            civ.update(tick, &table, &mut rng);
        }
        assert!(civ.trust(a, b) <= 1.0);
        assert!(civ.trust(b, a) <= 1.0);
    }

    assert!((civ.trust(a, b) - 1.0).abs() < f64::EPSILON);
    assert_eq!(civ.history().completed_count(), 12);
}

#[test]
fn dying_tribe_cancels_its_trades() {
    let holdings = [(Resource::Food, 10.0), (Resource::Wood, 60.0)];
    let (mut table, mut civ, a, b) = trading_pair(&holdings, &holdings);
    let mut rng = SmallRng::seed_from_u64(1);
    civ.propose_trade(0, a, b, bundle(Resource::Food, 5.0), bundle(Resource::Wood, 10.0))
        .unwrap();
    civ.update(1, &table, &mut rng);

    let leader_b = civ.tribe(b).unwrap().leader().unwrap();
    table.kill(leader_b);
    let summary = civ.update(2, &table, &mut rng);

    assert_eq!(summary.disbanded, vec![b]);
    assert_eq!(
        summary.trades[0].outcome,
        TradeOutcome::Cancelled(CancelReason::PartnerMissing)
    );
    assert_eq!(civ.trade_system().active_count(), 0);
}

/// Run a busy scenario: three tribes, certain research and market rolls,
/// and a leader building whatever it can afford each tick.
fn busy_run(seed: u64) -> Vec<CivEvent> {
    let mut table = EntityTable::new();
    let mut rules = CivilizationRules::default();
    rules.tribe.research_rate = 0.05;
    rules.market.random_trade_chance = 0.5;
    let mut civ = CivilizationSystem::with_sink(rules, Vec::new());
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut tribes = Vec::new();
    for group in 0..3_i32 {
        let members: Vec<EntityId> = (0..4)
            .map(|offset| {
                spawn(
                    &mut table,
                    group * 10 + offset,
                    f64::from(offset) * 0.2 + 0.2,
                    0.5,
                )
            })
            .collect();
        let id = civ.form_tribe(&members, &format!("G{group}"), 0, &table).unwrap();
        let tribe = civ.tribe_mut(id).unwrap();
        tribe.add_resource(Resource::Wood, 200.0 + f64::from(group) * 40.0);
        tribe.add_resource(Resource::Food, 5.0 + f64::from(group) * 60.0);
        tribe.add_resource(Resource::Stone, 8.0);
        tribes.push(id);
    }
    for &from in &tribes {
        for &to in &tribes {
            if from != to {
                civ.set_trust(from, to, 0.4);
            }
        }
    }

    for tick in 1..=300 {
        civ.update(tick, &table, &mut rng);
        for &id in &tribes {
            let Some(tribe) = civ.tribe(id) else { continue };
            let Some(leader) = tribe.leader() else { continue };
            if tribe.can_build(StructureType::Nest) {
                let position = Position::new(i32::try_from(tick).unwrap_or(0), 0);
                civ.build_structure(id, StructureType::Nest, position, leader, tick)
                    .unwrap();
            }
        }
    }
    civ.into_sink()
}

#[test]
fn identical_seeds_produce_identical_histories() {
    let first = busy_run(2024);
    let second = busy_run(2024);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}
