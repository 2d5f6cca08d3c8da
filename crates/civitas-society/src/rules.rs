//! Tunable parameters for tribes, structures, and trade.
//!
//! Every number that drives the per-tick behaviour of the civilization layer
//! lives here. The defaults are the canonical values; the engine may load
//! overrides from the `rules` section of `civitas-config.yaml`, and tests
//! construct the structs directly.

use serde::Deserialize;

/// Root of all civilization tunables.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CivilizationRules {
    /// Tribe governance, research, and maintenance.
    #[serde(default)]
    pub tribe: TribeRules,

    /// Structure decay, production, and repair.
    #[serde(default)]
    pub structure: StructureRules,

    /// Trust and negotiation parameters.
    #[serde(default)]
    pub trade: TradeRules,

    /// Random trade generation performed by the orchestrator.
    #[serde(default)]
    pub market: MarketRules,
}

/// Tunables applied by `Tribe` each tick.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TribeRules {
    /// Minimum leadership score a founder needs (default: 0.2).
    pub founder_min_score: f64,

    /// Weight of intelligence in the leadership score (default: 0.6).
    pub leader_intelligence_weight: f64,

    /// Weight of cooperation in the leadership score (default: 0.4).
    pub leader_cooperation_weight: f64,

    /// Scale applied to `avg intelligence * innovation` to get the
    /// per-tick research chance (default: 0.001).
    pub research_rate: f64,

    /// Extra health lost by an active structure whose upkeep cannot be paid
    /// (default: 2.0).
    pub unpaid_upkeep_damage: f64,

    /// Starting value of every culture channel (default: 0.5).
    pub initial_culture: f64,
}

impl Default for TribeRules {
    fn default() -> Self {
        Self {
            founder_min_score: 0.2,
            leader_intelligence_weight: 0.6,
            leader_cooperation_weight: 0.4,
            research_rate: 0.001,
            unpaid_upkeep_damage: 2.0,
            initial_culture: 0.5,
        }
    }
}

/// Tunables applied by `Structure` each tick and on repair.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StructureRules {
    /// Health lost by every active structure each tick (default: 0.1).
    pub decay_per_tick: f64,

    /// Fraction of max health a farm needs to produce (default: 0.5).
    pub farm_min_health_ratio: f64,

    /// Guaranteed farm yield per tick (default: 2.0).
    pub farm_base_yield: f64,

    /// Width of the uniform bonus added to the farm yield (default: 3.0).
    pub farm_yield_spread: f64,

    /// Fraction of cached food kept each tick (default: 0.99).
    pub cache_retention: f64,

    /// Chance per tick that a trap catches something (default: 0.05).
    pub trap_chance: f64,

    /// Guaranteed food from a sprung trap (default: 10.0).
    pub trap_base_yield: f64,

    /// Width of the uniform bonus added to a trap catch (default: 15.0).
    pub trap_yield_spread: f64,

    /// Minimum actor intelligence to repair anything (default: 0.3).
    pub repair_min_intelligence: f64,

    /// Energy spent per point of health restored (default: 2.0).
    pub repair_energy_per_point: f64,
}

impl Default for StructureRules {
    fn default() -> Self {
        Self {
            decay_per_tick: 0.1,
            farm_min_health_ratio: 0.5,
            farm_base_yield: 2.0,
            farm_yield_spread: 3.0,
            cache_retention: 0.99,
            trap_chance: 0.05,
            trap_base_yield: 10.0,
            trap_yield_spread: 15.0,
            repair_min_intelligence: 0.3,
            repair_energy_per_point: 2.0,
        }
    }
}

/// Tunables for the trust ledger and the negotiation state machine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TradeRules {
    /// Trust assumed between tribes that never traded (default: 0.1).
    pub default_trust: f64,

    /// Trust the proposer needs towards the receiver (default: 0.2).
    pub min_trust_to_propose: f64,

    /// Ticks an accepted trade stays active (default: 100).
    pub duration_ticks: u32,

    /// Offer must be worth more than this multiple of the request
    /// (default: 1.1).
    pub acceptance_margin: f64,

    /// Mutual trust gained when a trade completes (default: 0.1).
    pub trust_gain: f64,

    /// Terminal trades kept in the audit history; 0 disables it
    /// (default: 256).
    pub history_limit: usize,
}

impl Default for TradeRules {
    fn default() -> Self {
        Self {
            default_trust: 0.1,
            min_trust_to_propose: 0.2,
            duration_ticks: 100,
            acceptance_margin: 1.1,
            trust_gain: 0.1,
            history_limit: 256,
        }
    }
}

/// Tunables for the orchestrator's random trade proposals.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarketRules {
    /// Chance per tick of attempting a random trade (default: 0.05).
    pub random_trade_chance: f64,

    /// Holdings above this are offered (default: 50.0).
    pub surplus_threshold: f64,

    /// Share of a surplus that is offered (default: 0.2).
    pub surplus_offer_fraction: f64,

    /// Holdings below this are requested (default: 20.0).
    pub shortage_threshold: f64,

    /// Requests top a shortage up to this amount (default: 30.0).
    pub shortage_target: f64,
}

impl Default for MarketRules {
    fn default() -> Self {
        Self {
            random_trade_chance: 0.05,
            surplus_threshold: 50.0,
            surplus_offer_fraction: 0.2,
            shortage_threshold: 20.0,
            shortage_target: 30.0,
        }
    }
}

impl CivilizationRules {
    /// List every probability that lies outside `[0, 1]`, by field path.
    pub fn invalid_probabilities(&self) -> Vec<&'static str> {
        let checks = [
            ("structure.trap_chance", self.structure.trap_chance),
            ("structure.cache_retention", self.structure.cache_retention),
            ("trade.default_trust", self.trade.default_trust),
            ("trade.min_trust_to_propose", self.trade.min_trust_to_propose),
            ("market.random_trade_chance", self.market.random_trade_chance),
            ("market.surplus_offer_fraction", self.market.surplus_offer_fraction),
        ];
        checks
            .into_iter()
            .filter(|(_, value)| !(0.0..=1.0).contains(value))
            .map(|(name, _)| name)
            .collect()
    }
}
