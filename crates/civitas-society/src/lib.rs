//! Tribes, structures, and inter-tribe trade for the Civitas simulation.
//!
//! This crate is the civilization layer: everything that happens to groups
//! of entities once they organise. It does not own the entities themselves;
//! it reads and mutates them through the [`EntityRegistry`] contract and
//! reports what happened through an optional [`EventSink`].
//!
//! All state lives in ordered containers and every random draw comes from an
//! RNG handle passed in by the caller, so two runs with the same seed and the
//! same entity behaviour produce the same history.
//!
//! # Modules
//!
//! - [`civilization`] -- The per-tick orchestrator ([`CivilizationSystem`])
//! - [`entity`] -- The entity registry contract and an in-memory table
//! - [`error`] -- Error types for building, repairing, trading, and founding
//! - [`events`] -- Event sink contract plus null, vector, and tracing sinks
//! - [`history`] -- Bounded audit trail of finished trades
//! - [`rules`] -- Tunable parameters ([`CivilizationRules`])
//! - [`structure`] -- Structure blueprints, decay, production, and repair
//! - [`trade`] -- Trust ledger and trade negotiation ([`TradeSystem`])
//! - [`tribe`] -- Membership, governance, culture, and upkeep ([`Tribe`])

pub mod civilization;
pub mod entity;
pub mod error;
pub mod events;
pub mod history;
pub mod rules;
pub mod structure;
pub mod trade;
pub mod tribe;

// Re-export primary types at crate root for convenience.
pub use civilization::{CivilizationSystem, TickSummary};
pub use entity::{EntityRecord, EntityRegistry, EntityTable, leadership_score, traits};
pub use error::{BuildError, DiplomacyError, FormTribeError, RepairError, TradeError};
pub use events::{CountingSink, EventSink, NullSink, TracingSink};
pub use history::{TradeHistory, TradeRecord};
pub use rules::{CivilizationRules, MarketRules, StructureRules, TradeRules, TribeRules};
pub use structure::{Blueprint, Structure, StructureRegistry, blueprint};
pub use trade::{CancelReason, Trade, TradeOutcome, TradeResolution, TradeSystem, scarcity_value};
pub use tribe::{Tribe, TribeStatus};
