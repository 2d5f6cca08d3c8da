//! Error types for the civitas-society crate.
//!
//! Every fallible operation returns a typed error and leaves state untouched
//! when it fails. Nothing here is fatal to the surrounding simulation: the
//! caller decides whether to retry, log, or ignore.

use civitas_types::{EntityId, Resource, StructureId, StructureType, TribeId};

/// Reasons a tribe cannot build a structure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// The tribe's tech level is below the structure's tier.
    #[error("{structure_type} requires tech level {required}, tribe is at {current}")]
    TechTooLow {
        /// The structure that was requested.
        structure_type: StructureType,
        /// Tier required by the structure.
        required: u32,
        /// The tribe's current tech level.
        current: u32,
    },

    /// The tribe's pool does not cover the construction cost.
    #[error("{structure_type} needs {needed} {resource}, tribe has {available}")]
    InsufficientResources {
        /// The structure that was requested.
        structure_type: StructureType,
        /// The first resource found short.
        resource: Resource,
        /// Amount required.
        needed: f64,
        /// Amount held.
        available: f64,
    },

    /// No tribe with this ID is registered.
    #[error("tribe not found: {0}")]
    UnknownTribe(TribeId),
}

/// Reasons a repair attempt is refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepairError {
    /// The actor is unknown to the entity registry or dead.
    #[error("entity {0} is not a living entity")]
    ActorUnavailable(EntityId),

    /// The actor is not clever enough to repair anything.
    #[error("entity {actor} has intelligence {intelligence}, repairs need {required}")]
    Unqualified {
        /// The would-be repairer.
        actor: EntityId,
        /// The actor's intelligence.
        intelligence: f64,
        /// Minimum intelligence required.
        required: f64,
    },

    /// The actor cannot pay the energy cost.
    #[error("entity {actor} has {available} energy, repair costs {needed}")]
    InsufficientEnergy {
        /// The would-be repairer.
        actor: EntityId,
        /// Energy required.
        needed: f64,
        /// Energy held.
        available: f64,
    },

    /// The repair amount is not a positive finite number.
    #[error("invalid repair amount: {0}")]
    InvalidAmount(f64),

    /// No structure with this ID is registered.
    #[error("structure not found: {0}")]
    UnknownStructure(StructureId),
}

/// Reasons a trade proposal is refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TradeError {
    /// The proposer does not trust the receiver enough.
    #[error("trust from {from} to {to} is {trust}, proposals need {required}")]
    TrustTooLow {
        /// Proposing tribe.
        from: TribeId,
        /// Receiving tribe.
        to: TribeId,
        /// Current directional trust.
        trust: f64,
        /// Minimum trust required.
        required: f64,
    },

    /// Both sides of the trade are the same tribe.
    #[error("tribe {0} cannot trade with itself")]
    SelfTrade(TribeId),

    /// An amount in the terms is negative or not finite.
    #[error("invalid amount {amount} of {resource}")]
    InvalidAmount {
        /// Offending resource.
        resource: Resource,
        /// Offending amount.
        amount: f64,
    },

    /// No tribe with this ID is registered.
    #[error("tribe not found: {0}")]
    UnknownTribe(TribeId),
}

/// Reasons a tribe cannot be founded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormTribeError {
    /// None of the candidates is alive.
    #[error("no living candidate to found a tribe")]
    NoLivingCandidate,

    /// The best candidate does not meet the leadership threshold.
    #[error("best founder {candidate} scores {score}, founding needs {required}")]
    FounderScoreTooLow {
        /// Highest-scoring living candidate.
        candidate: EntityId,
        /// That candidate's leadership score.
        score: f64,
        /// Minimum score required.
        required: f64,
    },
}

/// Reasons a diplomatic relation cannot be recorded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiplomacyError {
    /// A tribe cannot ally with or oppose itself.
    #[error("tribe {0} cannot hold a relation with itself")]
    SelfRelation(TribeId),

    /// No tribe with this ID is registered.
    #[error("tribe not found: {0}")]
    UnknownTribe(TribeId),
}
