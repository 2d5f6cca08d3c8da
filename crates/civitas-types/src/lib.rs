//! Shared type definitions for the Civitas civilization layer.
//!
//! This crate is the single source of truth for the identifiers, enums and
//! plain records used across the Civitas workspace.
//!
//! # Modules
//!
//! - [`ids`] -- Integer-backed identifier newtypes for entities, tribes,
//!   structures, and trades
//! - [`enums`] -- Resource kinds, structure types, trade status, culture traits
//! - [`structs`] -- Grid positions and the structured civilization event record

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{CultureTrait, Resource, StructureType, TradeStatus};
pub use ids::{EntityId, StructureId, TradeId, TribeId};
pub use structs::{CivEvent, CivEventKind, EVENT_CATEGORY, Position, ResourceMap};
