//! Enumeration types for the Civitas civilization layer.
//!
//! Every enum derives `Ord` so that maps keyed by these types iterate in
//! declaration order. Resource valuation and random trade generation rely on
//! that fixed order to stay reproducible across runs and platforms.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A resource kind held by tribes and stored in structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Edible stock; also pays structure maintenance.
    Food,
    /// Lumber, the main building material.
    Wood,
    /// Quarried stone for durable structures.
    Stone,
    /// Fresh water.
    Water,
    /// Raw ore.
    Ore,
}

impl Resource {
    /// Every resource kind in declaration order.
    pub const ALL: [Self; 5] = [Self::Food, Self::Wood, Self::Stone, Self::Water, Self::Ore];

    /// Stable lowercase name, used in event metadata and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Wood => "wood",
            Self::Stone => "stone",
            Self::Water => "water",
            Self::Ore => "ore",
        }
    }
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Structures
// ---------------------------------------------------------------------------

/// The kind of installation a tribe can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    /// Shelter for members.
    Nest,
    /// Food storage; stored food spoils slowly.
    Cache,
    /// Defensive wall.
    Barrier,
    /// Passive hunting installation that occasionally yields food.
    Trap,
    /// Produces food while in good repair.
    Farm,
    /// Water source.
    Well,
    /// Lookout tower.
    Tower,
    /// Trading post.
    Market,
}

impl StructureType {
    /// Every structure type in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Nest,
        Self::Cache,
        Self::Barrier,
        Self::Trap,
        Self::Farm,
        Self::Well,
        Self::Tower,
        Self::Market,
    ];

    /// Stable lowercase name, used in event metadata and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nest => "nest",
            Self::Cache => "cache",
            Self::Barrier => "barrier",
            Self::Trap => "trap",
            Self::Farm => "farm",
            Self::Well => "well",
            Self::Tower => "tower",
            Self::Market => "market",
        }
    }
}

impl core::fmt::Display for StructureType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// Negotiation state of a trade.
///
/// Transitions only move forward: `Proposed -> Active | Cancelled` and
/// `Active -> Completed | Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    /// Offered, awaiting evaluation by the receiving tribe.
    Proposed,
    /// Accepted and executed; running down its duration.
    Active,
    /// Ran its full duration.
    Completed,
    /// Rejected, unaffordable, or abandoned by a vanished partner.
    Cancelled,
}

impl TradeStatus {
    /// Whether no further transition is possible from this state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

// ---------------------------------------------------------------------------
// Culture
// ---------------------------------------------------------------------------

/// A cultural channel tracked as a running average over tribe members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CultureTrait {
    /// Mean member cooperation.
    Cooperation,
    /// Mean member aggression.
    Aggression,
    /// Mean member intelligence.
    Innovation,
}

impl CultureTrait {
    /// Every culture channel in declaration order.
    pub const ALL: [Self; 3] = [Self::Cooperation, Self::Aggression, Self::Innovation];

    /// Name of the entity trait this channel averages.
    pub const fn source_trait(self) -> &'static str {
        match self {
            Self::Cooperation => "cooperation",
            Self::Aggression => "aggression",
            Self::Innovation => "intelligence",
        }
    }

    /// Stable lowercase name of the channel itself.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cooperation => "cooperation",
            Self::Aggression => "aggression",
            Self::Innovation => "innovation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_order_matches_declaration() {
        let mut sorted = Resource::ALL;
        sorted.sort();
        assert_eq!(sorted, Resource::ALL);
    }

    #[test]
    fn innovation_is_sourced_from_intelligence() {
        assert_eq!(CultureTrait::Innovation.source_trait(), "intelligence");
        assert_eq!(CultureTrait::Innovation.as_str(), "innovation");
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TradeStatus::Proposed.is_terminal());
        assert!(!TradeStatus::Active.is_terminal());
        assert!(TradeStatus::Completed.is_terminal());
        assert!(TradeStatus::Cancelled.is_terminal());
    }

    #[test]
    fn structure_type_serializes_snake_case() {
        let json = serde_json::to_string(&StructureType::Market).unwrap_or_default();
        assert_eq!(json, "\"market\"");
    }
}
