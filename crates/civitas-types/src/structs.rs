//! Plain data records shared across the workspace.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::Resource;

/// Resource amounts keyed by kind, iterated in declaration order.
pub type ResourceMap = BTreeMap<Resource, f64>;

/// Category attached to every event emitted by this layer.
pub const EVENT_CATEGORY: &str = "civilization";

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A cell on the outer simulation's world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Position {
    /// Create a position from grid coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// The kind of a civilization event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CivEventKind {
    /// A tribe finished constructing a structure.
    StructureBuilt,
    /// A structure decayed to nothing and was removed.
    StructureDestroyed,
    /// A tribe was founded.
    TribeFormed,
    /// A tribe lost its last member.
    TribeDisbanded,
    /// A tribe elected a different leader.
    TribeLeaderChanged,
    /// A tribe advanced a tech level.
    TechAdvancement,
    /// A tribe proposed a trade to another.
    TradeProposed,
    /// A proposed trade was accepted and executed.
    TradeAccepted,
    /// An active trade ran its full duration.
    TradeCompleted,
    /// A trade ended without completing.
    TradeCancelled,
}

impl CivEventKind {
    /// Stable snake-case name of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StructureBuilt => "structure_built",
            Self::StructureDestroyed => "structure_destroyed",
            Self::TribeFormed => "tribe_formed",
            Self::TribeDisbanded => "tribe_disbanded",
            Self::TribeLeaderChanged => "tribe_leader_changed",
            Self::TechAdvancement => "tech_advancement",
            Self::TradeProposed => "trade_proposed",
            Self::TradeAccepted => "trade_accepted",
            Self::TradeCompleted => "trade_completed",
            Self::TradeCancelled => "trade_cancelled",
        }
    }
}

impl core::fmt::Display for CivEventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured notification handed to the event sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CivEvent {
    /// The tick when this event occurred.
    pub tick: u64,
    /// The kind of event.
    pub kind: CivEventKind,
    /// Always [`EVENT_CATEGORY`].
    pub category: String,
    /// The component that raised the event (`tribe`, `civilization`, ...).
    pub source: String,
    /// Human-readable description.
    pub message: String,
    /// Where the event happened, if it has a location.
    pub position: Option<Position>,
    /// Kind-specific payload.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl CivEvent {
    /// Create an event with no position and empty metadata.
    pub fn new(
        tick: u64,
        kind: CivEventKind,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tick,
            kind,
            category: EVENT_CATEGORY.to_owned(),
            source: source.into(),
            message: message.into(),
            position: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a position.
    #[must_use]
    pub const fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Attach one metadata entry.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_owned(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_builder_sets_category_and_metadata() {
        let event = CivEvent::new(5, CivEventKind::TribeFormed, "civilization", "formed")
            .at(Position::new(1, 2))
            .with("members", 3);

        assert_eq!(event.category, EVENT_CATEGORY);
        assert_eq!(event.position, Some(Position::new(1, 2)));
        assert_eq!(event.metadata.get("members"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn kind_names_are_snake_case() {
        assert_eq!(CivEventKind::TribeLeaderChanged.as_str(), "tribe_leader_changed");
        assert_eq!(CivEventKind::TechAdvancement.to_string(), "tech_advancement");
    }
}
