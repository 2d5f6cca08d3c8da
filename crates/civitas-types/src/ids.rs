//! Type-safe identifier wrappers around `u64`.
//!
//! Every object in the civilization layer has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. Tribe, structure and
//! trade IDs are handed out by monotonically increasing counters owned by
//! their registries; entity IDs come from the outer simulation.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw identifier value.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the inner `u64` value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }

            /// Return the identifier that follows this one.
            ///
            /// Saturates at `u64::MAX` rather than wrapping.
            #[must_use]
            pub const fn next(self) -> Self {
                Self(self.0.saturating_add(1))
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of an entity owned by the outer simulation.
    EntityId
}

define_id! {
    /// Identifier of a tribe registered with the civilization system.
    TribeId
}

define_id! {
    /// Identifier of a structure built by a tribe.
    StructureId
}

define_id! {
    /// Identifier of a trade negotiated between two tribes.
    TradeId
}
