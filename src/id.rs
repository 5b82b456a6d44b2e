//! Entity identifiers.
//!
//! Every entity class draws its ids from its own process-wide counter. Ids are
//! strictly increasing per class and are never handed out twice, even after
//! the entity they named has been deleted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// The entity classes that own an id counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityClass {
    Store,
    Project,
    Song,
    Pattern,
    Note,
    /// Instruments and controllers share one class so a generator id is
    /// unambiguous within a project.
    Generator,
}

impl EntityClass {
    fn counter(self) -> &'static AtomicU64 {
        static COUNTERS: [AtomicU64; 6] = [
            AtomicU64::new(1),
            AtomicU64::new(1),
            AtomicU64::new(1),
            AtomicU64::new(1),
            AtomicU64::new(1),
            AtomicU64::new(1),
        ];
        &COUNTERS[self as usize]
    }
}

/// Issues the next id for `class`.
///
/// Thread-safe: uses an atomic increment internally. Never fails.
pub fn next_id(class: EntityClass) -> u64 {
    class.counter().fetch_add(1, Ordering::Relaxed)
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident => $class:expr) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Allocates a fresh id.
            pub fn new() -> Self {
                Self(next_id($class))
            }

            /// Wraps a raw value received across the caller boundary.
            ///
            /// This does not allocate; the value is only meaningful if it was
            /// previously issued by the store.
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw id value.
            pub const fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifies a [`Store`](crate::model::Store).
    StoreId => EntityClass::Store
);
entity_id!(
    /// Identifies a [`Project`](crate::model::Project).
    ProjectId => EntityClass::Project
);
entity_id!(
    /// Identifies a [`Song`](crate::model::Song).
    SongId => EntityClass::Song
);
entity_id!(
    /// Identifies a [`Pattern`](crate::model::Pattern).
    PatternId => EntityClass::Pattern
);
entity_id!(
    /// Identifies a [`Note`](crate::model::Note). Unique store-wide.
    NoteId => EntityClass::Note
);
entity_id!(
    /// Identifies an instrument or a controller.
    GeneratorId => EntityClass::Generator
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let ids: Vec<u64> = (0..50).map(|_| NoteId::new().as_u64()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_classes_have_independent_counters() {
        let before = PatternId::new().as_u64();
        for _ in 0..10 {
            GeneratorId::new();
        }
        let after = PatternId::new().as_u64();
        // Other tests may allocate patterns concurrently, so only ordering is
        // guaranteed.
        assert!(after > before);
    }
}
