//! Error types for resolution and unit execution.

use crate::unit::UnitId;
use serde::Serialize;

/// Failure raised by a unit's own `initialize` call.
///
/// Unlike [`ResolveError`], a `UnitError` is never fatal to a run: the
/// engine catches it and surfaces it as a `failed` lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("{message}")]
pub struct UnitError {
    /// Human-readable failure description.
    pub message: String,
}

impl UnitError {
    /// Create a unit error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for UnitError {
    fn from(err: anyhow::Error) -> Self {
        // {:#} keeps the context chain in one line
        Self::new(format!("{err:#}"))
    }
}

/// Fatal errors raised while resolving a run.
///
/// Every variant aborts the whole run before any unit executes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Input element could not be resolved to a unit
    #[error("\"{name}\" cannot be resolved to an initializer unit")]
    InvalidUnit {
        /// The offending name or type
        name: String,
    },

    /// A unit listed itself as a dependency
    #[error("unit \"{unit}\" can't have itself as a dependency")]
    SelfDependency {
        /// The self-depending unit
        unit: UnitId,
    },

    /// A dependency is absent from the full unit set
    #[error("dependency \"{dependency}\" of \"{unit}\" not found in the unit set")]
    DependencyNotFound {
        /// The dependent unit
        unit: UnitId,
        /// The missing dependency
        dependency: UnitId,
    },

    /// A dependency declares no groups at all
    #[error("dependency \"{dependency}\" of \"{unit}\" is not part of any group")]
    DependencyNotGrouped {
        /// The dependent unit
        unit: UnitId,
        /// The ungrouped dependency
        dependency: UnitId,
    },

    /// A dependency shares no group with its dependent
    #[error("dependency \"{dependency}\" is not part of a common group with \"{unit}\"")]
    NoCommonGroup {
        /// The dependent unit
        unit: UnitId,
        /// The dependency with disjoint groups
        dependency: UnitId,
    },

    /// Fixed-point sequencing could not resolve the remaining units
    #[error("units {} have circular dependencies", join_ids(.stuck))]
    CircularDependency {
        /// Every unit left unsequenced
        stuck: Vec<UnitId>,
    },
}

fn join_ids(ids: &[UnitId]) -> String {
    ids.iter()
        .map(|id| format!("\"{id}\""))
        .collect::<Vec<_>>()
        .join(", ")
}
