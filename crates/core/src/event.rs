//! Lifecycle events emitted while a run executes.

use crate::error::UnitError;
use crate::unit::UnitId;
use serde::Serialize;

/// One step of a run, in unit execution order.
///
/// Each unit produces a `BeforeInitialize` event followed by either
/// `Success` or `Failed`. Consumption of the event stream drives
/// execution: a unit's `initialize` only runs when the caller asks for
/// the event after its `BeforeInitialize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The unit is about to be initialized.
    BeforeInitialize {
        /// The unit being started
        unit: UnitId,
    },
    /// The unit initialized without error.
    Success {
        /// The unit that completed
        unit: UnitId,
    },
    /// The unit's `initialize` failed; the run continues with the next unit.
    Failed {
        /// The unit that failed
        unit: UnitId,
        /// The captured failure
        error: UnitError,
    },
}

impl LifecycleEvent {
    /// The unit this event concerns.
    pub fn unit(&self) -> UnitId {
        match self {
            Self::BeforeInitialize { unit } | Self::Success { unit } => *unit,
            Self::Failed { unit, .. } => *unit,
        }
    }

    /// Whether this is a `Failed` event.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
