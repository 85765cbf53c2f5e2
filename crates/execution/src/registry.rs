//! Unit registry - turns raw input into validated unit instances.

use initflow_core::{ResolveError, Unit, UnitFactory, UnitId, UnitSource};
use std::collections::HashMap;
use tracing::debug;

/// Resolves a raw input collection into executable unit instances.
///
/// Input elements are either built instances, passed through unchanged,
/// or names resolved through the configured [`UnitFactory`]. Input order
/// is preserved; it is the natural order the sequencer falls back to.
pub struct UnitRegistry {
    factory: Option<Box<dyn UnitFactory>>,
}

impl UnitRegistry {
    /// Create a registry without a factory; named sources will be rejected.
    pub fn new() -> Self {
        Self { factory: None }
    }

    /// Set the factory used to resolve named sources.
    pub fn with_factory(mut self, factory: Box<dyn UnitFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Resolve `sources` into unit instances, preserving input order.
    ///
    /// Fails with [`ResolveError::InvalidUnit`] when a named element
    /// cannot be resolved to a unit.
    pub fn register(&self, sources: Vec<UnitSource>) -> Result<Vec<Box<dyn Unit>>, ResolveError> {
        let mut units = Vec::with_capacity(sources.len());

        for source in sources {
            let unit = match source {
                UnitSource::Instance(unit) => unit,
                UnitSource::Named(name) => self
                    .factory
                    .as_ref()
                    .and_then(|f| f.build(&name))
                    .ok_or(ResolveError::InvalidUnit { name })?,
            };
            debug!(unit = %unit.id(), "registered unit");
            units.push(unit);
        }

        Ok(units)
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the keyed lookup map from identity to position in `units`.
///
/// Duplicate identities are not reported; the last occurrence wins.
pub fn index_by_id(units: &[Box<dyn Unit>]) -> HashMap<UnitId, usize> {
    let mut index = HashMap::with_capacity(units.len());
    for (pos, unit) in units.iter().enumerate() {
        index.insert(unit.id(), pos);
    }
    index
}
