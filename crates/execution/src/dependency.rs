//! Reverse dependency index over a unit set.

use initflow_core::{Unit, UnitId};
use std::collections::HashMap;

/// Reverse dependency index: dependency identity to the units that
/// declared it.
///
/// Purely diagnostic bookkeeping; ordering never consults it. Existence
/// of the recorded dependencies is not checked here (that is the group
/// filter's concern).
#[derive(Debug, Default)]
pub struct DependencyIndex {
    dependents: HashMap<UnitId, Vec<UnitId>>,
}

impl DependencyIndex {
    /// Build the index from a unit set.
    ///
    /// Units without the dependency capability contribute nothing.
    pub fn build(units: &[Box<dyn Unit>]) -> Self {
        let mut dependents: HashMap<UnitId, Vec<UnitId>> = HashMap::new();

        for unit in units {
            if let Some(dependencies) = unit.dependencies() {
                for dependency in dependencies {
                    dependents.entry(dependency).or_default().push(unit.id());
                }
            }
        }

        Self { dependents }
    }

    /// Units that declared `id` as a dependency, in input order.
    pub fn dependents_of(&self, id: UnitId) -> &[UnitId] {
        self.dependents.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any unit depends on `id`.
    pub fn is_depended_on(&self, id: UnitId) -> bool {
        !self.dependents_of(id).is_empty()
    }
}
