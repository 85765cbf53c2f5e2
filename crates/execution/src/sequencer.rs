//! Dependency-ordered sequencing via fixed-point rank assignment.

use initflow_core::{ResolveError, Unit, UnitId};
use std::collections::HashMap;
use tracing::debug;

/// Sentinel rank for a dependent unit that has not been sequenced yet.
const UNSEQUENCED: i64 = -1;

/// Assigns each unit a total order consistent with its dependency
/// partial order.
///
/// Units without the dependency capability are eligible immediately
/// (rank `0`). Dependent units start unsequenced and receive a strictly
/// increasing rank once every declared dependency has one, so a
/// dependency always sorts before its dependents. Equal ranks keep input
/// order (the sort is stable).
pub struct Sequencer;

impl Sequencer {
    /// Create a new sequencer.
    pub fn new() -> Self {
        Self
    }

    /// Order the units at `selected` positions, returning positions into
    /// `units` sorted by assigned rank.
    ///
    /// Fails with [`ResolveError::SelfDependency`] when a unit lists its
    /// own identity, and with [`ResolveError::CircularDependency`] when
    /// a full pass over the unsequenced units makes no progress.
    pub fn order(
        &self,
        units: &[Box<dyn Unit>],
        selected: &[usize],
    ) -> Result<Vec<usize>, ResolveError> {
        let mut sequence: HashMap<UnitId, i64> = HashMap::with_capacity(selected.len());
        let mut position: HashMap<UnitId, usize> = HashMap::with_capacity(selected.len());
        // identities in first-occurrence order; this is the natural order
        // every pass iterates in
        let mut order: Vec<UnitId> = Vec::with_capacity(selected.len());

        for &pos in selected {
            let unit = &units[pos];
            let id = unit.id();

            match unit.dependencies() {
                Some(dependencies) => {
                    if dependencies.contains(&id) {
                        return Err(ResolveError::SelfDependency { unit: id });
                    }
                    sequence.insert(id, UNSEQUENCED);
                }
                None => {
                    sequence.insert(id, 0);
                }
            }

            if !position.contains_key(&id) {
                order.push(id);
            }
            // duplicate identities collapse; the last instance wins
            position.insert(id, pos);
        }

        let mut next_rank: i64 = 1;
        let mut last_count = usize::MAX;

        loop {
            let unsequenced: Vec<UnitId> = order
                .iter()
                .copied()
                .filter(|id| sequence[id] == UNSEQUENCED)
                .collect();

            if unsequenced.is_empty() {
                break;
            }

            // a pass with no progress means the remaining units block
            // each other
            if unsequenced.len() == last_count {
                return Err(ResolveError::CircularDependency { stuck: unsequenced });
            }

            for id in &unsequenced {
                let unit = &units[position[id]];
                let dependencies = unit.dependencies().unwrap_or_default();

                // a dependency absent from the table counts as satisfied;
                // existence checks are the group filter's concern
                let blocked = dependencies
                    .iter()
                    .any(|dep| sequence.get(dep) == Some(&UNSEQUENCED));

                if !blocked {
                    sequence.insert(*id, next_rank);
                    debug!(unit = %id, rank = next_rank, "sequenced unit");
                    next_rank += 1;
                }
            }

            last_count = unsequenced.len();
        }

        let mut ordered: Vec<usize> = order.iter().map(|id| position[id]).collect();
        ordered.sort_by_key(|&pos| sequence[&units[pos].id()]);

        Ok(ordered)
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}
