//! Group-based unit selection with cross-group dependency validation.

use initflow_core::{ResolveError, Unit, UnitId};
use std::collections::HashMap;
use tracing::debug;

/// Selects the subset of units whose groups intersect a requested tag set.
///
/// An empty tag set disables filtering entirely: every unit is selected
/// and no dependency validation runs. With a non-empty tag set, only
/// units declaring the group capability can match, and each selected
/// unit's dependencies are validated against the *full* unit set.
pub struct GroupFilter {
    groups: Vec<String>,
}

impl GroupFilter {
    /// Create a filter for the requested group tags.
    pub fn new(groups: impl IntoIterator<Item = String>) -> Self {
        Self {
            groups: groups.into_iter().collect(),
        }
    }

    /// Select unit positions from `units`, in input order.
    ///
    /// `index` is the keyed map over the full unit set; dependency lookups
    /// go through it so a dependency outside the selected subset still
    /// resolves. Each unit appears at most once even when it matches
    /// several requested tags.
    pub fn select(
        &self,
        units: &[Box<dyn Unit>],
        index: &HashMap<UnitId, usize>,
    ) -> Result<Vec<usize>, ResolveError> {
        if self.groups.is_empty() {
            return Ok((0..units.len()).collect());
        }

        let mut selected = Vec::new();

        for (pos, unit) in units.iter().enumerate() {
            let Some(unit_groups) = unit.groups() else {
                continue;
            };

            if !unit_groups.iter().any(|g| self.groups.contains(g)) {
                continue;
            }

            self.check_dependencies(unit.as_ref(), &unit_groups, units, index)?;
            debug!(unit = %unit.id(), "unit matched requested groups");
            selected.push(pos);
        }

        Ok(selected)
    }

    /// Validate a selected unit's dependencies against the full set.
    ///
    /// A dependency must exist, must itself declare groups, and must
    /// share at least one group with the dependent's own group set (not
    /// with the requested tags).
    fn check_dependencies(
        &self,
        unit: &dyn Unit,
        unit_groups: &[String],
        units: &[Box<dyn Unit>],
        index: &HashMap<UnitId, usize>,
    ) -> Result<(), ResolveError> {
        let Some(dependencies) = unit.dependencies() else {
            return Ok(());
        };

        for dependency in dependencies {
            let Some(&dep_pos) = index.get(&dependency) else {
                return Err(ResolveError::DependencyNotFound {
                    unit: unit.id(),
                    dependency,
                });
            };

            let Some(dep_groups) = units[dep_pos].groups() else {
                return Err(ResolveError::DependencyNotGrouped {
                    unit: unit.id(),
                    dependency,
                });
            };

            if !dep_groups.iter().any(|g| unit_groups.contains(g)) {
                return Err(ResolveError::NoCommonGroup {
                    unit: unit.id(),
                    dependency,
                });
            }
        }

        Ok(())
    }
}
