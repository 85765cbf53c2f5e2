//! initflow execution layer - unit registration, group filtering,
//! dependency sequencing, and the run driver.
//!
//! The pipeline runs raw input through the [`UnitRegistry`], builds the
//! diagnostic [`DependencyIndex`], selects a subset with the
//! [`GroupFilter`], orders it with the [`Sequencer`], and executes it
//! through [`InitializationManager::run`], which yields lifecycle events
//! one step at a time.

#![warn(missing_docs)]

pub mod registry;
pub mod dependency;
pub mod filter;
pub mod sequencer;
pub mod engine;

pub use dependency::DependencyIndex;
pub use engine::{InitializationManager, Run, RunSummary};
pub use filter::GroupFilter;
pub use registry::UnitRegistry;
pub use sequencer::Sequencer;
