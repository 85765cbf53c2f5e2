//! initflow core data model.
//!
//! This crate defines the unit abstraction and its optional capabilities,
//! the lifecycle event stream type, and the error types shared by the
//! execution engine and its callers.

#![warn(missing_docs)]

// Unit abstraction and input contract
mod unit;

// Run output
mod event;

// Resolution and execution failures
mod error;

// Re-exports
pub use error::{ResolveError, UnitError};
pub use event::LifecycleEvent;
pub use unit::{Unit, UnitFactory, UnitId, UnitSource};
