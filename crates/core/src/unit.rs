//! The unit model - executable units and their optional capabilities.

use crate::error::UnitError;
use async_trait::async_trait;
use serde::Serialize;

/// Identity of a unit.
///
/// Two units share an identity when they are the same concrete type; the
/// identity is the type path. Dependencies and group validation all key
/// off this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UnitId(&'static str);

impl UnitId {
    /// Identity of the unit type `T`.
    ///
    /// Implementations of [`Unit::id`] conventionally return
    /// `UnitId::of::<Self>()`.
    pub fn of<T: ?Sized>() -> Self {
        Self(std::any::type_name::<T>())
    }

    /// Build an identity from a static name.
    ///
    /// Useful for declaring a dependency on a unit defined in another
    /// module without naming its type.
    pub const fn from_name(name: &'static str) -> Self {
        Self(name)
    }

    /// Full type path of the unit.
    pub fn name(&self) -> &'static str {
        self.0
    }

    /// Type name with the module path stripped, for diagnostics.
    pub fn short_name(&self) -> &'static str {
        self.0.rsplit("::").next().unwrap_or(self.0)
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// An executable initializer unit.
///
/// A unit exposes one operation, [`initialize`](Unit::initialize), which
/// performs side effects and may fail. The two capability queries are
/// optional: returning `None` means the unit does not declare the
/// capability at all, which is distinct from declaring it with an empty
/// collection (a unit declaring an empty dependency list still enters the
/// sequencer as a dependent unit).
#[async_trait]
pub trait Unit: Send {
    /// Identity of this unit, conventionally `UnitId::of::<Self>()`.
    fn id(&self) -> UnitId;

    /// Run the unit's setup work.
    async fn initialize(&mut self) -> Result<(), UnitError>;

    /// Declared dependency identities, in declaration order.
    ///
    /// `None` when the unit does not declare the capability.
    fn dependencies(&self) -> Option<Vec<UnitId>> {
        None
    }

    /// Group tags this unit belongs to.
    ///
    /// `None` when the unit does not declare the capability.
    fn groups(&self) -> Option<Vec<String>> {
        None
    }
}

/// A raw input element: either a built unit or a name to resolve.
pub enum UnitSource {
    /// An already-built unit instance.
    Instance(Box<dyn Unit>),
    /// A name to resolve through a [`UnitFactory`].
    Named(String),
}

impl UnitSource {
    /// Wrap a unit instance.
    pub fn instance(unit: impl Unit + 'static) -> Self {
        Self::Instance(Box::new(unit))
    }

    /// Reference a unit by registered name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl std::fmt::Debug for dyn Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Unit").field(&self.id()).finish()
    }
}

impl From<Box<dyn Unit>> for UnitSource {
    fn from(unit: Box<dyn Unit>) -> Self {
        Self::Instance(unit)
    }
}

impl std::fmt::Debug for UnitSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instance(unit) => f.debug_tuple("Instance").field(&unit.id()).finish(),
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

/// Builds units from registered names.
///
/// How names map to unit types is the caller's concern; the engine only
/// requires that unknown names yield `None`.
pub trait UnitFactory: Send + Sync {
    /// Build a unit for `name`, or `None` when the name is unknown.
    fn build(&self, name: &str) -> Option<Box<dyn Unit>>;
}
