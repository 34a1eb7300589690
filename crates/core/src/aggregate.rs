//! Aggregate root trait for domain records with a lifecycle.

/// Aggregate root marker + minimal interface.
///
/// Work orders are the aggregate here: they move through a status lifecycle and
/// every accepted change bumps the version.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Incremented once per accepted state change (build, cancellation).
    fn version(&self) -> u64;
}
