use std::sync::Arc;

use thiserror::Error;

use buildledger_inventory::LedgerState;

/// Ledger store operation error.
///
/// These are **infrastructure errors** (locking, persistence) as opposed to
/// domain errors (shortages, validation, BOM configuration).
#[derive(Debug, Error)]
pub enum LedgerStoreError {
    #[error("ledger lock poisoned")]
    LockPoisoned,

    #[error("snapshot io failed: {0}")]
    Io(String),

    #[error("snapshot serialization failed: {0}")]
    Serialization(String),
}

/// Transactional store holding the shared inventory ledger.
///
/// ## Read Semantics
///
/// `read()` runs a closure against a consistent snapshot. Readers never see a
/// transaction half-applied. Eligibility and flattening go through here; what
/// they return is advisory and may be stale by the time the caller acts on it.
///
/// ## Transaction Semantics
///
/// `transaction()`:
/// - runs the closure against a working copy of the ledger
/// - publishes the copy only when the closure returns `Ok`
/// - discards it on `Err`, so a failed operation leaves no trace
/// - isolates transactions from each other (serializable): a build's
///   availability check and its deductions cannot interleave with another
///   writer
///
/// ## Implementation Requirements
///
/// Implementations must:
/// - never expose a partially applied transaction to readers
/// - serialize conflicting writers (locking, or optimistic versioning with retry)
/// - leave the ledger untouched when the closure fails
pub trait LedgerStore: Send + Sync {
    /// Run `f` against a consistent snapshot.
    fn read<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> Result<R, LedgerStoreError>;

    /// Run `f` as one all-or-nothing unit of work.
    fn transaction<R, E>(&self, f: impl FnOnce(&mut LedgerState) -> Result<R, E>) -> Result<R, E>
    where
        E: From<LedgerStoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore,
{
    fn read<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> Result<R, LedgerStoreError> {
        (**self).read(f)
    }

    fn transaction<R, E>(&self, f: impl FnOnce(&mut LedgerState) -> Result<R, E>) -> Result<R, E>
    where
        E: From<LedgerStoreError>,
    {
        (**self).transaction(f)
    }
}
