//! Ledger storage boundary.
//!
//! This module defines the infrastructure-facing abstraction for reading and
//! transactionally mutating the inventory ledger, plus an in-memory
//! implementation with JSON snapshot persistence.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryLedgerStore, sibling_path};
pub use r#trait::{LedgerStore, LedgerStoreError};
