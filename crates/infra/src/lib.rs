//! Infrastructure layer: ledger storage, configuration and the engine service.

pub mod config;
pub mod engine;
pub mod ledger_store;

mod integration_tests;

pub use config::EngineConfig;
pub use engine::{BuildEngine, EngineError, EngineResult};
pub use ledger_store::{InMemoryLedgerStore, LedgerStore, LedgerStoreError, sibling_path};
