use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use buildledger_inventory::LedgerState;

use super::r#trait::{LedgerStore, LedgerStoreError};

#[derive(Debug, Default)]
struct Versioned {
    state: LedgerState,
    /// Number of committed transactions.
    version: u64,
}

/// In-memory ledger store.
///
/// Writers hold the write lock for the whole transaction, which makes
/// transactions serializable. Each transaction works on a clone of the ledger
/// and swaps it in on success, so a failing closure cannot leave partial
/// mutations behind. Intended for tests, dev and the CLI; not optimized for
/// large ledgers.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Versioned>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: LedgerState) -> Self {
        Self {
            inner: RwLock::new(Versioned { state, version: 0 }),
        }
    }

    /// Committed transaction count.
    pub fn version(&self) -> Result<u64, LedgerStoreError> {
        let inner = self.inner.read().map_err(|_| LedgerStoreError::LockPoisoned)?;
        Ok(inner.version)
    }

    /// A copy of the current ledger.
    pub fn snapshot(&self) -> Result<LedgerState, LedgerStoreError> {
        self.read(LedgerState::clone)
    }

    /// Load a ledger snapshot written by [`InMemoryLedgerStore::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LedgerStoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| LedgerStoreError::Io(format!("{}: {e}", path.display())))?;
        let state: LedgerState = serde_json::from_str(&raw)
            .map_err(|e| LedgerStoreError::Serialization(format!("{}: {e}", path.display())))?;
        Ok(Self::from_state(state))
    }

    /// Write the current ledger as pretty-printed JSON.
    ///
    /// The JSON goes to a sibling temp file that is then renamed over `path`,
    /// so readers see either the old or the new snapshot, never a torn one.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LedgerStoreError> {
        let path = path.as_ref();
        let json = self
            .read(|state| serde_json::to_string_pretty(state))?
            .map_err(|e| LedgerStoreError::Serialization(e.to_string()))?;

        let tmp = sibling_path(path, "tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| LedgerStoreError::Io(format!("{}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            LedgerStoreError::Io(format!("{}: {e}", path.display()))
        })
    }
}

/// `path` with `.{suffix}` appended to its file name.
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

impl LedgerStore for InMemoryLedgerStore {
    fn read<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> Result<R, LedgerStoreError> {
        let inner = self.inner.read().map_err(|_| LedgerStoreError::LockPoisoned)?;
        Ok(f(&inner.state))
    }

    fn transaction<R, E>(&self, f: impl FnOnce(&mut LedgerState) -> Result<R, E>) -> Result<R, E>
    where
        E: From<LedgerStoreError>,
    {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| E::from(LedgerStoreError::LockPoisoned))?;

        let mut working = inner.state.clone();
        let out = f(&mut working)?;

        inner.state = working;
        inner.version += 1;
        Ok(out)
    }
}
