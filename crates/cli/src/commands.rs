//! Command execution against a snapshot-backed engine.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use fs2::FileExt;
use serde::Serialize;
use serde_json::{Value, json};

use buildledger_infra::{BuildEngine, EngineConfig, InMemoryLedgerStore, sibling_path};

use crate::args::{Cli, Command};

/// Run one command and return its JSON output.
///
/// A missing snapshot file starts an empty ledger. The snapshot is rewritten
/// only after a mutating command succeeds. An advisory lock on
/// `<snapshot>.lock` is held from load to save: exclusive for mutating
/// commands, shared for reads.
pub fn run(cli: Cli, config: EngineConfig) -> Result<Value> {
    let path = snapshot_path(cli.snapshot.as_deref(), &config)?;
    let mutating = cli.command.is_mutating();
    let _lock = SnapshotLock::acquire(&path, mutating)?;
    let store = open_store(&path)?;
    let engine = BuildEngine::new(store, config);

    let output = execute(&engine, cli.command)?;

    if mutating {
        engine
            .store()
            .save(&path)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        tracing::debug!(path = %path.display(), "snapshot saved");
    }
    Ok(output)
}

fn snapshot_path(flag: Option<&Path>, config: &EngineConfig) -> Result<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| config.snapshot_path.clone())
        .ok_or_else(|| anyhow!("no snapshot file: pass --snapshot or set BUILDLEDGER_SNAPSHOT"))
}

/// Advisory lock serializing CLI processes that share a snapshot.
/// Released on drop.
struct SnapshotLock {
    file: File,
}

impl SnapshotLock {
    fn acquire(snapshot: &Path, exclusive: bool) -> Result<Self> {
        let path = sibling_path(snapshot, "lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("opening lock file {}", path.display()))?;
        let locked = if exclusive {
            FileExt::lock_exclusive(&file)
        } else {
            FileExt::lock_shared(&file)
        };
        locked.with_context(|| format!("locking {}", path.display()))?;
        Ok(Self { file })
    }
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn open_store(path: &Path) -> Result<InMemoryLedgerStore> {
    if path.exists() {
        InMemoryLedgerStore::load(path)
            .with_context(|| format!("reading snapshot {}", path.display()))
    } else {
        tracing::info!(path = %path.display(), "snapshot not found; starting an empty ledger");
        Ok(InMemoryLedgerStore::new())
    }
}

fn to_json(value: impl Serialize) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn execute(engine: &BuildEngine<InMemoryLedgerStore>, command: Command) -> Result<Value> {
    match command {
        Command::Eligibility { sku_code: Some(code) } => {
            let sku = engine.sku_by_code(&code)?;
            to_json(engine.query_eligibility(sku.id)?)
        }
        Command::Eligibility { sku_code: None } => to_json(engine.query_all_eligibility()?),

        Command::Requirements { sku_code, quantity } => {
            let sku = engine.sku_by_code(&sku_code)?;
            to_json(engine.flatten_requirements(sku.id, quantity)?)
        }

        Command::Lots { sku_code } => {
            let sku = engine.sku_by_code(&sku_code)?;
            to_json(engine.all_lots(sku.id)?)
        }

        Command::WorkOrders => to_json(engine.work_orders()?),

        Command::RegisterSku { code, sku_type } => {
            let id = engine.register_sku(&code, sku_type.into())?;
            to_json(engine.sku(id)?)
        }

        Command::SetBom {
            parent,
            component,
            quantity_per_unit,
        } => {
            let parent = engine.sku_by_code(&parent)?;
            let component = engine.sku_by_code(&component)?;
            engine.set_bom_line(parent.id, component.id, quantity_per_unit)?;
            Ok(json!({
                "parent": parent.code,
                "component": component.code,
                "quantity_per_unit": quantity_per_unit,
            }))
        }

        Command::Receive {
            sku_code,
            quantity,
            location,
            notes,
        } => {
            let sku = engine.sku_by_code(&sku_code)?;
            let lot_id = engine.receive_inventory(
                sku.id,
                quantity,
                location.as_deref(),
                notes.as_deref(),
            )?;
            to_json(engine.lot(lot_id)?)
        }

        Command::SignOff {
            sku_code,
            quantity,
            location,
        } => {
            let sku = engine.sku_by_code(&sku_code)?;
            to_json(engine.sign_off_receipt(sku.id, quantity, location.as_deref())?)
        }

        Command::Transfer {
            sku_code,
            quantity,
            location,
        } => {
            let sku = engine.sku_by_code(&sku_code)?;
            to_json(engine.transfer_inventory(sku.id, quantity, location.as_deref())?)
        }

        Command::Adjust {
            sku_code,
            state,
            delta,
            location,
        } => {
            let sku = engine.sku_by_code(&sku_code)?;
            to_json(engine.adjust_inventory(sku.id, state, delta, location.as_deref())?)
        }

        Command::CreateWorkOrder { sku_code, quantity } => {
            let sku = engine.sku_by_code(&sku_code)?;
            to_json(engine.create_work_order(sku.id, quantity)?)
        }

        Command::CancelWorkOrder { work_order_id } => {
            to_json(engine.cancel_work_order(work_order_id)?)
        }

        Command::Build {
            work_order_id,
            quantity,
        } => to_json(engine.execute_build(work_order_id, quantity)?),
    }
}
