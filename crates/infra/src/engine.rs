//! Service boundary over a [`LedgerStore`].
//!
//! `BuildEngine` stamps the clock, runs every mutation inside a store
//! transaction and logs the outcome. All decision logic lives in
//! `buildledger-inventory`; the engine only composes it with storage.

use chrono::Utc;
use thiserror::Error;

use buildledger_core::{DomainError, LotId, SkuId, WorkOrderId};
use buildledger_inventory::{
    Adjustment, AutoDeduction, BuildReceipt, ComponentRequirement, Eligibility, InventoryLot,
    InventoryState, LotDraw, Movement, Sku, SkuType, WorkOrder, WorkOrderConsumption,
};

use crate::config::EngineConfig;
use crate::ledger_store::{LedgerStore, LedgerStoreError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] LedgerStoreError),
}

impl EngineError {
    /// The domain error, if this is one.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            EngineError::Domain(e) => Some(e),
            EngineError::Store(_) => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

pub struct BuildEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: LedgerStore> BuildEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_parts(self) -> (S, EngineConfig) {
        (self.store, self.config)
    }

    // --- catalog ----------------------------------------------------------------

    pub fn register_sku(&self, code: &str, sku_type: SkuType) -> EngineResult<SkuId> {
        let id = self.store.transaction(|ledger| -> EngineResult<SkuId> {
            Ok(ledger.catalog_mut().register_sku(code, sku_type)?)
        })?;
        tracing::info!(sku = %code, sku_type = ?sku_type, "registered sku");
        Ok(id)
    }

    pub fn set_sku_active(&self, sku_id: SkuId, active: bool) -> EngineResult<()> {
        self.store.transaction(|ledger| -> EngineResult<()> {
            Ok(ledger.catalog_mut().set_active(sku_id, active)?)
        })?;
        tracing::info!(sku_id = %sku_id, active, "sku activation changed");
        Ok(())
    }

    pub fn set_bom_line(
        &self,
        parent_id: SkuId,
        component_id: SkuId,
        quantity_per_unit: i64,
    ) -> EngineResult<()> {
        self.store.transaction(|ledger| -> EngineResult<()> {
            Ok(ledger
                .catalog_mut()
                .set_bom_line(parent_id, component_id, quantity_per_unit)?)
        })?;
        tracing::info!(
            parent = %parent_id,
            component = %component_id,
            quantity_per_unit,
            "bom line set"
        );
        Ok(())
    }

    pub fn remove_bom_line(&self, parent_id: SkuId, component_id: SkuId) -> EngineResult<()> {
        self.store.transaction(|ledger| -> EngineResult<()> {
            Ok(ledger.catalog_mut().remove_bom_line(parent_id, component_id)?)
        })?;
        tracing::info!(parent = %parent_id, component = %component_id, "bom line removed");
        Ok(())
    }

    pub fn sku(&self, sku_id: SkuId) -> EngineResult<Sku> {
        let sku = self
            .store
            .read(|ledger| ledger.catalog().require_sku(sku_id).cloned())??;
        Ok(sku)
    }

    pub fn sku_by_code(&self, code: &str) -> EngineResult<Sku> {
        let sku = self
            .store
            .read(|ledger| ledger.catalog().sku_by_code(code).cloned())?
            .ok_or_else(|| DomainError::not_found("sku", code))?;
        Ok(sku)
    }

    pub fn skus(&self) -> EngineResult<Vec<Sku>> {
        Ok(self
            .store
            .read(|ledger| ledger.catalog().skus().cloned().collect())?)
    }

    // --- queries ------------------------------------------------------------------

    pub fn query_eligibility(&self, sku_id: SkuId) -> EngineResult<Eligibility> {
        let e = self.store.read(|ledger| ledger.eligibility(sku_id))??;
        tracing::debug!(sku = %e.sku_code, max_buildable = e.max_buildable, "eligibility");
        Ok(e)
    }

    pub fn query_all_eligibility(&self) -> EngineResult<Vec<Eligibility>> {
        let all = self.store.read(|ledger| ledger.all_eligibility())??;
        tracing::debug!(skus = all.len(), "eligibility for all buildable skus");
        Ok(all)
    }

    /// Raw-material totals for `quantity` units, bounded by the configured BOM depth.
    pub fn flatten_requirements(
        &self,
        sku_id: SkuId,
        quantity: i64,
    ) -> EngineResult<Vec<ComponentRequirement>> {
        let depth = self.config.max_bom_depth;
        let reqs = self
            .store
            .read(|ledger| ledger.flatten_requirements(sku_id, quantity, depth))??;
        tracing::debug!(sku_id = %sku_id, quantity, leaves = reqs.len(), "flattened requirements");
        Ok(reqs)
    }

    /// Lots of one SKU in one state, FIFO order.
    pub fn lots(&self, sku_id: SkuId, state: InventoryState) -> EngineResult<Vec<InventoryLot>> {
        Ok(self
            .store
            .read(|ledger| ledger.lots().lots(sku_id, state).cloned().collect())?)
    }

    /// Every lot of one SKU across all states.
    pub fn all_lots(&self, sku_id: SkuId) -> EngineResult<Vec<InventoryLot>> {
        Ok(self.store.read(|ledger| {
            ledger
                .lots()
                .iter()
                .filter(|lot| lot.sku_id == sku_id)
                .cloned()
                .collect()
        })?)
    }

    pub fn lot(&self, lot_id: LotId) -> EngineResult<InventoryLot> {
        let lot = self
            .store
            .read(|ledger| ledger.lots().get(lot_id).cloned())?
            .ok_or_else(|| DomainError::not_found("lot", lot_id))?;
        Ok(lot)
    }

    pub fn available(&self, sku_id: SkuId, states: &[InventoryState]) -> EngineResult<i64> {
        Ok(self.store.read(|ledger| ledger.lots().available(sku_id, states))?)
    }

    pub fn usable_quantity(&self, sku_id: SkuId) -> EngineResult<i64> {
        Ok(self.store.read(|ledger| ledger.usable_quantity(sku_id))?)
    }

    pub fn work_order(&self, id: WorkOrderId) -> EngineResult<WorkOrder> {
        let order = self
            .store
            .read(|ledger| ledger.require_work_order(id).cloned())??;
        Ok(order)
    }

    pub fn work_orders(&self) -> EngineResult<Vec<WorkOrder>> {
        Ok(self
            .store
            .read(|ledger| ledger.work_orders().cloned().collect())?)
    }

    pub fn consumptions(&self, id: WorkOrderId) -> EngineResult<Vec<WorkOrderConsumption>> {
        Ok(self
            .store
            .read(|ledger| ledger.consumptions(id).cloned().collect())?)
    }

    // --- inventory ----------------------------------------------------------------

    pub fn add_inventory(
        &self,
        sku_id: SkuId,
        quantity: i64,
        state: InventoryState,
        location: Option<&str>,
        notes: Option<&str>,
    ) -> EngineResult<LotId> {
        let at = Utc::now();
        let lot_id = self.store.transaction(|ledger| -> EngineResult<LotId> {
            Ok(ledger.add_inventory(sku_id, quantity, state, location, notes, at)?)
        })?;
        tracing::info!(sku_id = %sku_id, quantity, state = %state, lot_id = %lot_id, "inventory added");
        Ok(lot_id)
    }

    pub fn deduct_inventory(
        &self,
        sku_id: SkuId,
        quantity: i64,
        states: &[InventoryState],
    ) -> EngineResult<Vec<LotDraw>> {
        let at = Utc::now();
        let result = self.store.transaction(|ledger| -> EngineResult<Vec<LotDraw>> {
            Ok(ledger.deduct_inventory(sku_id, quantity, states, at)?)
        });
        match &result {
            Ok(draws) => {
                tracing::info!(sku_id = %sku_id, quantity, lots = draws.len(), "inventory deducted")
            }
            Err(e) => tracing::warn!(sku_id = %sku_id, quantity, error = %e, "deduction rejected"),
        }
        result
    }

    /// Write-off of stock from the given states.
    pub fn dispose_inventory(
        &self,
        sku_id: SkuId,
        quantity: i64,
        states: &[InventoryState],
    ) -> EngineResult<Vec<LotDraw>> {
        let at = Utc::now();
        let result = self.store.transaction(|ledger| -> EngineResult<Vec<LotDraw>> {
            Ok(ledger.deduct_inventory(sku_id, quantity, states, at)?)
        });
        match &result {
            Ok(draws) => {
                tracing::info!(sku_id = %sku_id, quantity, lots = draws.len(), "inventory disposed")
            }
            Err(e) => tracing::warn!(sku_id = %sku_id, quantity, error = %e, "disposal rejected"),
        }
        result
    }

    pub fn receive_inventory(
        &self,
        sku_id: SkuId,
        quantity: i64,
        location: Option<&str>,
        notes: Option<&str>,
    ) -> EngineResult<LotId> {
        let at = Utc::now();
        let lot_id = self.store.transaction(|ledger| -> EngineResult<LotId> {
            Ok(ledger.receive_inventory(sku_id, quantity, location, notes, at)?)
        })?;
        tracing::info!(sku_id = %sku_id, quantity, lot_id = %lot_id, "goods received");
        Ok(lot_id)
    }

    pub fn sign_off_receipt(
        &self,
        sku_id: SkuId,
        quantity: i64,
        location: Option<&str>,
    ) -> EngineResult<Movement> {
        let at = Utc::now();
        let movement = self.store.transaction(|ledger| -> EngineResult<Movement> {
            Ok(ledger.sign_off_receipt(sku_id, quantity, location, at)?)
        })?;
        tracing::info!(sku_id = %sku_id, quantity, to = %movement.to, "receipt signed off");
        Ok(movement)
    }

    pub fn transfer_inventory(
        &self,
        sku_id: SkuId,
        quantity: i64,
        location: Option<&str>,
    ) -> EngineResult<Movement> {
        let at = Utc::now();
        let movement = self.store.transaction(|ledger| -> EngineResult<Movement> {
            Ok(ledger.transfer_inventory(sku_id, quantity, location, at)?)
        })?;
        tracing::info!(sku_id = %sku_id, quantity, from = %movement.from, "inventory transferred");
        Ok(movement)
    }

    /// Manual edit of one state's quantity. Raising produced stock consumes
    /// components in the same transaction.
    pub fn adjust_inventory(
        &self,
        sku_id: SkuId,
        state: InventoryState,
        delta: i64,
        location: Option<&str>,
    ) -> EngineResult<Adjustment> {
        let at = Utc::now();
        let result = self.store.transaction(|ledger| -> EngineResult<Adjustment> {
            Ok(ledger.adjust_inventory(sku_id, state, delta, location, at)?)
        });
        match &result {
            Ok(adj) => tracing::info!(
                sku_id = %sku_id,
                state = %state,
                delta,
                auto_deducted = adj.auto_deducted.len(),
                "inventory adjusted"
            ),
            Err(e) => tracing::warn!(sku_id = %sku_id, state = %state, delta, error = %e, "adjustment rejected"),
        }
        result
    }

    /// Run auto-deduction on its own.
    ///
    /// A shortage is reported in the returned [`AutoDeduction`], not as an
    /// error; in that case nothing was deducted.
    pub fn auto_deduct(&self, sku_id: SkuId, delta: i64) -> EngineResult<AutoDeduction> {
        let at = Utc::now();
        let outcome = self.store.transaction(|ledger| -> EngineResult<AutoDeduction> {
            Ok(ledger.auto_deduct(sku_id, delta, at)?)
        })?;
        if outcome.success() {
            tracing::info!(sku_id = %sku_id, delta, components = outcome.deducted.len(), "auto-deducted components");
        } else {
            tracing::warn!(sku_id = %sku_id, delta, failures = outcome.failures.len(), "auto-deduction failed");
        }
        Ok(outcome)
    }

    // --- work orders --------------------------------------------------------------

    pub fn create_work_order(&self, output_sku_id: SkuId, quantity: i64) -> EngineResult<WorkOrder> {
        let at = Utc::now();
        let order = self.store.transaction(|ledger| -> EngineResult<WorkOrder> {
            Ok(ledger.create_work_order(output_sku_id, quantity, at)?)
        })?;
        tracing::info!(
            work_order_id = %order.id_typed(),
            sku_id = %output_sku_id,
            quantity,
            "work order created"
        );
        Ok(order)
    }

    pub fn cancel_work_order(&self, id: WorkOrderId) -> EngineResult<WorkOrder> {
        let at = Utc::now();
        let order = self.store.transaction(|ledger| -> EngineResult<WorkOrder> {
            Ok(ledger.cancel_work_order(id, at)?)
        })?;
        tracing::info!(work_order_id = %id, "work order cancelled");
        Ok(order)
    }

    /// Build `quantity` units against a work order. All-or-nothing.
    pub fn execute_build(&self, id: WorkOrderId, quantity: i64) -> EngineResult<BuildReceipt> {
        let at = Utc::now();
        let result = self.store.transaction(|ledger| -> EngineResult<BuildReceipt> {
            Ok(ledger.execute_build(id, quantity, at)?)
        });
        match &result {
            Ok(receipt) => tracing::info!(
                work_order_id = %id,
                quantity,
                quantity_built = receipt.quantity_built,
                status = ?receipt.status,
                "build executed"
            ),
            Err(e) => tracing::warn!(work_order_id = %id, quantity, error = %e, "build rejected"),
        }
        result
    }
}
