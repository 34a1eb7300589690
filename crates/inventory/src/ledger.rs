//! The inventory ledger: catalog, lots, work orders and consumption history.
//!
//! `LedgerState` is plain data plus deterministic operations. It has no notion of
//! locking or persistence; the infrastructure layer runs every mutating call
//! inside a transaction over a private copy and only publishes it on success.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use buildledger_core::{DomainError, DomainResult, LotId, SkuId, WorkOrderId};

use crate::auto_deduct::ComponentDeduction;
use crate::catalog::BomCatalog;
use crate::lot::{LotBook, LotDraw};
use crate::sku::{InventoryState, SkuType};
use crate::work_order::{WorkOrder, WorkOrderConsumption};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    catalog: BomCatalog,
    lots: LotBook,
    work_orders: BTreeMap<WorkOrderId, WorkOrder>,
    consumptions: Vec<WorkOrderConsumption>,
}

/// Outcome of a stock movement between two states (sign-off, transfer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub sku_id: SkuId,
    pub quantity: i64,
    pub from: InventoryState,
    pub to: InventoryState,
    pub draws: Vec<LotDraw>,
    pub lot_id: LotId,
}

/// Outcome of a manual inventory edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Lot that received a positive delta.
    pub lot_id: Option<LotId>,
    /// Lots drawn down by a negative delta.
    pub draws: Vec<LotDraw>,
    /// Components deducted because a produced state was raised by hand.
    pub auto_deducted: Vec<ComponentDeduction>,
}

impl LedgerState {
    pub fn new(catalog: BomCatalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn catalog(&self) -> &BomCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut BomCatalog {
        &mut self.catalog
    }

    pub fn lots(&self) -> &LotBook {
        &self.lots
    }

    pub(crate) fn lots_mut(&mut self) -> &mut LotBook {
        &mut self.lots
    }

    /// Quantity of `sku_id` in its type-correct usable state.
    pub fn usable_quantity(&self, sku_id: SkuId) -> i64 {
        let state = self.catalog.available_state_of(sku_id);
        self.lots.available(sku_id, &[state])
    }

    // --- ledger mutation primitives -------------------------------------------------

    /// Add stock to the `(sku, state, location)` lot, opening one if needed.
    pub fn add_inventory(
        &mut self,
        sku_id: SkuId,
        quantity: i64,
        state: InventoryState,
        location: Option<&str>,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> DomainResult<LotId> {
        self.catalog.require_sku(sku_id)?;
        self.lots.add(sku_id, quantity, state, location, notes, at)
    }

    /// FIFO deduction across `states`; all-or-nothing.
    pub fn deduct_inventory(
        &mut self,
        sku_id: SkuId,
        quantity: i64,
        states: &[InventoryState],
        at: DateTime<Utc>,
    ) -> DomainResult<Vec<LotDraw>> {
        self.catalog.require_sku(sku_id)?;
        self.lots.deduct(sku_id, quantity, states, at)
    }

    // --- receiving and movement -----------------------------------------------------

    /// Record goods arriving; RECEIVED stock is pending and never available.
    pub fn receive_inventory(
        &mut self,
        sku_id: SkuId,
        quantity: i64,
        location: Option<&str>,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> DomainResult<LotId> {
        self.add_inventory(sku_id, quantity, InventoryState::Received, location, notes, at)
    }

    /// Release received stock into the SKU's usable state.
    pub fn sign_off_receipt(
        &mut self,
        sku_id: SkuId,
        quantity: i64,
        location: Option<&str>,
        at: DateTime<Utc>,
    ) -> DomainResult<Movement> {
        let to = self.catalog.require_sku(sku_id)?.available_state();
        self.move_stock(sku_id, quantity, InventoryState::Received, to, location, at)
    }

    /// Ship usable stock out; TRANSFERRED is terminal.
    pub fn transfer_inventory(
        &mut self,
        sku_id: SkuId,
        quantity: i64,
        location: Option<&str>,
        at: DateTime<Utc>,
    ) -> DomainResult<Movement> {
        let from = self.catalog.require_sku(sku_id)?.available_state();
        self.move_stock(sku_id, quantity, from, InventoryState::Transferred, location, at)
    }

    fn move_stock(
        &mut self,
        sku_id: SkuId,
        quantity: i64,
        from: InventoryState,
        to: InventoryState,
        location: Option<&str>,
        at: DateTime<Utc>,
    ) -> DomainResult<Movement> {
        let draws = self.lots.deduct(sku_id, quantity, &[from], at)?;
        let lot_id = self.lots.add(sku_id, quantity, to, location, None, at)?;
        Ok(Movement {
            sku_id,
            quantity,
            from,
            to,
            draws,
            lot_id,
        })
    }

    /// A user edit of a lot quantity outside the build path.
    ///
    /// Raising ASSEMBLED / COMPLETED stock consumes the SKU's components through
    /// auto-deduction; if any component is short the edit is rejected as a whole.
    /// Lowering a quantity never returns components to stock.
    pub fn adjust_inventory(
        &mut self,
        sku_id: SkuId,
        state: InventoryState,
        delta: i64,
        location: Option<&str>,
        at: DateTime<Utc>,
    ) -> DomainResult<Adjustment> {
        self.catalog.require_sku(sku_id)?;

        if delta == 0 {
            return Err(DomainError::validation("adjustment delta cannot be zero"));
        }
        if delta < 0 {
            let quantity = delta.checked_neg().ok_or_else(|| {
                DomainError::validation(format!("adjustment delta {delta} is out of range"))
            })?;
            let draws = self.lots.deduct(sku_id, quantity, &[state], at)?;
            return Ok(Adjustment {
                draws,
                ..Adjustment::default()
            });
        }

        let auto_deducted = if state.is_produced() {
            self.auto_deduct(sku_id, delta, at)?.into_result()?
        } else {
            Vec::new()
        };
        let lot_id = self.lots.add(sku_id, delta, state, location, None, at)?;

        Ok(Adjustment {
            lot_id: Some(lot_id),
            draws: Vec::new(),
            auto_deducted,
        })
    }

    // --- work orders ----------------------------------------------------------------

    pub fn work_order(&self, id: WorkOrderId) -> Option<&WorkOrder> {
        self.work_orders.get(&id)
    }

    pub fn require_work_order(&self, id: WorkOrderId) -> DomainResult<&WorkOrder> {
        self.work_order(id)
            .ok_or_else(|| DomainError::not_found("work order", id))
    }

    pub fn work_orders(&self) -> impl Iterator<Item = &WorkOrder> {
        self.work_orders.values()
    }

    /// Consumption records of one work order, in the order they were written.
    pub fn consumptions(&self, id: WorkOrderId) -> impl Iterator<Item = &WorkOrderConsumption> {
        self.consumptions
            .iter()
            .filter(move |c| c.work_order_id == id)
    }

    pub fn create_work_order(
        &mut self,
        output_sku_id: SkuId,
        quantity_to_build: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<WorkOrder> {
        let sku = self.catalog.require_sku(output_sku_id)?;
        if sku.sku_type == SkuType::Raw {
            return Err(DomainError::validation(format!(
                "{} is a RAW sku and cannot be built",
                sku.code
            )));
        }
        if !sku.active {
            return Err(DomainError::validation(format!("{} is inactive", sku.code)));
        }

        let order = WorkOrder::new(WorkOrderId::new(), output_sku_id, quantity_to_build, at)?;
        self.work_orders.insert(order.id_typed(), order.clone());
        Ok(order)
    }

    pub fn cancel_work_order(&mut self, id: WorkOrderId, at: DateTime<Utc>) -> DomainResult<WorkOrder> {
        let order = self
            .work_orders
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("work order", id))?;
        order.cancel(at)?;
        Ok(order.clone())
    }

    pub(crate) fn work_order_mut(&mut self, id: WorkOrderId) -> DomainResult<&mut WorkOrder> {
        self.work_orders
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("work order", id))
    }

    pub(crate) fn append_consumption(&mut self, record: WorkOrderConsumption) {
        self.consumptions.push(record);
    }
}
