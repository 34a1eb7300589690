//! Build execution: consume components, produce output, advance the work order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use buildledger_core::{DomainError, DomainResult, LotId, SkuId, WorkOrderId};

use crate::ledger::LedgerState;
use crate::sku::InventoryState;
use crate::work_order::{WorkOrderConsumption, WorkOrderStatus};

/// What a successful build did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReceipt {
    pub work_order_id: WorkOrderId,
    pub output_sku_id: SkuId,
    pub output_state: InventoryState,
    pub output_lot_id: LotId,
    pub quantity: i64,
    pub consumed: Vec<WorkOrderConsumption>,
    pub quantity_built: i64,
    pub status: WorkOrderStatus,
}

/// A component requirement checked before any mutation.
struct PlannedDraw {
    sku_id: SkuId,
    state: InventoryState,
    quantity: i64,
}

impl LedgerState {
    /// Build `quantity` units against a work order.
    ///
    /// Every component is checked in its usable state before anything is
    /// deducted; the first short component aborts the build with
    /// `InsufficientComponent` and the ledger is left untouched.
    pub fn execute_build(
        &mut self,
        work_order_id: WorkOrderId,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<BuildReceipt> {
        let order = self.require_work_order(work_order_id)?;
        order.ensure_buildable(quantity)?;
        let output_sku_id = order.output_sku_id();

        let output = self.catalog().require_sku(output_sku_id)?;
        if !output.sku_type.is_buildable() {
            return Err(DomainError::validation(format!(
                "{} is a RAW sku and cannot be built",
                output.code
            )));
        }
        let output_state = output.available_state();

        let lines = self.catalog().bom_lines(output_sku_id);
        if lines.is_empty() {
            return Err(DomainError::invalid_bom(format!(
                "{} has no bill of materials",
                output.code
            )));
        }

        // 1. verify all components against current stock
        let mut plan = Vec::with_capacity(lines.len());
        for line in lines {
            let component = self.catalog().require_sku(line.component_id)?;
            let state = component.available_state();
            let needed = line
                .quantity_per_unit
                .checked_mul(quantity)
                .ok_or_else(|| DomainError::invariant("build quantity overflow"))?;
            let have = self.lots().available(component.id, &[state]);
            if have < needed {
                return Err(DomainError::InsufficientComponent {
                    sku: component.code.clone(),
                    needed,
                    have,
                });
            }
            plan.push(PlannedDraw {
                sku_id: component.id,
                state,
                quantity: needed,
            });
        }

        // 2. consume
        let mut consumed = Vec::with_capacity(plan.len());
        for draw in plan {
            self.lots_mut()
                .deduct(draw.sku_id, draw.quantity, &[draw.state], at)?;
            let record = WorkOrderConsumption {
                work_order_id,
                component_sku_id: draw.sku_id,
                quantity_consumed: draw.quantity,
                consumed_at: at,
            };
            self.append_consumption(record.clone());
            consumed.push(record);
        }

        // 3. produce
        let output_lot_id = self
            .lots_mut()
            .add(output_sku_id, quantity, output_state, None, None, at)?;

        // 4. advance the order
        let order = self.work_order_mut(work_order_id)?;
        order.record_build(quantity, at)?;

        Ok(BuildReceipt {
            work_order_id,
            output_sku_id,
            output_state,
            output_lot_id,
            quantity,
            consumed,
            quantity_built: order.quantity_built(),
            status: order.status(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BomCatalog, SkuType};

    struct Shop {
        ledger: LedgerState,
        widget: SkuId,
        bolt: SkuId,
        plate: SkuId,
    }

    fn shop() -> Shop {
        let mut c = BomCatalog::new();
        let widget = c.register_sku("WIDGET", SkuType::Assembly).unwrap();
        let bolt = c.register_sku("BOLT", SkuType::Raw).unwrap();
        let plate = c.register_sku("PLATE", SkuType::Raw).unwrap();
        c.set_bom_line(widget, bolt, 4).unwrap();
        c.set_bom_line(widget, plate, 1).unwrap();

        let mut ledger = LedgerState::new(c);
        let now = Utc::now();
        ledger.add_inventory(bolt, 40, InventoryState::Raw, None, None, now).unwrap();
        ledger.add_inventory(plate, 5, InventoryState::Raw, None, None, now).unwrap();
        Shop {
            ledger,
            widget,
            bolt,
            plate,
        }
    }

    #[test]
    fn full_build_completes_the_order() {
        let mut s = shop();
        let wo = s.ledger.create_work_order(s.widget, 5, Utc::now()).unwrap();

        let receipt = s.ledger.execute_build(wo.id_typed(), 5, Utc::now()).unwrap();

        assert_eq!(receipt.output_state, InventoryState::Assembled);
        assert_eq!(receipt.quantity_built, 5);
        assert_eq!(receipt.status, WorkOrderStatus::Completed);
        assert_eq!(s.ledger.usable_quantity(s.bolt), 20);
        assert_eq!(s.ledger.usable_quantity(s.plate), 0);
        assert_eq!(s.ledger.usable_quantity(s.widget), 5);

        let consumed: Vec<_> = s
            .ledger
            .consumptions(wo.id_typed())
            .map(|c| (c.component_sku_id, c.quantity_consumed))
            .collect();
        assert_eq!(consumed, vec![(s.bolt, 20), (s.plate, 5)]);

        let order = s.ledger.work_order(wo.id_typed()).unwrap();
        assert!(order.completed_at().is_some());
    }

    #[test]
    fn short_component_aborts_without_mutation() {
        let mut s = shop();
        let wo = s.ledger.create_work_order(s.widget, 10, Utc::now()).unwrap();
        let before = s.ledger.clone();

        let err = s.ledger.execute_build(wo.id_typed(), 6, Utc::now()).unwrap_err();

        assert_eq!(
            err,
            DomainError::InsufficientComponent {
                sku: "PLATE".to_string(),
                needed: 6,
                have: 5
            }
        );
        assert_eq!(s.ledger, before);
        assert_eq!(s.ledger.usable_quantity(s.bolt), 40);
        assert_eq!(s.ledger.usable_quantity(s.plate), 5);
    }

    #[test]
    fn partial_builds_accumulate() {
        let mut s = shop();
        let wo = s.ledger.create_work_order(s.widget, 5, Utc::now()).unwrap();

        let first = s.ledger.execute_build(wo.id_typed(), 2, Utc::now()).unwrap();
        assert_eq!(first.status, WorkOrderStatus::InProgress);
        let started = s.ledger.work_order(wo.id_typed()).unwrap().started_at();
        assert!(started.is_some());

        let second = s.ledger.execute_build(wo.id_typed(), 3, Utc::now()).unwrap();
        assert_eq!(second.status, WorkOrderStatus::Completed);
        assert_eq!(second.quantity_built, 5);
        assert_eq!(s.ledger.work_order(wo.id_typed()).unwrap().started_at(), started);
        // Output merges into the same ASSEMBLED lot.
        assert_eq!(first.output_lot_id, second.output_lot_id);
        assert_eq!(s.ledger.consumptions(wo.id_typed()).count(), 4);
    }

    #[test]
    fn completed_components_are_read_from_completed_state() {
        let mut s = shop();
        let now = Utc::now();
        let kit = s.ledger.catalog_mut().register_sku("KIT", SkuType::Completed).unwrap();
        let manual = s.ledger.catalog_mut().register_sku("MANUAL", SkuType::Completed).unwrap();
        s.ledger.catalog_mut().set_bom_line(kit, s.widget, 1).unwrap();
        s.ledger.catalog_mut().set_bom_line(kit, manual, 1).unwrap();
        s.ledger.add_inventory(s.widget, 2, InventoryState::Assembled, None, None, now).unwrap();
        s.ledger.add_inventory(manual, 2, InventoryState::Assembled, None, None, now).unwrap();
        let wo = s.ledger.create_work_order(kit, 2, now).unwrap();

        let err = s.ledger.execute_build(wo.id_typed(), 1, now).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientComponent { ref sku, .. } if sku == "MANUAL"));

        s.ledger.add_inventory(manual, 2, InventoryState::Completed, None, None, now).unwrap();
        let receipt = s.ledger.execute_build(wo.id_typed(), 2, now).unwrap();
        assert_eq!(receipt.output_state, InventoryState::Completed);
        assert_eq!(s.ledger.lots().available(manual, &[InventoryState::Assembled]), 2);
    }

    #[test]
    fn closed_or_unknown_orders_are_rejected() {
        let mut s = shop();
        assert!(matches!(
            s.ledger.execute_build(WorkOrderId::new(), 1, Utc::now()),
            Err(DomainError::NotFound { entity: "work order", .. })
        ));

        let wo = s.ledger.create_work_order(s.widget, 2, Utc::now()).unwrap();
        s.ledger.cancel_work_order(wo.id_typed(), Utc::now()).unwrap();
        assert!(matches!(
            s.ledger.execute_build(wo.id_typed(), 1, Utc::now()),
            Err(DomainError::InvalidTransition(_))
        ));
    }

    #[test]
    fn over_building_is_rejected() {
        let mut s = shop();
        let wo = s.ledger.create_work_order(s.widget, 3, Utc::now()).unwrap();
        assert!(matches!(
            s.ledger.execute_build(wo.id_typed(), 4, Utc::now()),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(s.ledger.usable_quantity(s.bolt), 40);
    }

    #[test]
    fn output_without_bom_is_a_configuration_error() {
        let mut s = shop();
        let empty = s.ledger.catalog_mut().register_sku("EMPTY", SkuType::Assembly).unwrap();
        let wo = s.ledger.create_work_order(empty, 1, Utc::now()).unwrap();
        assert!(matches!(
            s.ledger.execute_build(wo.id_typed(), 1, Utc::now()),
            Err(DomainError::InvalidBomConfiguration(_))
        ));
    }
}
