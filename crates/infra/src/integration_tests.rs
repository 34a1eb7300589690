//! End-to-end tests of the engine over the in-memory store.
//!
//! Verifies:
//! - eligibility, flattening, builds and auto-deduction through the service
//! - failed operations leave the ledger untouched
//! - concurrent builds cannot over-draw a shared component
//! - store failures surface as `EngineError::Store`

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use buildledger_core::{DomainError, SkuId};
    use buildledger_inventory::{InventoryState, LedgerState, SkuType, WorkOrderStatus};

    use crate::config::EngineConfig;
    use crate::engine::{BuildEngine, EngineError};
    use crate::ledger_store::{InMemoryLedgerStore, LedgerStore, LedgerStoreError};

    struct Shop {
        engine: BuildEngine<InMemoryLedgerStore>,
        widget: SkuId,
        bolt: SkuId,
        plate: SkuId,
    }

    /// WIDGET (ASSEMBLY) = BOLT x4 + PLATE x1, with 40 bolts and 5 plates on hand.
    fn shop() -> Shop {
        let engine = BuildEngine::new(InMemoryLedgerStore::new(), EngineConfig::default());
        let widget = engine.register_sku("WIDGET", SkuType::Assembly).unwrap();
        let bolt = engine.register_sku("BOLT", SkuType::Raw).unwrap();
        let plate = engine.register_sku("PLATE", SkuType::Raw).unwrap();
        engine.set_bom_line(widget, bolt, 4).unwrap();
        engine.set_bom_line(widget, plate, 1).unwrap();
        engine.add_inventory(bolt, 40, InventoryState::Raw, None, None).unwrap();
        engine.add_inventory(plate, 5, InventoryState::Raw, None, None).unwrap();
        Shop {
            engine,
            widget,
            bolt,
            plate,
        }
    }

    #[test]
    fn eligibility_then_build_to_completion() {
        let s = shop();

        let e = s.engine.query_eligibility(s.widget).unwrap();
        assert_eq!(e.max_buildable, 5);
        assert_eq!(e.bottleneck.unwrap().sku_id, s.plate);

        let wo = s.engine.create_work_order(s.widget, 5).unwrap();
        assert_eq!(wo.status(), WorkOrderStatus::Pending);

        let receipt = s.engine.execute_build(wo.id_typed(), 5).unwrap();
        assert_eq!(receipt.status, WorkOrderStatus::Completed);
        assert_eq!(s.engine.usable_quantity(s.bolt).unwrap(), 20);
        assert_eq!(s.engine.usable_quantity(s.plate).unwrap(), 0);
        assert_eq!(
            s.engine
                .available(s.widget, &[InventoryState::Assembled])
                .unwrap(),
            5
        );
        assert_eq!(s.engine.consumptions(wo.id_typed()).unwrap().len(), 2);
        assert_eq!(s.engine.query_eligibility(s.widget).unwrap().max_buildable, 0);
    }

    #[test]
    fn short_build_leaves_everything_as_it_was() {
        let s = shop();
        let wo = s.engine.create_work_order(s.widget, 10).unwrap();
        let before = s.engine.store().snapshot().unwrap();

        let err = s.engine.execute_build(wo.id_typed(), 6).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(DomainError::InsufficientComponent { ref sku, needed: 6, have: 5 }) if sku == "PLATE"
        ));

        assert_eq!(s.engine.store().snapshot().unwrap(), before);
        assert!(s.engine.consumptions(wo.id_typed()).unwrap().is_empty());
        assert_eq!(
            s.engine.work_order(wo.id_typed()).unwrap().status(),
            WorkOrderStatus::Pending
        );
    }

    #[test]
    fn manual_raise_of_assembled_stock_consumes_components() {
        let s = shop();
        let adj = s
            .engine
            .adjust_inventory(s.widget, InventoryState::Assembled, 3, None)
            .unwrap();

        assert_eq!(adj.auto_deducted.len(), 2);
        assert_eq!(s.engine.usable_quantity(s.bolt).unwrap(), 28);
        assert_eq!(s.engine.usable_quantity(s.plate).unwrap(), 2);
        assert_eq!(s.engine.usable_quantity(s.widget).unwrap(), 3);
    }

    #[test]
    fn manual_raise_with_shortage_is_rejected_whole() {
        let s = shop();
        let before = s.engine.store().snapshot().unwrap();

        let err = s
            .engine
            .adjust_inventory(s.widget, InventoryState::Assembled, 6, None)
            .unwrap_err();

        match err {
            EngineError::Domain(DomainError::DeductionFailed(failures)) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].sku_code, "PLATE");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(s.engine.store().snapshot().unwrap(), before);
    }

    #[test]
    fn standalone_auto_deduct_reports_shortage_without_error() {
        let s = shop();
        let outcome = s.engine.auto_deduct(s.widget, 6).unwrap();
        assert!(!outcome.success());
        assert_eq!(
            outcome.failures[0].error,
            DomainError::InsufficientInventory { needed: 6, have: 5 }
        );
        assert_eq!(s.engine.usable_quantity(s.bolt).unwrap(), 40);
    }

    #[test]
    fn receive_sign_off_and_transfer() {
        let s = shop();
        s.engine
            .receive_inventory(s.plate, 10, Some("DOCK-1"), Some("PO-17"))
            .unwrap();
        // Pending stock does not count.
        assert_eq!(s.engine.query_eligibility(s.widget).unwrap().max_buildable, 5);

        let movement = s.engine.sign_off_receipt(s.plate, 10, None).unwrap();
        assert_eq!(movement.from, InventoryState::Received);
        assert_eq!(movement.to, InventoryState::Raw);
        assert_eq!(s.engine.query_eligibility(s.widget).unwrap().max_buildable, 10);

        let wo = s.engine.create_work_order(s.widget, 2).unwrap();
        s.engine.execute_build(wo.id_typed(), 2).unwrap();
        s.engine.transfer_inventory(s.widget, 2, Some("CUSTOMER")).unwrap();
        assert_eq!(s.engine.usable_quantity(s.widget).unwrap(), 0);
        assert_eq!(
            s.engine
                .available(s.widget, &[InventoryState::Transferred])
                .unwrap(),
            2
        );

        assert!(s.engine.sign_off_receipt(s.plate, 1, None).is_err());
    }

    #[test]
    fn multi_level_requirements_through_the_engine() {
        let s = shop();
        let kit = s.engine.register_sku("KIT", SkuType::Completed).unwrap();
        s.engine.set_bom_line(kit, s.widget, 2).unwrap();
        s.engine.set_bom_line(kit, s.bolt, 1).unwrap();

        let reqs = s.engine.flatten_requirements(kit, 3).unwrap();
        let summary: Vec<_> = reqs
            .iter()
            .map(|r| (r.sku_code.as_str(), r.total_required, r.shortfall))
            .collect();
        assert_eq!(summary, vec![("BOLT", 27, 0), ("PLATE", 6, 1)]);

        // Cycle-closing edges are refused at edit time.
        assert!(matches!(
            s.engine.set_bom_line(s.widget, kit, 1),
            Err(EngineError::Domain(DomainError::InvalidBomConfiguration(_)))
        ));
    }

    #[test]
    fn concurrent_builds_never_overdraw_a_shared_component() {
        let s = shop();
        let engine = Arc::new(s.engine);
        // Five plates support exactly five single-unit builds.
        let orders: Vec<_> = (0..8)
            .map(|_| engine.create_work_order(s.widget, 1).unwrap().id_typed())
            .collect();

        let handles: Vec<_> = orders
            .into_iter()
            .map(|id| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || engine.execute_build(id, 1).is_ok())
            })
            .collect();
        let succeeded = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(succeeded, 5);
        assert_eq!(engine.usable_quantity(s.plate).unwrap(), 0);
        assert_eq!(engine.usable_quantity(s.bolt).unwrap(), 20);
        assert_eq!(engine.usable_quantity(s.widget).unwrap(), 5);
        let completed = engine
            .work_orders()
            .unwrap()
            .iter()
            .filter(|o| o.status() == WorkOrderStatus::Completed)
            .count();
        assert_eq!(completed, 5);
    }

    #[test]
    fn snapshot_survives_a_save_load_cycle() {
        let s = shop();
        let wo = s.engine.create_work_order(s.widget, 3).unwrap();
        s.engine.execute_build(wo.id_typed(), 1).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        s.engine.store().save(&path).unwrap();

        let reloaded = BuildEngine::new(
            InMemoryLedgerStore::load(&path).unwrap(),
            EngineConfig::default(),
        );
        let order = reloaded.work_order(wo.id_typed()).unwrap();
        assert_eq!(order.quantity_built(), 1);
        assert_eq!(order.status(), WorkOrderStatus::InProgress);
        assert_eq!(reloaded.usable_quantity(s.bolt).unwrap(), 36);
        assert_eq!(reloaded.query_eligibility(s.widget).unwrap().max_buildable, 4);
    }

    /// Store double whose lock is always poisoned.
    struct BrokenStore;

    impl LedgerStore for BrokenStore {
        fn read<R>(&self, _f: impl FnOnce(&LedgerState) -> R) -> Result<R, LedgerStoreError> {
            Err(LedgerStoreError::LockPoisoned)
        }

        fn transaction<R, E>(
            &self,
            _f: impl FnOnce(&mut LedgerState) -> Result<R, E>,
        ) -> Result<R, E>
        where
            E: From<LedgerStoreError>,
        {
            Err(E::from(LedgerStoreError::LockPoisoned))
        }
    }

    #[test]
    fn store_failures_are_reported_as_store_errors() {
        let engine = BuildEngine::new(BrokenStore, EngineConfig::default());
        assert!(matches!(
            engine.register_sku("BOLT", SkuType::Raw),
            Err(EngineError::Store(LedgerStoreError::LockPoisoned))
        ));
        assert!(matches!(
            engine.query_all_eligibility(),
            Err(EngineError::Store(LedgerStoreError::LockPoisoned))
        ));
    }
}
