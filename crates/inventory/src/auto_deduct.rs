//! Auto-deduction: reconcile a manual increase of produced stock against its BOM.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use buildledger_core::{ComponentFailure, DomainError, DomainResult, SkuId};

use crate::ledger::LedgerState;
use crate::lot::LotDraw;
use crate::sku::InventoryState;

/// Component stock removed by an auto-deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDeduction {
    pub sku_id: SkuId,
    pub sku_code: String,
    pub state: InventoryState,
    pub quantity: i64,
    pub draws: Vec<LotDraw>,
}

/// Result of [`LedgerState::auto_deduct`].
///
/// Either every component was deducted (`failures` empty) or none was
/// (`deducted` empty).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoDeduction {
    pub deducted: Vec<ComponentDeduction>,
    pub failures: Vec<ComponentFailure>,
}

impl AutoDeduction {
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    /// The combined error listing every failed component, if any.
    pub fn error(&self) -> Option<DomainError> {
        if self.failures.is_empty() {
            None
        } else {
            Some(DomainError::DeductionFailed(self.failures.clone()))
        }
    }

    pub fn into_result(self) -> DomainResult<Vec<ComponentDeduction>> {
        if self.failures.is_empty() {
            Ok(self.deducted)
        } else {
            Err(DomainError::DeductionFailed(self.failures))
        }
    }
}

impl LedgerState {
    /// Consume components for `delta` units of `sku_id` that appeared outside a
    /// build (a manual raise of ASSEMBLED / COMPLETED stock).
    ///
    /// Only positive deltas deduct. All components are checked first; if any is
    /// short, every failure is reported and nothing is deducted.
    pub fn auto_deduct(
        &mut self,
        sku_id: SkuId,
        delta: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<AutoDeduction> {
        self.catalog().require_sku(sku_id)?;
        if delta <= 0 {
            return Ok(AutoDeduction::default());
        }

        let mut planned = Vec::new();
        let mut failures = Vec::new();
        for line in self.catalog().bom_lines(sku_id) {
            let state = self.catalog().available_state_of(line.component_id);
            let sku_code = self
                .catalog()
                .sku(line.component_id)
                .map(|s| s.code.clone())
                .unwrap_or_else(|| line.component_id.to_string());
            let needed = line
                .quantity_per_unit
                .checked_mul(delta)
                .ok_or_else(|| DomainError::invariant("deduction quantity overflow"))?;
            let have = self.lots().available(line.component_id, &[state]);

            if have < needed {
                failures.push(ComponentFailure {
                    sku_id: line.component_id,
                    sku_code,
                    error: DomainError::InsufficientInventory { needed, have },
                });
            } else {
                planned.push((line.component_id, sku_code, state, needed));
            }
        }

        if !failures.is_empty() {
            return Ok(AutoDeduction {
                deducted: Vec::new(),
                failures,
            });
        }

        let mut deducted = Vec::with_capacity(planned.len());
        for (component_id, sku_code, state, quantity) in planned {
            let draws = self.lots_mut().deduct(component_id, quantity, &[state], at)?;
            deducted.push(ComponentDeduction {
                sku_id: component_id,
                sku_code,
                state,
                quantity,
                draws,
            });
        }

        Ok(AutoDeduction {
            deducted,
            failures: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BomCatalog, SkuType};

    fn ledger(x_stock: i64, y_stock: i64) -> (LedgerState, SkuId, SkuId, SkuId) {
        let mut c = BomCatalog::new();
        let asm = c.register_sku("ASM", SkuType::Assembly).unwrap();
        let x = c.register_sku("X", SkuType::Raw).unwrap();
        let y = c.register_sku("Y", SkuType::Assembly).unwrap();
        c.set_bom_line(asm, x, 2).unwrap();
        c.set_bom_line(asm, y, 1).unwrap();

        let mut ledger = LedgerState::new(c);
        let now = Utc::now();
        if x_stock > 0 {
            ledger.add_inventory(x, x_stock, InventoryState::Raw, None, None, now).unwrap();
        }
        if y_stock > 0 {
            ledger.add_inventory(y, y_stock, InventoryState::Assembled, None, None, now).unwrap();
        }
        (ledger, asm, x, y)
    }

    #[test]
    fn shortage_reports_failure_and_deducts_nothing() {
        let (mut ledger, asm, x, _) = ledger(15, 50);
        let before = ledger.clone();

        let result = ledger.auto_deduct(asm, 10, Utc::now()).unwrap();

        assert!(!result.success());
        assert!(result.deducted.is_empty());
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].sku_id, x);
        assert_eq!(
            result.failures[0].error,
            DomainError::InsufficientInventory { needed: 20, have: 15 }
        );
        // Y was available but is not deducted either.
        assert_eq!(ledger, before);
    }

    #[test]
    fn every_short_component_is_listed() {
        let (mut ledger, asm, _, _) = ledger(1, 0);
        let result = ledger.auto_deduct(asm, 3, Utc::now()).unwrap();
        let codes: Vec<_> = result.failures.iter().map(|f| f.sku_code.as_str()).collect();
        assert_eq!(codes, vec!["X", "Y"]);
        assert!(matches!(result.error(), Some(DomainError::DeductionFailed(f)) if f.len() == 2));
    }

    #[test]
    fn deducts_each_component_from_its_type_state() {
        let (mut ledger, asm, x, y) = ledger(30, 10);
        let result = ledger.auto_deduct(asm, 5, Utc::now()).unwrap();

        assert!(result.success());
        assert!(result.error().is_none());
        let summary: Vec<_> = result
            .deducted
            .iter()
            .map(|d| (d.sku_id, d.state, d.quantity))
            .collect();
        assert_eq!(
            summary,
            vec![
                (x, InventoryState::Raw, 10),
                (y, InventoryState::Assembled, 5)
            ]
        );
        assert_eq!(ledger.usable_quantity(x), 20);
        assert_eq!(ledger.usable_quantity(y), 5);
    }

    #[test]
    fn non_positive_deltas_do_nothing() {
        let (mut ledger, asm, _, _) = ledger(30, 10);
        let before = ledger.clone();
        for delta in [0, -4] {
            let result = ledger.auto_deduct(asm, delta, Utc::now()).unwrap();
            assert!(result.success());
            assert!(result.deducted.is_empty());
        }
        assert_eq!(ledger, before);
    }

    #[test]
    fn unknown_sku_is_not_found() {
        let (mut ledger, _, _, _) = ledger(0, 0);
        assert!(matches!(
            ledger.auto_deduct(SkuId::new(), 1, Utc::now()),
            Err(DomainError::NotFound { .. })
        ));
    }
}
