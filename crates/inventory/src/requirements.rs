//! Multi-level BOM expansion to raw-material totals.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use buildledger_core::{DomainError, DomainResult, SkuId};

use crate::ledger::LedgerState;
use crate::sku::SkuType;

/// Default recursion bound for [`LedgerState::flatten_requirements`].
pub const DEFAULT_MAX_BOM_DEPTH: usize = 32;

/// Raw material needed to build a quantity of some SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRequirement {
    pub sku_id: SkuId,
    pub sku_code: String,
    /// Rate on the direct parent edge that first reached this leaf.
    pub quantity_per_unit: i64,
    /// Summed over every path that reaches this leaf.
    pub total_required: i64,
    pub available: i64,
    pub shortfall: i64,
}

/// Per-unit RAW requirements below one non-RAW SKU, in the order a
/// depth-first walk first reaches each leaf.
#[derive(Debug, Default)]
struct Subtree {
    leaves: Vec<Leaf>,
    index: HashMap<SkuId, usize>,
    /// Non-RAW SKUs on the longest chain starting at (and including) this one.
    height: usize,
}

#[derive(Debug, Clone, Copy)]
struct Leaf {
    sku_id: SkuId,
    /// Rate on the direct parent edge that first reached this leaf.
    quantity_per_unit: i64,
    per_unit: i64,
}

impl Subtree {
    fn accumulate(&mut self, sku_id: SkuId, quantity_per_unit: i64, amount: i64) -> DomainResult<()> {
        match self.index.get(&sku_id) {
            Some(&idx) => {
                let leaf = &mut self.leaves[idx];
                leaf.per_unit = leaf.per_unit.checked_add(amount).ok_or_else(overflow)?;
            }
            None => {
                self.index.insert(sku_id, self.leaves.len());
                self.leaves.push(Leaf {
                    sku_id,
                    quantity_per_unit,
                    per_unit: amount,
                });
            }
        }
        Ok(())
    }
}

fn overflow() -> DomainError {
    DomainError::invariant("requirement quantity overflow")
}

impl LedgerState {
    /// Expand the BOM of `sku_id` for `quantity` units down to RAW leaves.
    ///
    /// Intermediate assemblies are recursed into without looking at their own
    /// stock. The walk fails with `InvalidBomConfiguration` instead of looping
    /// when it meets a cycle or goes deeper than `max_depth` levels.
    /// Shared sub-assemblies are expanded once per call.
    /// Result is ordered by SKU code.
    pub fn flatten_requirements(
        &self,
        sku_id: SkuId,
        quantity: i64,
        max_depth: usize,
    ) -> DomainResult<Vec<ComponentRequirement>> {
        self.catalog().require_sku(sku_id)?;
        if quantity < 0 {
            return Err(DomainError::validation(format!(
                "quantity cannot be negative (got {quantity})"
            )));
        }

        let mut memo = HashMap::new();
        let mut path = vec![sku_id];
        self.expand(sku_id, max_depth, &mut path, &mut memo)?;
        let root = memo
            .remove(&sku_id)
            .ok_or_else(|| DomainError::invariant("BOM expansion lost its root"))?;

        let mut out = root
            .leaves
            .into_iter()
            .map(|leaf| {
                let sku = self.catalog().require_sku(leaf.sku_id)?;
                let total_required = leaf.per_unit.checked_mul(quantity).ok_or_else(overflow)?;
                let available = self.lots().available(leaf.sku_id, &[sku.available_state()]);
                Ok(ComponentRequirement {
                    sku_id: leaf.sku_id,
                    sku_code: sku.code.clone(),
                    quantity_per_unit: leaf.quantity_per_unit,
                    total_required,
                    available,
                    shortfall: total_required.saturating_sub(available).max(0),
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        out.sort_by(|a, b| a.sku_code.cmp(&b.sku_code));
        Ok(out)
    }

    /// Summarise the subtree under `node` (the last entry of `path`) into `memo`.
    fn expand(
        &self,
        node: SkuId,
        max_depth: usize,
        path: &mut Vec<SkuId>,
        memo: &mut HashMap<SkuId, Subtree>,
    ) -> DomainResult<()> {
        if path.len() > max_depth {
            return Err(too_deep(max_depth));
        }

        let mut subtree = Subtree {
            height: 1,
            ..Subtree::default()
        };
        for line in self.catalog().bom_lines(node) {
            let component = self.catalog().require_sku(line.component_id)?;

            if component.sku_type == SkuType::Raw {
                subtree.accumulate(component.id, line.quantity_per_unit, line.quantity_per_unit)?;
                continue;
            }

            if path.contains(&component.id) {
                return Err(DomainError::invalid_bom(format!(
                    "cycle detected at {}",
                    component.code
                )));
            }
            if !memo.contains_key(&component.id) {
                path.push(component.id);
                self.expand(component.id, max_depth, path, memo)?;
                path.pop();
            }

            let child = memo
                .get(&component.id)
                .ok_or_else(|| DomainError::invariant("BOM expansion lost a sub-assembly"))?;
            // A memoised child may sit deeper here than where it was first expanded.
            if path.len() + child.height > max_depth {
                return Err(too_deep(max_depth));
            }
            subtree.height = subtree.height.max(child.height + 1);
            for leaf in &child.leaves {
                let amount = leaf
                    .per_unit
                    .checked_mul(line.quantity_per_unit)
                    .ok_or_else(overflow)?;
                subtree.accumulate(leaf.sku_id, leaf.quantity_per_unit, amount)?;
            }
        }

        memo.insert(node, subtree);
        Ok(())
    }
}

fn too_deep(max_depth: usize) -> DomainError {
    DomainError::invalid_bom(format!("BOM is deeper than {max_depth} levels"))
}
