//! Build eligibility: how many units of a SKU the current stock can produce,
//! looking one BOM level down.

use serde::{Deserialize, Serialize};

use buildledger_core::{DomainError, DomainResult, SkuId};

use crate::ledger::LedgerState;

/// Supply picture of one direct component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSupply {
    pub sku_id: SkuId,
    pub sku_code: String,
    pub required_per_unit: i64,
    pub available: i64,
    /// `floor(available / required_per_unit)`.
    pub can_supply: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub sku_id: SkuId,
    pub sku_code: String,
    pub max_buildable: i64,
    pub components: Vec<ComponentSupply>,
    /// First component (in BOM order) with the lowest `can_supply`.
    pub bottleneck: Option<ComponentSupply>,
}

impl LedgerState {
    /// Eligibility of one SKU. Pure read.
    ///
    /// A SKU without components has `max_buildable == 0` and no bottleneck.
    pub fn eligibility(&self, sku_id: SkuId) -> DomainResult<Eligibility> {
        let sku = self.catalog().require_sku(sku_id)?;

        let mut components: Vec<ComponentSupply> = Vec::new();
        let mut bottleneck: Option<usize> = None;

        for line in self.catalog().bom_lines(sku_id) {
            let component = self.catalog().require_sku(line.component_id)?;
            if line.quantity_per_unit <= 0 {
                return Err(DomainError::invalid_bom(format!(
                    "{} -> {}: quantity per unit must be positive (got {})",
                    sku.code, component.code, line.quantity_per_unit
                )));
            }

            let available = self
                .lots()
                .available(component.id, &[component.available_state()]);
            let can_supply = available / line.quantity_per_unit;

            // Strict `<`: a later tie never displaces the first bottleneck.
            let is_new_min = bottleneck.is_none_or(|idx| can_supply < components[idx].can_supply);
            components.push(ComponentSupply {
                sku_id: component.id,
                sku_code: component.code.clone(),
                required_per_unit: line.quantity_per_unit,
                available,
                can_supply,
            });
            if is_new_min {
                bottleneck = Some(components.len() - 1);
            }
        }

        let bottleneck = bottleneck.map(|idx| components[idx].clone());
        let max_buildable = bottleneck.as_ref().map(|b| b.can_supply).unwrap_or(0);

        Ok(Eligibility {
            sku_id,
            sku_code: sku.code.clone(),
            max_buildable,
            components,
            bottleneck,
        })
    }

    /// Eligibility of every active buildable SKU, highest `max_buildable` first
    /// (ties by SKU code).
    pub fn all_eligibility(&self) -> DomainResult<Vec<Eligibility>> {
        let mut all = self
            .catalog()
            .skus()
            .filter(|s| s.active && s.sku_type.is_buildable())
            .map(|s| self.eligibility(s.id))
            .collect::<DomainResult<Vec<_>>>()?;

        all.sort_by(|a, b| {
            b.max_buildable
                .cmp(&a.max_buildable)
                .then_with(|| a.sku_code.cmp(&b.sku_code))
        });
        Ok(all)
    }
}
