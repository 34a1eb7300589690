//! SKU catalog and bill-of-materials graph.
//!
//! The catalog is admin-maintained. Edge edits are validated here so the graph
//! handed to eligibility, flattening and builds is always acyclic with positive
//! per-unit rates.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use buildledger_core::{DomainError, DomainResult, SkuId};

use crate::sku::{InventoryState, Sku, SkuType};

/// One BOM edge, stored under its parent SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomLine {
    pub component_id: SkuId,
    pub quantity_per_unit: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomCatalog {
    skus: BTreeMap<SkuId, Sku>,
    /// Lines per parent, in insertion order (BOM iteration order).
    bom: BTreeMap<SkuId, Vec<BomLine>>,
}

impl BomCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new active SKU with a fresh id.
    pub fn register_sku(&mut self, code: impl Into<String>, sku_type: SkuType) -> DomainResult<SkuId> {
        let sku = Sku::new(SkuId::new(), code, sku_type);
        let id = sku.id;
        self.insert_sku(sku)?;
        Ok(id)
    }

    /// Insert a fully formed SKU (explicit id, e.g. from an import).
    pub fn insert_sku(&mut self, sku: Sku) -> DomainResult<()> {
        let code = sku.code.trim().to_string();
        if code.is_empty() {
            return Err(DomainError::validation("sku code cannot be empty"));
        }
        if self.skus.contains_key(&sku.id) {
            return Err(DomainError::validation(format!("sku id {} already registered", sku.id)));
        }
        if self.sku_by_code(&code).is_some() {
            return Err(DomainError::validation(format!("sku code '{code}' already registered")));
        }
        self.skus.insert(sku.id, Sku { code, ..sku });
        Ok(())
    }

    pub fn set_active(&mut self, sku_id: SkuId, active: bool) -> DomainResult<()> {
        let sku = self
            .skus
            .get_mut(&sku_id)
            .ok_or_else(|| DomainError::not_found("sku", sku_id))?;
        sku.active = active;
        Ok(())
    }

    pub fn sku(&self, sku_id: SkuId) -> Option<&Sku> {
        self.skus.get(&sku_id)
    }

    pub fn require_sku(&self, sku_id: SkuId) -> DomainResult<&Sku> {
        self.sku(sku_id).ok_or_else(|| DomainError::not_found("sku", sku_id))
    }

    pub fn sku_by_code(&self, code: &str) -> Option<&Sku> {
        self.skus.values().find(|s| s.code == code)
    }

    pub fn skus(&self) -> impl Iterator<Item = &Sku> {
        self.skus.values()
    }

    /// Usable state of a component; unknown SKUs fall back to RAW.
    pub fn available_state_of(&self, sku_id: SkuId) -> InventoryState {
        self.sku(sku_id)
            .map(Sku::available_state)
            .unwrap_or(InventoryState::Raw)
    }

    pub fn bom_lines(&self, parent_id: SkuId) -> &[BomLine] {
        self.bom.get(&parent_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Add or update the edge `parent -> component`.
    ///
    /// An existing edge keeps its position in the parent's BOM order.
    pub fn set_bom_line(
        &mut self,
        parent_id: SkuId,
        component_id: SkuId,
        quantity_per_unit: i64,
    ) -> DomainResult<()> {
        let parent = self.require_sku(parent_id)?;
        let component = self.require_sku(component_id)?;

        if quantity_per_unit <= 0 {
            return Err(DomainError::invalid_bom(format!(
                "{} -> {}: quantity per unit must be positive (got {quantity_per_unit})",
                parent.code, component.code
            )));
        }
        if !parent.sku_type.is_buildable() {
            return Err(DomainError::invalid_bom(format!(
                "{} is a RAW sku and cannot have components",
                parent.code
            )));
        }
        if parent_id == component_id || self.reaches(component_id, parent_id) {
            return Err(DomainError::invalid_bom(format!(
                "{} -> {} would create a cycle",
                parent.code, component.code
            )));
        }

        let lines = self.bom.entry(parent_id).or_default();
        match lines.iter_mut().find(|l| l.component_id == component_id) {
            Some(line) => line.quantity_per_unit = quantity_per_unit,
            None => lines.push(BomLine {
                component_id,
                quantity_per_unit,
            }),
        }
        Ok(())
    }

    pub fn remove_bom_line(&mut self, parent_id: SkuId, component_id: SkuId) -> DomainResult<()> {
        let lines = self
            .bom
            .get_mut(&parent_id)
            .ok_or_else(|| DomainError::not_found("bom line", format!("{parent_id} -> {component_id}")))?;
        let before = lines.len();
        lines.retain(|l| l.component_id != component_id);
        if lines.len() == before {
            return Err(DomainError::not_found(
                "bom line",
                format!("{parent_id} -> {component_id}"),
            ));
        }
        if lines.is_empty() {
            self.bom.remove(&parent_id);
        }
        Ok(())
    }

    /// True if `to` is reachable from `from` by following BOM edges.
    pub fn reaches(&self, from: SkuId, to: SkuId) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            stack.extend(self.bom_lines(current).iter().map(|l| l.component_id));
        }
        false
    }

    /// Parents that list `component_id` directly.
    pub fn where_used(&self, component_id: SkuId) -> Vec<SkuId> {
        self.bom
            .iter()
            .filter(|(_, lines)| lines.iter().any(|l| l.component_id == component_id))
            .map(|(parent, _)| *parent)
            .collect()
    }

    /// Writes an edge without validation, for building degenerate graphs in tests.
    #[cfg(test)]
    pub(crate) fn force_bom_line(&mut self, parent_id: SkuId, component_id: SkuId, quantity_per_unit: i64) {
        self.bom.entry(parent_id).or_default().push(BomLine {
            component_id,
            quantity_per_unit,
        });
    }
}
