use serde::{Deserialize, Serialize};

use buildledger_core::{Entity, SkuId};

/// Catalog classification of a SKU.
///
/// The type fixes which inventory state counts as "available" for the SKU;
/// see [`SkuType::available_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkuType {
    Raw,
    Assembly,
    Completed,
}

impl SkuType {
    /// The usable inventory state for this SKU type.
    ///
    /// RAW → RAW, ASSEMBLY → ASSEMBLED, COMPLETED → COMPLETED. Eligibility,
    /// flattening, builds, auto-deduction and receiving all resolve the state
    /// through this one lookup.
    pub fn available_state(self) -> InventoryState {
        match self {
            SkuType::Raw => InventoryState::Raw,
            SkuType::Assembly => InventoryState::Assembled,
            SkuType::Completed => InventoryState::Completed,
        }
    }

    /// Whether SKUs of this type carry a bill of materials and can be built.
    pub fn is_buildable(self) -> bool {
        !matches!(self, SkuType::Raw)
    }
}

impl core::fmt::Display for SkuType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            SkuType::Raw => "RAW",
            SkuType::Assembly => "ASSEMBLY",
            SkuType::Completed => "COMPLETED",
        };
        f.write_str(s)
    }
}

/// Inventory state of a lot.
///
/// RECEIVED (pending, unusable) → RAW / ASSEMBLED / COMPLETED (usable tier)
/// → TRANSFERRED (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryState {
    Received,
    Raw,
    Assembled,
    Completed,
    Transferred,
}

impl InventoryState {
    pub const ALL: [InventoryState; 5] = [
        InventoryState::Received,
        InventoryState::Raw,
        InventoryState::Assembled,
        InventoryState::Completed,
        InventoryState::Transferred,
    ];

    /// Usable tier: stock that builds and transfers may draw from.
    pub fn is_usable(self) -> bool {
        matches!(
            self,
            InventoryState::Raw | InventoryState::Assembled | InventoryState::Completed
        )
    }

    /// Produced states; a manual increase here triggers auto-deduction.
    pub fn is_produced(self) -> bool {
        matches!(self, InventoryState::Assembled | InventoryState::Completed)
    }
}

impl core::fmt::Display for InventoryState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            InventoryState::Received => "RECEIVED",
            InventoryState::Raw => "RAW",
            InventoryState::Assembled => "ASSEMBLED",
            InventoryState::Completed => "COMPLETED",
            InventoryState::Transferred => "TRANSFERRED",
        };
        f.write_str(s)
    }
}

impl core::str::FromStr for InventoryState {
    type Err = buildledger_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InventoryState::ALL
            .into_iter()
            .find(|state| state.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                buildledger_core::DomainError::validation(format!("unknown inventory state '{s}'"))
            })
    }
}

/// Catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    pub id: SkuId,
    pub code: String,
    pub sku_type: SkuType,
    pub active: bool,
}

impl Sku {
    pub fn new(id: SkuId, code: impl Into<String>, sku_type: SkuType) -> Self {
        Self {
            id,
            code: code.into(),
            sku_type,
            active: true,
        }
    }

    pub fn available_state(&self) -> InventoryState {
        self.sku_type.available_state()
    }
}

impl Entity for Sku {
    type Id = SkuId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_state_follows_sku_type() {
        assert_eq!(SkuType::Raw.available_state(), InventoryState::Raw);
        assert_eq!(SkuType::Assembly.available_state(), InventoryState::Assembled);
        assert_eq!(SkuType::Completed.available_state(), InventoryState::Completed);
    }

    #[test]
    fn only_the_middle_tier_is_usable() {
        let usable: Vec<_> = InventoryState::ALL
            .into_iter()
            .filter(|s| s.is_usable())
            .collect();
        assert_eq!(
            usable,
            vec![
                InventoryState::Raw,
                InventoryState::Assembled,
                InventoryState::Completed
            ]
        );
    }

    #[test]
    fn states_parse_case_insensitively() {
        assert_eq!("assembled".parse::<InventoryState>().unwrap(), InventoryState::Assembled);
        assert_eq!(" RAW ".parse::<InventoryState>().unwrap(), InventoryState::Raw);
        assert!("scrap".parse::<InventoryState>().is_err());
    }

    #[test]
    fn new_skus_are_active_and_keep_their_id() {
        let id = SkuId::new();
        let sku = Sku::new(id, "BOLT", SkuType::Raw);
        assert!(sku.active);
        assert_eq!(Entity::id(&sku), &id);
        assert_eq!(sku.available_state(), InventoryState::Raw);
    }

    #[test]
    fn serializes_in_upper_case() {
        let json = serde_json::to_string(&SkuType::Assembly).unwrap();
        assert_eq!(json, "\"ASSEMBLY\"");
        let json = serde_json::to_string(&InventoryState::Transferred).unwrap();
        assert_eq!(json, "\"TRANSFERRED\"");
    }
}
