//! Inventory domain module (BOM-driven build engine).
//!
//! This crate contains the business rules for manufacturing inventory,
//! implemented purely as deterministic domain logic (no IO, no locking, no
//! storage): the SKU catalog and BOM graph, the FIFO lot book, work orders,
//! build eligibility, requirements flattening, build execution and
//! auto-deduction.

pub mod auto_deduct;
pub mod build;
pub mod catalog;
pub mod eligibility;
pub mod ledger;
pub mod lot;
pub mod requirements;
pub mod sku;
pub mod work_order;

pub use auto_deduct::{AutoDeduction, ComponentDeduction};
pub use build::BuildReceipt;
pub use catalog::{BomCatalog, BomLine};
pub use eligibility::{ComponentSupply, Eligibility};
pub use ledger::{Adjustment, LedgerState, Movement};
pub use lot::{InventoryLot, LotBook, LotDraw};
pub use requirements::{ComponentRequirement, DEFAULT_MAX_BOM_DEPTH};
pub use sku::{InventoryState, Sku, SkuType};
pub use work_order::{WorkOrder, WorkOrderConsumption, WorkOrderStatus};
