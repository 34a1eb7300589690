//! Inventory lots and the FIFO lot book.
//!
//! The lot book is the ledger's storage primitive. It owns two guarantees:
//!
//! - no lot is ever negative, and a lot that reaches zero is removed
//! - a deduction is all-or-nothing: it is checked against the total of the
//!   candidate lots before any lot is touched
//!
//! Lots are kept sorted by `(created_at, seq)`, which is the FIFO depletion order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use buildledger_core::{DomainError, DomainResult, Entity, LotId, SkuId};

use crate::sku::InventoryState;

/// A quantity of one SKU in one state, optionally tagged with a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLot {
    pub id: LotId,
    pub sku_id: SkuId,
    pub state: InventoryState,
    pub quantity: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Creation sequence; breaks ties between lots created at the same instant.
    pub seq: u64,
}

impl InventoryLot {
    fn fifo_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.seq)
    }
}

impl Entity for InventoryLot {
    type Id = LotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Quantity taken from a single lot by a deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotDraw {
    pub lot_id: LotId,
    pub state: InventoryState,
    pub location: Option<String>,
    pub quantity: i64,
    /// The lot was emptied and removed.
    pub depleted: bool,
}

/// All lots of the ledger, in FIFO order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<InventoryLot>", into = "Vec<InventoryLot>")]
pub struct LotBook {
    lots: Vec<InventoryLot>,
    next_seq: u64,
}

impl From<Vec<InventoryLot>> for LotBook {
    fn from(mut lots: Vec<InventoryLot>) -> Self {
        lots.retain(|l| l.quantity > 0);
        lots.sort_by_key(InventoryLot::fifo_key);
        let next_seq = lots.iter().map(|l| l.seq + 1).max().unwrap_or(0);
        Self { lots, next_seq }
    }
}

impl From<LotBook> for Vec<InventoryLot> {
    fn from(book: LotBook) -> Self {
        book.lots
    }
}

fn ensure_positive(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation(format!(
            "quantity must be positive (got {quantity})"
        )));
    }
    Ok(())
}

impl LotBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lot, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &InventoryLot> {
        self.lots.iter()
    }

    /// Lots of one SKU in one state, oldest first.
    pub fn lots(&self, sku_id: SkuId, state: InventoryState) -> impl Iterator<Item = &InventoryLot> {
        self.lots
            .iter()
            .filter(move |l| l.sku_id == sku_id && l.state == state)
    }

    pub fn get(&self, lot_id: LotId) -> Option<&InventoryLot> {
        self.lots.iter().find(|l| l.id == lot_id)
    }

    /// Total quantity of `sku_id` across lots in any of `states`.
    ///
    /// `add` keeps each SKU's total within `i64`; a hand-edited snapshot that
    /// does not saturates instead of overflowing.
    pub fn available(&self, sku_id: SkuId, states: &[InventoryState]) -> i64 {
        self.lots
            .iter()
            .filter(|l| l.sku_id == sku_id && states.contains(&l.state))
            .fold(0i64, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Add stock, merging into the lot with the same `(sku, state, location)`
    /// if one exists, otherwise opening a new lot.
    ///
    /// A merge keeps the lot's original creation time (and FIFO position).
    pub fn add(
        &mut self,
        sku_id: SkuId,
        quantity: i64,
        state: InventoryState,
        location: Option<&str>,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> DomainResult<LotId> {
        ensure_positive(quantity)?;

        // Bound the SKU's total over every state and location, so any
        // availability sum fits in an i64.
        self.lots
            .iter()
            .filter(|l| l.sku_id == sku_id)
            .try_fold(quantity, |acc, l| acc.checked_add(l.quantity))
            .ok_or_else(|| DomainError::invariant("sku quantity overflow"))?;

        if let Some(lot) = self
            .lots
            .iter_mut()
            .find(|l| l.sku_id == sku_id && l.state == state && l.location.as_deref() == location)
        {
            lot.quantity = lot
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| DomainError::invariant("lot quantity overflow"))?;
            lot.updated_at = at;
            if let Some(notes) = notes {
                lot.notes = Some(notes.to_string());
            }
            return Ok(lot.id);
        }

        let lot = InventoryLot {
            id: LotId::new(),
            sku_id,
            state,
            quantity,
            location: location.map(str::to_string),
            notes: notes.map(str::to_string),
            created_at: at,
            updated_at: at,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        let id = lot.id;
        let key = lot.fifo_key();
        let pos = self.lots.partition_point(|l| l.fifo_key() <= key);
        self.lots.insert(pos, lot);
        Ok(id)
    }

    /// Deduct `quantity` of `sku_id` from lots in any of `states`, oldest lot first.
    ///
    /// Fails with `InsufficientInventory` and leaves every lot untouched when the
    /// candidate lots hold less than requested.
    pub fn deduct(
        &mut self,
        sku_id: SkuId,
        quantity: i64,
        states: &[InventoryState],
        at: DateTime<Utc>,
    ) -> DomainResult<Vec<LotDraw>> {
        ensure_positive(quantity)?;

        let have = self.available(sku_id, states);
        if have < quantity {
            return Err(DomainError::InsufficientInventory {
                needed: quantity,
                have,
            });
        }

        let mut remaining = quantity;
        let mut draws = Vec::new();
        for lot in self
            .lots
            .iter_mut()
            .filter(|l| l.sku_id == sku_id && states.contains(&l.state))
        {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(lot.quantity);
            lot.quantity -= take;
            lot.updated_at = at;
            remaining -= take;
            draws.push(LotDraw {
                lot_id: lot.id,
                state: lot.state,
                location: lot.location.clone(),
                quantity: take,
                depleted: lot.quantity == 0,
            });
        }

        self.lots.retain(|l| l.quantity > 0);
        Ok(draws)
    }
}
