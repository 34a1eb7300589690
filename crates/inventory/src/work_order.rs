use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use buildledger_core::{AggregateRoot, DomainError, DomainResult, SkuId, WorkOrderId};

/// Work order status lifecycle.
///
/// PENDING → IN_PROGRESS → COMPLETED, or → CANCELLED from PENDING / IN_PROGRESS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl WorkOrderStatus {
    pub fn is_open(self) -> bool {
        matches!(self, WorkOrderStatus::Pending | WorkOrderStatus::InProgress)
    }
}

/// Aggregate root: WorkOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    id: WorkOrderId,
    output_sku_id: SkuId,
    quantity_to_build: i64,
    quantity_built: i64,
    status: WorkOrderStatus,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    version: u64,
}

impl WorkOrder {
    /// Open a PENDING order for `quantity_to_build` units of `output_sku_id`.
    pub fn new(
        id: WorkOrderId,
        output_sku_id: SkuId,
        quantity_to_build: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity_to_build <= 0 {
            return Err(DomainError::validation(format!(
                "quantity to build must be positive (got {quantity_to_build})"
            )));
        }
        Ok(Self {
            id,
            output_sku_id,
            quantity_to_build,
            quantity_built: 0,
            status: WorkOrderStatus::Pending,
            created_at: at,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            version: 1,
        })
    }

    pub fn id_typed(&self) -> WorkOrderId {
        self.id
    }

    pub fn output_sku_id(&self) -> SkuId {
        self.output_sku_id
    }

    pub fn quantity_to_build(&self) -> i64 {
        self.quantity_to_build
    }

    pub fn quantity_built(&self) -> i64 {
        self.quantity_built
    }

    pub fn remaining(&self) -> i64 {
        self.quantity_to_build - self.quantity_built
    }

    pub fn status(&self) -> WorkOrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// Check that a build of `quantity` units may run against this order.
    pub fn ensure_buildable(&self, quantity: i64) -> DomainResult<()> {
        if !self.status.is_open() {
            return Err(DomainError::invalid_transition(format!(
                "work order {} is {:?} and cannot be built",
                self.id, self.status
            )));
        }
        if quantity <= 0 {
            return Err(DomainError::validation(format!(
                "build quantity must be positive (got {quantity})"
            )));
        }
        if quantity > self.remaining() {
            return Err(DomainError::validation(format!(
                "build quantity {quantity} exceeds remaining {} on work order {}",
                self.remaining(),
                self.id
            )));
        }
        Ok(())
    }

    /// Record `quantity` built units and advance the status.
    pub fn record_build(&mut self, quantity: i64, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_buildable(quantity)?;

        self.quantity_built += quantity;
        if self.started_at.is_none() {
            self.started_at = Some(at);
        }
        if self.quantity_built >= self.quantity_to_build {
            self.status = WorkOrderStatus::Completed;
            self.completed_at = Some(at);
        } else {
            self.status = WorkOrderStatus::InProgress;
        }
        self.version += 1;
        Ok(())
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.is_open() {
            return Err(DomainError::invalid_transition(format!(
                "work order {} is {:?} and cannot be cancelled",
                self.id, self.status
            )));
        }
        self.status = WorkOrderStatus::Cancelled;
        self.cancelled_at = Some(at);
        self.version += 1;
        Ok(())
    }
}

impl AggregateRoot for WorkOrder {
    type Id = WorkOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Append-only record of a component consumed by a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderConsumption {
    pub work_order_id: WorkOrderId,
    pub component_sku_id: SkuId,
    pub quantity_consumed: i64,
    pub consumed_at: DateTime<Utc>,
}
