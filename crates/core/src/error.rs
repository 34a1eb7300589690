//! Domain error model.

use thiserror::Error;

use crate::id::SkuId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, shortages, configuration). Storage concerns belong elsewhere.
/// Every failure is scoped to the operation that produced it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. non-positive quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced SKU, work order or lot does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A deduction asked for more than the candidate lots hold.
    #[error("insufficient inventory: needed {needed}, have {have}")]
    InsufficientInventory { needed: i64, have: i64 },

    /// A build component is short in its usable state.
    #[error("insufficient component {sku}: needed {needed}, have {have}")]
    InsufficientComponent { sku: String, needed: i64, have: i64 },

    /// Degenerate bill of materials (non-positive rate, cycle, raw parent, ...).
    #[error("invalid BOM configuration: {0}")]
    InvalidBomConfiguration(String),

    /// A work order status change that the lifecycle does not allow.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// One or more components could not be deducted; nothing was applied.
    #[error("deduction failed for {} component(s): {}", .0.len(), describe(.0))]
    DeductionFailed(Vec<ComponentFailure>),
}

/// A single component that could not be deducted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentFailure {
    pub sku_id: SkuId,
    pub sku_code: String,
    pub error: DomainError,
}

fn describe(failures: &[ComponentFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.sku_code, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_bom(msg: impl Into<String>) -> Self {
        Self::InvalidBomConfiguration(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True for the shortage family of errors (callers usually surface these
    /// to the user verbatim rather than retrying).
    pub fn is_shortage(&self) -> bool {
        matches!(
            self,
            Self::InsufficientInventory { .. }
                | Self::InsufficientComponent { .. }
                | Self::DeductionFailed(_)
        )
    }
}
