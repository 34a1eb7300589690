//! `buildledger-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the error taxonomy shared by every layer, and the small traits
//! domain records implement.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;

pub use aggregate::AggregateRoot;
pub use entity::Entity;
pub use error::{ComponentFailure, DomainError, DomainResult};
pub use id::{LotId, SkuId, WorkOrderId};
