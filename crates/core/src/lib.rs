//! `meditrust-core` — domain building blocks shared by every crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, order history records and catalog records.

pub mod catalog;
pub mod error;
pub mod id;
pub mod order;

pub use catalog::Medicine;
pub use error::DomainError;
pub use id::{OrderId, ProductKey, UserId};
pub use order::{OrderLine, OrderRecord, Reordered};
