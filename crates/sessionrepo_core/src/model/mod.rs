//! Entity mapping model.
//!
//! # Responsibility
//! - Define the contracts a domain record implements to be stored by a session.
//! - Provide the untyped row shape used for hydration and native queries.
//!
//! # Invariants
//! - Every entity is identified by an `EntityId` unique within its table.

pub mod entity;
pub mod row;
