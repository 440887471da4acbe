//! Repository facade over a session.
//!
//! # Responsibility
//! - Define the per-entity data access contract (`EntityRepository`).
//! - Forward each operation to the bound session (`SessionRepository`).
//!
//! # Invariants
//! - The facade adds no caching, retries or transactions of its own.
//! - Errors carry the session's failure unchanged; the facade only reports
//!   a missing session.

pub mod entity_repo;
pub mod error;
