//! Query construction primitives.
//!
//! # Responsibility
//! - Describe reads (`Query`, `SqlQuery`) and writes (`UpdateQuery`,
//!   `SqlUpdate`) without executing them.
//! - Provide paging, sorting, selection-path and example predicates.
//!
//! # Invariants
//! - Builders hold no session state and are used for a single call.

pub mod builder;
pub mod example;
pub mod fetch;
pub mod page;
pub mod sort;
