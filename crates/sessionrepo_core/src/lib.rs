//! Generic entity repositories over an ORM-style session.
//!
//! A `SessionRepository` gives one entity type uniform lookup by id,
//! property, example and raw query, plus bulk save and count/exists checks.
//! All work is forwarded to a `Session`; `SqliteSession` is the bundled
//! engine.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod session;

pub use config::SessionConfig;
pub use db::{open_db, open_db_in_memory, open_db_with, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::{Entity, EntityId};
pub use model::row::SqlRow;
pub use query::builder::{Query, SqlQuery, SqlUpdate, UpdateQuery};
pub use query::example::{ExampleExpression, LikeType};
pub use query::page::{Page, Pageable};
pub use query::sort::{Direction, Order, Sort};
pub use repo::entity_repo::{EntityRepository, SessionRepository};
pub use repo::error::{RepoError, RepoResult};
pub use session::sqlite::{NamedQuery, SqliteSession};
pub use session::Session;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
