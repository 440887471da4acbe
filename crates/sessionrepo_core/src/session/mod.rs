//! Session collaborator contract and its SQLite engine.
//!
//! # Responsibility
//! - Define the narrow engine surface a repository facade forwards to.
//! - Provide `SqliteSession`, which compiles builders to SQL and runs them.
//!
//! # Invariants
//! - Sessions own all query validation; callers see their errors unchanged.
//! - `find_one` never picks one of several matches; it fails instead.
//! - `find_exists` is observably equivalent to `find_count(..) > 0`.

use crate::model::entity::Entity;
use crate::model::row::SqlRow;
use crate::query::builder::{Query, SqlQuery, SqlUpdate, UpdateQuery};
use crate::query::example::{ExampleExpression, LikeType};
use crate::query::page::{Page, Pageable};
use crate::repo::error::RepoResult;

mod compile;
pub mod sqlite;

/// Engine handle used to build and execute queries.
pub trait Session {
    /// Default query over every `E`.
    fn create_query<E: Entity>(&self) -> Query<E> {
        Query::new()
    }

    /// Query from ORM query-language text (`where …` / `order by …`).
    fn create_oql_query<E: Entity>(&self, oql: &str) -> RepoResult<Query<E>>;

    /// Query from a complete native SELECT mapped onto `E`.
    fn create_native_query<E: Entity>(&self, sql: &str) -> RepoResult<Query<E>>;

    /// Query from a registered named query of `E`.
    fn create_named_query<E: Entity>(&self, name: &str) -> RepoResult<Query<E>>;

    fn create_sql_query(&self, sql: &str) -> RepoResult<SqlQuery>;

    fn create_sql_update(&self, sql: &str) -> RepoResult<SqlUpdate>;

    fn create_update_query<E: Entity>(&self) -> UpdateQuery<E> {
        UpdateQuery::new()
    }

    fn create_example_expression<E: Entity>(
        &self,
        prototype: Option<&E>,
        case_insensitive: bool,
        like_type: LikeType,
    ) -> ExampleExpression {
        ExampleExpression::of(prototype, case_insensitive, like_type)
    }

    fn find_list<E: Entity>(&self, query: &Query<E>) -> RepoResult<Vec<E>>;

    /// Returns the single match, `None` for no match.
    ///
    /// # Errors
    /// - `AmbiguousResult` when more than one row matches.
    fn find_one<E: Entity>(&self, query: &Query<E>) -> RepoResult<Option<E>>;

    fn find_count<E: Entity>(&self, query: &Query<E>) -> RepoResult<u64>;

    fn find_exists<E: Entity>(&self, query: &Query<E>) -> RepoResult<bool> {
        Ok(self.find_count(query)? > 0)
    }

    /// Runs `query` bounded by `pageable`; the pageable's sort follows the query's own.
    fn find_paged_list<E: Entity>(
        &self,
        query: &Query<E>,
        pageable: &Pageable,
    ) -> RepoResult<Page<E>>;

    fn find_sql_rows(&self, query: &SqlQuery) -> RepoResult<Vec<SqlRow>>;

    /// Returns the number of affected rows.
    fn execute_sql_update(&self, update: &SqlUpdate) -> RepoResult<u64>;

    /// Returns the number of affected rows.
    fn execute_update<E: Entity>(&self, update: &UpdateQuery<E>) -> RepoResult<u64>;

    /// Deletes every row `query` matches and returns how many were removed.
    fn delete<E: Entity>(&self, query: &Query<E>) -> RepoResult<u64>;

    /// Inserts or updates each entity, returning them in input order with ids assigned.
    fn save<E: Entity>(&self, entities: Vec<E>) -> RepoResult<Vec<E>>;
}
