//! Repository facade contract and its session-forwarding implementation.
//!
//! # Responsibility
//! - Expose uniform id/property/example/raw-query reads and bulk writes for
//!   one entity type.
//! - Forward every operation to the bound `Session` without local recovery.
//!
//! # Invariants
//! - The only facade-local check is that a session is bound.
//! - Session errors reach the caller unchanged.
//! - Single-entity lookups return `Ok(None)` for no match and fail with
//!   `AmbiguousResult` for several matches.
//! - Unsorted results follow the engine's natural order; no ordering is
//!   promised beyond an explicit `Sort`.

use crate::model::entity::Entity;
use crate::query::builder::{Query, SqlQuery, SqlUpdate, UpdateQuery};
use crate::query::example::{ExampleExpression, LikeType};
use crate::query::page::{Page, Pageable};
use crate::query::sort::Sort;
use crate::repo::error::{RepoError, RepoResult};
use crate::session::Session;
use log::debug;
use rusqlite::types::Value;
use std::marker::PhantomData;

/// Data-access contract over entity type `E`, backed by a session borrowed for `'s`.
pub trait EntityRepository<'s, E: Entity> {
    type Db: Session + 's;

    /// Returns the session currently in effect.
    ///
    /// # Errors
    /// - `Configuration` when no session is bound.
    fn db(&self) -> RepoResult<&'s Self::Db>;

    /// Replaces the session used by subsequent calls and returns it.
    fn set_db(&mut self, db: &'s Self::Db) -> &'s Self::Db;

    fn query(&self) -> RepoResult<Query<E>>;
    fn query_with_oql(&self, oql: &str) -> RepoResult<Query<E>>;
    fn query_with_sql(&self, sql: &str) -> RepoResult<Query<E>>;
    fn named_query_of(&self, name: &str) -> RepoResult<Query<E>>;
    fn sql_query_of(&self, sql: &str) -> RepoResult<SqlQuery>;
    fn update_query(&self) -> RepoResult<UpdateQuery<E>>;
    fn sql_update_of(&self, sql: &str) -> RepoResult<SqlUpdate>;

    /// Example with case-sensitive, raw LIKE matching.
    fn example_of(&self, prototype: Option<&E>) -> RepoResult<ExampleExpression>;
    fn example_of_with(
        &self,
        prototype: Option<&E>,
        case_insensitive: bool,
        like_type: LikeType,
    ) -> RepoResult<ExampleExpression>;

    fn find_all(&self) -> RepoResult<Vec<E>>;
    fn find_all_sorted(&self, sort: &Sort) -> RepoResult<Vec<E>>;
    /// Ids without a stored entity are silently omitted.
    fn find_all_by_ids(&self, ids: &[E::Id]) -> RepoResult<Vec<E>>;
    fn find_all_selected(&self, selects: &str) -> RepoResult<Vec<E>>;
    fn find_all_by_ids_selected(&self, ids: &[E::Id], selects: &str) -> RepoResult<Vec<E>>;
    fn find_all_sorted_selected(&self, sort: &Sort, selects: &str) -> RepoResult<Vec<E>>;
    fn find_all_paged_selected(&self, pageable: &Pageable, selects: &str) -> RepoResult<Page<E>>;

    /// Inserts or updates each entity; the result keeps input order.
    fn save_all(&self, entities: Vec<E>) -> RepoResult<Vec<E>>;

    fn find_one_selected(&self, id: &E::Id, selects: &str) -> RepoResult<Option<E>>;
    fn find_one_by_property<V: Into<Value>>(&self, name: &str, value: V) -> RepoResult<Option<E>>;
    fn find_one_by_property_selected<V: Into<Value>>(
        &self,
        name: &str,
        value: V,
        selects: &str,
    ) -> RepoResult<Option<E>>;

    /// `None` stands for the universal example in every `*_by_example` call.
    fn find_one_by_example(&self, example: Option<&ExampleExpression>) -> RepoResult<Option<E>>;
    /// `None` pageable returns every match on one page.
    fn find_all_by_example_paged(
        &self,
        example: Option<&ExampleExpression>,
        pageable: Option<&Pageable>,
    ) -> RepoResult<Page<E>>;
    fn find_all_by_example(&self, example: Option<&ExampleExpression>) -> RepoResult<Vec<E>>;
    fn find_all_by_example_sorted(
        &self,
        example: Option<&ExampleExpression>,
        sort: &Sort,
    ) -> RepoResult<Vec<E>>;
    fn count_by_example(&self, example: Option<&ExampleExpression>) -> RepoResult<u64>;
    fn exists_by_example(&self, example: Option<&ExampleExpression>) -> RepoResult<bool>;

    fn find_by_id(&self, id: &E::Id) -> RepoResult<Option<E>>;
    fn exists_by_id(&self, id: &E::Id) -> RepoResult<bool>;
    fn count(&self) -> RepoResult<u64>;
    fn save(&self, entity: E) -> RepoResult<E>;
    /// Returns whether a row was removed.
    fn delete_by_id(&self, id: &E::Id) -> RepoResult<bool>;
    /// Entities without an id are treated as not stored.
    fn delete(&self, entity: &E) -> RepoResult<bool>;
    fn delete_all(&self) -> RepoResult<u64>;
    fn find_all_paged(&self, pageable: &Pageable) -> RepoResult<Page<E>>;
}

/// Repository that forwards to a borrowed session.
pub struct SessionRepository<'s, S, E> {
    session: Option<&'s S>,
    _entity: PhantomData<fn() -> E>,
}

impl<'s, S: Session + 's, E: Entity> SessionRepository<'s, S, E> {
    pub fn new(session: &'s S) -> Self {
        Self {
            session: Some(session),
            _entity: PhantomData,
        }
    }

    /// Repository without a session; every call fails until `set_db` is used.
    pub fn unbound() -> Self {
        Self {
            session: None,
            _entity: PhantomData,
        }
    }

    fn by_example(&self, example: Option<&ExampleExpression>) -> RepoResult<Query<E>> {
        let query = self.query()?;
        Ok(match example {
            Some(example) => query.where_example(example.clone()),
            None => query,
        })
    }
}

impl<'s, S: Session + 's, E: Entity> EntityRepository<'s, E> for SessionRepository<'s, S, E> {
    type Db = S;

    fn db(&self) -> RepoResult<&'s S> {
        self.session.ok_or_else(|| {
            RepoError::Configuration(format!("no session bound to `{}` repository", E::TABLE))
        })
    }

    fn set_db(&mut self, db: &'s S) -> &'s S {
        debug!(
            "event=session_bind module=repo status=ok entity={} replaced={}",
            E::TABLE,
            self.session.is_some()
        );
        self.session = Some(db);
        db
    }

    fn query(&self) -> RepoResult<Query<E>> {
        Ok(self.db()?.create_query())
    }

    fn query_with_oql(&self, oql: &str) -> RepoResult<Query<E>> {
        self.db()?.create_oql_query(oql)
    }

    fn query_with_sql(&self, sql: &str) -> RepoResult<Query<E>> {
        self.db()?.create_native_query(sql)
    }

    fn named_query_of(&self, name: &str) -> RepoResult<Query<E>> {
        self.db()?.create_named_query(name)
    }

    fn sql_query_of(&self, sql: &str) -> RepoResult<SqlQuery> {
        self.db()?.create_sql_query(sql)
    }

    fn update_query(&self) -> RepoResult<UpdateQuery<E>> {
        Ok(self.db()?.create_update_query())
    }

    fn sql_update_of(&self, sql: &str) -> RepoResult<SqlUpdate> {
        self.db()?.create_sql_update(sql)
    }

    fn example_of(&self, prototype: Option<&E>) -> RepoResult<ExampleExpression> {
        self.example_of_with(prototype, false, LikeType::Raw)
    }

    fn example_of_with(
        &self,
        prototype: Option<&E>,
        case_insensitive: bool,
        like_type: LikeType,
    ) -> RepoResult<ExampleExpression> {
        Ok(self
            .db()?
            .create_example_expression(prototype, case_insensitive, like_type))
    }

    fn find_all(&self) -> RepoResult<Vec<E>> {
        self.db()?.find_list(&self.query()?)
    }

    fn find_all_sorted(&self, sort: &Sort) -> RepoResult<Vec<E>> {
        self.db()?.find_list(&self.query()?.order_by(sort))
    }

    fn find_all_by_ids(&self, ids: &[E::Id]) -> RepoResult<Vec<E>> {
        self.find_all_by_ids_selected(ids, "*")
    }

    fn find_all_selected(&self, selects: &str) -> RepoResult<Vec<E>> {
        self.db()?.find_list(&self.query()?.select(selects))
    }

    fn find_all_by_ids_selected(&self, ids: &[E::Id], selects: &str) -> RepoResult<Vec<E>> {
        let db = self.db()?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        db.find_list(&self.query()?.where_id_in(ids).select(selects))
    }

    fn find_all_sorted_selected(&self, sort: &Sort, selects: &str) -> RepoResult<Vec<E>> {
        self.db()?
            .find_list(&self.query()?.order_by(sort).select(selects))
    }

    fn find_all_paged_selected(&self, pageable: &Pageable, selects: &str) -> RepoResult<Page<E>> {
        self.db()?
            .find_paged_list(&self.query()?.select(selects), pageable)
    }

    fn save_all(&self, entities: Vec<E>) -> RepoResult<Vec<E>> {
        self.db()?.save(entities)
    }

    fn find_one_selected(&self, id: &E::Id, selects: &str) -> RepoResult<Option<E>> {
        self.db()?
            .find_one(&self.query()?.where_id_eq(id).select(selects))
    }

    fn find_one_by_property<V: Into<Value>>(&self, name: &str, value: V) -> RepoResult<Option<E>> {
        self.find_one_by_property_selected(name, value, "*")
    }

    fn find_one_by_property_selected<V: Into<Value>>(
        &self,
        name: &str,
        value: V,
        selects: &str,
    ) -> RepoResult<Option<E>> {
        self.db()?
            .find_one(&self.query()?.where_eq(name, value).select(selects))
    }

    fn find_one_by_example(&self, example: Option<&ExampleExpression>) -> RepoResult<Option<E>> {
        self.db()?.find_one(&self.by_example(example)?)
    }

    fn find_all_by_example_paged(
        &self,
        example: Option<&ExampleExpression>,
        pageable: Option<&Pageable>,
    ) -> RepoResult<Page<E>> {
        let db = self.db()?;
        let query = self.by_example(example)?;
        match pageable {
            Some(pageable) => db.find_paged_list(&query, pageable),
            None => Ok(Page::unpaged(db.find_list(&query)?)),
        }
    }

    fn find_all_by_example(&self, example: Option<&ExampleExpression>) -> RepoResult<Vec<E>> {
        self.db()?.find_list(&self.by_example(example)?)
    }

    fn find_all_by_example_sorted(
        &self,
        example: Option<&ExampleExpression>,
        sort: &Sort,
    ) -> RepoResult<Vec<E>> {
        self.db()?
            .find_list(&self.by_example(example)?.order_by(sort))
    }

    fn count_by_example(&self, example: Option<&ExampleExpression>) -> RepoResult<u64> {
        self.db()?.find_count(&self.by_example(example)?)
    }

    fn exists_by_example(&self, example: Option<&ExampleExpression>) -> RepoResult<bool> {
        self.db()?.find_exists(&self.by_example(example)?)
    }

    fn find_by_id(&self, id: &E::Id) -> RepoResult<Option<E>> {
        self.db()?.find_one(&self.query()?.where_id_eq(id))
    }

    fn exists_by_id(&self, id: &E::Id) -> RepoResult<bool> {
        self.db()?.find_exists(&self.query()?.where_id_eq(id))
    }

    fn count(&self) -> RepoResult<u64> {
        self.db()?.find_count(&self.query()?)
    }

    fn save(&self, entity: E) -> RepoResult<E> {
        self.db()?
            .save(vec![entity])?
            .pop()
            .ok_or_else(|| RepoError::InvalidData(format!("save of one `{}` returned nothing", E::TABLE)))
    }

    fn delete_by_id(&self, id: &E::Id) -> RepoResult<bool> {
        Ok(self.db()?.delete(&self.query()?.where_id_eq(id))? > 0)
    }

    fn delete(&self, entity: &E) -> RepoResult<bool> {
        match entity.id() {
            Some(id) => self.delete_by_id(&id),
            None => {
                self.db()?;
                Ok(false)
            }
        }
    }

    fn delete_all(&self) -> RepoResult<u64> {
        self.db()?.delete(&self.query()?)
    }

    fn find_all_paged(&self, pageable: &Pageable) -> RepoResult<Page<E>> {
        self.db()?.find_paged_list(&self.query()?, pageable)
    }
}

