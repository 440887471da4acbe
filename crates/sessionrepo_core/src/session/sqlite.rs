//! SQLite-backed session engine.
//!
//! # Responsibility
//! - Validate and compile query builders into SQLite statements.
//! - Execute reads, bulk writes and entity saves on one borrowed connection.
//!
//! # Invariants
//! - Preparation failures of caller-written text surface as
//!   `RepoError::QuerySyntax`; failures of compiled statements as `RepoError::Db`.
//! - A `save` batch is atomic when the connection is in autocommit mode;
//!   inside a caller transaction it joins that transaction.
//! - Page size never exceeds `SessionConfig::max_page_size`.

use super::compile::{self, Projection, Statement, Window};
use super::Session;
use crate::config::SessionConfig;
use crate::logging::sanitize_for_log;
use crate::model::entity::{Entity, EntityId};
use crate::model::row::SqlRow;
use crate::query::builder::{Query, QuerySource, SqlQuery, SqlUpdate, UpdateQuery};
use crate::query::page::{Page, Pageable};
use crate::query::sort::Sort;
use crate::repo::error::{RepoError, RepoResult};
use log::{debug, error, info};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, CachedStatement, Connection};
use std::collections::HashMap;
use std::time::Instant;

/// Stored query text registered under a name for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamedQuery {
    /// ORM query-language fragment.
    Oql(String),
    /// Complete native SELECT.
    Native(String),
}

impl NamedQuery {
    pub fn oql(text: impl Into<String>) -> Self {
        Self::Oql(text.into())
    }

    pub fn native(sql: impl Into<String>) -> Self {
        Self::Native(sql.into())
    }
}

/// Who wrote the text of an executed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin<'a> {
    Caller(&'a str),
    Compiled,
}

impl<'a> Origin<'a> {
    fn of<E: Entity>(query: &'a Query<E>) -> Self {
        match query.source() {
            QuerySource::Oql(text) | QuerySource::Native(text) => Self::Caller(text),
            QuerySource::Entity => Self::Compiled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Inserted,
    Updated,
}

/// Session over a borrowed SQLite connection.
#[derive(Debug)]
pub struct SqliteSession<'conn> {
    conn: &'conn Connection,
    config: SessionConfig,
    named_queries: HashMap<(&'static str, String), NamedQuery>,
}

impl<'conn> SqliteSession<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_config(conn, SessionConfig::default())
    }

    pub fn with_config(conn: &'conn Connection, config: SessionConfig) -> Self {
        Self {
            conn,
            config,
            named_queries: HashMap::new(),
        }
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Registers `query` as `name` for `E`, replacing an earlier registration.
    pub fn register_named_query<E: Entity>(&mut self, name: impl Into<String>, query: NamedQuery) {
        let name = name.into();
        debug!(
            "event=named_query_register module=session status=ok entity={} name={}",
            E::TABLE,
            name
        );
        self.named_queries.insert((E::TABLE, name), query);
    }

    fn prepare(&self, sql: &str, origin: Origin<'_>) -> RepoResult<CachedStatement<'conn>> {
        self.conn.prepare_cached(sql).map_err(|err| match origin {
            Origin::Caller(text) => RepoError::query_syntax(text, err.to_string()),
            Origin::Compiled => RepoError::from(err),
        })
    }

    fn observe<T>(
        &self,
        kind: &'static str,
        entity: &str,
        sql: &str,
        run: impl FnOnce() -> RepoResult<T>,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        let result = run();
        match &result {
            Ok(_) => debug!(
                "event=query_exec module=session status=ok kind={} entity={} duration_ms={} sql={}",
                kind,
                entity,
                started_at.elapsed().as_millis(),
                sanitize_for_log(sql)
            ),
            Err(err) => error!(
                "event=query_exec module=session status=error kind={} entity={} duration_ms={} sql={} error={}",
                kind,
                entity,
                started_at.elapsed().as_millis(),
                sanitize_for_log(sql),
                failure_for_log(err)
            ),
        }
        result
    }

    fn fetch_rows(
        &self,
        kind: &'static str,
        entity: &str,
        origin: Origin<'_>,
        statement: &Statement,
    ) -> RepoResult<Vec<SqlRow>> {
        self.observe(kind, entity, &statement.sql, || {
            let mut prepared = self.prepare(&statement.sql, origin)?;
            let mut rows = prepared.query(params_from_iter(statement.params.iter()))?;
            let mut fetched = Vec::new();
            while let Some(row) = rows.next()? {
                fetched.push(SqlRow::from_row(row)?);
            }
            Ok(fetched)
        })
    }

    fn fetch_integer(
        &self,
        kind: &'static str,
        entity: &str,
        origin: Origin<'_>,
        statement: &Statement,
    ) -> RepoResult<i64> {
        self.observe(kind, entity, &statement.sql, || {
            let mut prepared = self.prepare(&statement.sql, origin)?;
            let value = prepared.query_row(params_from_iter(statement.params.iter()), |row| {
                row.get::<_, i64>(0)
            })?;
            Ok(value)
        })
    }

    fn execute(
        &self,
        kind: &'static str,
        entity: &str,
        origin: Origin<'_>,
        statement: &Statement,
    ) -> RepoResult<u64> {
        self.observe(kind, entity, &statement.sql, || {
            let mut prepared = self.prepare(&statement.sql, origin)?;
            let changed = prepared.execute(params_from_iter(statement.params.iter()))?;
            Ok(changed as u64)
        })
    }

    fn hydrate<E: Entity>(rows: Vec<SqlRow>) -> RepoResult<Vec<E>> {
        rows.iter().map(E::from_row).collect()
    }

    fn persist<E: Entity>(&self, entity: &mut E) -> RepoResult<WriteKind> {
        let values = entity.to_values();
        if values.len() != E::COLUMNS.len() {
            return Err(RepoError::InvalidData(format!(
                "`{}` produced {} values for {} columns",
                E::TABLE,
                values.len(),
                E::COLUMNS.len()
            )));
        }

        if let Some(id) = entity.id() {
            let exists = self.fetch_integer(
                "exists_by_id",
                E::TABLE,
                Origin::Compiled,
                &compile::exists_by_id::<E>(&id),
            )?;
            if exists != 0 {
                if let Some(statement) = compile::update_by_id::<E>(&id, values) {
                    self.execute("update_by_id", E::TABLE, Origin::Compiled, &statement)?;
                }
                return Ok(WriteKind::Updated);
            }
            let statement = compile::insert::<E>(Some(&id), values);
            self.execute("insert", E::TABLE, Origin::Compiled, &statement)?;
            return Ok(WriteKind::Inserted);
        }

        if let Some(id) = E::Id::generate() {
            let statement = compile::insert::<E>(Some(&id), values);
            self.execute("insert", E::TABLE, Origin::Compiled, &statement)?;
            entity.set_id(id);
            return Ok(WriteKind::Inserted);
        }

        let statement = compile::insert::<E>(None, values);
        self.execute("insert", E::TABLE, Origin::Compiled, &statement)?;
        let row_id = self.conn.last_insert_rowid();
        let id = E::Id::from_value(&Value::Integer(row_id)).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "`{}` ids cannot be assigned from generated row id {row_id}",
                E::TABLE
            ))
        })?;
        entity.set_id(id);
        Ok(WriteKind::Inserted)
    }
}

/// Error text for one log line; `QuerySyntax` errors embed whole statements.
fn failure_for_log(err: &RepoError) -> String {
    sanitize_for_log(&err.to_string())
}

impl Session for SqliteSession<'_> {
    fn create_oql_query<E: Entity>(&self, oql: &str) -> RepoResult<Query<E>> {
        compile::parse_oql(oql)?;
        let query = Query::from_source(QuerySource::Oql(oql.trim().to_string()));
        let statement = compile::select(&query, Projection::Rows, &Sort::unsorted(), Window::default())?;
        self.prepare(&statement.sql, Origin::Caller(oql))?;
        Ok(query)
    }

    fn create_native_query<E: Entity>(&self, sql: &str) -> RepoResult<Query<E>> {
        if sql.trim().is_empty() {
            return Err(RepoError::query_syntax(sql, "native query text is empty"));
        }
        self.prepare(sql, Origin::Caller(sql))?;
        Ok(Query::from_source(QuerySource::Native(sql.trim().to_string())))
    }

    fn create_named_query<E: Entity>(&self, name: &str) -> RepoResult<Query<E>> {
        let named = self
            .named_queries
            .get(&(E::TABLE, name.to_string()))
            .ok_or_else(|| RepoError::UnknownNamedQuery {
                entity: E::TABLE,
                name: name.to_string(),
            })?;
        let query = match named {
            NamedQuery::Oql(text) => self.create_oql_query(text)?,
            NamedQuery::Native(sql) => self.create_native_query(sql)?,
        };
        Ok(query.named(name))
    }

    fn create_sql_query(&self, sql: &str) -> RepoResult<SqlQuery> {
        self.prepare(sql, Origin::Caller(sql))?;
        Ok(SqlQuery::new(sql))
    }

    fn create_sql_update(&self, sql: &str) -> RepoResult<SqlUpdate> {
        self.prepare(sql, Origin::Caller(sql))?;
        Ok(SqlUpdate::new(sql))
    }

    fn find_list<E: Entity>(&self, query: &Query<E>) -> RepoResult<Vec<E>> {
        let statement = compile::select(query, Projection::Rows, &Sort::unsorted(), Window::of(query))?;
        Self::hydrate(self.fetch_rows("find_list", E::TABLE, Origin::of(query), &statement)?)
    }

    fn find_one<E: Entity>(&self, query: &Query<E>) -> RepoResult<Option<E>> {
        let window = Window::of(query);
        let statement = compile::select(
            query,
            Projection::Rows,
            &Sort::unsorted(),
            window.at_most(2),
        )?;
        let mut rows = self.fetch_rows("find_one", E::TABLE, Origin::of(query), &statement)?;
        if rows.len() > 1 {
            let matched = window.clip(self.find_count(query)?);
            return Err(RepoError::AmbiguousResult {
                entity: E::TABLE,
                count: usize::try_from(matched).unwrap_or(usize::MAX),
            });
        }
        rows.pop().map(|row| E::from_row(&row)).transpose()
    }

    fn find_count<E: Entity>(&self, query: &Query<E>) -> RepoResult<u64> {
        let statement = compile::select(query, Projection::Count, &Sort::unsorted(), Window::default())?;
        let count = self.fetch_integer("find_count", E::TABLE, Origin::of(query), &statement)?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
    }

    fn find_exists<E: Entity>(&self, query: &Query<E>) -> RepoResult<bool> {
        let statement = compile::select(query, Projection::Exists, &Sort::unsorted(), Window::default())?;
        Ok(self.fetch_integer("find_exists", E::TABLE, Origin::of(query), &statement)? != 0)
    }

    fn find_paged_list<E: Entity>(
        &self,
        query: &Query<E>,
        pageable: &Pageable,
    ) -> RepoResult<Page<E>> {
        let effective = Pageable {
            page: pageable.page,
            size: self.config.clamp_page_size(pageable.size),
            sort: pageable.sort.clone(),
        };

        let total = self.find_count(query)?;
        if effective.offset() >= total {
            // Still resolve properties so a bad sort or selection fails consistently.
            compile::select(query, Projection::Rows, &effective.sort, Window::default())?;
            return Ok(Page::new(Vec::new(), &effective, total));
        }

        let window = Window {
            offset: effective.offset(),
            limit: Some(effective.size),
        };
        let statement = compile::select(query, Projection::Rows, &effective.sort, window)?;
        let rows = self.fetch_rows("find_paged_list", E::TABLE, Origin::of(query), &statement)?;
        let content = Self::hydrate(rows)?;
        Ok(Page::new(content, &effective, total))
    }

    fn find_sql_rows(&self, query: &SqlQuery) -> RepoResult<Vec<SqlRow>> {
        let statement = Statement {
            sql: query.sql().to_string(),
            params: query.parameters().to_vec(),
        };
        self.fetch_rows("sql_query", "-", Origin::Caller(query.sql()), &statement)
    }

    fn execute_sql_update(&self, update: &SqlUpdate) -> RepoResult<u64> {
        let statement = Statement {
            sql: update.sql().to_string(),
            params: update.parameters().to_vec(),
        };
        self.execute("sql_update", "-", Origin::Caller(update.sql()), &statement)
    }

    fn execute_update<E: Entity>(&self, update: &UpdateQuery<E>) -> RepoResult<u64> {
        let statement = compile::update(update)?;
        self.execute("update_query", E::TABLE, Origin::Compiled, &statement)
    }

    fn delete<E: Entity>(&self, query: &Query<E>) -> RepoResult<u64> {
        let statement = compile::delete(query)?;
        self.execute("delete", E::TABLE, Origin::of(query), &statement)
    }

    fn save<E: Entity>(&self, entities: Vec<E>) -> RepoResult<Vec<E>> {
        if entities.is_empty() {
            return Ok(entities);
        }

        let started_at = Instant::now();
        let tx = if self.conn.is_autocommit() {
            Some(self.conn.unchecked_transaction()?)
        } else {
            None
        };

        let mut saved = Vec::with_capacity(entities.len());
        let mut inserted = 0usize;
        for mut entity in entities {
            if self.persist(&mut entity)? == WriteKind::Inserted {
                inserted += 1;
            }
            saved.push(entity);
        }

        if let Some(tx) = tx {
            tx.commit()?;
        }

        info!(
            "event=entity_save module=session status=ok entity={} inserted={} updated={} duration_ms={}",
            E::TABLE,
            inserted,
            saved.len() - inserted,
            started_at.elapsed().as_millis()
        );
        Ok(saved)
    }
}
