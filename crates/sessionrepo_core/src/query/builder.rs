//! Unexecuted query and statement builders.
//!
//! Builders are plain values: they carry no session reference and run only
//! when handed to a `Session` execution method. Each is built for one call
//! and then discarded.

use crate::model::entity::{Entity, EntityId};
use crate::query::example::ExampleExpression;
use crate::query::sort::Sort;
use rusqlite::types::Value;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// Where the base rows of a `Query` come from.
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySource {
    /// Every row of the entity table.
    Entity,
    /// ORM query-language fragment: optional `where …` then optional `order by …`.
    Oql(String),
    /// Complete native SELECT whose columns map onto entity properties.
    Native(String),
}

/// Restriction added on top of a query source.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(String, Value),
    In(String, Vec<Value>),
    Example(ExampleExpression),
}

/// Fetch of `E` rows.
pub struct Query<E> {
    source: QuerySource,
    name: Option<String>,
    params: Vec<Value>,
    predicates: Vec<Predicate>,
    sort: Sort,
    selection: Option<String>,
    first_row: Option<u64>,
    max_rows: Option<u64>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Query<E> {
    /// Default query over every row of the entity table.
    pub fn new() -> Self {
        Self::from_source(QuerySource::Entity)
    }

    pub fn from_source(source: QuerySource) -> Self {
        Self {
            source,
            name: None,
            params: Vec::new(),
            predicates: Vec::new(),
            sort: Sort::unsorted(),
            selection: None,
            first_row: None,
            max_rows: None,
            _entity: PhantomData,
        }
    }

    /// Labels the query with the named-query identifier it was created from.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Binds the next positional `?` parameter of the OQL/native text.
    pub fn set_parameter(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn where_eq(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates
            .push(Predicate::Eq(property.into(), value.into()));
        self
    }

    pub fn where_in(
        mut self,
        property: impl Into<String>,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.predicates.push(Predicate::In(
            property.into(),
            values.into_iter().collect(),
        ));
        self
    }

    pub fn where_id_eq(self, id: &E::Id) -> Self {
        self.where_eq(E::ID_COLUMN, id.to_value())
    }

    pub fn where_id_in(self, ids: &[E::Id]) -> Self {
        self.where_in(E::ID_COLUMN, ids.iter().map(EntityId::to_value))
    }

    /// Adds an example predicate; universal examples add no restriction.
    pub fn where_example(mut self, example: ExampleExpression) -> Self {
        if !example.matches_all() {
            self.predicates.push(Predicate::Example(example));
        }
        self
    }

    /// Appends `sort` after any orders already present.
    pub fn order_by(mut self, sort: &Sort) -> Self {
        self.sort = self.sort.and(sort);
        self
    }

    /// Restricts loaded properties with a selection path (see `FetchPath`).
    pub fn select(mut self, fetch_path: impl Into<String>) -> Self {
        self.selection = Some(fetch_path.into());
        self
    }

    pub fn set_first_row(mut self, first_row: u64) -> Self {
        self.first_row = Some(first_row);
        self
    }

    pub fn set_max_rows(mut self, max_rows: u64) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    pub fn source(&self) -> &QuerySource {
        &self.source
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parameters(&self) -> &[Value] {
        &self.params
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn first_row(&self) -> Option<u64> {
        self.first_row
    }

    pub fn max_rows(&self) -> Option<u64> {
        self.max_rows
    }
}

impl<E: Entity> Default for Query<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            name: self.name.clone(),
            params: self.params.clone(),
            predicates: self.predicates.clone(),
            sort: self.sort.clone(),
            selection: self.selection.clone(),
            first_row: self.first_row,
            max_rows: self.max_rows,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Debug for Query<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("entity", &E::TABLE)
            .field("source", &self.source)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("predicates", &self.predicates)
            .field("sort", &self.sort)
            .field("selection", &self.selection)
            .field("first_row", &self.first_row)
            .field("max_rows", &self.max_rows)
            .finish()
    }
}

/// Bulk conditional update of `E` rows.
pub struct UpdateQuery<E> {
    assignments: Vec<(String, Value)>,
    predicates: Vec<Predicate>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> UpdateQuery<E> {
    pub fn new() -> Self {
        Self {
            assignments: Vec::new(),
            predicates: Vec::new(),
            _entity: PhantomData,
        }
    }

    pub fn set(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((property.into(), value.into()));
        self
    }

    pub fn where_eq(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates
            .push(Predicate::Eq(property.into(), value.into()));
        self
    }

    pub fn where_in(
        mut self,
        property: impl Into<String>,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.predicates.push(Predicate::In(
            property.into(),
            values.into_iter().collect(),
        ));
        self
    }

    pub fn where_example(mut self, example: ExampleExpression) -> Self {
        if !example.matches_all() {
            self.predicates.push(Predicate::Example(example));
        }
        self
    }

    pub fn assignments(&self) -> &[(String, Value)] {
        &self.assignments
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }
}

impl<E: Entity> Default for UpdateQuery<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Debug for UpdateQuery<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateQuery")
            .field("entity", &E::TABLE)
            .field("assignments", &self.assignments)
            .field("predicates", &self.predicates)
            .finish()
    }
}

/// Native SELECT returning untyped rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    sql: String,
    params: Vec<Value>,
}

impl SqlQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn set_parameter(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[Value] {
        &self.params
    }
}

/// Native INSERT, UPDATE or DELETE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlUpdate {
    sql: String,
    params: Vec<Value>,
}

impl SqlUpdate {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn set_parameter(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[Value] {
        &self.params
    }
}
