//! Untyped result row.

use crate::repo::error::{RepoError, RepoResult};
use rusqlite::types::{FromSql, Value, ValueRef};
use rusqlite::Row;

/// Ordered column/value pairs read from one result row.
///
/// Column lookup ignores ASCII case, matching SQLite identifier rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl SqlRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies every column of a rusqlite row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let names: Vec<String> = row
            .as_ref()
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut values = Vec::with_capacity(names.len());
        for index in 0..names.len() {
            values.push(row.get::<_, Value>(index)?);
        }
        Ok(Self {
            columns: names,
            values,
        })
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push(column.into());
        self.values.push(value.into());
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|index| &self.values[index])
    }

    /// Reads a required column.
    ///
    /// # Errors
    /// - `InvalidData` when the column is absent or cannot convert to `T`.
    pub fn get<T: FromSql>(&self, column: &str) -> RepoResult<T> {
        let value = self.value(column).ok_or_else(|| {
            RepoError::InvalidData(format!("column `{column}` is missing from result row"))
        })?;
        convert(column, value)
    }

    /// Reads an optional column; absent and NULL both yield `None`.
    pub fn get_opt<T: FromSql>(&self, column: &str) -> RepoResult<Option<T>> {
        match self.value(column) {
            Some(value) => convert::<Option<T>>(column, value),
            None => Ok(None),
        }
    }

    /// Reads a column that may be left out by a partial fetch.
    pub fn get_or_default<T: FromSql + Default>(&self, column: &str) -> RepoResult<T> {
        Ok(self.get_opt(column)?.unwrap_or_default())
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|name| name.eq_ignore_ascii_case(column))
    }
}

fn convert<T: FromSql>(column: &str, value: &Value) -> RepoResult<T> {
    T::column_result(ValueRef::from(value)).map_err(|err| {
        RepoError::InvalidData(format!("column `{column}` has unexpected value: {err}"))
    })
}
