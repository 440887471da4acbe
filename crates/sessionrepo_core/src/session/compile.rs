//! Builder-to-SQL compilation for the SQLite session.
//!
//! # Invariants
//! - Identifiers placed in SQL text come only from `Entity` constants; caller
//!   supplied property names are resolved against them first.
//! - Values are always bound as positional parameters, in textual order.

use crate::model::entity::{Entity, EntityId};
use crate::query::builder::{Predicate, Query, QuerySource, UpdateQuery};
use crate::query::fetch::FetchPath;
use crate::query::sort::Sort;
use crate::repo::error::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;

static OQL_WHERE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^where\b").expect("valid where regex"));
// Quoted literals are matched first so `order by` inside them is skipped.
static OQL_ORDER_BY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*"|(?i:\border\s+by\b)"#)
        .expect("valid order-by regex")
});

/// `IN` lists longer than this are bound as one JSON array parameter.
const INLINE_IN_LIST_MAX: usize = 100;

/// SQL text plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Statement {
    pub(crate) sql: String,
    pub(crate) params: Vec<Value>,
}

/// What a compiled SELECT returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Projection {
    Rows,
    Count,
    Exists,
    Ids,
}

/// Row window applied to `Projection::Rows`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Window {
    pub(crate) offset: u64,
    pub(crate) limit: Option<u64>,
}

impl Window {
    pub(crate) fn of<E: Entity>(query: &Query<E>) -> Self {
        Self {
            offset: query.first_row().unwrap_or(0),
            limit: query.max_rows(),
        }
    }

    /// Narrows the limit to at most `max` rows.
    pub(crate) fn at_most(self, max: u64) -> Self {
        Self {
            limit: Some(self.limit.map_or(max, |limit| limit.min(max))),
            ..self
        }
    }

    /// Number of rows this window lets through out of `total`.
    pub(crate) fn clip(self, total: u64) -> u64 {
        let remaining = total.saturating_sub(self.offset);
        self.limit.map_or(remaining, |limit| remaining.min(limit))
    }
}

/// Split form of an OQL fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct OqlParts {
    pub(crate) filter: Option<String>,
    pub(crate) order: Option<String>,
}

/// Splits `[where <expr>] [order by <list>]`.
///
/// # Errors
/// - `QuerySyntax` when the text starts with anything else or a clause is empty.
pub(crate) fn parse_oql(text: &str) -> RepoResult<OqlParts> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(OqlParts::default());
    }

    let clause = OQL_ORDER_BY_RE
        .find_iter(trimmed)
        .find(|found| !found.as_str().starts_with(&['\'', '"'][..]));
    let (head, order) = match clause {
        Some(found) => (&trimmed[..found.start()], Some(trimmed[found.end()..].trim())),
        None => (trimmed, None),
    };

    let head = head.trim();
    let filter = if head.is_empty() {
        None
    } else {
        let keyword = OQL_WHERE_RE.find(head).ok_or_else(|| {
            RepoError::query_syntax(text, "query text must start with `where` or `order by`")
        })?;
        let body = head[keyword.end()..].trim();
        if body.is_empty() {
            return Err(RepoError::query_syntax(text, "`where` clause is empty"));
        }
        Some(body.to_string())
    };

    if order == Some("") {
        return Err(RepoError::query_syntax(text, "`order by` clause is empty"));
    }

    Ok(OqlParts {
        filter,
        order: order.map(str::to_string),
    })
}

/// Compiles a fetch of `E`.
///
/// `extra_sort` is appended after the query's own orders. Ordering and the
/// window only apply to `Projection::Rows`.
pub(crate) fn select<E: Entity>(
    query: &Query<E>,
    projection: Projection,
    extra_sort: &Sort,
    window: Window,
) -> RepoResult<Statement> {
    let mut params = Vec::new();
    let mut conditions = Vec::new();
    let mut order_terms = Vec::new();

    let from = match query.source() {
        QuerySource::Entity => quote(E::TABLE),
        QuerySource::Oql(text) => {
            let parts = parse_oql(text)?;
            if let Some(filter) = parts.filter {
                conditions.push(format!("({filter})"));
            }
            if let Some(order) = parts.order {
                order_terms.push(order);
            }
            params.extend(query.parameters().iter().cloned());
            quote(E::TABLE)
        }
        QuerySource::Native(sql) => {
            params.extend(query.parameters().iter().cloned());
            format!("({}) AS q", sql.trim().trim_end_matches(';'))
        }
    };

    for predicate in query.predicates() {
        conditions.push(predicate_sql::<E>(predicate, &mut params)?);
    }
    let where_sql = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = match projection {
        Projection::Count => format!("SELECT COUNT(*) FROM {from}{where_sql}"),
        Projection::Exists => format!("SELECT EXISTS(SELECT 1 FROM {from}{where_sql})"),
        Projection::Ids => format!("SELECT {} FROM {from}{where_sql}", quote(E::ID_COLUMN)),
        Projection::Rows => {
            let columns = select_list::<E>(query)?;
            let mut sql = format!("SELECT {columns} FROM {from}{where_sql}");

            for order in query.sort().orders().iter().chain(extra_sort.orders()) {
                let column = resolve_property::<E>(&order.property)?;
                order_terms.push(format!("{} {}", quote(column), order.direction.as_sql()));
            }
            if !order_terms.is_empty() {
                sql.push_str(" ORDER BY ");
                sql.push_str(&order_terms.join(", "));
            }

            push_window(&mut sql, &mut params, window);
            sql
        }
    };

    Ok(Statement { sql, params })
}

/// Compiles a delete of every row the query matches.
pub(crate) fn delete<E: Entity>(query: &Query<E>) -> RepoResult<Statement> {
    let ids = select(query, Projection::Ids, &Sort::unsorted(), Window::default())?;
    Ok(Statement {
        sql: format!(
            "DELETE FROM {} WHERE {} IN ({})",
            quote(E::TABLE),
            quote(E::ID_COLUMN),
            ids.sql
        ),
        params: ids.params,
    })
}

/// Compiles a bulk update.
///
/// # Errors
/// - `QuerySyntax` when no `set` clause was given.
pub(crate) fn update<E: Entity>(update: &UpdateQuery<E>) -> RepoResult<Statement> {
    if update.assignments().is_empty() {
        return Err(RepoError::query_syntax(
            format!("update {}", E::TABLE),
            "update query has no `set` clause",
        ));
    }

    let mut params = Vec::new();
    let mut assignments = Vec::with_capacity(update.assignments().len());
    for (property, value) in update.assignments() {
        let column = resolve_property::<E>(property)?;
        assignments.push(format!("{} = ?", quote(column)));
        params.push(value.clone());
    }

    let mut sql = format!(
        "UPDATE {} SET {}",
        quote(E::TABLE),
        assignments.join(", ")
    );
    let mut conditions = Vec::new();
    for predicate in update.predicates() {
        conditions.push(predicate_sql::<E>(predicate, &mut params)?);
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    Ok(Statement { sql, params })
}

pub(crate) fn exists_by_id<E: Entity>(id: &E::Id) -> Statement {
    Statement {
        sql: format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?)",
            quote(E::TABLE),
            quote(E::ID_COLUMN)
        ),
        params: vec![id.to_value()],
    }
}

/// Compiles an insert of `values` (aligned with `E::COLUMNS`), with an explicit id when given.
pub(crate) fn insert<E: Entity>(id: Option<&E::Id>, values: Vec<Value>) -> Statement {
    let mut columns = Vec::with_capacity(E::COLUMNS.len() + 1);
    let mut params = Vec::with_capacity(E::COLUMNS.len() + 1);
    if let Some(id) = id {
        columns.push(quote(E::ID_COLUMN));
        params.push(id.to_value());
    }
    columns.extend(E::COLUMNS.iter().map(|column| quote(column)));
    params.extend(values);

    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quote(E::TABLE))
    } else {
        let placeholders = vec!["?"; columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            quote(E::TABLE),
            columns.join(", ")
        )
    };
    Statement { sql, params }
}

/// Compiles an update of every persisted column of one row; `None` when `E` has no columns.
pub(crate) fn update_by_id<E: Entity>(id: &E::Id, values: Vec<Value>) -> Option<Statement> {
    if E::COLUMNS.is_empty() {
        return None;
    }
    let assignments = E::COLUMNS
        .iter()
        .map(|column| format!("{} = ?", quote(column)))
        .collect::<Vec<_>>()
        .join(", ");
    let mut params = values;
    params.push(id.to_value());
    Some(Statement {
        sql: format!(
            "UPDATE {} SET {assignments} WHERE {} = ?",
            quote(E::TABLE),
            quote(E::ID_COLUMN)
        ),
        params,
    })
}

fn select_list<E: Entity>(query: &Query<E>) -> RepoResult<String> {
    let path = FetchPath::parse(query.selection().unwrap_or("*"))?;
    if path.is_all() && matches!(query.source(), QuerySource::Native(_)) {
        return Ok("*".to_string());
    }
    let columns = path.columns::<E>()?;
    Ok(columns
        .into_iter()
        .map(quote)
        .collect::<Vec<_>>()
        .join(", "))
}

fn predicate_sql<E: Entity>(predicate: &Predicate, params: &mut Vec<Value>) -> RepoResult<String> {
    match predicate {
        Predicate::Eq(property, Value::Null) => {
            Ok(format!("{} IS NULL", quote(resolve_property::<E>(property)?)))
        }
        Predicate::Eq(property, value) => {
            let column = resolve_property::<E>(property)?;
            params.push(value.clone());
            Ok(format!("{} = ?", quote(column)))
        }
        Predicate::In(property, values) => {
            let column = quote(resolve_property::<E>(property)?);
            if values.is_empty() {
                return Ok("1 = 0".to_string());
            }
            if values.len() > INLINE_IN_LIST_MAX {
                if let Some(array) = json_array(values) {
                    params.push(Value::Text(array));
                    return Ok(format!("{column} IN (SELECT value FROM json_each(?))"));
                }
            }
            params.extend(values.iter().cloned());
            let placeholders = vec!["?"; values.len()].join(", ");
            Ok(format!("{column} IN ({placeholders})"))
        }
        Predicate::Example(example) => {
            if example.entity() != E::TABLE {
                return Err(RepoError::query_syntax(
                    format!("example of `{}`", example.entity()),
                    format!("example cannot filter `{}` rows", E::TABLE),
                ));
            }
            for (property, _) in example.properties() {
                resolve_property::<E>(property)?;
            }
            match example.to_sql() {
                Some((sql, values)) => {
                    params.extend(values);
                    Ok(format!("({sql})"))
                }
                None => Ok("1 = 1".to_string()),
            }
        }
    }
}

/// Maps a caller-supplied property name onto `E`'s static column name.
fn resolve_property<E: Entity>(property: &str) -> RepoResult<&'static str> {
    if property == E::ID_COLUMN {
        return Ok(E::ID_COLUMN);
    }
    E::COLUMNS
        .iter()
        .copied()
        .find(|column| *column == property)
        .ok_or_else(|| RepoError::unknown_property(E::TABLE, property))
}

/// Encodes `values` as a JSON array; `None` when a value has no JSON form (blobs, NaN).
fn json_array(values: &[Value]) -> Option<String> {
    let items = values
        .iter()
        .map(|value| match value {
            Value::Null => Some(serde_json::Value::Null),
            Value::Integer(number) => Some(serde_json::Value::from(*number)),
            Value::Real(number) => {
                serde_json::Number::from_f64(*number).map(serde_json::Value::Number)
            }
            Value::Text(text) => Some(serde_json::Value::String(text.clone())),
            Value::Blob(_) => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(serde_json::Value::Array(items).to_string())
}

fn push_window(sql: &mut String, params: &mut Vec<Value>, window: Window) {
    match window.limit {
        Some(limit) => {
            sql.push_str(" LIMIT ?");
            params.push(to_integer(limit));
            if window.offset > 0 {
                sql.push_str(" OFFSET ?");
                params.push(to_integer(window.offset));
            }
        }
        None if window.offset > 0 => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(to_integer(window.offset));
        }
        None => {}
    }
}

fn to_integer(value: u64) -> Value {
    Value::Integer(i64::try_from(value).unwrap_or(i64::MAX))
}

fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}
