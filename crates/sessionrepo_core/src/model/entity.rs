//! Entity and identifier contracts.
//!
//! # Responsibility
//! - Describe how a domain record maps to one SQLite table.
//! - Convert identifiers to and from storage values.
//!
//! # Invariants
//! - `to_values()` yields exactly one value per entry of `COLUMNS`, in order.
//! - `from_row()` accepts rows carrying only a subset of `COLUMNS`; absent
//!   columns fall back to the property's default (partial fetch).
//! - An identifier determines at most one row in `TABLE`.

use crate::model::row::SqlRow;
use crate::repo::error::RepoResult;
use rusqlite::types::Value;
use std::fmt::Debug;
use uuid::Uuid;

/// Identifier of a persisted entity.
pub trait EntityId: Clone + Debug + PartialEq {
    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;

    /// Produces a fresh identifier client-side, if the type supports it.
    ///
    /// Types returning `None` rely on the engine assigning a row id on insert.
    fn generate() -> Option<Self> {
        None
    }
}

impl EntityId for i64 {
    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(id) => Some(*id),
            _ => None,
        }
    }
}

impl EntityId for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(text) => Some(text.clone()),
            _ => None,
        }
    }
}

impl EntityId for Uuid {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(text) => Uuid::parse_str(text).ok(),
            _ => None,
        }
    }

    fn generate() -> Option<Self> {
        Some(Uuid::new_v4())
    }
}

/// Domain record persisted in one table.
pub trait Entity: Sized {
    type Id: EntityId;

    /// Table name, also used as the entity name in errors and logs.
    const TABLE: &'static str;
    const ID_COLUMN: &'static str = "id";
    /// Persisted properties other than the identifier.
    const COLUMNS: &'static [&'static str];

    /// Returns `None` while the entity has not been persisted.
    fn id(&self) -> Option<Self::Id>;

    fn set_id(&mut self, id: Self::Id);

    /// Column values aligned with `COLUMNS`; unset properties map to `Value::Null`.
    fn to_values(&self) -> Vec<Value>;

    fn from_row(row: &SqlRow) -> RepoResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::EntityId;
    use rusqlite::types::Value;
    use uuid::Uuid;

    #[test]
    fn integer_ids_reject_text_values() {
        assert_eq!(i64::from_value(&Value::Integer(7)), Some(7));
        assert_eq!(i64::from_value(&Value::Text("7".to_string())), None);
        assert!(i64::generate().is_none());
    }

    #[test]
    fn uuid_ids_are_generated_and_parsed_from_text() {
        let id = Uuid::generate().expect("uuid ids are generated client-side");
        assert_eq!(Uuid::from_value(&id.to_value()), Some(id));
        assert_eq!(Uuid::from_value(&Value::Text("nope".to_string())), None);
    }
}
