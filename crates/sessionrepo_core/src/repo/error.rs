//! Error type shared by the session engine and the repository facade.
//!
//! The facade never wraps session failures: a `RepoError` produced by the
//! session reaches the caller as the same value.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors surfaced by repository and session operations.
#[derive(Debug)]
pub enum RepoError {
    /// No session is bound to the repository.
    Configuration(String),
    /// Query text could not be compiled by the engine.
    QuerySyntax { query: String, message: String },
    /// Named query is not registered for the entity.
    UnknownNamedQuery { entity: &'static str, name: String },
    /// Property is not a persisted column of the entity.
    UnknownProperty {
        entity: &'static str,
        property: String,
    },
    /// A unique lookup matched more than one row.
    AmbiguousResult { entity: &'static str, count: usize },
    Db(DbError),
    InvalidData(String),
}

impl RepoError {
    pub(crate) fn query_syntax(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QuerySyntax {
            query: query.into(),
            message: message.into(),
        }
    }

    pub(crate) fn unknown_property(entity: &'static str, property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            entity,
            property: property.into(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(message) => write!(f, "repository misconfigured: {message}"),
            Self::QuerySyntax { query, message } => {
                write!(f, "invalid query `{query}`: {message}")
            }
            Self::UnknownNamedQuery { entity, name } => {
                write!(f, "no named query `{name}` registered for `{entity}`")
            }
            Self::UnknownProperty { entity, property } => {
                write!(f, "`{entity}` has no property `{property}`")
            }
            Self::AmbiguousResult { entity, count } => write!(
                f,
                "expected at most one `{entity}` but the query matched {count}"
            ),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Configuration(_)
            | Self::QuerySyntax { .. }
            | Self::UnknownNamedQuery { .. }
            | Self::UnknownProperty { .. }
            | Self::AmbiguousResult { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
