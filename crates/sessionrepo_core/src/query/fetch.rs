//! Selection paths restricting which properties a fetch loads.
//!
//! Accepted forms: `""` or `"*"` for every property, otherwise a comma
//! separated property list, optionally wrapped in one pair of parentheses
//! (`"(name,email)"`). The identifier is always loaded.

use crate::model::entity::Entity;
use crate::repo::error::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;

static PROPERTY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid property regex"));

/// Parsed selection path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPath {
    All,
    Properties(Vec<String>),
}

impl FetchPath {
    pub fn parse(text: &str) -> RepoResult<Self> {
        let mut body = text.trim();
        if let Some(inner) = body.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
            body = inner.trim();
        }

        if body.is_empty() || body == "*" {
            return Ok(Self::All);
        }
        if body.contains('(') || body.contains(')') {
            return Err(RepoError::query_syntax(
                text,
                "nested fetch paths are not supported",
            ));
        }

        let mut properties = Vec::new();
        for part in body.split(',').map(str::trim) {
            if part == "*" {
                return Ok(Self::All);
            }
            if !PROPERTY_RE.is_match(part) {
                return Err(RepoError::query_syntax(
                    text,
                    format!("`{part}` is not a property name"),
                ));
            }
            if !properties.iter().any(|known: &String| known == part) {
                properties.push(part.to_string());
            }
        }
        Ok(Self::Properties(properties))
    }

    /// Resolves the path to `E`'s column names, id first.
    ///
    /// # Errors
    /// - `UnknownProperty` when the path names a property `E` does not persist.
    pub fn columns<E: Entity>(&self) -> RepoResult<Vec<&'static str>> {
        let mut columns = vec![E::ID_COLUMN];
        match self {
            Self::All => columns.extend_from_slice(E::COLUMNS),
            Self::Properties(properties) => {
                for property in properties {
                    if property == E::ID_COLUMN {
                        continue;
                    }
                    let column = E::COLUMNS
                        .iter()
                        .copied()
                        .find(|column| *column == property.as_str())
                        .ok_or_else(|| RepoError::unknown_property(E::TABLE, property.as_str()))?;
                    columns.push(column);
                }
            }
        }
        Ok(columns)
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}
