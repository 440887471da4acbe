//! Query-by-example predicates.
//!
//! # Invariants
//! - Only populated (non-NULL), non-id properties of the prototype take part.
//! - An expression without properties matches every row.
//! - Text properties match through the configured `LikeType`; other values
//!   match by equality.

use crate::model::entity::Entity;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// How text properties of a prototype are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeType {
    /// Prototype text is used verbatim as a LIKE pattern (`%` and `_` are wildcards).
    #[default]
    Raw,
    StartsWith,
    EndsWith,
    Contains,
    /// Exact match, no wildcards.
    EqualTo,
}

/// Predicate derived from a prototype entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleExpression {
    entity: &'static str,
    properties: Vec<(&'static str, Value)>,
    case_insensitive: bool,
    like_type: LikeType,
}

impl ExampleExpression {
    /// Builds an expression from `prototype`; `None` yields the universal match.
    pub fn of<E: Entity>(prototype: Option<&E>, case_insensitive: bool, like_type: LikeType) -> Self {
        let properties = prototype
            .map(|entity| {
                E::COLUMNS
                    .iter()
                    .copied()
                    .zip(entity.to_values())
                    .filter(|(_, value)| *value != Value::Null)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            entity: E::TABLE,
            properties,
            case_insensitive,
            like_type,
        }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn properties(&self) -> &[(&'static str, Value)] {
        &self.properties
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn like_type(&self) -> LikeType {
        self.like_type
    }

    /// Whether this expression places no restriction on the result.
    pub fn matches_all(&self) -> bool {
        self.properties.is_empty()
    }

    /// Renders the predicate as SQL conditions joined by `AND`.
    ///
    /// Returns `None` for the universal match.
    pub(crate) fn to_sql(&self) -> Option<(String, Vec<Value>)> {
        if self.matches_all() {
            return None;
        }

        let mut clauses = Vec::with_capacity(self.properties.len());
        let mut params = Vec::with_capacity(self.properties.len());
        for (column, value) in &self.properties {
            let (clause, param) = match value {
                Value::Text(text) => self.text_clause(column, text),
                other => (format!("\"{column}\" = ?"), other.clone()),
            };
            clauses.push(clause);
            params.push(param);
        }
        Some((clauses.join(" AND "), params))
    }

    fn text_clause(&self, column: &str, text: &str) -> (String, Value) {
        if self.like_type == LikeType::EqualTo {
            let collate = if self.case_insensitive {
                " COLLATE NOCASE"
            } else {
                ""
            };
            return (
                format!("\"{column}\" = ?{collate}"),
                Value::Text(text.to_string()),
            );
        }

        let tokens = pattern_tokens(self.like_type, text);
        if self.case_insensitive {
            // LIKE folds ASCII case.
            (
                format!("\"{column}\" LIKE ? ESCAPE '\\'"),
                Value::Text(to_like(&tokens)),
            )
        } else {
            (
                format!("\"{column}\" GLOB ?"),
                Value::Text(to_glob(&tokens)),
            )
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyRun,
    AnyOne,
}

fn pattern_tokens(like_type: LikeType, text: &str) -> Vec<Token> {
    let literal = || text.chars().map(Token::Literal);
    match like_type {
        LikeType::Raw => text
            .chars()
            .map(|ch| match ch {
                '%' => Token::AnyRun,
                '_' => Token::AnyOne,
                other => Token::Literal(other),
            })
            .collect(),
        LikeType::StartsWith => literal().chain([Token::AnyRun]).collect(),
        LikeType::EndsWith => [Token::AnyRun].into_iter().chain(literal()).collect(),
        LikeType::Contains => [Token::AnyRun]
            .into_iter()
            .chain(literal())
            .chain([Token::AnyRun])
            .collect(),
        LikeType::EqualTo => literal().collect(),
    }
}

fn to_like(tokens: &[Token]) -> String {
    let mut pattern = String::new();
    for token in tokens {
        match token {
            Token::Literal(ch @ ('%' | '_' | '\\')) => {
                pattern.push('\\');
                pattern.push(*ch);
            }
            Token::Literal(ch) => pattern.push(*ch),
            Token::AnyRun => pattern.push('%'),
            Token::AnyOne => pattern.push('_'),
        }
    }
    pattern
}

fn to_glob(tokens: &[Token]) -> String {
    let mut pattern = String::new();
    for token in tokens {
        match token {
            Token::Literal(ch @ ('*' | '?' | '[')) => {
                pattern.push('[');
                pattern.push(*ch);
                pattern.push(']');
            }
            Token::Literal(ch) => pattern.push(*ch),
            Token::AnyRun => pattern.push('*'),
            Token::AnyOne => pattern.push('?'),
        }
    }
    pattern
}
