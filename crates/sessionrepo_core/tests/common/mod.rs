#![allow(dead_code)]

use rusqlite::types::Value;
use rusqlite::Connection;
use sessionrepo_core::db::migrations::Migration;
use sessionrepo_core::{open_db_in_memory, Entity, RepoResult, SqlRow};
use uuid::Uuid;

pub const MIGRATIONS: &[Migration] = &[
    Migration::new(
        1,
        "CREATE TABLE customer (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT,
            city TEXT
        );",
    ),
    Migration::new(2, "ALTER TABLE customer ADD COLUMN age INTEGER;"),
    Migration::new(
        3,
        "CREATE TABLE tag (
            id TEXT PRIMARY KEY,
            label TEXT NOT NULL
        );",
    ),
];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Customer {
    pub id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub city: Option<String>,
    pub age: Option<i64>,
}

impl Customer {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_city(mut self, city: &str) -> Self {
        self.city = Some(city.to_string());
        self
    }

    pub fn with_age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }
}

fn text_or_null(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::Text)
}

impl Entity for Customer {
    type Id = i64;

    const TABLE: &'static str = "customer";
    const COLUMNS: &'static [&'static str] = &["name", "email", "city", "age"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            text_or_null(&self.email),
            text_or_null(&self.city),
            self.age.map_or(Value::Null, Value::Integer),
        ]
    }

    fn from_row(row: &SqlRow) -> RepoResult<Self> {
        Ok(Self {
            id: row.get_opt("id")?,
            name: row.get_or_default("name")?,
            email: row.get_opt("email")?,
            city: row.get_opt("city")?,
            age: row.get_opt("age")?,
        })
    }
}

/// Entity whose identifiers are generated client-side.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: Option<Uuid>,
    pub label: String,
}

impl Tag {
    pub fn labelled(label: &str) -> Self {
        Self {
            id: None,
            label: label.to_string(),
        }
    }
}

impl Entity for Tag {
    type Id = Uuid;

    const TABLE: &'static str = "tag";
    const COLUMNS: &'static [&'static str] = &["label"];

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Text(self.label.clone())]
    }

    fn from_row(row: &SqlRow) -> RepoResult<Self> {
        let id = row
            .get_opt::<String>("id")?
            .and_then(|text| Uuid::parse_str(&text).ok());
        Ok(Self {
            id,
            label: row.get_or_default("label")?,
        })
    }
}

pub fn open_test_db() -> Connection {
    open_db_in_memory(MIGRATIONS).unwrap()
}

/// Inserts A(1,"x"), B(2,"x"), C(3,"y").
pub fn seed_scenario(conn: &Connection) {
    conn.execute_batch(
        "INSERT INTO customer (id, name) VALUES (1, 'x');
         INSERT INTO customer (id, name) VALUES (2, 'x');
         INSERT INTO customer (id, name) VALUES (3, 'y');",
    )
    .unwrap();
}

pub fn customer_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM customer", [], |row| row.get(0))
        .unwrap()
}

pub fn ids(customers: &[Customer]) -> Vec<i64> {
    let mut ids: Vec<i64> = customers.iter().filter_map(|customer| customer.id).collect();
    ids.sort_unstable();
    ids
}
