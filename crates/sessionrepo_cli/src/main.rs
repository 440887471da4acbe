//! CLI smoke entry point.
//!
//! # Responsibility
//! - Run a fixed repository scenario against an in-memory database.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `sessionrepo_cli [ABSOLUTE_LOG_DIR]`

use log::info;
use rusqlite::types::Value;
use sessionrepo_core::db::migrations::Migration;
use sessionrepo_core::{
    core_version, default_log_level, init_logging, open_db_in_memory, Entity, EntityRepository,
    RepoError, RepoResult, SessionRepository, SqlRow, SqliteSession,
};
use std::process::ExitCode;

const MIGRATIONS: &[Migration] = &[Migration::new(
    1,
    "CREATE TABLE customer (id INTEGER PRIMARY KEY, name TEXT NOT NULL, city TEXT);",
)];

#[derive(Debug, Clone, PartialEq)]
struct Customer {
    id: Option<i64>,
    name: String,
    city: Option<String>,
}

impl Customer {
    fn named(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            city: None,
        }
    }
}

impl Entity for Customer {
    type Id = i64;

    const TABLE: &'static str = "customer";
    const COLUMNS: &'static [&'static str] = &["name", "city"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            self.city.clone().map_or(Value::Null, Value::Text),
        ]
    }

    fn from_row(row: &SqlRow) -> RepoResult<Self> {
        Ok(Self {
            id: row.get_opt("id")?,
            name: row.get_or_default("name")?,
            city: row.get_opt("city")?,
        })
    }
}

fn main() -> ExitCode {
    if let Some(log_dir) = std::env::args().nth(1) {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("sessionrepo_core version={}", core_version());
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("scenario failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> RepoResult<()> {
    let conn = open_db_in_memory(MIGRATIONS)?;
    let session = SqliteSession::new(&conn);
    let customers: SessionRepository<'_, _, Customer> = SessionRepository::new(&session);

    let saved = customers.save_all(vec![
        Customer::named("x"),
        Customer::named("x"),
        Customer::named("y"),
    ])?;
    info!(
        "event=cli_scenario module=cli status=seeded count={}",
        saved.len()
    );

    let y = customers.find_one_by_property("name", "y".to_string())?;
    println!("find_one_by_property(name=y) -> {y:?}");

    match customers.find_one_by_property("name", "x".to_string()) {
        Err(RepoError::AmbiguousResult { count, .. }) => {
            println!("find_one_by_property(name=x) -> ambiguous ({count} matches)")
        }
        other => println!("find_one_by_property(name=x) -> unexpected {other:?}"),
    }

    let x = customers.example_of(Some(&Customer::named("x")))?;
    println!(
        "find_all_by_example(name=x) -> {:?}",
        customers.find_all_by_example(Some(&x))?
    );
    println!(
        "count_by_example(name=x) -> {}",
        customers.count_by_example(Some(&x))?
    );

    let z = customers.example_of(Some(&Customer::named("z")))?;
    println!(
        "exists_by_example(name=z) -> {}",
        customers.exists_by_example(Some(&z))?
    );

    info!("event=cli_scenario module=cli status=ok");
    Ok(())
}
