//! Session and connection settings.

use crate::query::page::Pageable;
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 1000;

/// Tunables for connection bootstrap and query execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Whether `PRAGMA foreign_keys = ON` is applied on open.
    pub foreign_keys: bool,
    /// Page size used when a caller builds a `Pageable` without one.
    pub default_page_size: u64,
    /// Upper bound applied to every paged fetch.
    pub max_page_size: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            foreign_keys: true,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl SessionConfig {
    /// Clamps a requested page size into `1..=max_page_size`.
    pub fn clamp_page_size(&self, requested: u64) -> u64 {
        requested.clamp(1, self.max_page_size.max(1))
    }

    /// First page at the configured default size.
    pub fn default_pageable(&self) -> Pageable {
        Pageable::first(self.clamp_page_size(self.default_page_size))
    }
}
