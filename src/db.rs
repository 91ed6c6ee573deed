use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Postgres adapter for the profile, payment and dashboard stores.
#[derive(Clone)]
pub struct PgStore {
    pub db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl Pagination {
    pub const MAX_LIMIT: i64 = 100;

    pub fn clamped(self) -> Self {
        Self {
            limit: self.limit.clamp(1, Self::MAX_LIMIT),
            offset: self.offset.max(0),
        }
    }
}

/// One page of a listing plus the unpaged total.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: Pagination) -> Self {
        let page = page.clamped();
        Self {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        }
    }

    pub fn has_next(&self) -> bool {
        self.offset + (self.items.len() as i64) < self.total
    }

    pub fn has_prev(&self) -> bool {
        self.offset > 0
    }

    pub fn next_offset(&self) -> i64 {
        self.offset + self.limit
    }

    pub fn prev_offset(&self) -> i64 {
        (self.offset - self.limit).max(0)
    }
}

/// `ILIKE` pattern for a case-insensitive substring search.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Padding stripped from stored enum-like text columns (`role`, `status`).
const STORED_PADDING: &[char] = &[' ', '\t', '\n', '\r'];

/// Case- and padding-insensitive form used on both sides of a comparison.
pub fn normalize_stored(raw: &str) -> String {
    raw.trim_matches(STORED_PADDING).to_lowercase()
}

/// SQL twin of [`normalize_stored`] for a column.
pub fn normalized(col: &str) -> String {
    format!(r"lower(btrim({col}, E' \t\n\r'))")
}
