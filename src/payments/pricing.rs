use serde::Serialize;
use time::OffsetDateTime;

pub const CURRENCY: &str = "NGN";

/// Dues per academic level, in naira.
pub const LEVEL_PRICES: &[(&str, i64)] = &[
    ("100", 5_000),
    ("200", 3_000),
    ("300", 3_000),
    ("400", 3_000),
    ("500", 3_000),
];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LevelPrice {
    pub level: &'static str,
    pub amount: i64,
}

pub fn levels() -> Vec<LevelPrice> {
    LEVEL_PRICES
        .iter()
        .map(|&(level, amount)| LevelPrice { level, amount })
        .collect()
}

pub fn price_for(level: &str) -> Option<i64> {
    LEVEL_PRICES
        .iter()
        .find(|(l, _)| *l == level.trim())
        .map(|&(_, amount)| amount)
}

/// Gateway amounts are in kobo.
pub fn to_minor_units(naira: i64) -> i64 {
    naira * 100
}

/// `ref-{userId}-{epochMillis}`
pub fn new_reference(user_id: &str, now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!("ref-{user_id}-{millis}")
}
