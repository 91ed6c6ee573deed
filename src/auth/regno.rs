//! Registration numbers double as login names: the identity provider only
//! knows an email-shaped identifier derived from them.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref REG_NO_RE: Regex = Regex::new(r"^[0-9]{4}/?[0-9]{6}$").unwrap();
}

pub fn validate_reg_no(reg_no: &str) -> bool {
    REG_NO_RE.is_match(reg_no)
}

/// `2020/241762` -> `2020241762@{domain}`.
pub fn reg_no_to_identifier(reg_no: &str, domain: &str) -> String {
    let digits = reg_no.replace('/', "");
    format!("{}@{}", digits.trim(), domain)
}

/// `YYYY/NNNNNN`, the form stored on profiles. Expects a validated number.
pub fn canonical_reg_no(reg_no: &str) -> String {
    let digits = reg_no.replace('/', "");
    let (year, serial) = digits.split_at(digits.len().min(4));
    format!("{year}/{serial}")
}
