use serde::{Deserialize, Serialize};

use crate::db::Pagination;

/// `?q=&limit=&offset=` on the student directory. Kept flat because
/// `serde(flatten)` loses the numeric types in query strings.
#[derive(Debug, Default, Deserialize)]
pub struct StudentQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl StudentQuery {
    pub fn page(&self) -> Pagination {
        let default = Pagination::default();
        Pagination {
            limit: self.limit.unwrap_or(default.limit),
            offset: self.offset.unwrap_or(default.offset),
        }
        .clamped()
    }
}

#[derive(Debug, Serialize)]
pub struct PhotoResponse {
    pub photo_url: String,
}
