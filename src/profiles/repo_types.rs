use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// One profile per identity; `id` is the identity provider's account id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub reg_no: String,
    pub department: String,
    pub level: Option<String>,
    pub role: Option<String>, // raw stored value, resolved by session::Role
    pub photo_url: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub reg_no: String,
    pub department: String,
    pub role: String,
}

/// Fields a student may edit on their own profile.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub department: String,
    pub level: Option<String>,
}
