use anyhow::Context;
use async_trait::async_trait;

use super::repo_types::{NewProfile, ProfileUpdate, UserProfile};
use crate::db::{like_pattern, normalized, Pagination, PgStore};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, id: &str) -> anyhow::Result<Option<UserProfile>>;
    async fn create(&self, new: &NewProfile) -> anyhow::Result<UserProfile>;
    async fn update_details(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> anyhow::Result<Option<UserProfile>>;
    async fn set_photo(&self, id: &str, url: &str) -> anyhow::Result<()>;
    /// Profiles whose role is `student`, newest first.
    async fn list_students(
        &self,
        search: Option<&str>,
        page: Pagination,
    ) -> anyhow::Result<Vec<UserProfile>>;
    async fn count_students(&self, search: Option<&str>) -> anyhow::Result<i64>;
}

const COLUMNS: &str =
    "id, email, name, reg_no, department, level, role, photo_url, created_at";

/// Students matching the optional `$1` LIKE pattern. Role matching ignores
/// case and padding, like `Role::from_str`.
fn student_search_filter() -> String {
    format!(
        "{} = 'student' AND ($1::text IS NULL \
         OR name ILIKE $1 OR reg_no ILIKE $1 \
         OR email ILIKE $1 OR department ILIKE $1)",
        normalized("role")
    )
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get(&self, id: &str) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get profile")?;
        Ok(row)
    }

    async fn create(&self, new: &NewProfile) -> anyhow::Result<UserProfile> {
        let row = sqlx::query_as::<_, UserProfile>(&format!(
            r#"
            INSERT INTO profiles (id, email, name, reg_no, department, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&new.id)
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.reg_no)
        .bind(&new.department)
        .bind(&new.role)
        .fetch_one(&self.db)
        .await
        .context("insert profile")?;
        Ok(row)
    }

    async fn update_details(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserProfile>(&format!(
            r#"
            UPDATE profiles
               SET name = $2, department = $3, level = $4
             WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.name)
        .bind(&update.department)
        .bind(&update.level)
        .fetch_optional(&self.db)
        .await
        .context("update profile")?;
        Ok(row)
    }

    async fn set_photo(&self, id: &str, url: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE profiles SET photo_url = $2 WHERE id = $1")
            .bind(id)
            .bind(url)
            .execute(&self.db)
            .await
            .context("set profile photo")?;
        Ok(())
    }

    async fn list_students(
        &self,
        search: Option<&str>,
        page: Pagination,
    ) -> anyhow::Result<Vec<UserProfile>> {
        let page = page.clamped();
        let rows = sqlx::query_as::<_, UserProfile>(&format!(
            r#"
            SELECT {COLUMNS}
              FROM profiles
             WHERE {filter}
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3
            "#,
            filter = student_search_filter(),
        ))
        .bind(search.map(like_pattern))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.db)
        .await
        .context("list students")?;
        Ok(rows)
    }

    async fn count_students(&self, search: Option<&str>) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM profiles WHERE {}",
            student_search_filter()
        ))
        .bind(search.map(like_pattern))
        .fetch_one(&self.db)
        .await
        .context("count students")?;
        Ok(count)
    }
}
