use time::OffsetDateTime;
use tracing::{info, instrument};

use super::repo_types::{ProfileUpdate, UserProfile};
use crate::{
    db::{Page, Pagination},
    error::{AppError, AppResult},
    images::services::{ext_from_mime, validate_photo, UploadItem},
    payments::pricing::price_for,
    session::Session,
    state::AppState,
};

pub const MISSING_PHOTO_URL: &str = "Upload succeeded but no image URL was returned.";

fn normalize(update: ProfileUpdate) -> AppResult<ProfileUpdate> {
    let name = update.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("Please enter your full name"));
    }
    let department = update.department.trim().to_string();
    if department.is_empty() {
        return Err(AppError::validation("Please enter your department"));
    }
    let level = update
        .level
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());
    if let Some(level) = &level {
        if price_for(level).is_none() {
            return Err(AppError::validation("Please select a valid level"));
        }
    }
    Ok(ProfileUpdate {
        name,
        department,
        level,
    })
}

#[instrument(skip(st, session, update), fields(user_id = %session.user_id))]
pub async fn update_profile(
    st: &AppState,
    session: &Session,
    update: ProfileUpdate,
) -> AppResult<UserProfile> {
    let update = normalize(update)?;
    let profile = st
        .profiles
        .update_details(&session.user_id, &update)
        .await?
        .ok_or(AppError::NotFound("Profile"))?;
    info!("profile updated");
    Ok(profile)
}

/// Sends the image to the image host and records its public URL.
#[instrument(skip(st, session, item), fields(user_id = %session.user_id))]
pub async fn upload_photo(st: &AppState, session: &Session, item: UploadItem) -> AppResult<String> {
    validate_photo(&item)?;
    let ext = ext_from_mime(&item.content_type).unwrap_or("img");
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let file_name = format!("{}-{}.{}", session.user_id, millis, ext);

    let url = st
        .images
        .upload(&file_name, item)
        .await?
        .ok_or(AppError::Upstream(MISSING_PHOTO_URL))?;
    st.profiles.set_photo(&session.user_id, &url).await?;
    info!(url = %url, "profile photo updated");
    Ok(url)
}

pub async fn list_students(
    st: &AppState,
    search: Option<&str>,
    page: Pagination,
) -> AppResult<Page<UserProfile>> {
    let page = page.clamped();
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    let (items, total) = tokio::try_join!(
        st.profiles.list_students(search, page),
        st.profiles.count_students(search)
    )?;
    Ok(Page::new(items, total, page))
}
