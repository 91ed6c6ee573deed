use anyhow::Context;
use axum::extract::Multipart;
use bytes::Bytes;
use tracing::warn;

use crate::{error::AppError, state::AppState};

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
/// Request body cap for upload routes; leaves room for multipart framing.
pub const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;
const PROOF_URL_TTL_SECS: u64 = 30 * 60;

/// Pulls the first file from `field` out of a multipart body.
pub async fn read_file_field(mp: &mut Multipart, field: &str) -> Result<UploadItem, AppError> {
    loop {
        let next = mp.next_field().await.map_err(|e| {
            warn!(error = %e, "malformed multipart body");
            AppError::validation("Could not read the uploaded file")
        })?;
        let Some(part) = next else {
            return Err(AppError::validation("Please choose a file to upload"));
        };
        if part.name() != Some(field) {
            continue;
        }
        let content_type = part
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = part.bytes().await.map_err(|e| {
            warn!(error = %e, "upload body rejected");
            AppError::validation("File size must be less than 5MB")
        })?;
        return Ok(UploadItem { body, content_type });
    }
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

/// Profile photos: any image, at most 5 MB.
pub fn validate_photo(item: &UploadItem) -> Result<(), AppError> {
    if !item.content_type.starts_with("image/") {
        return Err(AppError::validation("Please upload an image file"));
    }
    check_size(item)
}

/// Payment proofs: png, jpeg or pdf, at most 5 MB.
pub fn validate_proof(item: &UploadItem) -> Result<&'static str, AppError> {
    let ext = match ext_from_mime(&item.content_type) {
        Some(ext @ ("jpg" | "png" | "pdf")) => ext,
        _ => {
            return Err(AppError::validation(
                "Payment proof must be a PNG, JPEG or PDF file",
            ))
        }
    };
    check_size(item)?;
    Ok(ext)
}

fn check_size(item: &UploadItem) -> Result<(), AppError> {
    if item.body.is_empty() {
        return Err(AppError::validation("Uploaded file is empty"));
    }
    if item.body.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::validation("File size must be less than 5MB"));
    }
    Ok(())
}

pub fn proof_key(user_id: &str, reference: &str, ext: &str) -> String {
    format!("proofs/{}/{}.{}", user_id, reference, ext)
}

/// Uploads a validated proof and returns its object key.
pub async fn store_proof(
    st: &AppState,
    user_id: &str,
    reference: &str,
    item: UploadItem,
) -> Result<String, AppError> {
    let ext = validate_proof(&item)?;
    let key = proof_key(user_id, reference, ext);
    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

pub async fn presign_proof(st: &AppState, key: &str) -> anyhow::Result<String> {
    st.storage
        .presign_get(key, PROOF_URL_TTL_SECS)
        .await
        .with_context(|| format!("presign url for key {}", key))
}
