use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use tracing::{error, instrument};

use super::services::UploadItem;
use crate::config::ImageHostConfig;

/// Third-party asset host for profile photos.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Public URL of the uploaded image; `None` when the host accepted the
    /// file without reporting one.
    async fn upload(&self, file_name: &str, item: UploadItem) -> anyhow::Result<Option<String>>;
}

pub struct CloudinaryHost {
    client: Client,
    upload_url: String,
    upload_preset: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

impl CloudinaryHost {
    pub fn new(cfg: &ImageHostConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("build image host client")?;
        Ok(Self {
            client,
            upload_url: format!(
                "https://api.cloudinary.com/v1_1/{}/image/upload",
                cfg.cloud_name
            ),
            upload_preset: cfg.upload_preset.clone(),
        })
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    #[instrument(skip(self, item), fields(size = item.body.len()))]
    async fn upload(&self, file_name: &str, item: UploadItem) -> anyhow::Result<Option<String>> {
        let part = multipart::Part::stream(item.body)
            .file_name(file_name.to_string())
            .mime_str(&item.content_type)?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .context("image upload request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "image host rejected upload");
            return Err(anyhow!("image upload failed: {}", status));
        }

        let parsed: UploadResponse = response.json().await.context("decode upload response")?;
        Ok(parsed.secure_url.filter(|url| !url.is_empty()))
    }
}
