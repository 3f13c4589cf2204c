use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart;
use sha1::{Digest, Sha1};

use crate::config::Config;
use crate::core::error::{AppError, AppResult};

pub struct UploadedArtifact {
    pub public_id: String,
    pub secure_url: String,
    pub signed_url: String,
    pub signed_url_expires_at: DateTime<Utc>,
}

/// Abstraction over "put these bytes somewhere durable and give me back
/// a URL", so the upload worker doesn't hardcode Cloudinary's wire
/// format.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload(&self, public_id: &str, bytes: Vec<u8>) -> AppResult<UploadedArtifact>;
}

/// Cloudinary has no official Rust SDK; this implements its public
/// signed-upload HTTP protocol directly: `POST /v1_1/{cloud}/raw/upload`
/// with a multipart body and a `signature` computed as
/// `sha1(sorted_params_string + api_secret)`.
pub struct CloudinaryArtifactStore {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

const SIGNED_URL_TTL_SECS: i64 = 3600;

impl CloudinaryArtifactStore {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            cloud_name: config.cloudinary_cloud_name.clone(),
            api_key: config.cloudinary_api_key.clone(),
            api_secret: config.cloudinary_api_secret.clone(),
        }
    }

    fn sign(&self, params: &[(&str, String)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let joined = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let mut hasher = Sha1::new();
        hasher.update(joined.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl ArtifactStore for CloudinaryArtifactStore {
    async fn upload(&self, public_id: &str, bytes: Vec<u8>) -> AppResult<UploadedArtifact> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp.clone()),
        ]);

        let url = format!("https://api.cloudinary.com/v1_1/{}/raw/upload", self.cloud_name);
        let part = multipart::Part::bytes(bytes).file_name(format!("{public_id}.pdf"));
        let form = multipart::Form::new()
            .part("file", part)
            .text("public_id", public_id.to_string())
            .text("timestamp", timestamp)
            .text("api_key", self.api_key.clone())
            .text("signature", signature);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::gateway(format!(
                "cloudinary upload failed ({status}): {body}"
            )));
        }

        let body: serde_json::Value = response.json().await.map_err(AppError::HttpClient)?;
        let secure_url = body
            .get("secure_url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::gateway("cloudinary response missing secure_url"))?
            .to_string();
        let returned_public_id = body
            .get("public_id")
            .and_then(|v| v.as_str())
            .unwrap_or(public_id)
            .to_string();

        let expires_at = Utc::now() + chrono::Duration::seconds(SIGNED_URL_TTL_SECS);
        let download_timestamp = expires_at.timestamp().to_string();
        let download_signature = self.sign(&[
            ("public_id", returned_public_id.clone()),
            ("timestamp", download_timestamp.clone()),
        ]);
        let signed_url = format!(
            "{secure_url}?api_key={}&timestamp={download_timestamp}&signature={download_signature}",
            self.api_key
        );

        Ok(UploadedArtifact {
            public_id: returned_public_id,
            secure_url,
            signed_url,
            signed_url_expires_at: expires_at,
        })
    }
}
