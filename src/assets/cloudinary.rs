//! Cloudinary-backed [`AssetStore`] implementation.
//!
//! Uses the signed upload/destroy REST endpoints. Request signatures are the
//! SHA-1 of the alphabetically sorted parameters concatenated with the API
//! secret, hex encoded.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{debug, instrument};

use super::AssetStore;
use crate::token::unix_now;

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";

pub struct CloudinaryStore {
    client: reqwest::Client,
    api_base: String,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
}

impl CloudinaryStore {
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(cloud_name: String, api_key: String, api_secret: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("Error creating asset store client")?;
        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            cloud_name,
            api_key,
            api_secret,
        })
    }

    /// Point the store at a different API host. Test hook.
    #[must_use]
    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base;
        self
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1_1/{}/image/{action}",
            self.api_base.trim_end_matches('/'),
            self.cloud_name
        )
    }

    fn signature(&self, params: &[(&str, &str)]) -> String {
        sign_params(params, self.api_secret.expose_secret())
    }
}

/// SHA-1 request signature over `key=value&...` pairs plus the API secret.
/// Parameters must already be in alphabetical order.
fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let joined = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[async_trait]
impl AssetStore for CloudinaryStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> Result<String> {
        let timestamp = unix_now().to_string();
        let signature = self.signature(&[("folder", folder), ("timestamp", &timestamp)]);

        let form = reqwest::multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.to_string())
            .text("signature", signature)
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name("upload"),
            );

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .context("Asset upload request failed")?
            .error_for_status()
            .context("Asset upload rejected")?
            .json::<UploadResponse>()
            .await
            .context("Asset upload response malformed")?;

        debug!(url = %response.secure_url, "Asset uploaded");
        Ok(response.secure_url)
    }

    #[instrument(skip(self))]
    async fn destroy(&self, public_id: &str) -> Result<()> {
        let timestamp = unix_now().to_string();
        let signature = self.signature(&[("public_id", public_id), ("timestamp", &timestamp)]);

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&[
                ("api_key", self.api_key.as_str()),
                ("timestamp", &timestamp),
                ("public_id", public_id),
                ("signature", &signature),
            ])
            .send()
            .await
            .context("Asset destroy request failed")?
            .error_for_status()
            .context("Asset destroy rejected")?
            .json::<DestroyResponse>()
            .await
            .context("Asset destroy response malformed")?;

        // "not found" counts as destroyed so retries stay idempotent.
        match response.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(anyhow!("Asset destroy failed: {other}")),
        }
    }
}
