//! HTTP client for an Immich-style asset server.
//!
//! Every request carries the `x-api-key` header. Upload failures are mapped
//! onto [`UploadError`] here so the task layer only sees categories:
//! - files that aren't images or videos are rejected locally, before any I/O
//! - 415, or 400 mentioning "unsupported", is an unsupported-media error
//! - 5xx responses are counted; once `max_server_errors` arrive without a
//!   success in between, the error becomes `SystemicOverload`

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use ferry_core::config::UploadSettings;
use ferry_core::{AssetMetadata, CandidateAsset, FingerprintId, UploadError};

use crate::remote::RemoteAssetService;

#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    pub max_server_errors: u32,
    pub request_timeout: Option<Duration>,
}

impl From<&UploadSettings> for ClientSettings {
    fn from(settings: &UploadSettings) -> Self {
        Self {
            max_server_errors: settings.max_server_errors.max(1),
            request_timeout: (settings.request_timeout_secs > 0)
                .then(|| Duration::from_secs(settings.request_timeout_secs)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Deserialize)]
struct PingResponse {
    res: String,
}

pub struct ImmichClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
    device_id: String,
    max_server_errors: u32,
    server_errors: AtomicU32,
}

impl ImmichClient {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        device_id: &str,
        settings: ClientSettings,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build HTTP client")?;

        let base = Url::parse(endpoint.trim_end_matches('/'))
            .with_context(|| format!("invalid server address {endpoint}"))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("invalid server address {endpoint}");
        }

        Ok(Self {
            http,
            base,
            api_key: api_key.to_string(),
            device_id: device_id.to_string(),
            max_server_errors: settings.max_server_errors.max(1),
            server_errors: AtomicU32::new(0),
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Append percent-encoded path segments to the server address.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, segments: &[&str]) -> Result<T> {
        let url = self.url(segments);
        self.http
            .get(url.clone())
            .header("x-api-key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("failed to connect to {url}"))?
            .error_for_status()
            .with_context(|| format!("request to {url} failed"))?
            .json::<T>()
            .await
            .with_context(|| format!("failed to parse response from {url}"))
    }

    pub async fn ping(&self) -> Result<()> {
        let resp: PingResponse = self.get_json(&["server-info", "ping"]).await?;
        if resp.res != "pong" {
            anyhow::bail!("unexpected ping response: {}", resp.res);
        }
        Ok(())
    }

    pub async fn validate_connection(&self) -> Result<User> {
        self.get_json(&["user", "me"]).await
    }

    /// Map a non-success upload response onto the failure taxonomy.
    fn classify_failure(&self, path: &Path, status: u16, body: &str) -> UploadError {
        let message = error_message(body);
        match status {
            415 => UploadError::UnsupportedMedia {
                path: path.to_path_buf(),
                mime: message,
            },
            400 if message.to_lowercase().contains("unsupported") => {
                UploadError::UnsupportedMedia {
                    path: path.to_path_buf(),
                    mime: message,
                }
            }
            500..=599 => {
                let errors = self.server_errors.fetch_add(1, Ordering::AcqRel) + 1;
                if errors >= self.max_server_errors {
                    UploadError::SystemicOverload { errors }
                } else {
                    UploadError::Server { status, message }
                }
            }
            _ => UploadError::Server { status, message },
        }
    }
}

/// Pull `message` out of a JSON error body, or fall back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match &v["message"] {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|i| i.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            _ => None,
        })
        .unwrap_or_else(|| body.trim().to_string())
}

fn rfc3339(at: SystemTime) -> String {
    OffsetDateTime::from(at)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[async_trait]
impl RemoteAssetService for ImmichClient {
    async fn list_known_fingerprints(&self, device_id: &str) -> Result<HashSet<FingerprintId>> {
        let ids: Vec<String> = self
            .get_json(&["asset", device_id])
            .await
            .context("failed to list assets for device")?;
        Ok(ids.into_iter().map(FingerprintId::from).collect())
    }

    async fn upload_asset(&self, asset: &CandidateAsset) -> Result<AssetMetadata, UploadError> {
        let path = asset.full_path();

        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        if mime.type_() != mime_guess::mime::IMAGE && mime.type_() != mime_guess::mime::VIDEO {
            return Err(UploadError::UnsupportedMedia {
                path,
                mime: mime.essence_str().to_string(),
            });
        }

        let local_read = |source: std::io::Error| UploadError::LocalRead {
            path: path.clone(),
            source,
        };
        let meta = tokio::fs::metadata(&path).await.map_err(local_read)?;
        let data = tokio::fs::read(&path).await.map_err(local_read)?;

        let modified = meta.modified().unwrap_or_else(|_| SystemTime::now());
        let created = meta.created().unwrap_or(modified);

        let part = Part::bytes(data)
            .file_name(asset.file_name())
            .mime_str(mime.essence_str())
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let form = Form::new()
            .part("assetData", part)
            .text("deviceAssetId", asset.id.to_string())
            .text("deviceId", self.device_id.clone())
            .text("fileCreatedAt", rfc3339(created))
            .text("fileModifiedAt", rfc3339(modified))
            .text("isFavorite", "false");

        let resp = self
            .http
            .post(self.url(&["asset", "upload"]))
            .header("x-api-key", &self.api_key)
            .header("Accept", "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            self.server_errors.store(0, Ordering::Release);
            return resp
                .json::<AssetMetadata>()
                .await
                .map_err(|e| UploadError::Transport(e.to_string()));
        }

        let body = resp.text().await.unwrap_or_default();
        Err(self.classify_failure(&path, status.as_u16(), &body))
    }
}
