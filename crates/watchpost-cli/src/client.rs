//! Thin HTTP client for one Watchpost service.

use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{status}: {detail}")]
    Status {
        status: reqwest::StatusCode,
        detail: String,
    },
}

pub struct ServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl ServiceClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        let response = self.http.get(self.url(path)).send().await?;
        read_json(response).await
    }

    /// Upload `image` as the multipart `image` field, with optional query
    /// parameters.
    pub async fn post_image(
        &self,
        path: &str,
        image: &Path,
        query: &[(&str, &str)],
    ) -> Result<Value, ClientError> {
        let bytes = tokio::fs::read(image).await.map_err(|source| ClientError::Io {
            path: image.display().to_string(),
            source,
        })?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        tracing::debug!(url = %self.url(path), bytes = bytes.len(), %file_name, "uploading");
        let form = Form::new().part("image", Part::bytes(bytes).file_name(file_name));
        let response = self
            .http
            .post(self.url(path))
            .query(query)
            .multipart(form)
            .send()
            .await?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Status {
            status,
            detail: error_detail(&body),
        });
    }
    Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
}

/// The `detail` of a `{"detail": ...}` error body, or the raw body.
pub fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        _ => body.to_string(),
    }
}
