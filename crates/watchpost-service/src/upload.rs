//! Multipart upload parsing.

use crate::error::ApiError;
use axum::body::Bytes;
use axum::extract::Multipart;
use std::collections::HashMap;

/// Name of the multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// The fields of one upload: the image file part plus any UTF-8 text parts.
#[derive(Debug, Default)]
pub struct UploadForm {
    image: Option<Bytes>,
    text: HashMap<String, String>,
}

impl UploadForm {
    /// Drain the multipart stream. Unnamed parts are skipped, as are
    /// non-image parts whose content is not UTF-8. A repeated field keeps
    /// its last value.
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let data = field.bytes().await?;
            if name == IMAGE_FIELD {
                tracing::debug!(bytes = data.len(), "received image part");
                form.image = Some(data);
            } else {
                match String::from_utf8(data.to_vec()) {
                    Ok(value) => {
                        form.text.insert(name, value);
                    }
                    Err(_) => tracing::debug!(field = %name, "ignoring binary form field"),
                }
            }
        }
        Ok(form)
    }

    /// The image bytes, or 422 when the form has no `image` field.
    pub fn image(&self) -> Result<&[u8], ApiError> {
        self.image
            .as_deref()
            .ok_or_else(|| ApiError::Unprocessable(format!("missing form field `{IMAGE_FIELD}`")))
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "watchpost-test-boundary";

    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match filename {
                Some(f) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn echo(multipart: Multipart) -> Result<Json<Value>, ApiError> {
        let form = UploadForm::read(multipart).await?;
        let image = form.image()?;
        Ok(Json(json!({
            "image_len": image.len(),
            "note": form.text("note"),
        })))
    }

    async fn post_form(body: Vec<u8>) -> (StatusCode, Value) {
        let app = Router::new().route("/", post(echo));
        let request = Request::post("/")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_reads_image_and_text() {
        let body = multipart_body(&[
            ("note", None, b"hello"),
            ("image", Some("frame.jpg"), &[1, 2, 3, 4]),
        ]);
        let (status, json) = post_form(body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["image_len"], 4);
        assert_eq!(json["note"], "hello");
    }

    #[tokio::test]
    async fn test_missing_image_is_unprocessable() {
        let body = multipart_body(&[("note", None, b"hello")]);
        let (status, json) = post_form(body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["detail"], "missing form field `image`");
    }

    #[tokio::test]
    async fn test_last_image_part_wins() {
        let body = multipart_body(&[
            ("image", Some("a.jpg"), &[1]),
            ("image", Some("b.jpg"), &[1, 2]),
        ]);
        let (_, json) = post_form(body).await;
        assert_eq!(json["image_len"], 2);
    }
}
