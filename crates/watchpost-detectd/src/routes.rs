use crate::pipeline::ObjectEngine;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use watchpost_core::frame;
use watchpost_core::{DetectionReport, WeaponPolicy};
use watchpost_service::{ApiError, UploadForm};

#[derive(Clone)]
pub struct AppState {
    /// `None` when the model failed to load at startup.
    pub engine: Option<ObjectEngine>,
    pub policy: Arc<WeaponPolicy>,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    model_loaded: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/detect", post(detect))
        .route("/health", get(health))
        .with_state(state)
}

async fn detect(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionReport>, ApiError> {
    let engine = state.engine.as_ref().ok_or(ApiError::ModelUnavailable)?;

    let form = UploadForm::read(multipart?).await?;
    let image = frame::decode_upload(form.image()?)?;
    let (width, height) = image.dimensions();

    let boxes = engine.run(image).await?;
    let candidates = boxes.len();
    let report = state.policy.apply(boxes);

    tracing::info!(
        width,
        height,
        candidates,
        detections = report.detections.len(),
        weapons = report.weapons_detected,
        "detect"
    );
    if report.weapons_detected > 0 {
        tracing::warn!(weapons = report.weapons_detected, "weapon detected");
    }

    Ok(Json(report))
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        model_loaded: state.engine.is_some(),
    })
}
