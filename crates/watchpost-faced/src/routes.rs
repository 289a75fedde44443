use crate::pipeline::FaceEngine;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use watchpost_core::frame;
use watchpost_core::{DistanceMatcher, SuspectMatch, SuspectRegistry};
use watchpost_service::{ApiError, UploadForm};

const NO_FACES: &str = "No faces detected in image";
const NO_ENCODING: &str = "Could not extract face encoding";

#[derive(Clone)]
pub struct AppState {
    /// `None` when the face models failed to load at startup.
    pub engine: Option<FaceEngine>,
    pub registry: Arc<SuspectRegistry>,
    pub matcher: Arc<DistanceMatcher>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MatchResponse {
    Ranked {
        matches: Vec<SuspectMatch>,
        faces_detected: usize,
    },
    Empty {
        matches: Vec<SuspectMatch>,
        message: &'static str,
    },
}

impl MatchResponse {
    fn empty(message: &'static str) -> Self {
        MatchResponse::Empty {
            matches: Vec::new(),
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SuspectQuery {
    suspect_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct Registered {
    message: &'static str,
    suspect_id: String,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    suspects_count: usize,
    model_loaded: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/match", post(match_face))
        .route("/add-suspect", post(add_suspect))
        .route("/health", get(health))
        .with_state(state)
}

async fn match_face(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MatchResponse>, ApiError> {
    let engine = state.engine.as_ref().ok_or(ApiError::ModelUnavailable)?;

    let form = UploadForm::read(multipart?).await?;
    let image = frame::decode_upload(form.image()?)?;
    let analysis = engine.run(image).await?;

    if analysis.faces_detected == 0 {
        tracing::info!("match: no faces");
        return Ok(Json(MatchResponse::empty(NO_FACES)));
    }
    let Some(probe) = analysis.first_embedding() else {
        tracing::info!(faces = analysis.faces_detected, "match: no encoding");
        return Ok(Json(MatchResponse::empty(NO_ENCODING)));
    };

    let matches = state.registry.rank(probe, &state.matcher);
    tracing::info!(
        faces = analysis.faces_detected,
        suspects = state.registry.len(),
        matches = matches.len(),
        best = matches.first().map(|m| m.confidence),
        "match"
    );

    Ok(Json(MatchResponse::Ranked {
        matches,
        faces_detected: analysis.faces_detected,
    }))
}

/// `suspect_id` comes from the query string, or else from a form field of
/// the same name.
async fn add_suspect(
    State(state): State<AppState>,
    Query(query): Query<SuspectQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Registered>, ApiError> {
    let engine = state.engine.as_ref().ok_or(ApiError::ModelUnavailable)?;

    let form = UploadForm::read(multipart?).await?;
    let suspect_id = query
        .suspect_id
        .or_else(|| form.text("suspect_id").map(str::to_string))
        .ok_or_else(|| ApiError::Unprocessable("missing parameter `suspect_id`".into()))?;

    let image = frame::decode_upload(form.image()?)?;
    let analysis = engine.run(image).await?;

    let embedding = analysis
        .first_embedding()
        .cloned()
        .ok_or_else(|| ApiError::BadRequest("No face detected in image".into()))?;

    let replaced = state.registry.register(suspect_id.clone(), embedding);
    tracing::info!(
        suspect_id = %suspect_id,
        faces = analysis.faces_detected,
        replaced = replaced.is_some(),
        suspects = state.registry.len(),
        "suspect registered"
    );

    Ok(Json(Registered {
        message: "Suspect added successfully",
        suspect_id,
    }))
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        suspects_count: state.registry.len(),
        model_loaded: state.engine.is_some(),
    })
}
