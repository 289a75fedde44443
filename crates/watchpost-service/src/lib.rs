//! watchpost-service — Plumbing shared by the Watchpost HTTP daemons.
//!
//! Each daemon owns one model pipeline running on a dedicated engine thread
//! and exposes it over axum. This crate holds everything around that:
//! environment configuration, the JSON error type, multipart upload
//! parsing, the permissive CORS layer and the serve loop.

pub mod config;
pub mod cors;
pub mod engine;
pub mod error;
pub mod server;
pub mod upload;

pub use config::ServerConfig;
pub use engine::{spawn_engine, EngineError, EngineHandle, Pipeline};
pub use error::ApiError;
pub use server::{init_tracing, serve, with_middleware};
pub use upload::UploadForm;
