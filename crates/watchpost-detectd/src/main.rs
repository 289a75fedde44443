use anyhow::Result;
use std::sync::Arc;

mod config;
mod pipeline;
mod routes;

#[tokio::main]
async fn main() -> Result<()> {
    watchpost_service::init_tracing();

    let config = config::Config::from_env();
    tracing::info!(
        model = %config.yolo_path().display(),
        keywords = ?config.weapon_keywords,
        confidence_floor = config.confidence_floor,
        "watchpost-detectd starting"
    );

    let policy = config.policy();
    let engine = pipeline::start(&config, &policy);
    tracing::info!(model_loaded = engine.is_some(), "watchpost-detectd ready");

    let state = routes::AppState {
        engine,
        policy: Arc::new(policy),
    };
    let app = watchpost_service::with_middleware(routes::router(state), &config.server);
    watchpost_service::serve(app, &config.server).await
}
