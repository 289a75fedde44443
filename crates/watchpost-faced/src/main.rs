use anyhow::Result;
use std::sync::Arc;
use watchpost_core::SuspectRegistry;

mod config;
mod pipeline;
mod routes;

#[tokio::main]
async fn main() -> Result<()> {
    watchpost_service::init_tracing();

    let config = config::Config::from_env();
    let matcher = config.matcher();
    tracing::info!(
        scrfd = %config.scrfd_path().display(),
        arcface = %config.arcface_path().display(),
        metric = ?matcher.metric,
        threshold = matcher.min_confidence,
        max_matches = matcher.max_results,
        "watchpost-faced starting"
    );

    let engine = pipeline::start(&config);
    tracing::info!(model_loaded = engine.is_some(), "watchpost-faced ready");

    let state = routes::AppState {
        engine,
        registry: Arc::new(SuspectRegistry::new()),
        matcher: Arc::new(matcher),
    };
    let app = watchpost_service::with_middleware(routes::router(state), &config.server);
    watchpost_service::serve(app, &config.server).await
}
