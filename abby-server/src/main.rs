mod bot;
mod config;
mod routes;
mod state;

use std::sync::Arc;

use abby_core::cache::ConfigCache;
use abby_core::config_source::{HttpConfigSource, HttpConfigSourceConfig};
use abby_core::events::{EventPipeline, EventSink, HttpEventSink, LogEventSink};
use abby_core::quota::QuotaEnforcer;

#[tokio::main]
async fn main() {
    env_logger::init();
    let config = config::Config::from_env();

    let source = Arc::new(HttpConfigSource::new(HttpConfigSourceConfig {
        base_url: config.source_url.clone(),
        api_key: config.api_key.clone(),
    }));
    let cache = ConfigCache::new(source, config.cache_config());

    let quota = Arc::new(QuotaEnforcer::new());
    let sink: Arc<dyn EventSink> = match &config.ingestion_url {
        Some(url) => Arc::new(HttpEventSink::new(url.clone())),
        None => Arc::new(LogEventSink),
    };
    let pipeline = Arc::new(EventPipeline::start(
        config.pipeline_config(),
        sink,
        quota.clone(),
    ));

    let state = state::AppState {
        cache,
        pipeline,
        quota,
    };
    let app = routes::routes().with_state(state);

    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .expect("failed to bind listener");
    log::info!(target: "abby-server", "listening on http://{}", config.addr());

    axum::serve(listener, app).await.expect("server error");
}
