mod config;
mod health;
mod track;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// The config payload and script are consumed cross-origin by design, so CORS
/// is wide open.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/data", post(track::track_event))
        .route("/{project_id}/{environment}", get(config::get_config))
        .route(
            "/{project_id}/{environment}/script.js",
            get(config::get_script),
        )
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use abby_core::cache::{ConfigCache, ConfigCacheConfig, CACHE_HEADER};
    use abby_core::config::{
        FlagDefinition, FlagType, FlagValue, ProjectConfig, TestDefinition,
    };
    use abby_core::config_source::MemoryConfigSource;
    use abby_core::events::{EventPipeline, EventPipelineConfig, MemoryEventSink};
    use abby_core::quota::QuotaEnforcer;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    use super::routes;
    use crate::state::AppState;

    struct TestApp {
        router: Router,
        sink: Arc<MemoryEventSink>,
        quota: Arc<QuotaEnforcer>,
    }

    fn test_app() -> TestApp {
        let source = Arc::new(MemoryConfigSource::new());
        source.insert(
            "prod",
            ProjectConfig {
                project_id: "p1".to_owned(),
                environments: vec!["prod".to_owned()],
                tests: std::collections::HashMap::from([(
                    "cta".to_owned(),
                    TestDefinition {
                        variants: vec!["A".to_owned(), "B".to_owned()],
                        weights: vec![0.7, 0.3],
                    },
                )]),
                flags: std::collections::HashMap::from([(
                    "dark-mode".to_owned(),
                    FlagDefinition {
                        value_type: FlagType::Boolean,
                        default_value: FlagValue::Boolean(true),
                        rule_set: vec![],
                    },
                )]),
            },
        );

        let cache = ConfigCache::new(source, ConfigCacheConfig::default());
        let sink = Arc::new(MemoryEventSink::new());
        let quota = Arc::new(QuotaEnforcer::new());
        let pipeline = Arc::new(EventPipeline::start(
            EventPipelineConfig {
                workers: 1,
                retry_delay: std::time::Duration::from_millis(1),
                ..EventPipelineConfig::default()
            },
            sink.clone(),
            quota.clone(),
        ));

        let state = AppState {
            cache,
            pipeline,
            quota: quota.clone(),
        };
        TestApp {
            router: routes().with_state(state),
            sink,
            quota,
        }
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_data(body: &str, user_agent: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/data")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(user_agent) = user_agent {
            builder = builder.header(header::USER_AGENT, user_agent);
        }
        builder.body(Body::from(body.to_owned())).unwrap()
    }

    #[tokio::test]
    async fn config_reports_miss_then_hit_with_identical_payload() {
        let app = test_app();

        let first = app.router.clone().oneshot(get("/p1/prod")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()[CACHE_HEADER], "MISS");
        let first_body = body_string(first).await;
        assert!(first_body.contains("\"cta\""));
        assert!(first_body.contains("remoteConfig"));

        let second = app.router.clone().oneshot(get("/p1/prod")).await.unwrap();
        assert_eq!(second.headers()[CACHE_HEADER], "HIT");
        assert_eq!(body_string(second).await, first_body);
    }

    #[tokio::test]
    async fn script_endpoint_wraps_payload_in_global() {
        let app = test_app();

        let response = app
            .router
            .clone()
            .oneshot(get("/p1/prod/script.js"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/javascript"
        );
        let body = body_string(response).await;
        assert!(body.starts_with("window.__abby_data__ = "));
        assert!(body.ends_with(';'));
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let app = test_app();
        let response = app.router.clone().oneshot(get("/ghost/prod")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn over_quota_project_gets_429() {
        let app = test_app();
        app.quota.set_limit("p1", 10);
        let period = abby_core::quota::period_key(chrono::Utc::now());
        for _ in 0..10 {
            app.quota.increment("p1", &period);
        }

        let response = app.router.clone().oneshot(get("/p1/prod")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn malformed_event_is_rejected_and_never_enqueued() {
        let app = test_app();

        let response = app
            .router
            .clone()
            .oneshot(post_data(r#"{"type": "BOGUS"}"#, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(app.sink.events().is_empty());
    }

    #[tokio::test]
    async fn bot_traffic_is_rejected() {
        let app = test_app();

        let body =
            r#"{"type": "PING", "projectId": "p1", "testName": "cta", "selectedVariant": "A"}"#;
        let response = app
            .router
            .clone()
            .oneshot(post_data(body, Some("Googlebot/2.1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(app.sink.events().is_empty());
    }

    #[tokio::test]
    async fn accepted_event_reaches_the_sink() {
        let app = test_app();

        let body =
            r#"{"type": "ACT", "projectId": "p1", "testName": "cta", "selectedVariant": "B"}"#;
        let response = app
            .router
            .clone()
            .oneshot(post_data(body, Some("Mozilla/5.0 (X11; Linux x86_64)")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Intake is acknowledged before persistence; wait for the worker.
        for _ in 0..200 {
            if !app.sink.events().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
        let events = app.sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].selected_variant, "B");
    }
}
