//! Router-level admission tests.
//!
//! Drives an instrumented axum router with `oneshot` and checks the pulse
//! header, rejections, and the out-of-band pulse route.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use tower::ServiceExt;

use pulse_core::StrategyTier;
use pulse_publisher::{LoadPublisher, PublisherConfig, PulseReading, instrument};

fn app(load: f64) -> (Router, Arc<LoadPublisher>) {
    let publisher = Arc::new(LoadPublisher::configure(PublisherConfig::default()).unwrap());
    publisher.set_load(load);
    let router = Router::new().route("/items", get(|| async { "items" }));
    (instrument(router, publisher.clone()), publisher)
}

fn get_items(prefetch: bool) -> Request<Body> {
    let mut builder = Request::builder().uri("/items");
    if prefetch {
        builder = builder.header("x-purpose", "prefetch");
    }
    builder.body(Body::empty()).unwrap()
}

fn pulse_of(resp: &axum::response::Response) -> &str {
    resp.headers()
        .get("X-Server-Pulse")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn light_load_stamps_header_and_admits_prefetch() {
    let (router, _) = app(0.30);

    let resp = router.oneshot(get_items(true)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(pulse_of(&resp), "0.30");

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"items");
}

#[tokio::test]
async fn saturated_load_rejects_prefetch_with_header() {
    let (router, _) = app(0.95);

    let resp = router.oneshot(get_items(true)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(pulse_of(&resp), "0.95");

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(!body.is_empty());
    assert!(std::str::from_utf8(&body).unwrap().contains("Busy"));
}

#[tokio::test]
async fn saturated_load_admits_normal_requests() {
    let (router, _) = app(0.95);

    let resp = router.oneshot(get_items(false)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(pulse_of(&resp), "0.95");
}

#[tokio::test]
async fn rejected_prefetch_never_reaches_handler() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let publisher = Arc::new(LoadPublisher::configure(PublisherConfig::default()).unwrap());
    publisher.set_load(1.0);

    let router = Router::new().route(
        "/items",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::Relaxed);
                "items"
            }
        }),
    );
    let router = instrument(router, publisher);

    let resp = router.clone().oneshot(get_items(true)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(hits.load(Ordering::Relaxed), 0);

    let resp = router.oneshot(get_items(false)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(hits.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn load_changes_are_seen_by_next_request() {
    let (router, publisher) = app(0.10);

    let resp = router.clone().oneshot(get_items(true)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(pulse_of(&resp), "0.10");

    publisher.set_load(0.97);
    let resp = router.oneshot(get_items(true)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(pulse_of(&resp), "0.97");
}

#[tokio::test]
async fn pulse_route_reports_reading() {
    let (router, _) = app(0.62);

    let req = Request::builder()
        .uri("/api/pulse")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(pulse_of(&resp), "0.62");

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let reading: PulseReading = serde_json::from_slice(&body).unwrap();
    assert_eq!(reading.pulse, "0.62");
    assert_eq!(reading.strategy, StrategyTier::Conservative);
}

#[tokio::test]
async fn pulse_route_honours_custom_endpoint() {
    let publisher = Arc::new(
        LoadPublisher::configure(PublisherConfig {
            endpoint: "/internal/load".to_string(),
            initial_load: 0.85,
            ..Default::default()
        })
        .unwrap(),
    );
    let router = instrument(Router::new(), publisher);

    let req = Request::builder()
        .uri("/internal/load")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let reading: PulseReading = serde_json::from_slice(&body).unwrap();
    assert_eq!(reading.strategy, StrategyTier::Blocked);
}
