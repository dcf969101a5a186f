//! axum adapter — the publisher as request middleware plus a pulse route.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | any | `*` | Stamp `X-Server-Pulse`; reject saturated prefetches with 503 |
//! | GET | `{endpoint}` | JSON reading of the current load and tier |

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use pulse_core::{ConfigError, ConfigResult, LoadValue, PULSE_HEADER, StrategyTier};

use crate::publisher::{Admission, LoadPublisher};

/// Plain-text body sent with a rejection.
pub const BUSY_BODY: &str = "Server Busy - Prefetch Rejected";

/// Body of the out-of-band pulse route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseReading {
    pub load: LoadValue,
    pub pulse: String,
    pub strategy: StrategyTier,
}

/// Stamps the pulse header on every response and short-circuits
/// saturated prefetches.
///
/// The header is computed before the admission decision, so a 503 carries
/// the same reading that caused it.
pub async fn pulse_middleware(
    State(publisher): State<Arc<LoadPublisher>>,
    req: Request,
    next: Next,
) -> Response {
    let interception = publisher.intercept(req.headers());

    let mut response = match interception.admission {
        Admission::Reject => (StatusCode::SERVICE_UNAVAILABLE, BUSY_BODY).into_response(),
        Admission::Admit => next.run(req).await,
    };

    response
        .headers_mut()
        .insert(PULSE_HEADER, interception.pulse);
    response
}

/// GET {endpoint}
pub async fn pulse_handler(State(publisher): State<Arc<LoadPublisher>>) -> impl IntoResponse {
    let load = publisher.current_load();
    Json(PulseReading {
        load,
        pulse: load.to_wire(),
        strategy: publisher.thresholds().classify(load),
    })
}

/// Check the pulse endpoint against the route patterns of the host app.
///
/// `{name}` segments match any non-empty segment, so an endpoint that an
/// existing route would capture counts as a collision too.
pub fn check_endpoint(endpoint: &str, routes: &[&str]) -> ConfigResult<()> {
    match routes.iter().find(|route| route_captures(route, endpoint)) {
        Some(route) => {
            warn!(endpoint, route, "pulse endpoint collides with application route");
            Err(ConfigError::EndpointConflict(endpoint.to_string()))
        }
        None => Ok(()),
    }
}

fn route_captures(route: &str, path: &str) -> bool {
    let mut route = route.split('/');
    let mut path = path.split('/');
    loop {
        match (route.next(), path.next()) {
            (None, None) => return true,
            (Some(pattern), Some(segment)) => {
                let capture = pattern.starts_with('{') && pattern.ends_with('}');
                if pattern != segment && !(capture && !segment.is_empty()) {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// Mount the pulse route and wrap every route of `router` in the
/// publisher middleware.
///
/// The endpoint must not collide with a route of `router`; run
/// `check_endpoint` against its route table first.
pub fn instrument(router: Router, publisher: Arc<LoadPublisher>) -> Router {
    let endpoint = publisher.endpoint().to_string();
    router
        .route(&endpoint, get(pulse_handler).with_state(publisher.clone()))
        .layer(middleware::from_fn_with_state(publisher, pulse_middleware))
}
