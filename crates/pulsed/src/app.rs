//! Demo application served by `pulsed serve`.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Banner |
//! | GET | `/items/{id}` | A catalogue item (JSON) |
//! | GET | `{endpoint}` | Pulse reading (from the publisher) |

use std::sync::Arc;
use std::time::Duration;

use axum::extract::Path;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use pulse_core::ConfigResult;
use pulse_publisher::{LoadPublisher, check_endpoint, instrument};

#[derive(Debug, Serialize)]
struct Item {
    id: u64,
    name: String,
}

async fn index() -> &'static str {
    "pulse-fetch demo server\n"
}

async fn get_item(Path(id): Path<u64>) -> Json<Item> {
    Json(Item {
        id,
        name: format!("item-{id}"),
    })
}

const INDEX_ROUTE: &str = "/";
const ITEM_ROUTE: &str = "/items/{id}";

/// Build the demo router with every route behind the publisher.
///
/// Fails if the publisher's endpoint collides with a demo route.
pub fn build_app(publisher: Arc<LoadPublisher>) -> ConfigResult<Router> {
    check_endpoint(publisher.endpoint(), &[INDEX_ROUTE, ITEM_ROUTE])?;
    let routes = Router::new()
        .route(INDEX_ROUTE, get(index))
        .route(ITEM_ROUTE, get(get_item));
    Ok(instrument(routes, publisher))
}

/// Sweep the static load up and down in a triangle wave until shutdown.
///
/// Each tick moves the load by `step`; the direction flips at 0 and 1.
pub async fn simulate_load(
    publisher: Arc<LoadPublisher>,
    tick: Duration,
    step: f64,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(tick_ms = tick.as_millis() as u64, step, "load simulator started");

    let mut load = publisher.current_load().get();
    let mut rising = true;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(tick) => {
                load = next_wave_value(load, step, &mut rising);
                if !publisher.set_load(load) {
                    info!("load simulator stopping: publisher uses a custom source");
                    break;
                }
                debug!(load, "simulated load");
            }
            _ = shutdown.changed() => {
                info!("load simulator shutting down");
                break;
            }
        }
    }
}

fn next_wave_value(load: f64, step: f64, rising: &mut bool) -> f64 {
    let next = if *rising { load + step } else { load - step };
    if next >= 1.0 {
        *rising = false;
        1.0
    } else if next <= 0.0 {
        *rising = true;
        0.0
    } else {
        next
    }
}
