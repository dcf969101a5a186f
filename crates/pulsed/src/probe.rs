//! Pulse probe — repeatedly requests a path and reports what it learned.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use axum::http::StatusCode;
use serde::Serialize;
use tracing::info;

use pulse_core::{LoadValue, StrategyTier};
use pulse_observer::{ClientResult, PrefetchOutcome, PulseClient};

/// What to send and how often.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub path: String,
    /// Tag requests as prefetches (and honour the observed strategy).
    pub prefetch: bool,
    pub count: u32,
    pub interval: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            prefetch: false,
            count: 1,
            interval: Duration::from_secs(1),
        }
    }
}

/// Summary of a probe run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    /// Requests that reached the network.
    pub sent: u32,
    /// Answered with a success status.
    pub fetched: u32,
    /// Answered with 503.
    pub rejected: u32,
    /// Answered with any other status.
    pub failed: u32,
    pub skipped: u32,
    /// Pulse notifications received during the run.
    pub notifications: u32,
    pub last_load: LoadValue,
    pub last_strategy: StrategyTier,
}

/// Run a probe. Transport errors abort the run.
pub async fn run_probe(client: &PulseClient, options: &ProbeOptions) -> ClientResult<ProbeReport> {
    let observer = client.observer();
    let notifications = Arc::new(AtomicU32::new(0));
    let counter = notifications.clone();
    let subscription = observer.subscribe(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    let mut report = ProbeReport {
        sent: 0,
        fetched: 0,
        rejected: 0,
        failed: 0,
        skipped: 0,
        notifications: 0,
        last_load: observer.current_load(),
        last_strategy: observer.current_strategy(),
    };

    for i in 0..options.count {
        if i > 0 {
            tokio::time::sleep(options.interval).await;
        }

        let result = probe_once(client, options, &mut report).await;
        if result.is_err() {
            subscription.cancel();
        }
        let status = result?;

        info!(
            attempt = i + 1,
            path = %options.path,
            status,
            load = %observer.current_load(),
            strategy = %observer.current_strategy(),
            "probe"
        );
    }

    subscription.cancel();
    report.notifications = notifications.load(Ordering::Relaxed);
    report.last_load = observer.current_load();
    report.last_strategy = observer.current_strategy();
    Ok(report)
}

async fn probe_once(
    client: &PulseClient,
    options: &ProbeOptions,
    report: &mut ProbeReport,
) -> ClientResult<&'static str> {
    if !options.prefetch {
        let response = client.get(&options.path).await?;
        return Ok(report.tally(response.status()));
    }

    match client.prefetch(&options.path).await? {
        PrefetchOutcome::Fetched(response) | PrefetchOutcome::Rejected(response) => {
            Ok(report.tally(response.status()))
        }
        PrefetchOutcome::Skipped(_) => {
            report.skipped += 1;
            Ok("skipped")
        }
    }
}

impl ProbeReport {
    fn tally(&mut self, status: StatusCode) -> &'static str {
        self.sent += 1;
        if status.is_success() {
            self.fetched += 1;
            "fetched"
        } else if status == StatusCode::SERVICE_UNAVAILABLE {
            self.rejected += 1;
            "rejected"
        } else {
            self.failed += 1;
            "failed"
        }
    }
}
