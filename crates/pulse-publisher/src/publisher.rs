//! Load publisher — current load and prefetch admission control.
//!
//! The publisher keeps no per-request or per-client state. Each call to
//! `intercept()` takes a fresh reading from the load source, formats it
//! for the pulse header, and decides whether the request may proceed.

use std::sync::Arc;

use http::{HeaderMap, HeaderValue};
use tracing::debug;

use pulse_core::{
    ConfigResult, LoadValue, PublisherConfig, REJECT_ABOVE, RequestPurpose, StrategyTier,
    ThresholdTable,
};

use crate::source::{LoadSource, StaticLoad};

/// Admission verdict for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Pass the request on to the next pipeline stage.
    Admit,
    /// Answer `503` immediately without further processing.
    Reject,
}

/// Outcome of intercepting one request.
///
/// The pulse header is computed before the admission decision and must
/// be applied to whichever response is sent.
#[derive(Debug, Clone)]
pub struct Interception {
    pub load: LoadValue,
    pub pulse: HeaderValue,
    pub admission: Admission,
}

/// Publishes the server load and guards against prefetch floods.
pub struct LoadPublisher {
    endpoint: String,
    thresholds: ThresholdTable,
    source: Arc<dyn LoadSource>,
    /// Present only while the default static source is in use.
    manual: Option<Arc<StaticLoad>>,
}

impl LoadPublisher {
    /// Create a publisher backed by the default static source, seeded
    /// with `config.initial_load`.
    pub fn configure(config: PublisherConfig) -> ConfigResult<Self> {
        config.validate()?;
        let manual = Arc::new(StaticLoad::new(config.initial_load));
        Ok(Self {
            endpoint: config.endpoint,
            thresholds: config.thresholds,
            source: manual.clone(),
            manual: Some(manual),
        })
    }

    /// Create a publisher that reads from a custom load source.
    ///
    /// `set_load()` has no effect on such a publisher.
    pub fn with_source(config: PublisherConfig, source: Arc<dyn LoadSource>) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            endpoint: config.endpoint,
            thresholds: config.thresholds,
            source,
            manual: None,
        })
    }

    /// Route path for out-of-band load queries.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn thresholds(&self) -> ThresholdTable {
        self.thresholds
    }

    /// Read the load source now. Never cached.
    pub fn current_load(&self) -> LoadValue {
        LoadValue::clamped(self.source.load())
    }

    /// Classify the current load with this publisher's thresholds.
    pub fn current_strategy(&self) -> StrategyTier {
        self.thresholds.classify(self.current_load())
    }

    /// Override the static load. Returns `false` when a custom source is
    /// installed and the override was ignored.
    pub fn set_load(&self, value: f64) -> bool {
        match &self.manual {
            Some(slot) => {
                let stored = slot.set(value);
                debug!(requested = value, load = %stored, "load override set");
                true
            }
            None => {
                debug!(requested = value, "load override ignored: custom load source");
                false
            }
        }
    }

    /// Admission rule: reject only prefetches above the saturation mark.
    pub fn admit(load: LoadValue, purpose: RequestPurpose) -> Admission {
        if load.get() > REJECT_ABOVE && purpose.is_prefetch() {
            Admission::Reject
        } else {
            Admission::Admit
        }
    }

    /// The per-request hook.
    pub fn intercept(&self, request_headers: &HeaderMap) -> Interception {
        let load = self.current_load();
        let pulse = load.header_value();
        let purpose = RequestPurpose::from_headers(request_headers);
        let admission = Self::admit(load, purpose);

        if admission == Admission::Reject {
            debug!(%load, ?purpose, "prefetch rejected under load");
        }

        Interception {
            load,
            pulse,
            admission,
        }
    }
}

impl std::fmt::Debug for LoadPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadPublisher")
            .field("endpoint", &self.endpoint)
            .field("thresholds", &self.thresholds)
            .field("static_source", &self.manual.is_some())
            .finish()
    }
}
