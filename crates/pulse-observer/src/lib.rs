//! pulse-observer — client side of the pulse-fetch protocol.
//!
//! Learns the server's load from the `X-Server-Pulse` header of ordinary
//! responses, classifies it into a `StrategyTier`, and notifies
//! subscribers on every accepted reading.
//!
//! # Wiring
//!
//! The observer never patches anything globally. Callers compose it with
//! their own request function:
//!
//! ```text
//! observer.intercept(fut)      one future
//! observer.wrap(f).call(req)   a request-performing closure
//! PulseLayer::new(observer)    any tower Service<http::Request<_>>
//! PulseClient                  a small hyper HTTP/1 client
//! ```
//!
//! Missing or malformed headers leave the stored load untouched and are
//! never reported to the caller. Transport errors pass through unchanged.

pub mod client;
pub mod error;
pub mod layer;
pub mod observer;

pub use client::{PrefetchOutcome, PulseClient};
pub use error::{ClientError, ClientResult};
pub use layer::{PulseLayer, PulseService};
pub use observer::{Instrumented, PulseCarrier, PulseObserver, Subscription};

pub use pulse_core::{LoadValue, ObserverConfig, StrategyTier, ThresholdTable};
