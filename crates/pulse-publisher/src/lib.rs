//! pulse-publisher — server side of the pulse-fetch protocol.
//!
//! Stamps every response with the current load in `X-Server-Pulse` and
//! rejects prefetch-tagged requests while the server is saturated.
//!
//! # Architecture
//!
//! ```text
//! LoadPublisher
//!   ├── LoadSource (StaticLoad by default, or any Fn() -> f64)
//!   ├── intercept(headers) → Interception { pulse header, Admission }
//!   └── axum adapter
//!       ├── pulse_middleware  (stamp + admit/reject)
//!       └── GET {endpoint}    (out-of-band JSON reading)
//! ```
//!
//! # Admission
//!
//! A request is rejected with `503` only when the load is strictly above
//! `0.9` *and* it carries `x-purpose: prefetch`. The pulse header is set
//! on rejections too, so turned-away callers still learn the load.

pub mod middleware;
pub mod publisher;
pub mod source;

pub use middleware::{PulseReading, check_endpoint, instrument, pulse_handler, pulse_middleware};
pub use publisher::{Admission, Interception, LoadPublisher};
pub use source::{LoadSource, StaticLoad};

pub use pulse_core::PublisherConfig;
