//! pulse-core — shared vocabulary of the pulse-fetch protocol.
//!
//! A server publishes its instantaneous load in the `X-Server-Pulse`
//! response header; clients read it back and classify it into a
//! prefetch strategy. This crate holds everything both sides agree on:
//!
//! - **`load`** — `LoadValue` and its 2-decimal wire encoding
//! - **`strategy`** — `ThresholdTable` and the `StrategyTier` classifier
//! - **`purpose`** — the `x-purpose` request tag used for admission
//! - **`config`** — publisher/observer settings and the `pulse.toml` file
//!
//! # Wire Contract
//!
//! ```text
//! X-Server-Pulse: 0.00 .. 1.00   (always two fractional digits)
//! x-purpose: prefetch            (anything else is normal priority)
//! ```

pub mod config;
pub mod error;
pub mod load;
pub mod purpose;
pub mod strategy;

use http::HeaderName;

pub use config::{ObserverConfig, PublisherConfig, PublisherSection, PulseConfig};
pub use error::{ConfigError, ConfigResult, PulseHeaderError};
pub use load::LoadValue;
pub use purpose::RequestPurpose;
pub use strategy::{StrategyTier, ThresholdTable};

/// Response header carrying the published load.
pub const PULSE_HEADER: HeaderName = HeaderName::from_static("x-server-pulse");

/// Request header carrying the caller's purpose tag.
pub const PURPOSE_HEADER: HeaderName = HeaderName::from_static("x-purpose");

/// Default route for out-of-band load queries.
pub const DEFAULT_ENDPOINT: &str = "/api/pulse";

/// Prefetch requests are rejected while the load is strictly above this.
pub const REJECT_ABOVE: f64 = 0.9;
