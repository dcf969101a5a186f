//! pulsed — demo server and probe for the pulse-fetch protocol.
//!
//! - **`app`** — a small catalogue router instrumented by a
//!   `LoadPublisher`, plus a load simulator for demos
//! - **`probe`** — drives a `PulseClient` against a server and reports
//!   each observed pulse

pub mod app;
pub mod probe;

pub use app::{build_app, simulate_load};
pub use probe::{ProbeOptions, ProbeReport, run_probe};
