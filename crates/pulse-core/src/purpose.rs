//! Request purpose tagging.

use http::{HeaderMap, HeaderValue};

use crate::PURPOSE_HEADER;

/// Tag value marking a speculative request.
pub const PREFETCH: &str = "prefetch";

/// Caller-declared priority of an outbound request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestPurpose {
    /// Speculative; the caller accepts rejection under load.
    Prefetch,
    /// Anything not tagged exactly `prefetch`.
    #[default]
    Normal,
}

impl RequestPurpose {
    /// Read the purpose tag from request headers.
    ///
    /// Only the exact value `prefetch` counts; case variants and
    /// surrounding whitespace are normal priority.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match headers.get(&PURPOSE_HEADER) {
            Some(value) if value.as_bytes() == PREFETCH.as_bytes() => RequestPurpose::Prefetch,
            _ => RequestPurpose::Normal,
        }
    }

    /// Header value to send for this purpose, if any.
    pub fn header_value(self) -> Option<HeaderValue> {
        match self {
            RequestPurpose::Prefetch => Some(HeaderValue::from_static(PREFETCH)),
            RequestPurpose::Normal => None,
        }
    }

    pub fn is_prefetch(self) -> bool {
        self == RequestPurpose::Prefetch
    }
}
