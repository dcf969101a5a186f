//! Load values and their wire encoding.
//!
//! A `LoadValue` is always inside `[0.0, 1.0]`. On the wire it travels as
//! an ASCII decimal with exactly two fractional digits (`"0.30"`,
//! `"1.00"`). Parsing is more lenient than formatting: any plain decimal
//! in range is accepted (`"0.6"`, `" 1 "`), but signs, exponents, and
//! `inf`/`NaN` spellings are not.

use std::fmt;
use std::str::FromStr;

use http::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::error::PulseHeaderError;

/// Instantaneous server busyness in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct LoadValue(f64);

impl LoadValue {
    /// Fully idle.
    pub const IDLE: LoadValue = LoadValue(0.0);
    /// Fully saturated.
    pub const SATURATED: LoadValue = LoadValue(1.0);

    /// Validate a raw reading. Returns `None` if it is not finite or
    /// falls outside `[0, 1]`.
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && (0.0..=1.0).contains(&value)).then_some(Self(value))
    }

    /// Clamp a raw reading into range. `NaN` is treated as idle.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            Self::IDLE
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    /// The raw scalar.
    pub fn get(self) -> f64 {
        self.0
    }

    /// Fixed 2-decimal wire form, e.g. `"0.95"`.
    pub fn to_wire(self) -> String {
        format!("{:.2}", self.0)
    }

    /// The wire form as a header value.
    pub fn header_value(self) -> HeaderValue {
        // Two-decimal ASCII digits are always a valid header value.
        HeaderValue::from_str(&self.to_wire()).unwrap_or(HeaderValue::from_static("0.00"))
    }

    /// Parse a wire string.
    pub fn parse_wire(raw: &str) -> Result<Self, PulseHeaderError> {
        let trimmed = raw.trim();
        if !is_plain_decimal(trimmed) {
            return Err(PulseHeaderError::NotDecimal(raw.to_string()));
        }
        let value: f64 = trimmed
            .parse()
            .map_err(|_| PulseHeaderError::NotDecimal(raw.to_string()))?;
        Self::new(value).ok_or(PulseHeaderError::OutOfRange(value))
    }

    /// Parse a header value.
    pub fn from_header(value: &HeaderValue) -> Result<Self, PulseHeaderError> {
        let raw = value.to_str().map_err(|_| PulseHeaderError::NotAscii)?;
        Self::parse_wire(raw)
    }
}

/// Digits with at most one decimal point, and at least one digit.
fn is_plain_decimal(s: &str) -> bool {
    let mut digits = 0;
    let mut dots = 0;
    for c in s.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

impl fmt::Display for LoadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for LoadValue {
    type Err = PulseHeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_wire(s)
    }
}

impl TryFrom<f64> for LoadValue {
    type Error = PulseHeaderError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PulseHeaderError::OutOfRange(value))
    }
}

impl From<LoadValue> for f64 {
    fn from(value: LoadValue) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_has_two_decimals() {
        assert_eq!(LoadValue::clamped(0.3).to_wire(), "0.30");
        assert_eq!(LoadValue::clamped(0.9).to_wire(), "0.90");
        assert_eq!(LoadValue::SATURATED.to_wire(), "1.00");
        assert_eq!(LoadValue::IDLE.to_wire(), "0.00");
        assert_eq!(LoadValue::clamped(0.95).to_string(), "0.95");
    }

    #[test]
    fn clamped_pins_to_range() {
        assert_eq!(LoadValue::clamped(1.7).get(), 1.0);
        assert_eq!(LoadValue::clamped(-0.2).get(), 0.0);
        assert_eq!(LoadValue::clamped(f64::NAN).get(), 0.0);
        assert_eq!(LoadValue::clamped(f64::INFINITY).get(), 1.0);
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert!(LoadValue::new(0.0).is_some());
        assert!(LoadValue::new(1.0).is_some());
        assert!(LoadValue::new(1.01).is_none());
        assert!(LoadValue::new(-0.01).is_none());
        assert!(LoadValue::new(f64::NAN).is_none());
    }

    #[test]
    fn wire_round_trip_within_half_hundredth() {
        for i in 0..=1000 {
            let original = LoadValue::clamped(i as f64 / 1000.0);
            let parsed = LoadValue::parse_wire(&original.to_wire()).unwrap();
            assert!(
                (parsed.get() - original.get()).abs() <= 0.005 + f64::EPSILON,
                "{} -> {}",
                original.get(),
                parsed.get()
            );
        }
    }

    #[test]
    fn parse_accepts_lenient_decimals() {
        assert_eq!(LoadValue::parse_wire("0.6").unwrap().get(), 0.6);
        assert_eq!(LoadValue::parse_wire(" 1 ").unwrap().get(), 1.0);
        assert_eq!(LoadValue::parse_wire(".5").unwrap().get(), 0.5);
    }

    #[test]
    fn parse_rejects_malformed() {
        for raw in ["", ".", "abc", "0.5.1", "-0.1", "+0.5", "1e-1", "NaN", "inf", "0,5"] {
            assert!(
                matches!(LoadValue::parse_wire(raw), Err(PulseHeaderError::NotDecimal(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_rejects_out_of_range() {
        assert_eq!(
            LoadValue::parse_wire("1.50"),
            Err(PulseHeaderError::OutOfRange(1.5))
        );
    }

    #[test]
    fn header_value_matches_wire() {
        let value = LoadValue::clamped(0.42).header_value();
        assert_eq!(value.to_str().unwrap(), "0.42");
        assert_eq!(LoadValue::from_header(&value).unwrap().get(), 0.42);
    }

    #[test]
    fn non_ascii_header_is_rejected() {
        let value = HeaderValue::from_bytes(b"0.\xff").unwrap();
        assert_eq!(LoadValue::from_header(&value), Err(PulseHeaderError::NotAscii));
    }

    #[test]
    fn serde_validates_range() {
        let ok: LoadValue = serde_json::from_str("0.25").unwrap();
        assert_eq!(ok.get(), 0.25);
        assert!(serde_json::from_str::<LoadValue>("2.0").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "0.25");
    }
}
