//! Strategy classification.
//!
//! Maps a `LoadValue` onto one of three prefetch tiers using a validated
//! two-entry threshold table:
//!
//! ```text
//! load <  aggressive_max                     → aggressive
//! aggressive_max <= load < conservative_max  → conservative
//! load >= conservative_max                   → blocked
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::load::LoadValue;

pub const DEFAULT_AGGRESSIVE_MAX: f64 = 0.5;
pub const DEFAULT_CONSERVATIVE_MAX: f64 = 0.8;

/// Prefetch policy derived from an observed load.
///
/// Variants are ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyTier {
    /// Prefetch freely (e.g. on hover).
    Aggressive,
    /// Prefetch only on explicit interaction.
    Conservative,
    /// Do not prefetch.
    Blocked,
}

impl StrategyTier {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyTier::Aggressive => "aggressive",
            StrategyTier::Conservative => "conservative",
            StrategyTier::Blocked => "blocked",
        }
    }

    /// Whether speculative requests are allowed at this tier.
    pub fn allows_prefetch(self) -> bool {
        self != StrategyTier::Blocked
    }
}

impl fmt::Display for StrategyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bounds for the aggressive and conservative tiers.
///
/// Construction enforces `0 <= aggressive_max < conservative_max <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds")]
pub struct ThresholdTable {
    aggressive_max: f64,
    conservative_max: f64,
}

/// Unvalidated form used for deserialization.
#[derive(Deserialize)]
struct RawThresholds {
    #[serde(default = "default_aggressive_max")]
    aggressive_max: f64,
    #[serde(default = "default_conservative_max")]
    conservative_max: f64,
}

fn default_aggressive_max() -> f64 {
    DEFAULT_AGGRESSIVE_MAX
}

fn default_conservative_max() -> f64 {
    DEFAULT_CONSERVATIVE_MAX
}

impl TryFrom<RawThresholds> for ThresholdTable {
    type Error = ConfigError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        ThresholdTable::new(raw.aggressive_max, raw.conservative_max)
    }
}

impl ThresholdTable {
    /// Build a validated table.
    pub fn new(aggressive_max: f64, conservative_max: f64) -> ConfigResult<Self> {
        check_bound("aggressive_max", aggressive_max)?;
        check_bound("conservative_max", conservative_max)?;
        if aggressive_max >= conservative_max {
            return Err(ConfigError::ThresholdOrder {
                aggressive_max,
                conservative_max,
            });
        }
        Ok(Self {
            aggressive_max,
            conservative_max,
        })
    }

    pub fn aggressive_max(&self) -> f64 {
        self.aggressive_max
    }

    pub fn conservative_max(&self) -> f64 {
        self.conservative_max
    }

    /// Classify a load. Total over `[0, 1]`.
    pub fn classify(&self, load: LoadValue) -> StrategyTier {
        let v = load.get();
        if v < self.aggressive_max {
            StrategyTier::Aggressive
        } else if v < self.conservative_max {
            StrategyTier::Conservative
        } else {
            StrategyTier::Blocked
        }
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            aggressive_max: DEFAULT_AGGRESSIVE_MAX,
            conservative_max: DEFAULT_CONSERVATIVE_MAX,
        }
    }
}

fn check_bound(name: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdRange { name, value })
    }
}
