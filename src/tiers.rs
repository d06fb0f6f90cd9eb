//! Visit-count classification for map coloring.

use serde::{Deserialize, Serialize};

/// Visit frequency tier of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum Tier {
    Low,
    Medium,
    High,
    Severe,
}

impl Tier {
    /// Fill color used by the map layer.
    pub fn color_hex(&self) -> &'static str {
        match self {
            Tier::Low => "#4CAF50",
            Tier::Medium => "#FFEB3B",
            Tier::High => "#FF9800",
            Tier::Severe => "#F44336",
        }
    }
}

/// Inclusive lower bounds for each tier above `Low`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct TierThresholds {
    /// Minimum session count for Medium (default: 2)
    pub medium: u32,
    /// Minimum session count for High (default: 5)
    pub high: u32,
    /// Minimum session count for Severe (default: 10)
    pub severe: u32,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            medium: 2,
            high: 5,
            severe: 10,
        }
    }
}

impl TierThresholds {
    /// Classify a count. Checked highest tier first.
    pub fn classify(&self, count: u32) -> Tier {
        if count >= self.severe {
            Tier::Severe
        } else if count >= self.high {
            Tier::High
        } else if count >= self.medium {
            Tier::Medium
        } else {
            Tier::Low
        }
    }
}

/// Classify a visit count with the default thresholds.
///
/// Cells with a count of zero never reach this: they are absent from the grid.
pub fn tier_of(count: u32) -> Tier {
    TierThresholds::default().classify(count)
}
