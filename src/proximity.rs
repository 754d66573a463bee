//! Proximity estimation from signal strength.
//!
//! Two independent views of a single RSSI sample:
//!
//! - [`distance_category`] buckets the raw dBm value with fixed thresholds.
//! - [`normalized_proximity`] maps the dBm value linearly onto `[0, 1]`,
//!   which drives progress-style displays and [`DistanceCategory::from_proximity`].
//!
//! Both are pure functions with no state.

use serde::{Deserialize, Serialize};

/// Weakest signal considered, maps to proximity `0.0`.
pub const RSSI_FLOOR: i16 = -100;

/// Strongest signal considered, maps to proximity `1.0`.
pub const RSSI_CEILING: i16 = -40;

/// Coarse distance bucket for a signal sample.
///
/// Ordered from nearest to farthest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DistanceCategory {
    /// Roughly 0 to 1 m.
    VeryClose,
    /// Roughly 1 to 5 m.
    Close,
    /// Roughly 5 to 10 m.
    Medium,
    /// Roughly 10 to 20 m.
    Far,
    /// Beyond 20 m or heavily obstructed.
    VeryFar,
}

impl DistanceCategory {
    /// Bucket a raw RSSI value (dBm). Thresholds are inclusive lower bounds.
    pub fn from_rssi(rssi: i16) -> Self {
        match rssi {
            r if r >= -50 => Self::VeryClose,
            r if r >= -70 => Self::Close,
            r if r >= -80 => Self::Medium,
            r if r >= -90 => Self::Far,
            _ => Self::VeryFar,
        }
    }

    /// Bucket a normalized proximity score in `[0, 1]`.
    ///
    /// This is computed from the score alone, never from the dBm thresholds.
    pub fn from_proximity(score: f64) -> Self {
        if score >= 0.8 {
            Self::VeryClose
        } else if score >= 0.6 {
            Self::Close
        } else if score >= 0.4 {
            Self::Medium
        } else if score >= 0.2 {
            Self::Far
        } else {
            Self::VeryFar
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryClose => "Very close",
            Self::Close => "Close",
            Self::Medium => "Medium distance",
            Self::Far => "Far",
            Self::VeryFar => "Very far",
        }
    }

    /// Approximate distance range description.
    pub fn range_hint(&self) -> &'static str {
        match self {
            Self::VeryClose => "0-1 m",
            Self::Close => "1-5 m",
            Self::Medium => "5-10 m",
            Self::Far => "10-20 m",
            Self::VeryFar => "20+ m or obstructed",
        }
    }
}

impl std::fmt::Display for DistanceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Distance category for a raw RSSI value.
#[inline]
pub fn distance_category(rssi: i16) -> DistanceCategory {
    DistanceCategory::from_rssi(rssi)
}

/// Linear map of `rssi` from `[-100, -40]` onto `[0, 1]`, clamped at both ends.
///
/// # Example
///
/// ```
/// use proximity_link_ble::normalized_proximity;
///
/// assert_eq!(normalized_proximity(-100), 0.0);
/// assert_eq!(normalized_proximity(-40), 1.0);
/// assert!((normalized_proximity(-70) - 0.5).abs() < 1e-9);
/// ```
#[inline]
pub fn normalized_proximity(rssi: i16) -> f64 {
    let span = f64::from(RSSI_CEILING - RSSI_FLOOR);
    let score = (f64::from(rssi) - f64::from(RSSI_FLOOR)) / span;
    score.clamp(0.0, 1.0)
}

/// Display-ready proximity derived from one signal sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityReading {
    /// The raw sample in dBm.
    pub rssi: i16,
    /// Bucket from the dBm thresholds.
    pub category: DistanceCategory,
    /// Normalized score in `[0, 1]`.
    pub score: f64,
    /// Bucket from the normalized score.
    pub level: DistanceCategory,
}

impl ProximityReading {
    /// Estimate proximity for a sample.
    pub fn from_rssi(rssi: i16) -> Self {
        let score = normalized_proximity(rssi);
        Self {
            rssi,
            category: distance_category(rssi),
            score,
            level: DistanceCategory::from_proximity(score),
        }
    }

    /// Whether the score is at or below an alert threshold.
    pub fn is_below(&self, threshold: f64) -> bool {
        self.score <= threshold
    }
}
