//! Threshold judgement
//!
//! Classifies a derived thickness against a low/high acceptance band. The
//! UI layer turns the classification into its OK/NG display.

use serde::{Deserialize, Serialize};

/// Acceptance band for a thickness value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    /// Lower acceptance bound (inclusive)
    pub low: f32,
    /// Upper acceptance bound (inclusive)
    pub high: f32,
}

/// Outcome of checking a value against a [`Limits`] band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitCheck {
    /// Value under the lower bound (NG)
    BelowLow,
    /// Value inside the band (OK)
    Within,
    /// Value over the upper bound (NG)
    AboveHigh,
}

impl Limits {
    /// Create a band; `low` must not exceed `high`
    pub fn new(low: f32, high: f32) -> Self {
        debug_assert!(low <= high);
        Self { low, high }
    }

    /// Classify `value` against the band
    pub fn classify(&self, value: f32) -> LimitCheck {
        if value < self.low {
            LimitCheck::BelowLow
        } else if value > self.high {
            LimitCheck::AboveHigh
        } else {
            LimitCheck::Within
        }
    }
}
