//! Fractional-completion snapshot reported by a running encode.

use serde::{Deserialize, Serialize};

/// One progress snapshot parsed from the encoder's key=value output.
///
/// `percent` is derived from the output timestamp and the source duration;
/// snapshots without a finite fraction are dropped instead of forwarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeProgress {
    pub frame: u64,
    pub fps: f64,
    pub out_time_ms: i64,
    pub out_time: String,
    pub speed: f64,
    pub percent: f64,
}

impl EncodeProgress {
    /// Fraction of the source already encoded, capped at 100. Returns NaN
    /// when the total duration is unknown, which marks the snapshot as
    /// unreportable.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if total_duration_ms <= 0 {
            return f64::NAN;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).min(100.0)
    }

    pub fn is_reportable(&self) -> bool {
        self.percent.is_finite()
    }
}
