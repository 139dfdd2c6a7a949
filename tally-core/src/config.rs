//! Tunables consumed by the pipeline and the anomaly engine.
//!
//! Everything here can be overridden without code changes: the structs
//! deserialize from any serde source and fall back to the documented
//! defaults field by field.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::date::YearWindow;

/// Knobs for the per-record normalization stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Accepted year window for resolved dates.
    pub year_window: YearWindow,
    /// Fuzzy merchant-match acceptance cutoff on the 0-100 scale.
    pub fuzzy_match_cutoff: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            year_window: YearWindow::default(),
            fuzzy_match_cutoff: 75.0,
        }
    }
}

/// Knobs for the batch profiling and anomaly detection stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Z-score severity cutoffs.
    pub z_medium: f64,
    pub z_high: f64,
    pub z_critical: f64,
    /// Mean amount above which a batch is classified FINANCIAL.
    pub scale_split: f64,
    /// Relative amount difference treated as a suspected duplicate.
    pub duplicate_tolerance: f64,
    /// Velocity window length in hours.
    pub velocity_window_hours: f64,
    /// Cumulative per-merchant spend that trips the velocity check.
    pub velocity_amount: Decimal,
    /// Windows spanning no more than this many hours are treated as
    /// simultaneous postings and ignored.
    pub velocity_epsilon_hours: f64,
    /// A day is a diversity anomaly at this multiple of the baseline.
    pub diversity_multiplier: f64,
    /// Floor on distinct merchants before a day can be flagged at all.
    pub diversity_min_merchants: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            z_medium: 3.0,
            z_high: 4.0,
            z_critical: 5.0,
            scale_split: 50_000.0,
            duplicate_tolerance: 0.05,
            velocity_window_hours: 6.0,
            velocity_amount: Decimal::new(500, 0),
            velocity_epsilon_hours: 0.01,
            diversity_multiplier: 2.0,
            diversity_min_merchants: 3,
        }
    }
}
