//! Batch-level amount statistics and scale-adaptive policy thresholds.
//!
//! The profiler needs the complete normalized batch: thresholds are chosen
//! relative to the dataset, so retail card exports and enterprise ledgers
//! get different cutoffs instead of one miscalibrated constant.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalyzerConfig;
use crate::record::CleanTransaction;

/// Classification of one batch by mean transaction size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleClass {
    #[serde(rename = "RETAIL")]
    Retail,
    #[serde(rename = "FINANCIAL")]
    Financial,
}

/// Policy thresholds (critical, high, medium) for one scale class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTriple {
    pub critical: Decimal,
    pub high: Decimal,
    pub medium: Decimal,
}

impl ThresholdTriple {
    pub fn for_scale(scale: ScaleClass) -> Self {
        match scale {
            ScaleClass::Retail => Self {
                critical: Decimal::new(5_000, 0),
                high: Decimal::new(2_000, 0),
                medium: Decimal::new(1_000, 0),
            },
            ScaleClass::Financial => Self {
                critical: Decimal::new(500_000, 0),
                high: Decimal::new(200_000, 0),
                medium: Decimal::new(100_000, 0),
            },
        }
    }
}

/// Read-only summary of one batch. Computed once, consumed by the anomaly
/// engine, discarded with the batch; there is no cross-batch memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    /// Number of spending amounts in the baseline.
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` when fewer than 2 amounts exist,
    /// reported explicitly instead of dividing by zero.
    pub stdev: Option<f64>,
    pub scale: ScaleClass,
    pub thresholds: ThresholdTriple,
}

impl DatasetProfile {
    /// Standard deviation usable for Z-scores: defined and non-zero.
    pub fn usable_stdev(&self) -> Option<f64> {
        self.stdev.filter(|sd| *sd > f64::EPSILON)
    }
}

/// Computes aggregate statistics over one batch of resolved amounts.
#[derive(Debug, Clone)]
pub struct DatasetProfiler {
    scale_split: f64,
}

impl Default for DatasetProfiler {
    fn default() -> Self {
        Self::new(&AnalyzerConfig::default())
    }
}

impl DatasetProfiler {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            scale_split: config.scale_split,
        }
    }

    /// Profile the batch. Refunds and zero amounts are excluded from the
    /// baseline: the statistics describe spending behavior only.
    pub fn profile(&self, transactions: &[CleanTransaction]) -> DatasetProfile {
        let amounts: Vec<f64> = transactions
            .iter()
            .filter(|t| t.amount > Decimal::ZERO)
            .filter_map(|t| t.amount.to_f64())
            .collect();

        let count = amounts.len();
        let mean = if count == 0 {
            0.0
        } else {
            amounts.iter().sum::<f64>() / count as f64
        };

        let stdev = if count < 2 {
            None
        } else {
            let variance = amounts
                .iter()
                .map(|a| {
                    let d = a - mean;
                    d * d
                })
                .sum::<f64>()
                / (count - 1) as f64;
            Some(variance.sqrt())
        };

        // Strictly greater than the split: a mean of exactly 50,000 stays
        // RETAIL.
        let scale = if mean > self.scale_split {
            ScaleClass::Financial
        } else {
            ScaleClass::Retail
        };

        debug!(count, mean, ?stdev, ?scale, "dataset profile computed");

        DatasetProfile {
            count,
            mean,
            stdev,
            scale,
            thresholds: ThresholdTriple::for_scale(scale),
        }
    }
}
