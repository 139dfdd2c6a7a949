//! tally-core: normalization pipeline and adaptive anomaly detection for
//! messy financial transaction records.

pub mod amount;
pub mod anomaly;
pub mod category;
pub mod config;
pub mod date;
pub mod merchant;
pub mod pipeline;
pub mod profile;
pub mod record;
pub mod summary;

pub use amount::{AmountResolver, DEFAULT_CURRENCY, ResolvedAmount};
pub use anomaly::AnomalyEngine;
pub use category::{CategoryInferencer, UNCATEGORIZED};
pub use config::{AnalyzerConfig, PipelineConfig};
pub use date::{DateResolver, YearWindow};
pub use merchant::{MerchantResolver, UNKNOWN_MERCHANT, token_set_ratio};
pub use pipeline::{BatchOutcome, NormalizationPipeline};
pub use profile::{DatasetProfile, DatasetProfiler, ScaleClass, ThresholdTriple};
pub use record::{
    AnomalyFlag, CleanTransaction, FailureField, RawRecord, RecordFailure, ResolveError, Severity,
};
pub use summary::{
    BatchSummary, RiskAssessment, RiskLevel, assess_risk, category_breakdown, merchant_breakdown,
    summarize,
};
