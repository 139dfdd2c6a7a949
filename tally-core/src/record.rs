//! Record types shared across the normalization and analysis stages.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A raw transaction row as handed over by the ingestion layer.
///
/// Fields are untouched text; `row` is the 1-based source row number
/// (the header counts as row 1) so failures can point back at the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub row: usize,
    pub date: String,
    pub merchant: String,
    pub amount: String,
    /// Empty when the upstream record carried no category.
    pub category: String,
}

/// Severity attached to an anomaly flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "CRITICAL")]
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One anomaly finding: severity plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    pub severity: Severity,
    pub reason: String,
}

impl AnomalyFlag {
    pub fn new(severity: Severity, reason: impl Into<String>) -> Self {
        Self {
            severity,
            reason: reason.into(),
        }
    }
}

/// The fully normalized, analysis-ready representation of one input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanTransaction {
    pub date: NaiveDateTime,
    /// Original merchant text, preserved for traceability.
    pub merchant_name: String,
    /// Canonical identity, or a structured account identifier kept verbatim.
    pub normalized_merchant: String,
    /// Signed amount at 2 decimal places; refunds are negative.
    pub amount: Decimal,
    pub currency: String,
    pub category: String,
    pub is_refund: bool,
    pub anomaly_flags: Vec<AnomalyFlag>,
}

impl CleanTransaction {
    pub fn is_anomaly(&self) -> bool {
        !self.anomaly_flags.is_empty()
    }

    /// Human-readable join of flag reasons; empty when clean.
    pub fn anomaly_reason(&self) -> String {
        self.anomaly_flags
            .iter()
            .map(|f| format!("[{}] {}", f.severity, f.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Calendar day of the transaction.
    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }
}

/// Which raw field failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureField {
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "amount")]
    Amount,
}

impl fmt::Display for FailureField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureField::Date => f.write_str("date"),
            FailureField::Amount => f.write_str("amount"),
        }
    }
}

/// Why a field could not be resolved. Carries only the failure kind so
/// nothing beyond the sanitized raw value ever reaches a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ResolveError {
    #[error("field is empty")]
    #[serde(rename = "empty")]
    Empty,
    #[error("value could not be parsed")]
    #[serde(rename = "unparseable")]
    Unparseable,
    #[error("date is outside the accepted year window")]
    #[serde(rename = "out_of_window")]
    OutOfWindow,
}

/// Per-record failure event, emitted for the collaborator's audit log.
/// The record itself is excluded from the canonical set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub row: usize,
    pub field: FailureField,
    /// Trimmed original field value.
    pub value: String,
    pub kind: ResolveError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn txn() -> CleanTransaction {
        CleanTransaction {
            date: NaiveDate::from_ymd_opt(2023, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            merchant_name: "AMAZON.COM".to_string(),
            normalized_merchant: "Amazon".to_string(),
            amount: dec!(45.99),
            currency: "USD".to_string(),
            category: "Shopping".to_string(),
            is_refund: false,
            anomaly_flags: Vec::new(),
        }
    }

    #[test]
    fn test_clean_transaction_no_flags() {
        let t = txn();
        assert!(!t.is_anomaly());
        assert_eq!(t.anomaly_reason(), "");
    }

    #[test]
    fn test_anomaly_reason_joins_flags() {
        let mut t = txn();
        t.anomaly_flags
            .push(AnomalyFlag::new(Severity::Critical, "way outside range"));
        t.anomaly_flags
            .push(AnomalyFlag::new(Severity::High, "possible duplicate"));
        assert!(t.is_anomaly());
        assert_eq!(
            t.anomaly_reason(),
            "[CRITICAL] way outside range; [HIGH] possible duplicate"
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }
}
