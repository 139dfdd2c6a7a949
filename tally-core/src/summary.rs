//! Batch analytics over the annotated canonical set: summary totals,
//! spending breakdowns, and a coarse risk assessment.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::record::{CleanTransaction, Severity};

/// Aggregate view of one processed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_transactions: usize,
    pub date_range: (NaiveDateTime, NaiveDateTime),
    /// Sum of positive amounts.
    pub total_spending: Decimal,
    /// Absolute sum of negative amounts.
    pub total_refunds: Decimal,
    pub net_spending: Decimal,
    pub top_category: String,
    pub top_category_spending: Decimal,
    pub anomalies_detected: usize,
    /// Transactions whose canonical merchant differs from the raw text.
    pub merchants_normalized: usize,
}

/// Summarize an annotated batch. An empty batch has no summary.
pub fn summarize(transactions: &[CleanTransaction]) -> Option<BatchSummary> {
    let first = transactions.first()?;
    let mut min_date = first.date;
    let mut max_date = first.date;
    let mut total_spending = Decimal::ZERO;
    let mut total_refunds = Decimal::ZERO;

    for txn in transactions {
        min_date = min_date.min(txn.date);
        max_date = max_date.max(txn.date);
        if txn.amount > Decimal::ZERO {
            total_spending += txn.amount;
        } else {
            total_refunds += txn.amount.abs();
        }
    }

    let breakdown = category_breakdown(transactions);
    let (top_category, top_category_spending) = breakdown
        .first()
        .cloned()
        .unwrap_or_else(|| ("Uncategorized".to_string(), Decimal::ZERO));

    Some(BatchSummary {
        total_transactions: transactions.len(),
        date_range: (min_date, max_date),
        total_spending,
        total_refunds,
        net_spending: total_spending - total_refunds,
        top_category,
        top_category_spending,
        anomalies_detected: transactions.iter().filter(|t| t.is_anomaly()).count(),
        merchants_normalized: transactions
            .iter()
            .filter(|t| t.normalized_merchant != t.merchant_name)
            .count(),
    })
}

/// Spending per category, highest first; name is the tie-break.
pub fn category_breakdown(transactions: &[CleanTransaction]) -> Vec<(String, Decimal)> {
    spending_by(transactions, |t| t.category.as_str())
}

/// Spending per canonical merchant, highest first; name is the tie-break.
pub fn merchant_breakdown(transactions: &[CleanTransaction]) -> Vec<(String, Decimal)> {
    spending_by(transactions, |t| t.normalized_merchant.as_str())
}

fn spending_by<'a>(
    transactions: &'a [CleanTransaction],
    key: impl Fn(&'a CleanTransaction) -> &'a str,
) -> Vec<(String, Decimal)> {
    let mut totals: BTreeMap<&str, Decimal> = BTreeMap::new();
    for txn in transactions {
        if txn.amount > Decimal::ZERO {
            *totals.entry(key(txn)).or_insert(Decimal::ZERO) += txn.amount;
        }
    }
    let mut out: Vec<(String, Decimal)> = totals
        .into_iter()
        .map(|(name, total)| (name.to_string(), total))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// Coarse batch risk level derived from anomaly flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "MINIMAL")]
    Minimal,
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Minimal => f.write_str("MINIMAL"),
            RiskLevel::Low => f.write_str("LOW"),
            RiskLevel::Medium => f.write_str("MEDIUM"),
            RiskLevel::High => f.write_str("HIGH"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// 0-100, severity-weighted.
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    /// Flagged transactions over total transactions, in [0, 1].
    pub anomaly_rate: f64,
    pub total_anomalies: usize,
    pub risk_factors: Vec<String>,
}

/// Score the batch from its anomaly flags. Weights: CRITICAL 25, HIGH 15,
/// MEDIUM 8, LOW 3, INFO 1, clamped to 100.
pub fn assess_risk(transactions: &[CleanTransaction]) -> RiskAssessment {
    let mut score: u32 = 0;
    let mut counts: BTreeMap<Severity, usize> = BTreeMap::new();
    for txn in transactions {
        for flag in &txn.anomaly_flags {
            *counts.entry(flag.severity).or_insert(0) += 1;
            score += match flag.severity {
                Severity::Critical => 25,
                Severity::High => 15,
                Severity::Medium => 8,
                Severity::Low => 3,
                Severity::Info => 1,
            };
        }
    }
    let risk_score = score.min(100);

    let total_anomalies = transactions.iter().filter(|t| t.is_anomaly()).count();
    let anomaly_rate = if transactions.is_empty() {
        0.0
    } else {
        total_anomalies as f64 / transactions.len() as f64
    };

    let mut risk_factors = Vec::new();
    for (severity, count) in counts.iter().rev() {
        if *count > 0 && *severity >= Severity::Medium {
            risk_factors.push(format!("{count} {severity} anomaly flags"));
        }
    }
    if anomaly_rate > 0.2 {
        risk_factors.push(format!(
            "anomaly rate {:.0}% exceeds 20% of the batch",
            anomaly_rate * 100.0
        ));
    }

    let risk_level = if risk_score >= 70 {
        RiskLevel::High
    } else if risk_score >= 40 {
        RiskLevel::Medium
    } else if risk_score >= 15 {
        RiskLevel::Low
    } else {
        RiskLevel::Minimal
    };

    RiskAssessment {
        risk_score,
        risk_level,
        anomaly_rate,
        total_anomalies,
        risk_factors,
    }
}
