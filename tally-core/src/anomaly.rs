//! Adaptive anomaly detection over one normalized batch.
//!
//! Four independent detectors run against the batch plus its profile:
//! statistical outliers (Z-score), policy threshold breaches, suspected
//! duplicates, velocity bursts, and a merchant-diversity pattern check.
//! Each detector is a pure function returning `(index, flag)` findings;
//! `annotate` appends them and never touches canonical fields. One
//! transaction can accumulate flags from several detectors.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use crate::config::AnalyzerConfig;
use crate::profile::DatasetProfile;
use crate::record::{AnomalyFlag, CleanTransaction, Severity};

type Finding = (usize, AnomalyFlag);

/// Flags suspicious transactions using dataset-adaptive thresholds.
#[derive(Debug, Clone, Default)]
pub struct AnomalyEngine {
    config: AnalyzerConfig,
}

impl AnomalyEngine {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Run all detectors and append their flags. Returns the number of
    /// flags added.
    pub fn annotate(
        &self,
        transactions: &mut [CleanTransaction],
        profile: &DatasetProfile,
    ) -> usize {
        let mut findings: Vec<Finding> = Vec::new();
        findings.extend(self.statistical_outliers(transactions, profile));
        findings.extend(self.policy_breaches(transactions, profile));
        findings.extend(self.suspected_duplicates(transactions));
        findings.extend(self.velocity_bursts(transactions));
        findings.extend(self.diversity_anomalies(transactions));

        let total = findings.len();
        debug!(flags = total, "anomaly detection complete");
        for (index, flag) in findings {
            transactions[index].anomaly_flags.push(flag);
        }
        total
    }

    /// Z-score outliers among spending amounts. Skipped entirely when the
    /// batch has no usable standard deviation.
    fn statistical_outliers(
        &self,
        transactions: &[CleanTransaction],
        profile: &DatasetProfile,
    ) -> Vec<Finding> {
        let Some(stdev) = profile.usable_stdev() else {
            debug!("statistical detector skipped: no usable stdev");
            return Vec::new();
        };

        let mut findings = Vec::new();
        for (i, txn) in transactions.iter().enumerate() {
            if txn.amount <= Decimal::ZERO {
                continue;
            }
            let Some(amount) = txn.amount.to_f64() else {
                continue;
            };
            let z = (amount - profile.mean) / stdev;
            let severity = if z > self.config.z_critical {
                Severity::Critical
            } else if z > self.config.z_high {
                Severity::High
            } else if z > self.config.z_medium {
                Severity::Medium
            } else {
                continue;
            };
            findings.push((
                i,
                AnomalyFlag::new(
                    severity,
                    format!(
                        "amount ${:.2} is {:.1} standard deviations outside your normal spending range",
                        amount, z
                    ),
                ),
            ));
        }
        findings
    }

    /// Absolute-amount breaches of the scale-selected threshold triple,
    /// independent of the statistical result.
    fn policy_breaches(
        &self,
        transactions: &[CleanTransaction],
        profile: &DatasetProfile,
    ) -> Vec<Finding> {
        let thresholds = profile.thresholds;
        let mut findings = Vec::new();
        for (i, txn) in transactions.iter().enumerate() {
            let magnitude = txn.amount.abs();
            let (severity, threshold) = if magnitude > thresholds.critical {
                (Severity::Critical, thresholds.critical)
            } else if magnitude > thresholds.high {
                (Severity::High, thresholds.high)
            } else if magnitude > thresholds.medium {
                (Severity::Medium, thresholds.medium)
            } else {
                continue;
            };
            findings.push((
                i,
                AnomalyFlag::new(
                    severity,
                    format!("Large purchase: ${magnitude} exceeds the ${threshold} policy threshold"),
                ),
            ));
        }
        findings
    }

    /// Same-day same-merchant pairs whose amounts differ by at most the
    /// configured relative tolerance. Both members are flagged, once each.
    fn suspected_duplicates(&self, transactions: &[CleanTransaction]) -> Vec<Finding> {
        let mut groups: BTreeMap<(NaiveDate, &str), Vec<usize>> = BTreeMap::new();
        for (i, txn) in transactions.iter().enumerate() {
            groups
                .entry((txn.day(), txn.normalized_merchant.as_str()))
                .or_default()
                .push(i);
        }

        let mut findings = Vec::new();
        let mut flagged: BTreeSet<usize> = BTreeSet::new();
        for (&(day, merchant), members) in &groups {
            if members.len() < 2 {
                continue;
            }
            for (pos, &i) in members.iter().enumerate() {
                for &j in &members[pos + 1..] {
                    if !amounts_within_tolerance(
                        transactions[i].amount,
                        transactions[j].amount,
                        self.config.duplicate_tolerance,
                    ) {
                        continue;
                    }
                    for index in [i, j] {
                        if flagged.insert(index) {
                            findings.push((
                                index,
                                AnomalyFlag::new(
                                    Severity::High,
                                    format!("possible duplicate charge at {merchant} on {day}"),
                                ),
                            ));
                        }
                    }
                }
            }
        }
        findings
    }

    /// Per-merchant spending bursts inside a sliding time window. Windows
    /// whose whole span is within the simultaneity epsilon are ignored so
    /// batch-imported postings are not mistaken for bursts.
    fn velocity_bursts(&self, transactions: &[CleanTransaction]) -> Vec<Finding> {
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, txn) in transactions.iter().enumerate() {
            if txn.amount > Decimal::ZERO {
                groups
                    .entry(txn.normalized_merchant.as_str())
                    .or_default()
                    .push(i);
            }
        }

        let mut findings = Vec::new();
        let mut flagged: BTreeSet<usize> = BTreeSet::new();
        for (merchant, members) in &mut groups {
            members.sort_by_key(|&i| transactions[i].date);
            for start in 0..members.len() {
                let mut sum = transactions[members[start]].amount;
                for end in start + 1..members.len() {
                    let span_hours = (transactions[members[end]].date
                        - transactions[members[start]].date)
                        .num_seconds() as f64
                        / 3600.0;
                    if span_hours > self.config.velocity_window_hours {
                        break;
                    }
                    sum += transactions[members[end]].amount;
                    if span_hours <= self.config.velocity_epsilon_hours {
                        continue;
                    }
                    if sum >= self.config.velocity_amount {
                        for &index in &members[start..=end] {
                            if flagged.insert(index) {
                                findings.push((
                                    index,
                                    AnomalyFlag::new(
                                        Severity::High,
                                        format!(
                                            "rapid spending: ${sum} at {merchant} within {span_hours:.1} hours"
                                        ),
                                    ),
                                ));
                            }
                        }
                    }
                }
            }
        }
        findings
    }

    /// Days transacting with unusually many distinct merchants relative
    /// to the dataset-wide baseline (possible card-testing signature).
    fn diversity_anomalies(&self, transactions: &[CleanTransaction]) -> Vec<Finding> {
        let mut days: BTreeMap<NaiveDate, BTreeSet<&str>> = BTreeMap::new();
        for txn in transactions {
            days.entry(txn.day())
                .or_default()
                .insert(txn.normalized_merchant.as_str());
        }
        if days.is_empty() {
            return Vec::new();
        }

        let baseline =
            days.values().map(|m| m.len()).sum::<usize>() as f64 / days.len() as f64;

        let mut findings = Vec::new();
        for (day, merchants) in &days {
            let count = merchants.len();
            if count < self.config.diversity_min_merchants {
                continue;
            }
            if (count as f64) < baseline * self.config.diversity_multiplier {
                continue;
            }
            for (i, txn) in transactions.iter().enumerate() {
                if txn.day() == *day {
                    findings.push((
                        i,
                        AnomalyFlag::new(
                            Severity::Low,
                            format!(
                                "unusual merchant diversity: {count} distinct merchants on {day} (typical {baseline:.1})"
                            ),
                        ),
                    ));
                }
            }
        }
        findings
    }
}

/// Relative difference of two magnitudes against the larger one.
fn amounts_within_tolerance(a: Decimal, b: Decimal, tolerance: f64) -> bool {
    let (a, b) = (a.abs(), b.abs());
    let larger = a.max(b);
    if larger.is_zero() {
        return true;
    }
    ((a - b).abs() / larger)
        .to_f64()
        .is_some_and(|ratio| ratio <= tolerance)
}
