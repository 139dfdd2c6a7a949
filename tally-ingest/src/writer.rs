//! Clean-CSV output in the analyst-facing column order.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use tally_core::CleanTransaction;

const HEADER: &[&str] = &[
    "date",
    "normalized_merchant",
    "merchant_name",
    "amount",
    "currency",
    "category",
    "is_refund",
    "is_anomaly",
    "anomaly_reason",
];

/// Write annotated transactions as CSV, creating parent directories as
/// needed. Dates are ISO 8601 timestamps, amounts fixed at 2 decimals.
pub fn write_clean_csv(path: impl AsRef<Path>, transactions: &[CleanTransaction]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(HEADER)?;

    for txn in transactions {
        wtr.write_record([
            txn.date.format("%Y-%m-%dT%H:%M:%S").to_string(),
            txn.normalized_merchant.clone(),
            txn.merchant_name.clone(),
            format!("{:.2}", txn.amount),
            txn.currency.clone(),
            txn.category.clone(),
            txn.is_refund.to_string(),
            txn.is_anomaly().to_string(),
            txn.anomaly_reason(),
        ])?;
    }

    wtr.flush()?;
    info!(rows = transactions.len(), path = %path.display(), "wrote clean transactions");
    Ok(())
}
