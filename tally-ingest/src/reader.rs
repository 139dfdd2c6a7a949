//! Messy-CSV ingestion.
//!
//! Upstream exports arrive with padded header cells, inconsistent casing,
//! and a merchant column that may be labeled "Merchant" or "Merchant
//! Name". The category column is optional. Rows are numbered from 2 so
//! failure events line up with the source file (the header is row 1).

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use csv::ReaderBuilder;
use tracing::info;

use tally_core::RawRecord;

const MERCHANT_ALIASES: &[&str] = &["merchant name", "merchant"];

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    date: usize,
    merchant: usize,
    amount: usize,
    category: Option<usize>,
}

fn map_columns(header: &csv::StringRecord) -> Result<ColumnMap> {
    let cells: Vec<String> = header.iter().map(|c| c.trim().to_lowercase()).collect();
    let find = |name: &str| cells.iter().position(|c| c == name);

    let date = find("date").context("missing 'Date' column")?;
    let merchant = MERCHANT_ALIASES
        .iter()
        .find_map(|alias| find(alias))
        .context("missing 'Merchant' column")?;
    let amount = find("amount").context("missing 'Amount' column")?;

    Ok(ColumnMap {
        date,
        merchant,
        amount,
        category: find("category"),
    })
}

/// Read raw records from any CSV source.
pub fn read_raw_records<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(reader);

    let mut columns: Option<ColumnMap> = None;
    let mut records = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("reading CSV row {}", index + 1))?;

        let Some(map) = columns else {
            columns = Some(map_columns(&record)?);
            continue;
        };

        let cell = |idx: usize| record.get(idx).unwrap_or("").to_string();
        records.push(RawRecord {
            row: index + 1,
            date: cell(map.date),
            merchant: cell(map.merchant),
            amount: cell(map.amount),
            category: map.category.map(cell).unwrap_or_default(),
        });
    }

    if columns.is_none() {
        bail!("CSV contains no header row");
    }

    Ok(records)
}

/// Read raw records from a CSV file on disk.
pub fn read_raw_csv(path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let records = read_raw_records(file)?;
    info!(rows = records.len(), path = %path.display(), "loaded raw transactions");
    Ok(records)
}
