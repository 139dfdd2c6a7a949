//! Per-record normalization: the four resolvers assembled into canonical
//! transactions.
//!
//! Each record is independent; the resolvers consult only immutable
//! lookup tables, so the stage needs no shared state. A record that fails
//! date or amount resolution is excluded from the canonical set and
//! reported as a failure event; it never aborts the rest of the batch.

use tracing::{info, warn};

use crate::amount::AmountResolver;
use crate::category::CategoryInferencer;
use crate::config::PipelineConfig;
use crate::date::DateResolver;
use crate::merchant::MerchantResolver;
use crate::record::{CleanTransaction, FailureField, RawRecord, RecordFailure};

/// Result of normalizing one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub transactions: Vec<CleanTransaction>,
    pub failures: Vec<RecordFailure>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.transactions.len() + self.failures.len()
    }
}

/// Orchestrates date, amount, merchant and category resolution per record.
#[derive(Debug, Clone)]
pub struct NormalizationPipeline {
    dates: DateResolver,
    amounts: AmountResolver,
    merchants: MerchantResolver,
    categories: CategoryInferencer,
}

impl Default for NormalizationPipeline {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl NormalizationPipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            dates: DateResolver::new(config.year_window),
            amounts: AmountResolver::new(),
            merchants: MerchantResolver::new(config.fuzzy_match_cutoff),
            categories: CategoryInferencer::new(),
        }
    }

    /// Build a pipeline around caller-provided lookup tables.
    pub fn with_resolvers(
        dates: DateResolver,
        merchants: MerchantResolver,
        categories: CategoryInferencer,
    ) -> Self {
        Self {
            dates,
            amounts: AmountResolver::new(),
            merchants,
            categories,
        }
    }

    /// Normalize one raw record into a canonical transaction.
    ///
    /// Date and amount failures are terminal for the record; merchant and
    /// category resolution always degrade gracefully to fallback values.
    pub fn normalize(&self, raw: &RawRecord) -> Result<CleanTransaction, RecordFailure> {
        let date = self.dates.resolve(&raw.date).map_err(|kind| RecordFailure {
            row: raw.row,
            field: FailureField::Date,
            value: raw.date.trim().to_string(),
            kind,
        })?;

        let resolved = self
            .amounts
            .resolve(&raw.amount)
            .map_err(|kind| RecordFailure {
                row: raw.row,
                field: FailureField::Amount,
                value: raw.amount.trim().to_string(),
                kind,
            })?;

        let normalized_merchant = self.merchants.resolve(&raw.merchant);
        let category = self.categories.infer(&normalized_merchant, &raw.category);

        Ok(CleanTransaction {
            date,
            merchant_name: raw.merchant.trim().to_string(),
            normalized_merchant,
            amount: resolved.amount,
            currency: resolved.currency,
            category,
            is_refund: resolved.is_negative,
            anomaly_flags: Vec::new(),
        })
    }

    /// Normalize a whole batch, collecting failures alongside successes.
    pub fn normalize_batch(&self, records: &[RawRecord]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for record in records {
            match self.normalize(record) {
                Ok(txn) => outcome.transactions.push(txn),
                Err(failure) => {
                    warn!(
                        row = failure.row,
                        field = %failure.field,
                        value = %failure.value,
                        "record excluded from canonical set"
                    );
                    outcome.failures.push(failure);
                }
            }
        }
        info!(
            ok = outcome.transactions.len(),
            failed = outcome.failures.len(),
            "batch normalization complete"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ResolveError;
    use chrono::{Datelike, NaiveDate};
    use rust_decimal_macros::dec;

    fn raw(row: usize, date: &str, merchant: &str, amount: &str, category: &str) -> RawRecord {
        RawRecord {
            row,
            date: date.to_string(),
            merchant: merchant.to_string(),
            amount: amount.to_string(),
            category: category.to_string(),
        }
    }

    #[test]
    fn test_normalize_full_record() {
        let p = NormalizationPipeline::default();
        let txn = p
            .normalize(&raw(2, "2023-01-15", "AMAZON.COM", "$45.99", "Shopping"))
            .unwrap();
        assert_eq!(
            txn.date.date(),
            NaiveDate::from_ymd_opt(2023, 1, 15).unwrap()
        );
        assert_eq!(txn.merchant_name, "AMAZON.COM");
        assert_eq!(txn.normalized_merchant, "Amazon");
        assert_eq!(txn.amount, dec!(45.99));
        assert_eq!(txn.currency, "USD");
        assert_eq!(txn.category, "Shopping");
        assert!(!txn.is_refund);
        assert!(txn.anomaly_flags.is_empty());
    }

    #[test]
    fn test_missing_category_is_inferred() {
        let p = NormalizationPipeline::default();
        let txn = p
            .normalize(&raw(3, "01/18/2023", "UBER *TRIP", "12.30", ""))
            .unwrap();
        assert_eq!(txn.normalized_merchant, "Uber");
        assert_eq!(txn.category, "Transportation");
    }

    #[test]
    fn test_unknown_merchant_without_category_is_uncategorized() {
        let p = NormalizationPipeline::default();
        let txn = p
            .normalize(&raw(4, "2023-02-12", "Unknown Merchant ABC", "67.89", ""))
            .unwrap();
        assert_eq!(txn.category, "Uncategorized");
    }

    #[test]
    fn test_refund_is_negative_and_marked() {
        let p = NormalizationPipeline::default();
        let txn = p
            .normalize(&raw(5, "2023-01-23", "Whole Foods", "-10.00", "Food"))
            .unwrap();
        assert_eq!(txn.amount, dec!(-10.00));
        assert!(txn.is_refund);
    }

    #[test]
    fn test_empty_date_fails_record() {
        let p = NormalizationPipeline::default();
        let err = p
            .normalize(&raw(6, "", "Spotify", "9.99", "Entertainment"))
            .unwrap_err();
        assert_eq!(err.row, 6);
        assert_eq!(err.field, FailureField::Date);
        assert_eq!(err.kind, ResolveError::Empty);
    }

    #[test]
    fn test_empty_amount_fails_record() {
        let p = NormalizationPipeline::default();
        let err = p
            .normalize(&raw(7, "2023-02-01", "Netflix", "", "Entertainment"))
            .unwrap_err();
        assert_eq!(err.field, FailureField::Amount);
        assert_eq!(err.kind, ResolveError::Empty);
        assert_eq!(err.value, "");
    }

    #[test]
    fn test_one_bad_record_never_aborts_the_batch() {
        let p = NormalizationPipeline::default();
        let records = vec![
            raw(2, "2023-01-15", "AMAZON.COM", "$45.99", "Shopping"),
            raw(3, "", "Spotify", "9.99", ""),
            raw(4, "2023-01-16", "Starbucks", "not-money", "Food"),
            raw(5, "Jan 17th, 2023", "UBER *TRIP", "$12.30", ""),
        ];
        let outcome = p.normalize_batch(&records);
        assert_eq!(outcome.transactions.len(), 2);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.total(), 4);
        assert_eq!(outcome.failures[0].row, 3);
        assert_eq!(outcome.failures[1].row, 4);
        assert_eq!(outcome.failures[1].kind, ResolveError::Unparseable);
    }

    #[test]
    fn test_equivalent_dates_normalize_identically() {
        let p = NormalizationPipeline::default();
        let a = p.normalize(&raw(2, "2023-01-18", "uber", "22.00", "")).unwrap();
        let b = p.normalize(&raw(3, "01/18/2023", "uber", "22.00", "")).unwrap();
        let c = p
            .normalize(&raw(4, "Jan 18th, 2023", "uber", "22.00", ""))
            .unwrap();
        assert_eq!(a.date, b.date);
        assert_eq!(b.date, c.date);
        assert_eq!(a.date.year(), 2023);
    }

    #[test]
    fn test_account_identifier_survives_the_pipeline() {
        let p = NormalizationPipeline::default();
        let txn = p
            .normalize(&raw(2, "2023-03-01", "C834976624", "120.00", ""))
            .unwrap();
        assert_eq!(txn.normalized_merchant, "C834976624");
        assert_eq!(txn.category, "Uncategorized");
    }
}
