//! End-to-end pass over the documented messy sample batch: fifteen rows
//! spanning date formats, currencies, merchant variants, refunds, and one
//! oversized rent payment that must come out flagged.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tally_core::{
    AnalyzerConfig, AnomalyEngine, DatasetProfiler, NormalizationPipeline, RawRecord, assess_risk,
    summarize,
};

fn record(row: usize, date: &str, merchant: &str, amount: &str, category: &str) -> RawRecord {
    RawRecord {
        row,
        date: date.to_string(),
        merchant: merchant.to_string(),
        amount: amount.to_string(),
        category: category.to_string(),
    }
}

fn messy_batch() -> Vec<RawRecord> {
    vec![
        record(2, "2023-01-15", "AMAZON.COM", "$45.99", "Shopping"),
        record(3, "2023-01-16", "Starbucks", "5.50", "Food"),
        record(4, "Jan 17th, 2023", "UBER *TRIP", "$12.30", "Transportation"),
        record(5, "01/18/2023", "Uber Technologies", "USD 15.75", "Transportation"),
        record(6, "2023.01.19", "UBER EATS", "  $28.50  ", "Food"),
        record(7, "18-Jan-23", "uber", "22.00", "Transportation"),
        record(8, "2023-01-20", "AMZN Mktp US*2X3Y4Z", "$67.89", "Shopping"),
        record(9, "2023-01-22", "AMZ*Amazon.com", "$ 123.45", "Shopping"),
        record(10, "2023-01-23", "Whole Foods", "-10.00", "Food"),
        record(11, "2023-01-24", "Target", "€45.50", "Shopping"),
        record(12, "2023-02-02", "  WAL-MART  ", "  $ 156.78  ", "Shopping"),
        record(13, "2023-02-03", "walmart.com", "89.99", "Shopping"),
        record(14, "2023-02-04", "WALMART SUPERCENTER", "$234.56", "Shopping"),
        record(15, "2023-02-05", "RENT PAYMENT", "$2,500.00", "Housing"),
        record(16, "2023-02-14", "Restaurant Deluxe", "($50.00)", "Food"),
    ]
}

fn process() -> Vec<tally_core::CleanTransaction> {
    let pipeline = NormalizationPipeline::default();
    let outcome = pipeline.normalize_batch(&messy_batch());
    assert!(outcome.failures.is_empty(), "sample batch has no bad rows");

    let mut transactions = outcome.transactions;
    let config = AnalyzerConfig::default();
    let profile = DatasetProfiler::new(&config).profile(&transactions);
    AnomalyEngine::new(config).annotate(&mut transactions, &profile);
    transactions
}

#[test]
fn test_merchant_variants_reduce_to_canonical_forms() {
    let txns = process();
    let canonical: Vec<&str> = txns.iter().map(|t| t.normalized_merchant.as_str()).collect();
    assert_eq!(
        canonical,
        vec![
            "Amazon",
            "Starbucks",
            "Uber",
            "Uber",
            "Uber Eats",
            "Uber",
            "Amazon",
            "Amazon",
            "Whole Foods",
            "Target",
            "Walmart",
            "Walmart",
            "Walmart",
            "Rent Payment",
            "Restaurant Deluxe",
        ]
    );
}

#[test]
fn test_date_formats_converge() {
    let txns = process();
    assert_eq!(txns[2].date.date(), NaiveDate::from_ymd_opt(2023, 1, 17).unwrap());
    assert_eq!(txns[3].date.date(), NaiveDate::from_ymd_opt(2023, 1, 18).unwrap());
    assert_eq!(txns[4].date.date(), NaiveDate::from_ymd_opt(2023, 1, 19).unwrap());
    assert_eq!(txns[5].date.date(), NaiveDate::from_ymd_opt(2023, 1, 18).unwrap());
}

#[test]
fn test_currencies_and_signs() {
    let txns = process();
    assert_eq!(txns[10].amount, dec!(156.78));
    assert_eq!(txns[9].currency, "EUR");
    assert_eq!(txns[3].currency, "USD");

    let refund = &txns[14];
    assert_eq!(refund.amount, dec!(-50.00));
    assert!(refund.is_refund);

    let whole_foods = &txns[8];
    assert_eq!(whole_foods.amount, dec!(-10.00));
    assert!(whole_foods.is_refund);
}

#[test]
fn test_rent_payment_is_the_only_anomaly() {
    let txns = process();
    let rent = txns
        .iter()
        .find(|t| t.merchant_name == "RENT PAYMENT")
        .unwrap();
    assert!(rent.is_anomaly());
    assert_eq!(rent.amount, dec!(2500.00));

    // Flagged by both the statistical and the policy detector.
    let reason = rent.anomaly_reason();
    assert!(reason.contains("standard deviations"), "reason: {reason}");
    assert!(reason.contains("Large purchase"), "reason: {reason}");

    for txn in txns.iter().filter(|t| t.merchant_name != "RENT PAYMENT") {
        assert!(!txn.is_anomaly(), "unexpected flag: {}", txn.anomaly_reason());
    }
}

#[test]
fn test_summary_over_sample_batch() {
    let txns = process();
    let summary = summarize(&txns).unwrap();
    assert_eq!(summary.total_transactions, 15);
    assert_eq!(summary.anomalies_detected, 1);
    assert_eq!(summary.total_refunds, dec!(60.00));
    assert_eq!(summary.top_category, "Housing");
    assert_eq!(summary.top_category_spending, dec!(2500.00));
    assert!(summary.merchants_normalized >= 6);

    let risk = assess_risk(&txns);
    assert!(risk.risk_score > 0);
    assert_eq!(risk.total_anomalies, 1);
}
