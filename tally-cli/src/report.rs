//! Text rendering of the batch analysis: summary, breakdowns, anomalies,
//! risk.

use std::fmt::Write;

use tally_core::{
    BatchSummary, CleanTransaction, RiskAssessment, category_breakdown, merchant_breakdown,
};

const RULE: &str = "======================================================================";
const THIN: &str = "----------------------------------------------------------------------";

/// Render the full analysis report for one processed batch.
pub fn render(summary: &BatchSummary, risk: &RiskAssessment, transactions: &[CleanTransaction]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "FINANCIAL TRANSACTION ANALYSIS REPORT");
    let _ = writeln!(out, "{RULE}");

    let _ = writeln!(out, "\nTRANSACTION SUMMARY");
    let _ = writeln!(out, "{THIN}");
    let _ = writeln!(out, "Total transactions: {}", summary.total_transactions);
    let _ = writeln!(
        out,
        "Date range:         {} to {}",
        summary.date_range.0.date(),
        summary.date_range.1.date()
    );
    let _ = writeln!(
        out,
        "Merchants normalized: {}",
        summary.merchants_normalized
    );

    let _ = writeln!(out, "\nFINANCIAL SUMMARY");
    let _ = writeln!(out, "{THIN}");
    let _ = writeln!(out, "Total spending: ${:.2}", summary.total_spending);
    let _ = writeln!(out, "Total refunds:  ${:.2}", summary.total_refunds);
    let _ = writeln!(out, "Net spending:   ${:.2}", summary.net_spending);

    let _ = writeln!(out, "\nTOP SPENDING CATEGORY");
    let _ = writeln!(out, "{THIN}");
    let _ = writeln!(
        out,
        "{} (${:.2})",
        summary.top_category, summary.top_category_spending
    );

    let _ = writeln!(out, "\nSPENDING BY CATEGORY");
    let _ = writeln!(out, "{THIN}");
    for (category, amount) in category_breakdown(transactions).iter().take(5) {
        let amount = format!("{amount:.2}");
        let _ = writeln!(out, "{category:<30} ${amount:>12}");
    }

    let _ = writeln!(out, "\nTOP MERCHANTS");
    let _ = writeln!(out, "{THIN}");
    for (merchant, amount) in merchant_breakdown(transactions).iter().take(5) {
        let amount = format!("{amount:.2}");
        let _ = writeln!(out, "{merchant:<30} ${amount:>12}");
    }

    let _ = writeln!(out, "\nANOMALY DETECTION RESULTS");
    let _ = writeln!(out, "{THIN}");
    let _ = writeln!(out, "Anomalies detected: {}", summary.anomalies_detected);
    for txn in transactions.iter().filter(|t| t.is_anomaly()) {
        let _ = writeln!(
            out,
            "  {} | {} | ${:.2} | {}",
            txn.date.date(),
            txn.normalized_merchant,
            txn.amount,
            txn.anomaly_reason()
        );
    }

    let _ = writeln!(out, "\nRISK ASSESSMENT: {}", risk.risk_level);
    let _ = writeln!(out, "Risk score:   {}/100", risk.risk_score);
    let _ = writeln!(out, "Anomaly rate: {:.1}%", risk.anomaly_rate * 100.0);
    for factor in &risk.risk_factors {
        let _ = writeln!(out, "  - {factor}");
    }
    let _ = writeln!(out, "{RULE}");

    out
}
