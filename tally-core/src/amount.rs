//! Monetary amount resolution: currency detection, composable sign
//! notations, exact decimal parsing.
//!
//! All arithmetic is exact base-10 via [`rust_decimal::Decimal`]; binary
//! floats would drift at the cent level.

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{error, warn};

use crate::record::ResolveError;

/// Symbol table consulted in order; the first symbol found wins.
const CURRENCY_SYMBOLS: &[(char, &str)] = &[
    ('$', "USD"),
    ('€', "EUR"),
    ('£', "GBP"),
    ('¥', "JPY"),
    ('₹', "INR"),
];

pub const DEFAULT_CURRENCY: &str = "USD";

fn code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z]{3}\b").expect("invalid currency code regex"))
}

/// Successful amount resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAmount {
    /// Signed amount, rounded to exactly 2 decimal places.
    pub amount: Decimal,
    pub currency: String,
    /// Recomputed from the final signed value, so it always agrees with
    /// `amount`.
    pub is_negative: bool,
}

/// Parses free-form monetary text into an exact signed decimal plus a
/// currency code.
#[derive(Debug, Clone, Default)]
pub struct AmountResolver;

impl AmountResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `raw` in the fixed order: symbol, bare code, sign
    /// notations, separator stripping, decimal parse, sign application,
    /// rounding. The order matters because symbol, parenthesis and minus
    /// tokens can overlap.
    pub fn resolve(&self, raw: &str) -> Result<ResolvedAmount, ResolveError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            warn!("amount field is empty");
            return Err(ResolveError::Empty);
        }

        let mut text = trimmed.to_string();

        // 1. Currency symbol, first table hit wins.
        let mut currency: Option<String> = None;
        for &(symbol, code) in CURRENCY_SYMBOLS {
            if text.contains(symbol) {
                currency = Some(code.to_string());
                text = text.replace(symbol, "");
                break;
            }
        }

        // 2. A bare 3-letter code ("USD") overrides the symbol.
        let code = code_re()
            .find(&text)
            .map(|m| (m.range(), m.as_str().to_string()));
        if let Some((range, code)) = code {
            currency = Some(code);
            text.replace_range(range, "");
        }

        // 3. Sign notations are independent and composable: parentheses,
        // trailing minus, leading minus. Any indicator present means
        // negative; the sign is forced exactly once in step 6.
        let mut negative = false;
        let t = text.trim().to_string();
        text = if t.len() >= 2 && t.starts_with('(') && t.ends_with(')') {
            negative = true;
            t[1..t.len() - 1].to_string()
        } else {
            t
        };
        let t = text.trim_end().to_string();
        text = if let Some(stripped) = t.strip_suffix('-') {
            negative = true;
            stripped.to_string()
        } else {
            t
        };
        let t = text.trim_start().to_string();
        text = if let Some(stripped) = t.strip_prefix('-') {
            negative = true;
            stripped.to_string()
        } else {
            t
        };

        // 4. Interior whitespace and thousands separators.
        let cleaned: String = text
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .collect();

        // 5. Exact decimal parse. The currency is still reported on
        // failure for diagnostics.
        let parsed: Decimal = match cleaned.parse() {
            Ok(value) => value,
            Err(_) => {
                error!(value = %trimmed, currency = ?currency, "could not parse amount");
                return Err(ResolveError::Unparseable);
            }
        };

        // 6. Force the sign once (never double-negate), then round.
        let signed = if negative { -parsed.abs() } else { parsed };
        let amount = signed.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        Ok(ResolvedAmount {
            amount,
            currency: currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            is_negative: amount < Decimal::ZERO,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn resolve(raw: &str) -> ResolvedAmount {
        AmountResolver::new().resolve(raw).unwrap()
    }

    #[test]
    fn test_simple_dollar() {
        let r = resolve("$45.99");
        assert_eq!(r.amount, dec!(45.99));
        assert_eq!(r.currency, "USD");
        assert!(!r.is_negative);
    }

    #[test]
    fn test_no_symbol_defaults_to_usd() {
        let r = resolve("45.99");
        assert_eq!(r.amount, dec!(45.99));
        assert_eq!(r.currency, "USD");
    }

    #[test]
    fn test_interior_whitespace() {
        let r = resolve("  $ 45.99  ");
        assert_eq!(r.amount, dec!(45.99));
        assert_eq!(r.currency, "USD");
    }

    #[test]
    fn test_thousands_separators() {
        let r = resolve("$2,500.00");
        assert_eq!(r.amount, dec!(2500.00));
        assert_eq!(r.currency, "USD");
    }

    #[test]
    fn test_euro_and_gbp_symbols() {
        assert_eq!(resolve("€45.50").currency, "EUR");
        assert_eq!(resolve("€45.50").amount, dec!(45.50));
        assert_eq!(resolve("£67.80").currency, "GBP");
        assert_eq!(resolve("£67.80").amount, dec!(67.80));
    }

    #[test]
    fn test_bare_code_overrides_symbol() {
        let r = resolve("99.99 USD");
        assert_eq!(r.amount, dec!(99.99));
        assert_eq!(r.currency, "USD");

        // Code wins even when a symbol is also present.
        let r = resolve("€10.00 GBP");
        assert_eq!(r.currency, "GBP");
    }

    #[test]
    fn test_leading_minus() {
        let r = resolve("-45.99");
        assert_eq!(r.amount, dec!(-45.99));
        assert!(r.is_negative);
    }

    #[test]
    fn test_parentheses() {
        let r = resolve("($45.99)");
        assert_eq!(r.amount, dec!(-45.99));
        assert_eq!(r.currency, "USD");
        assert!(r.is_negative);

        // Parentheses without a symbol still default to USD.
        let r = resolve("(50.00)");
        assert_eq!(r.amount, dec!(-50.00));
        assert_eq!(r.currency, "USD");
        assert!(r.is_negative);
    }

    #[test]
    fn test_trailing_minus() {
        let r = resolve("45.00-");
        assert_eq!(r.amount, dec!(-45.00));
        assert!(r.is_negative);
    }

    #[test]
    fn test_conflicting_sign_indicators_negate_once() {
        // Leading and trailing minus together still mean a single negation.
        let r = resolve("-45.99-");
        assert_eq!(r.amount, dec!(-45.99));

        // An already-negative value inside parentheses is not double-negated.
        let r = resolve("(-50.00)");
        assert_eq!(r.amount, dec!(-50.00));
    }

    #[test]
    fn test_negative_with_symbol_and_commas() {
        let r = resolve("-$5,000.00");
        assert_eq!(r.amount, dec!(-5000.00));
        assert!(r.is_negative);
    }

    #[test]
    fn test_rounding_is_midpoint_away_from_zero() {
        assert_eq!(resolve("2.345").amount, dec!(2.35));
        assert_eq!(resolve("2.344").amount, dec!(2.34));
        assert_eq!(resolve("(2.345)").amount, dec!(-2.35));
    }

    #[test]
    fn test_empty_is_reported_as_empty() {
        let r = AmountResolver::new();
        assert_eq!(r.resolve(""), Err(ResolveError::Empty));
        assert_eq!(r.resolve("   "), Err(ResolveError::Empty));
    }

    #[test]
    fn test_mixed_text_is_unparseable() {
        let r = AmountResolver::new();
        assert_eq!(
            r.resolve("crushing it: $45.99"),
            Err(ResolveError::Unparseable)
        );
    }
}
