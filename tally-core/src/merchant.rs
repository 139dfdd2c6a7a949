//! Merchant identity resolution.
//!
//! Order of attack: account-identifier passthrough, cleaning, exact
//! fragment matching, token-set fuzzy fallback, title-case fallback.
//! Every input resolves to some display name; the resolver has no failure
//! path and no mutable state, so repeated calls always agree.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

pub const UNKNOWN_MERCHANT: &str = "Unknown Merchant";

pub const DEFAULT_FUZZY_CUTOFF: f64 = 75.0;

/// Ordered fragment → canonical display name mapping. First match wins,
/// so more specific fragments sort before their prefixes ("uber eats"
/// before "uber"). Many fragments may map to one canonical name.
const MERCHANT_FRAGMENTS: &[(&str, &str)] = &[
    ("uber eats", "Uber Eats"),
    ("uber", "Uber"),
    ("lyft", "Lyft"),
    ("amazon", "Amazon"),
    ("amzn", "Amazon"),
    ("amz", "Amazon"),
    ("wal-mart", "Walmart"),
    ("walmart", "Walmart"),
    ("whole foods", "Whole Foods"),
    ("trader joe", "Trader Joe's"),
    ("starbucks", "Starbucks"),
    ("mcdonald", "McDonald's"),
    ("chipotle", "Chipotle"),
    ("cvs", "CVS Pharmacy"),
    ("walgreens", "Walgreens"),
    ("target", "Target"),
    ("costco", "Costco"),
    ("h&m", "H&M"),
    ("netflix", "Netflix"),
    ("spotify", "Spotify"),
    ("apple", "Apple"),
    ("shell", "Shell"),
    ("chevron", "Chevron"),
    ("delta air", "Delta Airlines"),
    ("hilton", "Hilton Hotels"),
];

// Structured account references: one letter from {C, M} then 8-10 digits.
// These denote ledger accounts, not business names, and must never be
// cleaned, fuzzy-matched or title-cased.
fn account_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[CM]\d{8,10}$").expect("invalid account id regex"))
}

// Processor-appended transaction reference codes: "*TRIP", "*2X3Y4Z",
// "#4512".
fn ref_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\S+|#\d+").expect("invalid ref code regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid whitespace regex"))
}

/// Token-order-insensitive similarity in [0, 100].
///
/// Token-set comparison: the shared tokens are compared against each
/// side's remainder, so a short canonical key scores 100 against a longer
/// raw string that contains all of its tokens ("uber" vs
/// "uber technologies").
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let shared = tokens_a
        .intersection(&tokens_b)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let only_a = tokens_a
        .difference(&tokens_b)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let only_b = tokens_b
        .difference(&tokens_a)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    let combine = |base: &str, rest: &str| -> String {
        if base.is_empty() {
            rest.to_string()
        } else if rest.is_empty() {
            base.to_string()
        } else {
            format!("{base} {rest}")
        }
    };
    let combo_a = combine(&shared, &only_a);
    let combo_b = combine(&shared, &only_b);

    let ratio = |x: &str, y: &str| -> f64 {
        if x.is_empty() && y.is_empty() {
            return 0.0;
        }
        strsim::normalized_levenshtein(x, y) * 100.0
    };

    ratio(&shared, &combo_a)
        .max(ratio(&shared, &combo_b))
        .max(ratio(&combo_a, &combo_b))
}

/// Maps free-form merchant text to a canonical identity.
#[derive(Debug, Clone)]
pub struct MerchantResolver {
    fragments: Vec<(String, String)>,
    fuzzy_cutoff: f64,
}

impl Default for MerchantResolver {
    fn default() -> Self {
        Self::new(DEFAULT_FUZZY_CUTOFF)
    }
}

impl MerchantResolver {
    pub fn new(fuzzy_cutoff: f64) -> Self {
        let fragments = MERCHANT_FRAGMENTS
            .iter()
            .map(|&(frag, canon)| (frag.to_string(), canon.to_string()))
            .collect();
        Self {
            fragments,
            fuzzy_cutoff,
        }
    }

    /// Replace the curated mapping, preserving the given order.
    pub fn with_fragments(
        fragments: impl IntoIterator<Item = (String, String)>,
        fuzzy_cutoff: f64,
    ) -> Self {
        Self {
            fragments: fragments.into_iter().collect(),
            fuzzy_cutoff,
        }
    }

    pub fn resolve(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return UNKNOWN_MERCHANT.to_string();
        }

        // Account identifiers bypass all cleaning and matching.
        if account_re().is_match(trimmed) {
            return trimmed.to_string();
        }

        let cleaned = clean(trimmed);
        if cleaned.is_empty() {
            return UNKNOWN_MERCHANT.to_string();
        }

        // Exact substring match against the curated mapping, in order.
        for (fragment, canonical) in &self.fragments {
            if cleaned.contains(fragment.as_str()) {
                return canonical.clone();
            }
        }

        // Fuzzy fallback: best-scoring fragment, first listed wins ties.
        let mut best: Option<(&str, f64)> = None;
        for (fragment, canonical) in &self.fragments {
            let score = token_set_ratio(&cleaned, fragment);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((canonical, score));
            }
        }
        if let Some((canonical, score)) = best {
            if score >= self.fuzzy_cutoff {
                debug!(merchant = %cleaned, %canonical, score, "fuzzy merchant match");
                return canonical.to_string();
            }
        }

        // Guaranteed fallback: a presentable title-cased form of the
        // cleaned text, never raw noise.
        title_case(&cleaned)
    }
}

/// Lowercase, strip processor reference codes, collapse whitespace.
fn clean(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped = ref_code_re().replace_all(&lowered, " ");
    whitespace_re()
        .replace_all(stripped.trim(), " ")
        .to_string()
}

/// Capitalize the first character of each whitespace-delimited word.
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
