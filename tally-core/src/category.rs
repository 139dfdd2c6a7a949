//! Spending-category inference from merchant identity.
//!
//! A category supplied upstream always passes through untouched. Inference
//! walks an ordered category → keyword table; the first category with a
//! matching keyword wins, so table order is the documented tie-break:
//! Food, Transportation, Shopping, Entertainment, Health, Technology,
//! Housing, Income.

pub const UNCATEGORIZED: &str = "Uncategorized";

const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Food",
        &[
            "uber eats", "doordash", "grubhub", "starbucks", "mcdonald", "chipotle",
            "whole foods", "trader joe", "restaurant", "cafe", "café", "taco", "pizza",
            "deli", "bakery", "grill", "grocery", "food",
        ],
    ),
    (
        "Transportation",
        &[
            "uber", "lyft", "shell", "chevron", "exxon", "gas", "airlines", "delta",
            "united", "transit", "parking", "rent-a-car",
        ],
    ),
    (
        "Shopping",
        &[
            "amazon", "walmart", "target", "costco", "h&m", "ebay", "etsy", "store",
            "market",
        ],
    ),
    (
        "Entertainment",
        &["netflix", "spotify", "hulu", "cinema", "theater", "concert"],
    ),
    (
        "Health",
        &["cvs", "walgreens", "pharmacy", "gym", "fitness", "dental", "medical"],
    ),
    (
        "Technology",
        &["apple", "microsoft", "google", "github", "adobe", "aws"],
    ),
    ("Housing", &["rent", "mortgage", "lease", "apartment", "landlord"]),
    ("Income", &["salary", "payroll", "paycheck", "deposit"]),
];

/// Derives a category from the merchant's display name when none was
/// supplied upstream.
#[derive(Debug, Clone)]
pub struct CategoryInferencer {
    table: Vec<(String, Vec<String>)>,
}

impl Default for CategoryInferencer {
    fn default() -> Self {
        let table = CATEGORY_KEYWORDS
            .iter()
            .map(|&(category, keywords)| {
                (
                    category.to_string(),
                    keywords.iter().map(|k| k.to_string()).collect(),
                )
            })
            .collect();
        Self { table }
    }
}

impl CategoryInferencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the keyword table, preserving the given order.
    pub fn with_table(table: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        Self {
            table: table.into_iter().collect(),
        }
    }

    /// A non-empty supplied category is passed through trimmed, never
    /// overridden. Otherwise the merchant name is matched against the
    /// keyword table, falling back to "Uncategorized".
    pub fn infer(&self, merchant: &str, supplied: &str) -> String {
        let supplied = supplied.trim();
        if !supplied.is_empty() {
            return supplied.to_string();
        }

        let name = merchant.to_lowercase();
        for (category, keywords) in &self.table {
            if keywords.iter().any(|k| name.contains(k.as_str())) {
                return category.clone();
            }
        }
        UNCATEGORIZED.to_string()
    }
}
