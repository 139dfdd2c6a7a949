//! Free-form date resolution.
//!
//! Accepts ISO, US, EU-ordered, dotted and natural-language forms, plus a
//! token-extraction fallback for dates embedded in surrounding noise.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::record::ResolveError;

/// Inclusive year window; parses landing outside it are treated as
/// unresolved. Guards against misparsed two-digit years and corrupted
/// tokens being silently accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearWindow {
    pub min: i32,
    pub max: i32,
}

impl Default for YearWindow {
    fn default() -> Self {
        Self {
            min: 2000,
            max: 2030,
        }
    }
}

impl YearWindow {
    pub fn contains(&self, year: i32) -> bool {
        year >= self.min && year <= self.max
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M",
];

// Ambiguous dashed numeric dates are tried month-first, matching the
// upstream convention for rows like "02-07-2023".
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y.%m.%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d-%b-%y",
    "%d-%b-%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

fn ordinal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})(?:st|nd|rd|th)\b").expect("invalid ordinal regex"))
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"\d{4}[-./]\d{1,2}[-./]\d{1,2}",
            r"|\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4}",
            r"|\d{1,2}-[A-Za-z]{3,9}-\d{2,4}",
            r"|[A-Za-z]{3,9} \d{1,2}(?:st|nd|rd|th)?,? \d{4}",
        ))
        .expect("invalid date token regex")
    })
}

/// Resolves free-form date strings into canonical timestamps.
/// Never panics and never errors out of the batch: every outcome is
/// success-with-value or unresolved-with-reason.
#[derive(Debug, Clone)]
pub struct DateResolver {
    window: YearWindow,
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new(YearWindow::default())
    }
}

impl DateResolver {
    pub fn new(window: YearWindow) -> Self {
        Self { window }
    }

    /// Attempt flexible parsing of `raw`. Empty input is a warning, any
    /// other failure an error; both resolve to `Err`, never a panic.
    ///
    /// Formats are tried in a fixed priority order; an interpretation
    /// whose year falls outside the sanity window is passed over in favor
    /// of a later in-window one (so "2/8/23" resolves as month-first 2023
    /// rather than year 2). Only when every interpretation is out of
    /// window is the value rejected as such.
    pub fn resolve(&self, raw: &str) -> Result<NaiveDateTime, ResolveError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            warn!("date field is empty");
            return Err(ResolveError::Empty);
        }

        let mut saw_out_of_window = false;
        for parsed in parse_interpretations(trimmed) {
            if self.window.contains(parsed.year()) {
                return Ok(parsed);
            }
            saw_out_of_window = true;
        }

        // Fuzzy fallback: pull a date-shaped token out of surrounding noise.
        if let Some(m) = token_re().find(trimmed) {
            for parsed in parse_interpretations(m.as_str()) {
                if self.window.contains(parsed.year()) {
                    return Ok(parsed);
                }
                saw_out_of_window = true;
            }
        }

        if saw_out_of_window {
            error!(value = %trimmed, "parsed year outside sanity window");
            Err(ResolveError::OutOfWindow)
        } else {
            error!(value = %trimmed, "could not parse date");
            Err(ResolveError::Unparseable)
        }
    }
}

/// Every format interpretation of `text`, in priority order.
fn parse_interpretations(text: &str) -> Vec<NaiveDateTime> {
    let mut out = Vec::new();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            out.push(dt);
        }
    }
    // Ordinal suffixes ("Jan 17th, 2023") are stripped before the
    // date-only formats run.
    let cleaned = ordinal_re().replace_all(text, "$1");
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&cleaned, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                out.push(dt);
            }
        }
    }
    out
}
