//! Numeric token extraction over recognized receipt text.
//!
//! A token is a maximal run of digits and `.`/`,` separators that starts and
//! ends on a digit, and it must match the two-decimal money grammar in full.
//! Runs that only contain a valid prefix produce nothing: `12,505` is not read
//! as `12,50`, and a date such as `15.01.2024` yields no candidate at all.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use cupom_core::DEFAULT_KEYWORDS;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// A maximal run of digits and separators, starting and ending on a digit.
re!(re_number_run, r"\d[\d.,]*\d");
// Plain `12,50` or thousands-grouped `1.234,56` / `1,234.56`.
re!(re_money_token,
    r"^(?:\d+[.,]\d{2}|\d{1,3}(?:[.,]\d{3})+[.,]\d{2})$");

/// Lines at or below this many characters (after trimming) carry no description.
const MIN_LINE_CHARS: usize = 3;

/// A monetary-looking token found in recognized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericCandidate {
    pub raw_token: String,
    /// Normalized, always non-negative.
    pub value: Decimal,
    pub source_line: String,
    /// Zero-based index of `source_line` in the recognized text.
    pub line_index: usize,
    /// Whether `source_line` carries one of the value keywords.
    pub keyword: bool,
}

/// Everything the resolvers need from one block of recognized text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenScan {
    pub candidates: Vec<NumericCandidate>,
    /// Trimmed lines longer than three characters, in original order.
    pub lines: Vec<String>,
}

pub struct TokenExtractor {
    /// Lower-cased once at construction.
    keywords: Vec<String>,
}

impl Default for TokenExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}

impl TokenExtractor {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// Case-insensitive substring match against the keyword set.
    pub fn is_keyword_line(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    /// Scan recognized text line by line. Malformed tokens are skipped.
    pub fn extract(&self, text: &str) -> TokenScan {
        let mut scan = TokenScan::default();

        for (line_index, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.chars().count() > MIN_LINE_CHARS {
                scan.lines.push(line.to_string());
            }

            let mut line_keyword = None;
            for m in re_number_run().find_iter(line) {
                let Some(value) = normalize_token(m.as_str()) else {
                    continue;
                };
                let keyword = *line_keyword.get_or_insert_with(|| self.is_keyword_line(line));
                scan.candidates.push(NumericCandidate {
                    raw_token: m.as_str().to_string(),
                    value,
                    source_line: line.to_string(),
                    line_index,
                    keyword,
                });
            }
        }

        scan
    }
}

/// Convert a token such as `1.234,56` or `12.50` to a decimal.
///
/// The last separator is the decimal point; any earlier ones are thousands
/// separators and are dropped. Returns `None` for anything outside the
/// "digits, separator, exactly two digits" grammar.
pub fn normalize_token(token: &str) -> Option<Decimal> {
    if !re_money_token().is_match(token) {
        return None;
    }
    let split = token.rfind(['.', ','])?;
    let int_part: String = token[..split].chars().filter(char::is_ascii_digit).collect();
    let frac_part = &token[split + 1..];
    Decimal::from_str(&format!("{int_part}.{frac_part}")).ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
