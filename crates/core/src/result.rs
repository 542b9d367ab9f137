use serde::{Deserialize, Serialize};

use crate::money::Money;

/// How much the caller should trust an extracted amount before asking the
/// user to confirm it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Nothing usable was found; the caller should ask for manual entry.
    #[default]
    None,
    /// Largest plausible figure, but no keyword line backed it.
    Low,
    /// Taken from a line carrying a total/value keyword.
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::None => write!(f, "none"),
            Confidence::Low => write!(f, "low"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// The only structure handed back to callers of the extraction engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ExtractionResult {
    /// Prefill suggestion for the transaction label. May be empty.
    pub description: String,
    /// Zero means "not found".
    pub amount: Money,
    pub confidence: Confidence,
}

impl ExtractionResult {
    pub fn new(description: impl Into<String>, amount: Money, confidence: Confidence) -> Self {
        Self { description: description.into(), amount, confidence }
    }

    /// The degraded result returned whenever extraction cannot proceed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// False for the empty result; the CLI uses it to prompt manual entry.
    pub fn has_amount(&self) -> bool {
        self.confidence != Confidence::None && !self.amount.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_display_matches_serde_names() {
        for c in [Confidence::None, Confidence::Low, Confidence::High] {
            let json = serde_json::to_string(&c).unwrap();
            assert_eq!(json, format!("\"{c}\""));
        }
    }

    #[test]
    fn confidence_orders_by_trust() {
        assert!(Confidence::High > Confidence::Low);
        assert!(Confidence::Low > Confidence::None);
    }

    #[test]
    fn empty_result_is_zero_and_none() {
        let r = ExtractionResult::empty();
        assert_eq!(r.description, "");
        assert!(r.amount.is_zero());
        assert_eq!(r.confidence, Confidence::None);
        assert!(!r.has_amount());
    }

    #[test]
    fn serializes_to_json() {
        let r = ExtractionResult::new("MERCADO BOM", Money::from_cents(4500), Confidence::High);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["description"], "MERCADO BOM");
        assert_eq!(json["amount"], "45.00");
        assert_eq!(json["confidence"], "high");
    }
}
