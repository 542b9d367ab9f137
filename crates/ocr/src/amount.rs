use std::cmp::Reverse;

use cupom_core::{Confidence, MagnitudeWindow, Money};

use crate::tokens::NumericCandidate;

/// Picks the single most plausible receipt total from a set of candidates.
///
/// Priority: largest keyword-line value inside the magnitude window (`High`),
/// else largest value inside the window (`Low`), else nothing (`None`).
#[derive(Debug, Clone, Default)]
pub struct AmountResolver {
    window: MagnitudeWindow,
}

impl AmountResolver {
    pub fn new(window: MagnitudeWindow) -> Self {
        Self { window }
    }

    /// Amount and confidence; `(0, None)` when no candidate is plausible.
    pub fn resolve(&self, candidates: &[NumericCandidate]) -> (Money, Confidence) {
        match self.select(candidates) {
            Some((winner, confidence)) => (Money::from_decimal(winner.value), confidence),
            None => (Money::zero(), Confidence::None),
        }
    }

    /// The winning candidate itself, for callers that want to show where the
    /// amount came from.
    pub fn select<'a>(
        &self,
        candidates: &'a [NumericCandidate],
    ) -> Option<(&'a NumericCandidate, Confidence)> {
        let plausible: Vec<&NumericCandidate> =
            candidates.iter().filter(|c| self.window.contains(c.value)).collect();

        if let Some(best) = largest(plausible.iter().copied().filter(|c| c.keyword)) {
            return Some((best, Confidence::High));
        }
        largest(plausible.into_iter()).map(|best| (best, Confidence::Low))
    }
}

/// Maximum value; equal maxima resolve to the lowest `line_index`, then to
/// the earliest position in the input.
fn largest<'a>(
    candidates: impl Iterator<Item = &'a NumericCandidate>,
) -> Option<&'a NumericCandidate> {
    candidates
        .enumerate()
        .max_by_key(|(pos, c)| (c.value, Reverse(c.line_index), Reverse(*pos)))
        .map(|(_, c)| c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::TokenExtractor;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn resolve_text(text: &str) -> (Money, Confidence) {
        let scan = TokenExtractor::default().extract(text);
        AmountResolver::default().resolve(&scan.candidates)
    }

    fn money(s: &str) -> Money {
        Money::from_decimal(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn keyword_max_beats_larger_plain_value() {
        let (amount, confidence) = resolve_text("ARROZ 12,50\nTOTAL: 45,00\nFEIJAO 3,20\nCOD 99,90");
        assert_eq!(amount, money("45.00"));
        assert_eq!(confidence, Confidence::High);
    }

    #[test]
    fn keyword_group_takes_its_maximum() {
        let (amount, confidence) =
            resolve_text("SUBTOTAL 40,00\nDESCONTO 2,00\nTOTAL 38,00\nVALOR RECEBIDO 50,00");
        assert_eq!(amount, money("50.00"));
        assert_eq!(confidence, Confidence::High);
    }

    #[test]
    fn falls_back_to_largest_plain_value() {
        let (amount, confidence) = resolve_text("PADARIA\n5,00\n3,00\n8,00");
        assert_eq!(amount, money("8.00"));
        assert_eq!(confidence, Confidence::Low);
    }

    #[test]
    fn ceiling_excludes_huge_values() {
        let (amount, confidence) = resolve_text("TOTAL 123456,78\nPAO 4,50");
        assert_eq!(amount, money("4.50"));
        assert_eq!(confidence, Confidence::Low);
    }

    #[test]
    fn floor_excludes_tiny_values() {
        let (amount, confidence) = resolve_text("TOTAL 0,10\nTROCO 0,50");
        assert!(amount.is_zero());
        assert_eq!(confidence, Confidence::None);
    }

    #[test]
    fn window_edges() {
        let (amount, _) = resolve_text("TOTAL 50.000,00");
        assert_eq!(amount, money("50000.00"));
        let (amount, confidence) = resolve_text("TOTAL 50.000,01");
        assert!(amount.is_zero());
        assert_eq!(confidence, Confidence::None);
    }

    #[test]
    fn tie_resolves_to_earliest_line() {
        let scan = TokenExtractor::default().extract("LOJA\nTOTAL 30,00\nITEM\nVALOR PAGO 30,00");
        let (winner, confidence) = AmountResolver::default().select(&scan.candidates).unwrap();
        assert_eq!(winner.line_index, 1);
        assert_eq!(winner.source_line, "TOTAL 30,00");
        assert_eq!(confidence, Confidence::High);
    }

    #[test]
    fn tie_on_same_line_resolves_to_first_token() {
        let scan = TokenExtractor::default().extract("CAFE 7,00 7,00");
        let first: *const NumericCandidate = &scan.candidates[0];
        let (winner, _) = AmountResolver::default().select(&scan.candidates).unwrap();
        assert!(std::ptr::eq(winner, first));
    }

    #[test]
    fn no_candidates_is_none() {
        let (amount, confidence) = AmountResolver::default().resolve(&[]);
        assert!(amount.is_zero());
        assert_eq!(confidence, Confidence::None);
    }

    #[test]
    fn custom_window() {
        let resolver = AmountResolver::new(MagnitudeWindow::new(
            Decimal::from_str("10.00").unwrap(),
            Decimal::from_str("100.00").unwrap(),
        ));
        let scan = TokenExtractor::default().extract("A 5,00\nB 150,00\nC 60,00");
        let (amount, confidence) = resolver.resolve(&scan.candidates);
        assert_eq!(amount, money("60.00"));
        assert_eq!(confidence, Confidence::Low);
    }
}
