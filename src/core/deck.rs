use rand::Rng;

use super::Card;

/// The undealt cards of a hand.
///
/// Dealing removes a uniformly random card, so there is no need to shuffle
/// up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Default for Deck {
    fn default() -> Self {
        Deck {
            cards: (0..52).filter_map(Card::from_index).collect(),
        }
    }
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    /// A full deck minus the cards already in play.
    pub fn without(used: &[Card]) -> Self {
        let mut deck = Deck::default();
        deck.cards.retain(|c| !used.contains(c));
        deck
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains(card)
    }

    /// Remove and return one random card.
    pub fn deal<R: Rng>(&mut self, rng: &mut R) -> Option<Card> {
        if self.cards.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..self.cards.len());
        Some(self.cards.swap_remove(idx))
    }

    /// Deal `n` cards, or `None` if the deck runs dry.
    pub fn deal_n<R: Rng>(&mut self, rng: &mut R, n: usize) -> Option<Vec<Card>> {
        (0..n).map(|_| self.deal(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_full_deck() {
        let deck = Deck::new();
        assert_eq!(52, deck.len());
    }

    #[test]
    fn test_without() {
        let used = Card::parse_many("AsKd").unwrap();
        let deck = Deck::without(&used);
        assert_eq!(50, deck.len());
        assert!(!deck.contains(&used[0]));
    }

    #[test]
    fn test_deal_unique() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut deck = Deck::new();
        let mut dealt = deck.deal_n(&mut rng, 52).unwrap();
        assert!(deck.is_empty());
        dealt.sort();
        dealt.dedup();
        assert_eq!(52, dealt.len());
        assert!(deck.deal(&mut rng).is_none());
    }
}
