use super::Card;

/// Given some cards create every group of `num_cards` of them.
///
/// Used by the evaluator to find the best five cards out of six or seven.
#[derive(Debug)]
pub struct CardIter<'a> {
    /// All the possible cards that can be picked
    possible_cards: &'a [Card],

    /// Set of current offsets being used to create card sets.
    idx: Vec<usize>,

    /// size of card sets requested.
    num_cards: usize,
}

impl CardIter<'_> {
    /// Create a new `CardIter` from a slice of cards.
    /// `num_cards` represents how many cards should be in each yielded group.
    pub fn new(possible_cards: &[Card], num_cards: usize) -> CardIter<'_> {
        let mut idx: Vec<usize> = (0..num_cards).collect();
        if num_cards > 1 {
            idx[num_cards - 1] -= 1;
        }
        CardIter {
            possible_cards,
            idx,
            num_cards,
        }
    }
}

impl Iterator for CardIter<'_> {
    type Item = Vec<Card>;

    fn next(&mut self) -> Option<Vec<Card>> {
        if self.num_cards == 0 {
            return None;
        }
        // With a single card `new` can't pre-decrement the last offset
        // without underflowing, so walk the slice directly.
        if self.num_cards == 1 {
            let c = self.possible_cards.get(self.idx[0]).copied()?;
            self.idx[0] += 1;
            return Some(vec![c]);
        }
        // Keep track of where we are mutating
        let mut current_level: usize = self.num_cards - 1;

        while current_level < self.num_cards {
            // Move the current level forward one.
            self.idx[current_level] += 1;

            // If moving this level forward leaves too few cards to fill the
            // rest of the group, back up a level.
            let cards_needed_after = self.num_cards - (current_level + 1);
            if self.idx[current_level] + cards_needed_after >= self.possible_cards.len() {
                if current_level == 0 {
                    return None;
                }
                current_level -= 1;
            } else {
                if current_level < self.num_cards - 1 {
                    self.idx[current_level + 1] = self.idx[current_level];
                }
                current_level += 1;
            }
        }

        Some(self.idx.iter().map(|&i| self.possible_cards[i]).collect())
    }
}
