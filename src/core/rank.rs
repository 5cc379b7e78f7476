use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::card::{Card, MIN_RANK};
use super::card_iter::CardIter;

/// Radix used to pack kicker ranks. Ranks run 2..=14 so every rank fits in
/// a single base-15 digit.
const RADIX: u32 = 15;
/// Width of one category band: five base-15 digits.
const BAND: u32 = RADIX * RADIX * RADIX * RADIX * RADIX;

/// All the different hand categories, weakest first.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandCategory {
    /// No matches
    HighCard = 0,
    /// One card matches another.
    OnePair = 1,
    /// Two different pair of matching cards.
    TwoPair = 2,
    /// Three of the same value.
    ThreeOfAKind = 3,
    /// Five cards in a sequence
    Straight = 4,
    /// Five cards of the same suit
    Flush = 5,
    /// Three of one value and two of another value
    FullHouse = 6,
    /// Four of the same value.
    FourOfAKind = 7,
    /// Five cards in a sequence all for the same suit.
    StraightFlush = 8,
}

impl HandCategory {
    const ALL: [HandCategory; 9] = [
        HandCategory::HighCard,
        HandCategory::OnePair,
        HandCategory::TwoPair,
        HandCategory::ThreeOfAKind,
        HandCategory::Straight,
        HandCategory::Flush,
        HandCategory::FullHouse,
        HandCategory::FourOfAKind,
        HandCategory::StraightFlush,
    ];
}

/// A totally ordered hand strength; higher wins.
///
/// The value is `category * 15^5 + kickers`, where the kickers are the
/// deciding ranks packed most-significant first in base 15. Two scores in the
/// same band therefore compare by kicker without re-deriving the category.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct StrengthScore(pub u32);

impl StrengthScore {
    fn pack(category: HandCategory, ranks: &[u8]) -> Self {
        let kickers = (0..5).fold(0u32, |acc, i| {
            acc * RADIX + ranks.get(i).copied().unwrap_or(0) as u32
        });
        StrengthScore(category as u32 * BAND + kickers)
    }

    pub fn category(&self) -> HandCategory {
        let band = (self.0 / BAND) as usize;
        HandCategory::ALL[band.min(HandCategory::ALL.len() - 1)]
    }

    /// The packed kicker ranks, most significant first. Unused trailing slots
    /// are zero.
    pub fn kickers(&self) -> [u8; 5] {
        let mut rest = self.0 % BAND;
        let mut out = [0u8; 5];
        for slot in out.iter_mut().rev() {
            *slot = (rest % RADIX) as u8;
            rest /= RADIX;
        }
        out
    }
}

impl fmt::Display for StrengthScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.category(), self.0 % BAND)
    }
}

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum EvalError {
    #[error("need five to seven cards, got {0}")]
    WrongCardCount(usize),
    #[error("card {0} appears twice")]
    DuplicateCard(Card),
    #[error("card {0} has a rank outside 2..=14")]
    InvalidRank(Card),
}

/// Bit mask for the wheel (Ace, two, three, four, five)
const WHEEL: u32 = 0b1_0000_0000_1111;

/// Given a bitset of ranks (bit 0 is the deuce) determine if there's a
/// straight and return its high card rank. The wheel plays as five high.
fn straight_high(value_set: u32) -> Option<u8> {
    // Five ones in a row survive the shifted ands; anything shorter is
    // wiped out.
    let left =
        value_set & (value_set << 1) & (value_set << 2) & (value_set << 3) & (value_set << 4);
    let idx = left.leading_zeros();
    if idx < 32 {
        // The surviving bit marks the top card of the run.
        Some((31 - idx) as u8 + MIN_RANK)
    } else if value_set & WHEEL == WHEEL {
        Some(5)
    } else {
        None
    }
}

/// Score at most five cards. Fewer than five still gets a category from the
/// rank counts (useful for partial boards), it just can't be a straight or
/// flush.
fn score_five(cards: &[Card]) -> StrengthScore {
    let mut value_to_count = [0u8; 13];
    let mut value_set: u32 = 0;
    let mut suit_set: u32 = 0;

    for c in cards {
        let v = c.rank.saturating_sub(MIN_RANK).min(12);
        value_set |= 1 << v;
        suit_set |= 1 << (c.suit as u8);
        value_to_count[v as usize] += 1;
    }

    // Ranks ordered by (count, rank), both descending. This is exactly the
    // kicker order for every paired category.
    let mut grouped: Vec<(u8, u8)> = value_to_count
        .iter()
        .enumerate()
        .filter(|(_, n)| **n > 0)
        .map(|(v, &n)| (n, v as u8 + MIN_RANK))
        .collect();
    grouped.sort_unstable_by(|a, b| b.cmp(a));
    let ranks: Vec<u8> = grouped.iter().map(|&(_, r)| r).collect();

    let is_flush = cards.len() == 5 && suit_set.count_ones() == 1;
    let straight = if cards.len() == 5 && value_set.count_ones() == 5 {
        straight_high(value_set)
    } else {
        None
    };

    match (straight, is_flush) {
        (Some(high), true) => return StrengthScore::pack(HandCategory::StraightFlush, &[high]),
        (Some(high), false) => return StrengthScore::pack(HandCategory::Straight, &[high]),
        (None, true) => return StrengthScore::pack(HandCategory::Flush, &ranks),
        (None, false) => {}
    }

    let top = grouped.first().map_or(0, |g| g.0);
    let second = grouped.get(1).map_or(0, |g| g.0);
    let category = match (top, second) {
        (4, _) => HandCategory::FourOfAKind,
        (3, 2) => HandCategory::FullHouse,
        (3, _) => HandCategory::ThreeOfAKind,
        (2, 2) => HandCategory::TwoPair,
        (2, _) => HandCategory::OnePair,
        _ => HandCategory::HighCard,
    };
    StrengthScore::pack(category, &ranks)
}

/// Can this turn into a hand strength? Implemented for card slices and
/// vectors.
pub trait Rankable {
    fn cards(&self) -> impl Iterator<Item = Card>;

    /// Best five card strength among the cards. Works on any count; more than
    /// five cards tries every five card subset.
    fn strength(&self) -> StrengthScore {
        let cards: Vec<Card> = self.cards().collect();
        if cards.len() <= 5 {
            score_five(&cards)
        } else {
            CardIter::new(&cards, 5)
                .map(|five| score_five(&five))
                .max()
                .unwrap_or(StrengthScore(0))
        }
    }
}

impl Rankable for [Card] {
    fn cards(&self) -> impl Iterator<Item = Card> {
        self.iter().copied()
    }
}

impl Rankable for Vec<Card> {
    fn cards(&self) -> impl Iterator<Item = Card> {
        self.iter().copied()
    }
}

impl<const N: usize> Rankable for [Card; N] {
    fn cards(&self) -> impl Iterator<Item = Card> {
        self.iter().copied()
    }
}

fn check_cards(cards: &[Card]) -> Result<(), EvalError> {
    if !(5..=7).contains(&cards.len()) {
        return Err(EvalError::WrongCardCount(cards.len()));
    }
    for (i, c) in cards.iter().enumerate() {
        if !c.has_valid_rank() {
            return Err(EvalError::InvalidRank(*c));
        }
        if cards[..i].contains(c) {
            return Err(EvalError::DuplicateCard(*c));
        }
    }
    Ok(())
}

/// Evaluate five to seven distinct cards. Pure and order independent.
///
/// ```
/// use holdem_engine::core::{Card, HandCategory, evaluate};
///
/// let royal = evaluate(&Card::parse_many("AsKsQsJsTs").unwrap()).unwrap();
/// assert_eq!(HandCategory::StraightFlush, royal.category());
/// ```
pub fn evaluate(cards: &[Card]) -> Result<StrengthScore, EvalError> {
    check_cards(cards)?;
    Ok(cards.strength())
}

/// Exactly five cards.
pub fn evaluate_five(cards: &[Card; 5]) -> Result<StrengthScore, EvalError> {
    check_cards(cards)?;
    Ok(score_five(cards))
}

/// Compare two hands: `1` if `h1` wins, `-1` if `h2` wins, `0` on a tie.
pub fn compare(h1: &[Card], h2: &[Card]) -> Result<i8, EvalError> {
    let a = evaluate(h1)?;
    let b = evaluate(h2)?;
    Ok(match a.cmp(&b) {
        Ordering::Greater => 1,
        Ordering::Less => -1,
        Ordering::Equal => 0,
    })
}
