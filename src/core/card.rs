use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest legal rank (deuce).
pub const MIN_RANK: u8 = 2;
/// Highest legal rank (ace is always high here, the wheel is handled by the
/// evaluator).
pub const MAX_RANK: u8 = 14;

const RANK_CHARS: &[u8; 13] = b"23456789TJQKA";

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum CardError {
    #[error("rank {0} is outside 2..=14")]
    InvalidRank(u8),
    #[error("suit index {0} is outside 0..=3")]
    InvalidSuit(u8),
    #[error("can't parse rank from '{0}'")]
    UnparsableRank(char),
    #[error("can't parse suit from '{0}'")]
    UnparsableSuit(char),
    #[error("a card needs exactly two characters")]
    WrongLength,
}

/// The four suits. The discriminant doubles as the wire index used by
/// `(rank, suit)` pairs at the request boundary.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suit {
    Spade = 0,
    Club = 1,
    Heart = 2,
    Diamond = 3,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spade, Suit::Club, Suit::Heart, Suit::Diamond];

    pub fn to_char(self) -> char {
        match self {
            Suit::Spade => 's',
            Suit::Club => 'c',
            Suit::Heart => 'h',
            Suit::Diamond => 'd',
        }
    }

    pub fn from_char(c: char) -> Result<Self, CardError> {
        match c.to_ascii_lowercase() {
            's' => Ok(Suit::Spade),
            'c' => Ok(Suit::Club),
            'h' => Ok(Suit::Heart),
            'd' => Ok(Suit::Diamond),
            _ => Err(CardError::UnparsableSuit(c)),
        }
    }
}

impl TryFrom<u8> for Suit {
    type Error = CardError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Suit::ALL
            .get(value as usize)
            .copied()
            .ok_or(CardError::InvalidSuit(value))
    }
}

/// An immutable playing card. Two cards are equal when both rank and suit
/// match.
///
/// The rank is kept as the raw `2..=14` number so that a card decoded from an
/// untrusted request can still be represented and later rejected by the
/// validator with a precise reason.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: u8,
    pub suit: Suit,
}

impl Card {
    /// Create a card without range checking the rank.
    pub const fn new(rank: u8, suit: Suit) -> Self {
        Card { rank, suit }
    }

    /// Create a card, rejecting ranks outside `2..=14`.
    pub fn try_new(rank: u8, suit: Suit) -> Result<Self, CardError> {
        if (MIN_RANK..=MAX_RANK).contains(&rank) {
            Ok(Card { rank, suit })
        } else {
            Err(CardError::InvalidRank(rank))
        }
    }

    /// Build from the `(rank, suit_index)` pair used on the wire. The suit
    /// must be a valid index; the rank is kept as-is for the validator.
    pub fn from_pair(rank: u8, suit: u8) -> Result<Self, CardError> {
        Ok(Card {
            rank,
            suit: Suit::try_from(suit)?,
        })
    }

    pub fn has_valid_rank(&self) -> bool {
        (MIN_RANK..=MAX_RANK).contains(&self.rank)
    }

    /// Dense index in `0..52`, only meaningful for valid ranks.
    pub fn index(&self) -> usize {
        (self.rank.saturating_sub(MIN_RANK) as usize) * 4 + self.suit as usize
    }

    /// Inverse of [`Card::index`].
    pub fn from_index(idx: usize) -> Option<Self> {
        if idx >= 52 {
            return None;
        }
        let suit = Suit::ALL[idx % 4];
        Some(Card::new((idx / 4) as u8 + MIN_RANK, suit))
    }

    fn rank_char(rank: u8) -> char {
        if (MIN_RANK..=MAX_RANK).contains(&rank) {
            RANK_CHARS[(rank - MIN_RANK) as usize] as char
        } else {
            '?'
        }
    }

    /// Parse a run of two-character cards such as `"AsKd7h"`.
    ///
    /// ```
    /// use holdem_engine::core::Card;
    ///
    /// let cards = Card::parse_many("AsKd").unwrap();
    /// assert_eq!(cards.len(), 2);
    /// assert_eq!(cards[0].rank, 14);
    /// ```
    pub fn parse_many(s: &str) -> Result<Vec<Card>, CardError> {
        let chars: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
        if chars.len() % 2 != 0 {
            return Err(CardError::WrongLength);
        }
        chars
            .chunks(2)
            .map(|pair| Card::from_chars(pair[0], pair[1]))
            .collect()
    }

    fn from_chars(rank_c: char, suit_c: char) -> Result<Self, CardError> {
        let upper = rank_c.to_ascii_uppercase() as u8;
        let rank = RANK_CHARS
            .iter()
            .position(|&r| r == upper)
            .map(|p| p as u8 + MIN_RANK)
            .ok_or(CardError::UnparsableRank(rank_c))?;
        Ok(Card::new(rank, Suit::from_char(suit_c)?))
    }
}

impl FromStr for Card {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(r), Some(su), None) => Card::from_chars(r, su),
            _ => Err(CardError::WrongLength),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Card::rank_char(self.rank), self.suit.to_char())
    }
}
