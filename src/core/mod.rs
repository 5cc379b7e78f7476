//! Cards, seats and hand strength.
//!
//! Everything else in the crate is built on these value types.
mod card;
mod card_iter;
mod deck;
mod player_bit_set;
mod rank;

pub use card::{Card, CardError, MAX_RANK, MIN_RANK, Suit};
pub use card_iter::CardIter;
pub use deck::Deck;
pub use player_bit_set::PlayerBitSet;
pub use rank::{
    EvalError, HandCategory, Rankable, StrengthScore, compare, evaluate, evaluate_five,
};
