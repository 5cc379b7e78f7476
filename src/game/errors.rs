use thiserror::Error;

use crate::core::Card;

use super::action::Action;
use super::game_state::Street;

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum GameStateError {
    #[error("num_players must be between 2 and {max}, got {actual}", max = super::game_state::MAX_PLAYERS)]
    InvalidPlayerCount { actual: usize },

    #[error("dealer_idx {dealer_idx} must be less than num_players {num_players}")]
    InvalidDealerIndex {
        dealer_idx: usize,
        num_players: usize,
    },

    #[error("big_blind must be positive, got {0}")]
    InvalidBigBlind(f32),

    #[error("{field} has {actual} entries but there are {expected} seats")]
    SeatCountMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{action:?} is not legal for seat {seat} on the {street}")]
    IllegalAction {
        action: Action,
        seat: usize,
        street: Street,
    },

    #[error("The betting round is settled, deal the next street first")]
    RoundSettled,

    #[error("The betting round is still in progress")]
    RoundInProgress,

    #[error("Can't deal past the river")]
    CantAdvanceStreet,

    #[error("The {street} needs {expected} new board cards, got {actual}")]
    WrongDealSize {
        street: Street,
        expected: usize,
        actual: usize,
    },

    #[error("The hand is still in progress")]
    HandNotComplete,

    #[error("Seat {0} reached showdown without hole cards")]
    MissingHoleCards(usize),

    #[error("Showdown needs five board cards, got {0}")]
    IncompleteBoard(usize),

    #[error("Ran out of cards to deal")]
    DeckExhausted,
}

/// Why a state failed validation. Every variant names the offending value.
#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum ValidationError {
    #[error("No seat is still active")]
    NoActiveSeats,

    #[error("The current actor {0} is not an active seat")]
    ActorNotActive(usize),

    #[error("Card {0} appears more than once")]
    DuplicateCard(Card),

    #[error("Card {0} has a rank outside 2..=14")]
    InvalidRank(Card),

    #[error("Seat {seat} holds {count} hole cards")]
    TooManyHoleCards { seat: usize, count: usize },

    #[error("The {street} needs {expected} board cards, found {actual}")]
    BoardCountMismatch {
        street: Street,
        expected: usize,
        actual: usize,
    },

    #[error("{field} is negative or not a number at seat {seat:?}: {value}")]
    InvalidAmount {
        field: &'static str,
        seat: Option<usize>,
        value: f32,
    },

    #[error("{field} has {actual} entries but there are {expected} seats")]
    SeatCountMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}
