use std::fmt;

use serde::{Deserialize, Serialize};

use super::game_state::Street;

/// How big an abstract raise is.
///
/// Both flavours describe the raise *increment* over the current bet and are
/// clamped up to a legal minimum raise when turned into chips.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "size", rename_all = "snake_case")]
pub enum BetSize {
    /// A fraction of the pot after calling.
    PotFraction(f32),
    /// A fixed number of big blinds.
    BigBlinds(f32),
}

impl BetSize {
    /// The smallest legal raise; the increment always clamps up to the
    /// current minimum raise.
    pub const MIN_RAISE: BetSize = BetSize::BigBlinds(0.0);

    /// Raise-to amount for the given round context.
    ///
    /// * `current_bet` - The largest bet of the round so far.
    /// * `to_call` - What the acting seat still has to put in to call.
    /// * `pot` - Everything in the middle, including this round's bets.
    /// * `min_raise` - The smallest legal raise increment.
    pub fn raise_to(
        &self,
        current_bet: f32,
        to_call: f32,
        pot: f32,
        min_raise: f32,
        big_blind: f32,
    ) -> f32 {
        let increment = match *self {
            BetSize::PotFraction(f) => f * (pot + to_call),
            BetSize::BigBlinds(x) => x * big_blind,
        };
        current_bet + increment.max(min_raise)
    }
}

impl fmt::Display for BetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetSize::PotFraction(p) => write!(f, "{p}p"),
            BetSize::BigBlinds(x) => write!(f, "{x}b"),
        }
    }
}

/// An abstract action in the trained game. Sizes are carried as data and
/// resolved into chips against a concrete state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "size", rename_all = "snake_case")]
pub enum Action {
    /// Give up the hand. Only offered when facing a bet.
    Fold,
    /// Pass with nothing to call.
    Check,
    /// Match the current bet, capped at the stack.
    Call,
    /// Raise (or open bet) by the given size.
    Raise(BetSize),
    /// Put the whole stack in.
    AllIn,
}

impl Action {
    /// Bets and raises, including all in.
    pub fn is_aggressive(&self) -> bool {
        matches!(self, Action::Raise(_) | Action::AllIn)
    }

    /// Compact history token used in information set keys.
    pub fn token(&self) -> String {
        match self {
            Action::Fold => "f".to_string(),
            Action::Check => "k".to_string(),
            Action::Call => "c".to_string(),
            Action::Raise(size) => format!("r{size}"),
            Action::AllIn => "a".to_string(),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Fold => ActionKind::Fold,
            Action::Check => ActionKind::Check,
            Action::Call => ActionKind::Call,
            Action::Raise(_) => ActionKind::Raise,
            Action::AllIn => ActionKind::AllIn,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

/// The five action kinds visible outside the engine: what a request reports
/// seats doing and what a decision returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Raise,
    AllIn,
}

impl ActionKind {
    pub fn is_aggressive(&self) -> bool {
        matches!(self, ActionKind::Raise | ActionKind::AllIn)
    }

    /// Money went in voluntarily.
    pub fn is_voluntary(&self) -> bool {
        matches!(self, ActionKind::Call | ActionKind::Raise | ActionKind::AllIn)
    }
}

/// One action a seat was seen taking at a real table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservedAction {
    pub seat: usize,
    pub street: Street,
    pub kind: ActionKind,
    /// The seat's total bet on the street after the action. Unused for
    /// folds and checks.
    #[serde(default)]
    pub amount: Option<f32>,
}

impl ObservedAction {
    pub fn new(seat: usize, street: Street, kind: ActionKind, amount: Option<f32>) -> Self {
        ObservedAction {
            seat,
            street,
            kind,
            amount,
        }
    }
}
