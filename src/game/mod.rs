//! The abstracted state of a hand, the actions that move it forward and the
//! integrity checks run before a state is trusted.
pub mod action;
pub mod errors;
pub mod game_state;
pub mod validator;

pub use action::{Action, ActionKind, BetSize, ObservedAction};
pub use errors::{GameStateError, ValidationError};
pub use game_state::{CHIP_EPSILON, GameState, GameStateBuilder, MAX_PLAYERS, Street};
pub use validator::{sanitize, validate};
