//! Integrity checks for a `GameState` before it is trained on or served.
//!
//! `validate` is pure and reports the first problem it finds. `sanitize`
//! is the recovery path: it repairs what can be repaired deterministically
//! and leaves the rest for `validate` to reject again.
use std::collections::HashSet;

use tracing::debug;

use crate::core::Card;

use super::errors::ValidationError;
use super::game_state::{GameState, Street};

const MAX_HOLE_CARDS: usize = 2;

fn check_amount(field: &'static str, seat: Option<usize>, value: f32) -> Result<(), ValidationError> {
    if value < 0.0 || !value.is_finite() {
        Err(ValidationError::InvalidAmount { field, seat, value })
    } else {
        Ok(())
    }
}

fn check_seat_amounts(field: &'static str, values: &[f32]) -> Result<(), ValidationError> {
    for (seat, value) in values.iter().enumerate() {
        check_amount(field, Some(seat), *value)?;
    }
    Ok(())
}

/// Check a state for internal consistency.
///
/// ```
/// use holdem_engine::core::Card;
/// use holdem_engine::game::{GameStateBuilder, ValidationError, validate};
///
/// let ace = Card::from_pair(14, 3).unwrap();
/// let state = GameStateBuilder::new()
///     .stacks(vec![100.0, 100.0])
///     .big_blind(2.0)
///     .hands(vec![vec![ace, ace], vec![]])
///     .build()
///     .unwrap();
/// assert_eq!(Err(ValidationError::DuplicateCard(ace)), validate(&state));
/// ```
pub fn validate(state: &GameState) -> Result<(), ValidationError> {
    let n = state.num_players;
    let seat_fields = [
        ("stacks", state.stacks.len()),
        ("round_bets", state.round_bets.len()),
        ("contributions", state.contributions.len()),
        ("hands", state.hands.len()),
    ];
    for (field, actual) in seat_fields {
        if actual != n {
            return Err(ValidationError::SeatCountMismatch {
                field,
                expected: n,
                actual,
            });
        }
    }

    check_seat_amounts("stacks", &state.stacks)?;
    check_seat_amounts("round_bets", &state.round_bets)?;
    check_seat_amounts("contributions", &state.contributions)?;
    check_amount("pot", None, state.pot)?;
    check_amount("current_bet", None, state.current_bet)?;
    check_amount("min_raise", None, state.min_raise)?;

    if state.player_active.empty() {
        return Err(ValidationError::NoActiveSeats);
    }
    if !state.player_active.get(state.to_act_idx) {
        return Err(ValidationError::ActorNotActive(state.to_act_idx));
    }

    let mut seen: HashSet<Card> = HashSet::new();
    for (seat, hand) in state.hands.iter().enumerate() {
        if hand.len() > MAX_HOLE_CARDS {
            return Err(ValidationError::TooManyHoleCards {
                seat,
                count: hand.len(),
            });
        }
    }
    for card in state.hands.iter().flatten().chain(state.board.iter()) {
        if !card.has_valid_rank() {
            return Err(ValidationError::InvalidRank(*card));
        }
        if !seen.insert(*card) {
            return Err(ValidationError::DuplicateCard(*card));
        }
    }

    let expected = state.street.board_len();
    if state.board.len() != expected {
        return Err(ValidationError::BoardCountMismatch {
            street: state.street,
            expected,
            actual: state.board.len(),
        });
    }

    Ok(())
}

fn floor_amount(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Repair a state as far as possible.
///
/// * Per seat vectors are resized to the seat count.
/// * Negative or non finite amounts become zero.
/// * Cards with an impossible rank are dropped, as is every repeat of a card
///   after its first occurrence (hole cards in seat order, then the board).
/// * Extra hole cards beyond two are dropped.
/// * A board that doesn't fit its street is cut back to the largest complete
///   street it covers, and the street follows it.
/// * An actor that isn't active moves to the next active seat.
///
/// A state with no active seats can't be repaired and still fails
/// `validate`.
pub fn sanitize(state: &GameState) -> GameState {
    let mut clean = state.clone();
    let n = clean.num_players;

    clean.stacks.resize(n, 0.0);
    clean.round_bets.resize(n, 0.0);
    clean.contributions.resize(n, 0.0);
    clean.hands.resize(n, Vec::new());

    for v in clean
        .stacks
        .iter_mut()
        .chain(clean.round_bets.iter_mut())
        .chain(clean.contributions.iter_mut())
    {
        *v = floor_amount(*v);
    }
    clean.pot = floor_amount(clean.pot);
    clean.current_bet = floor_amount(clean.current_bet);
    clean.min_raise = floor_amount(clean.min_raise);

    let mut seen: HashSet<Card> = HashSet::new();
    let mut keep = |card: &Card| card.has_valid_rank() && seen.insert(*card);
    for hand in clean.hands.iter_mut() {
        hand.retain(|c| keep(c));
        hand.truncate(MAX_HOLE_CARDS);
    }
    clean.board.retain(|c| keep(c));

    if clean.board.len() != clean.street.board_len() {
        let street = Street::ALL
            .into_iter()
            .rev()
            .find(|s| s.board_len() <= clean.board.len())
            .unwrap_or(Street::Preflop);
        debug!(
            from = %clean.street,
            to = %street,
            board = clean.board.len(),
            "Board doesn't fit street"
        );
        clean.board.truncate(street.board_len());
        clean.street = street;
        clean.history.resize(street.index() + 1, Vec::new());
    }

    if !clean.player_active.get(clean.to_act_idx)
        && let Some(seat) = (1..=n)
            .map(|offset| (clean.to_act_idx + offset) % n)
            .find(|seat| clean.player_active.get(*seat))
    {
        clean.to_act_idx = seat;
    }

    clean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlayerBitSet;
    use crate::game::GameStateBuilder;

    fn two_handed() -> GameStateBuilder {
        GameStateBuilder::new()
            .stacks(vec![100.0, 100.0])
            .big_blind(2.0)
    }

    #[test]
    fn test_valid_new_hand() {
        let gs = GameState::new_hand(vec![100.0; 6], 2.0, 3, Some(3)).unwrap();
        assert_eq!(Ok(()), validate(&gs));
    }

    #[test]
    fn test_duplicate_hero_cards() {
        let ace = Card::from_pair(14, 3).unwrap();
        let gs = two_handed()
            .hands(vec![vec![ace, ace], vec![]])
            .build()
            .unwrap();
        assert_eq!(Err(ValidationError::DuplicateCard(ace)), validate(&gs));

        let clean = sanitize(&gs);
        let count = clean.known_cards().iter().filter(|c| **c == ace).count();
        assert_eq!(1, count);
        assert_eq!(vec![ace], clean.hands[0]);
        assert_eq!(Ok(()), validate(&clean));
    }

    #[test]
    fn test_duplicate_across_hand_and_board() {
        let board = Card::parse_many("AsKd7h").unwrap();
        let gs = two_handed()
            .street(Street::Flop)
            .hands(vec![Card::parse_many("AsQc").unwrap(), vec![]])
            .board(board.clone())
            .build()
            .unwrap();
        assert_eq!(
            Err(ValidationError::DuplicateCard(board[0])),
            validate(&gs)
        );

        // Hole cards come first, so the board copy is the one dropped.
        let clean = sanitize(&gs);
        assert_eq!(2, clean.hands[0].len());
        assert_eq!(Street::Preflop, clean.street);
        assert!(clean.board.is_empty());
        assert_eq!(Ok(()), validate(&clean));
    }

    #[test]
    fn test_invalid_rank() {
        let bad = Card::from_pair(15, 0).unwrap();
        let gs = two_handed()
            .hands(vec![vec![bad], vec![]])
            .build()
            .unwrap();
        assert_eq!(Err(ValidationError::InvalidRank(bad)), validate(&gs));
        assert!(sanitize(&gs).hands[0].is_empty());
    }

    #[test]
    fn test_negative_amounts() {
        let mut gs = GameState::new_hand(vec![100.0, 100.0], 2.0, 0, Some(3)).unwrap();
        gs.stacks[1] = -5.0;
        assert!(matches!(
            validate(&gs),
            Err(ValidationError::InvalidAmount {
                field: "stacks",
                seat: Some(1),
                ..
            })
        ));
        gs.pot = f32::NAN;
        let clean = sanitize(&gs);
        assert_eq!(0.0, clean.stacks[1]);
        assert_eq!(0.0, clean.pot);
        assert_eq!(Ok(()), validate(&clean));
    }

    #[test]
    fn test_board_count() {
        let gs = two_handed()
            .street(Street::Turn)
            .board(Card::parse_many("2c3c4c").unwrap())
            .build()
            .unwrap();
        assert_eq!(
            Err(ValidationError::BoardCountMismatch {
                street: Street::Turn,
                expected: 4,
                actual: 3
            }),
            validate(&gs)
        );
        let clean = sanitize(&gs);
        assert_eq!(Street::Flop, clean.street);
        assert_eq!(Ok(()), validate(&clean));
    }

    #[test]
    fn test_actor_not_active() {
        let mut gs = GameState::new_hand(vec![100.0; 3], 2.0, 0, Some(3)).unwrap();
        gs.player_active.disable(gs.to_act_idx);
        assert_eq!(
            Err(ValidationError::ActorNotActive(gs.to_act_idx)),
            validate(&gs)
        );
        let clean = sanitize(&gs);
        assert_eq!(Ok(()), validate(&clean));
    }

    #[test]
    fn test_no_active_seats_stays_invalid() {
        let mut gs = GameState::new_hand(vec![100.0; 2], 2.0, 0, Some(3)).unwrap();
        gs.player_active = PlayerBitSet::default();
        assert_eq!(Err(ValidationError::NoActiveSeats), validate(&sanitize(&gs)));
    }

    #[test]
    fn test_sanitize_is_deterministic() {
        let ace = Card::from_pair(14, 3).unwrap();
        let gs = two_handed()
            .hands(vec![vec![ace], vec![ace]])
            .build()
            .unwrap();
        let a = sanitize(&gs);
        let b = sanitize(&gs);
        assert_eq!(a, b);
        assert_eq!(vec![ace], a.hands[0]);
        assert!(a.hands[1].is_empty());
    }
}
