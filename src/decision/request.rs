use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cfr::ActionAbstraction;
use crate::core::{Card, CardError};
use crate::game::{
    Action, ActionKind, CHIP_EPSILON, GameState, GameStateBuilder, GameStateError,
    ObservedAction, Street,
};

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("bad card: {0}")]
    Card(#[from] CardError),

    #[error("{field} has {actual} seats, expected {expected}")]
    SeatCountMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("seat {seat} is not at a {num_players} seat table")]
    SeatOutOfRange { seat: usize, num_players: usize },

    #[error("history has a {found} action during the {current} street")]
    HistoryAhead { found: Street, current: Street },

    #[error("couldn't build game state: {0}")]
    GameState(#[from] GameStateError),
}

/// One decision request from the serving layer.
///
/// Cards travel as `(rank, suit_index)` pairs with rank `2..=14` and suit
/// index `0..=3` (spade, club, heart, diamond).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateRequest {
    /// Identifies the hand; a new value starts a new hand for the agent.
    #[serde(default)]
    pub hand_id: Option<String>,
    pub street: Street,
    pub hero_seat: usize,
    pub dealer_seat: usize,
    pub hero_cards: Vec<(u8, u8)>,
    #[serde(default)]
    pub board: Vec<(u8, u8)>,
    /// Chips behind per seat.
    pub stacks: Vec<f32>,
    /// Chips put in on the current street per seat.
    pub bets: Vec<f32>,
    pub pot: f32,
    pub big_blind: f32,
    #[serde(default)]
    pub folded: Vec<usize>,
    /// Opponents in the hand, the primary one first.
    #[serde(default)]
    pub opponent_ids: Vec<String>,
    /// Every action of the hand so far, in order.
    #[serde(default)]
    pub history: Vec<ObservedAction>,
}

/// Round bookkeeping while replaying an observed history.
struct Ledger {
    street: Street,
    /// Chips each seat put in on streets before `street`.
    earlier_streets: Vec<f32>,
    round_bets: Vec<f32>,
    current_bet: f32,
    min_raise: f32,
    pot: f32,
    big_blind: f32,
}

impl Ledger {
    fn new(num_players: usize, big_blind: f32, sb_seat: usize, bb_seat: usize) -> Self {
        let mut round_bets = vec![0.0; num_players];
        round_bets[sb_seat] = big_blind / 2.0;
        round_bets[bb_seat] = big_blind;
        Ledger {
            street: Street::Preflop,
            earlier_streets: vec![0.0; num_players],
            round_bets,
            current_bet: big_blind,
            min_raise: big_blind,
            pot: big_blind * 1.5,
            big_blind,
        }
    }

    fn advance_to(&mut self, street: Street) {
        if street != self.street {
            self.street = street;
            for (total, bet) in self.earlier_streets.iter_mut().zip(self.round_bets.iter_mut()) {
                *total += *bet;
                *bet = 0.0;
            }
            self.current_bet = 0.0;
            self.min_raise = self.big_blind;
        }
    }

    fn put_to(&mut self, seat: usize, to: f32) {
        let added = (to - self.round_bets[seat]).max(0.0);
        self.round_bets[seat] += added;
        self.pot += added;
        if to > self.current_bet + CHIP_EPSILON {
            self.min_raise = self.min_raise.max(to - self.current_bet);
            self.current_bet = to;
        }
    }

    /// Record `action` and return its abstract form.
    fn record(&mut self, action: &ObservedAction, abstraction: &ActionAbstraction) -> Action {
        let seat = action.seat;
        match action.kind {
            ActionKind::Fold => Action::Fold,
            ActionKind::Check => Action::Check,
            ActionKind::Call => {
                let to = action.amount.unwrap_or(self.current_bet);
                self.put_to(seat, to);
                Action::Call
            }
            ActionKind::Raise => {
                let to = action
                    .amount
                    .unwrap_or(self.current_bet + self.min_raise);
                let to_call = (self.current_bet - self.round_bets[seat]).max(0.0);
                let abstract_action = abstraction.translate_raise(
                    self.street,
                    to,
                    self.current_bet,
                    to_call,
                    self.pot,
                    self.min_raise,
                    self.big_blind,
                );
                self.put_to(seat, to);
                abstract_action
            }
            ActionKind::AllIn => {
                if let Some(to) = action.amount {
                    self.put_to(seat, to);
                }
                Action::AllIn
            }
        }
    }
}

/// A card from its wire pair. The rank is not range checked here.
pub fn card_from_pair((rank, suit): (u8, u8)) -> Result<Card, CardError> {
    Card::from_pair(rank, suit)
}

impl GameStateRequest {
    pub fn num_players(&self) -> usize {
        self.stacks.len()
    }

    /// What the hero has to put in to call, straight from the request.
    pub fn to_call(&self) -> f32 {
        let top = self.bets.iter().fold(0.0f32, |acc, &b| acc.max(b));
        let hero = self.bets.get(self.hero_seat).copied().unwrap_or(0.0);
        (top - hero).max(0.0)
    }

    /// Turn the request into an abstract state with the hero to act.
    ///
    /// Observed raises are mapped to the nearest abstract size so the
    /// history matches the one training produced. The shape is checked here;
    /// card and amount sanity is left to the validator.
    pub fn to_game_state(
        &self,
        abstraction: &ActionAbstraction,
        max_raises_per_round: Option<u8>,
    ) -> Result<GameState, RequestError> {
        let n = self.num_players();
        if self.bets.len() != n {
            return Err(RequestError::SeatCountMismatch {
                field: "bets",
                expected: n,
                actual: self.bets.len(),
            });
        }
        for seat in [self.hero_seat, self.dealer_seat]
            .into_iter()
            .chain(self.folded.iter().copied())
            .chain(self.history.iter().map(|a| a.seat))
        {
            if seat >= n {
                return Err(RequestError::SeatOutOfRange {
                    seat,
                    num_players: n,
                });
            }
        }

        let hero_cards = self
            .hero_cards
            .iter()
            .map(|p| card_from_pair(*p))
            .collect::<Result<Vec<_>, _>>()?;
        let board = self
            .board
            .iter()
            .map(|p| card_from_pair(*p))
            .collect::<Result<Vec<_>, _>>()?;
        let mut hands = vec![Vec::new(); n];
        hands[self.hero_seat] = hero_cards;

        let (sb_seat, bb_seat) = if n == 2 {
            (self.dealer_seat, (self.dealer_seat + 1) % n)
        } else {
            ((self.dealer_seat + 1) % n, (self.dealer_seat + 2) % n)
        };
        let mut ledger = Ledger::new(n, self.big_blind, sb_seat, bb_seat);
        let mut history: Vec<Vec<Action>> = vec![Vec::new(); self.street.index() + 1];
        for observed in &self.history {
            if observed.street > self.street {
                return Err(RequestError::HistoryAhead {
                    found: observed.street,
                    current: self.street,
                });
            }
            ledger.advance_to(observed.street);
            let action = ledger.record(observed, abstraction);
            history[observed.street.index()].push(action);
        }
        let min_raise = if ledger.street == self.street {
            ledger.min_raise
        } else {
            self.big_blind
        };
        // Bets on the current street come from the request; earlier streets
        // come from the replayed history.
        if ledger.street != self.street {
            ledger.advance_to(self.street);
        }
        let contributions: Vec<f32> = ledger
            .earlier_streets
            .iter()
            .zip(self.bets.iter())
            .map(|(earlier, bet)| earlier + bet)
            .collect();
        // Not folded and nothing behind means all in, whether or not the
        // history shows how the chips went in.
        let all_in: Vec<usize> = self
            .stacks
            .iter()
            .enumerate()
            .filter(|(seat, stack)| **stack <= 0.0 && !self.folded.contains(seat))
            .map(|(seat, _)| seat)
            .collect();

        Ok(GameStateBuilder::new()
            .stacks(self.stacks.clone())
            .big_blind(self.big_blind)
            .dealer_idx(self.dealer_seat)
            .max_raises_per_round(max_raises_per_round)
            .street(self.street)
            .board(board)
            .hands(hands)
            .round_bets(self.bets.clone())
            .contributions(contributions)
            .pot(self.pot)
            .folded(self.folded.clone())
            .all_in(all_in)
            .to_act_idx(self.hero_seat)
            .min_raise(min_raise)
            .history(history)
            .build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::game::{BetSize, ValidationError, validate};

    fn abstraction() -> ActionAbstraction {
        ActionAbstraction::from_config(&EngineConfig::default())
    }

    fn flop_request() -> GameStateRequest {
        GameStateRequest {
            hand_id: Some("h1".to_string()),
            street: Street::Flop,
            hero_seat: 0,
            dealer_seat: 0,
            hero_cards: vec![(14, 0), (13, 0)],
            board: vec![(2, 1), (7, 2), (9, 3)],
            stacks: vec![97.0, 97.0, 97.0],
            bets: vec![0.0, 0.0, 0.0],
            pot: 9.0,
            big_blind: 1.0,
            folded: vec![],
            opponent_ids: vec!["v1".to_string()],
            history: vec![
                ObservedAction::new(0, Street::Preflop, ActionKind::Raise, Some(3.0)),
                ObservedAction::new(1, Street::Preflop, ActionKind::Call, Some(3.0)),
                ObservedAction::new(2, Street::Preflop, ActionKind::Call, Some(3.0)),
                ObservedAction::new(1, Street::Flop, ActionKind::Check, None),
                ObservedAction::new(2, Street::Flop, ActionKind::Check, None),
            ],
        }
    }

    #[test]
    fn test_translates_history() {
        let state = flop_request().to_game_state(&abstraction(), Some(3)).unwrap();
        assert_eq!(
            vec![
                vec![
                    Action::Raise(BetSize::BigBlinds(2.0)),
                    Action::Call,
                    Action::Call
                ],
                vec![Action::Check, Action::Check],
            ],
            state.history
        );
        assert_eq!(0, state.to_act_idx);
        assert_eq!(Street::Flop, state.street);
        assert!(validate(&state).is_ok());
        assert_eq!(0, state.raise_count);
    }

    #[test]
    fn test_contributions_from_history() {
        let state = flop_request().to_game_state(&abstraction(), Some(3)).unwrap();
        assert_eq!(vec![3.0, 3.0, 3.0], state.contributions);
    }

    #[test]
    fn test_all_in_seat_keeps_its_claim() {
        // Seat 2 shoved preflop and has nothing left.
        let mut request = flop_request();
        request.stacks = vec![90.0, 90.0, 0.0];
        request.pot = 30.0;
        request.history = vec![
            ObservedAction::new(0, Street::Preflop, ActionKind::Raise, Some(3.0)),
            ObservedAction::new(1, Street::Preflop, ActionKind::Call, Some(3.0)),
            ObservedAction::new(2, Street::Preflop, ActionKind::AllIn, Some(10.0)),
            ObservedAction::new(0, Street::Preflop, ActionKind::Call, Some(10.0)),
            ObservedAction::new(1, Street::Preflop, ActionKind::Call, Some(10.0)),
        ];
        let state = request.to_game_state(&abstraction(), Some(3)).unwrap();
        assert_eq!(vec![10.0, 10.0, 10.0], state.contributions);
        assert!(state.player_active.get(2));
        assert!(state.player_all_in.get(2));
        assert!(!state.needs_action.get(2));

        // Without a history, and on the button so no blind shows it put
        // chips in, the seat is still in the hand.
        request.history.clear();
        request.dealer_seat = 2;
        let state = request.to_game_state(&abstraction(), Some(3)).unwrap();
        assert_eq!(0.0, state.contributions[2]);
        assert!(state.player_active.get(2));
        assert!(state.player_all_in.get(2));
        assert!(validate(&state).is_ok());

        // A folded seat with an empty stack stays folded.
        request.folded = vec![2];
        let state = request.to_game_state(&abstraction(), Some(3)).unwrap();
        assert!(!state.player_active.get(2));
        assert!(!state.player_all_in.get(2));
    }

    #[test]
    fn test_duplicate_hero_cards_reach_validator() {
        let mut request = flop_request();
        request.hero_cards = vec![(14, 3), (14, 3)];
        let state = request.to_game_state(&abstraction(), Some(3)).unwrap();
        let ace = Card::from_pair(14, 3).unwrap();
        assert_eq!(Err(ValidationError::DuplicateCard(ace)), validate(&state));
    }

    #[test]
    fn test_shape_errors() {
        let mut request = flop_request();
        request.bets.pop();
        assert!(matches!(
            request.to_game_state(&abstraction(), Some(3)),
            Err(RequestError::SeatCountMismatch { field: "bets", .. })
        ));

        let mut request = flop_request();
        request.hero_seat = 7;
        assert!(matches!(
            request.to_game_state(&abstraction(), Some(3)),
            Err(RequestError::SeatOutOfRange { seat: 7, .. })
        ));

        let mut request = flop_request();
        request.board[0] = (5, 9);
        assert_eq!(
            Err(RequestError::Card(CardError::InvalidSuit(9))),
            request.to_game_state(&abstraction(), Some(3))
        );

        let mut request = flop_request();
        request.street = Street::Preflop;
        assert!(matches!(
            request.to_game_state(&abstraction(), Some(3)),
            Err(RequestError::HistoryAhead { .. })
        ));
    }

    #[test]
    fn test_to_call() {
        let mut request = flop_request();
        assert_eq!(0.0, request.to_call());
        request.bets = vec![0.0, 4.5, 0.0];
        assert_eq!(4.5, request.to_call());
    }

    #[test]
    fn test_request_json() {
        let json = r#"{
            "street": "preflop",
            "hero_seat": 3,
            "dealer_seat": 0,
            "hero_cards": [[14, 0], [14, 1]],
            "stacks": [100, 99.5, 99, 100, 100, 100],
            "bets": [0, 0.5, 1, 0, 0, 0],
            "pot": 1.5,
            "big_blind": 1
        }"#;
        let request: GameStateRequest = serde_json::from_str(json).unwrap();
        let state = request.to_game_state(&abstraction(), Some(3)).unwrap();
        assert_eq!(3, state.to_act_idx);
        assert_eq!(1.0, state.to_call());
        assert!(validate(&state).is_ok());
    }
}
