use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Card;
use crate::game::{Action, GameState, Street};

/// Public identity of a decision point.
///
/// Built from the street, the acting seat's position relative to the dealer,
/// the board and the abstract betting so far. Private cards never take part,
/// so every holding that reaches the same public situation shares one key.
///
/// The text form is `street|position|board|history`, e.g.
/// `flop|2|7h9dAs|r2b,c,c/k`. Flop cards are sorted since their order
/// carries no information; turn and river cards follow in deal order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InfoSetKey(String);

fn street_tag(street: Street) -> &'static str {
    match street {
        Street::Preflop => "preflop",
        Street::Flop => "flop",
        Street::Turn => "turn",
        Street::River => "river",
    }
}

impl InfoSetKey {
    pub fn new(street: Street, position: usize, board: &[Card], history: &[Vec<Action>]) -> Self {
        let mut flop: Vec<Card> = board.iter().take(3).copied().collect();
        flop.sort();
        let board_str: String = flop
            .iter()
            .chain(board.iter().skip(3))
            .map(|c| c.to_string())
            .collect();

        let history_str = history
            .iter()
            .map(|street_actions| {
                street_actions
                    .iter()
                    .map(|a| a.token())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("/");

        InfoSetKey(format!(
            "{}|{}|{}|{}",
            street_tag(street),
            position,
            board_str,
            history_str
        ))
    }

    /// Key for the seat about to act.
    pub fn from_state(state: &GameState) -> Self {
        InfoSetKey::new(
            state.street,
            state.position_of(state.to_act_idx),
            &state.board,
            &state.history,
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn street(&self) -> Option<Street> {
        let tag = self.0.split('|').next()?;
        Street::ALL.into_iter().find(|s| street_tag(*s) == tag)
    }
}

impl fmt::Display for InfoSetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for InfoSetKey {
    fn from(value: String) -> Self {
        InfoSetKey(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Deck;
    use crate::game::BetSize;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_key_format() {
        let board = Card::parse_many("As7h9d").unwrap();
        let history = vec![
            vec![Action::Raise(BetSize::BigBlinds(2.0)), Action::Call, Action::Call],
            vec![Action::Check],
        ];
        let key = InfoSetKey::new(Street::Flop, 2, &board, &history);
        assert_eq!("flop|2|7h9dAs|r2b,c,c/k", key.as_str());
        assert_eq!(Some(Street::Flop), key.street());
    }

    #[test]
    fn test_flop_order_ignored() {
        let a = Card::parse_many("As7h9d2c").unwrap();
        let b = Card::parse_many("9dAs7h2c").unwrap();
        let history = vec![vec![], vec![], vec![]];
        assert_eq!(
            InfoSetKey::new(Street::Turn, 1, &a, &history),
            InfoSetKey::new(Street::Turn, 1, &b, &history)
        );
    }

    #[test]
    fn test_private_cards_excluded() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut a = GameState::new_hand(vec![100.0; 6], 2.0, 4, Some(3)).unwrap();
        let mut b = a.clone();
        a.deal_hole_cards(&mut rng).unwrap();
        let mut deck = Deck::without(&a.known_cards());
        b.hands[a.to_act_idx] = deck.deal_n(&mut rng, 2).unwrap();
        assert_ne!(a.hands, b.hands);
        assert_eq!(InfoSetKey::from_state(&a), InfoSetKey::from_state(&b));
    }

    #[test]
    fn test_position_relative_to_dealer() {
        let a = GameState::new_hand(vec![100.0; 6], 2.0, 0, Some(3)).unwrap();
        let b = GameState::new_hand(vec![100.0; 6], 2.0, 3, Some(3)).unwrap();
        assert_ne!(a.to_act_idx, b.to_act_idx);
        assert_eq!(InfoSetKey::from_state(&a), InfoSetKey::from_state(&b));
        assert!(InfoSetKey::from_state(&a).as_str().starts_with("preflop|3|"));
    }
}
