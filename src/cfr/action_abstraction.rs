use crate::config::{EngineConfig, PerStreet};
use crate::game::{Action, BetSize, CHIP_EPSILON, GameState, Street};

/// Two raise sizes closer than this in chips are the same action.
const SAME_AMOUNT_EPSILON: f32 = 0.01;

/// Which actions the trained game offers at each decision.
///
/// Fold (only when facing a bet), check or call and all in are always
/// offered when the stack allows. On top of that each street has a short list
/// of raise sizes; sizes that would put the whole stack in, or that land on
/// the same amount as an earlier size, are dropped. Once the round's raise
/// cap is hit only all in remains as a way to raise.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionAbstraction {
    raise_sizes: PerStreet<Vec<BetSize>>,
}

impl ActionAbstraction {
    /// Keep the first `max_sizes` candidates of each street.
    pub fn new(raise_sizes: &PerStreet<Vec<BetSize>>, max_sizes: &PerStreet<usize>) -> Self {
        let pick = |street: Street| -> Vec<BetSize> {
            raise_sizes
                .get(street)
                .iter()
                .take(*max_sizes.get(street))
                .copied()
                .collect()
        };
        ActionAbstraction {
            raise_sizes: PerStreet {
                preflop: pick(Street::Preflop),
                flop: pick(Street::Flop),
                turn: pick(Street::Turn),
                river: pick(Street::River),
            },
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.raise_sizes, &config.max_raise_sizes_per_street)
    }

    pub fn sizes(&self, street: Street) -> &[BetSize] {
        self.raise_sizes.get(street)
    }

    /// Legal abstract actions for the seat to act, in a fixed order: fold,
    /// check or call, raises in configured order, all in.
    pub fn legal_actions(&self, state: &GameState) -> Vec<Action> {
        let seat = state.to_act_idx;
        let mut actions = Vec::new();
        if state.is_round_settled() || !state.can_act(seat) {
            return actions;
        }

        let to_call = state.to_call();
        let stack = state.current_player_stack();
        if to_call > CHIP_EPSILON {
            actions.push(Action::Fold);
            actions.push(Action::Call);
        } else {
            actions.push(Action::Check);
        }

        let can_raise = stack > to_call + CHIP_EPSILON && state.opponents_can_act(seat) > 0;
        if !can_raise {
            return actions;
        }

        if !state.is_raise_capped() {
            let all_in_to = state.all_in_amount();
            let mut used_amounts: Vec<f32> = Vec::new();
            for size in self.sizes(state.street) {
                let to = state.raise_to(*size);
                if to + CHIP_EPSILON >= all_in_to {
                    continue;
                }
                if used_amounts
                    .iter()
                    .any(|a| (a - to).abs() < SAME_AMOUNT_EPSILON)
                {
                    continue;
                }
                used_amounts.push(to);
                actions.push(Action::Raise(*size));
            }
        }
        actions.push(Action::AllIn);
        actions
    }

    /// Map an observed raise to the abstract size whose raise-to amount is
    /// closest. Used to replay real action histories into training keys.
    ///
    /// * `raise_to` - The observed total round bet after the raise.
    /// * `current_bet`, `to_call`, `pot`, `min_raise` - The round before the
    ///   raise, from the raiser's point of view.
    #[allow(clippy::too_many_arguments)]
    pub fn translate_raise(
        &self,
        street: Street,
        raise_to: f32,
        current_bet: f32,
        to_call: f32,
        pot: f32,
        min_raise: f32,
        big_blind: f32,
    ) -> Action {
        self.sizes(street)
            .iter()
            .map(|size| {
                let to = size.raise_to(current_bet, to_call, pot, min_raise, big_blind);
                (size, (to - raise_to).abs())
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(size, _)| Action::Raise(*size))
            .unwrap_or(Action::AllIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abstraction() -> ActionAbstraction {
        ActionAbstraction::from_config(&EngineConfig::default())
    }

    #[test]
    fn test_truncates_to_max_sizes() {
        let config = EngineConfig {
            max_raise_sizes_per_street: PerStreet {
                preflop: 1,
                flop: 0,
                turn: 2,
                river: 3,
            },
            ..Default::default()
        };
        let abs = ActionAbstraction::from_config(&config);
        assert_eq!(1, abs.sizes(Street::Preflop).len());
        assert!(abs.sizes(Street::Flop).is_empty());
        assert_eq!(2, abs.sizes(Street::Turn).len());
    }

    #[test]
    fn test_preflop_open() {
        let gs = GameState::new_hand(vec![100.0; 6], 1.0, 0, Some(3)).unwrap();
        let actions = abstraction().legal_actions(&gs);
        assert_eq!(
            vec![
                Action::Fold,
                Action::Call,
                Action::Raise(BetSize::BigBlinds(2.0)),
                Action::Raise(BetSize::PotFraction(1.0)),
                Action::AllIn,
            ],
            actions
        );
    }

    #[test]
    fn test_no_fold_without_bet() {
        let mut gs = GameState::new_hand(vec![100.0, 100.0], 1.0, 0, Some(3)).unwrap();
        gs.apply(Action::Call).unwrap();
        let actions = abstraction().legal_actions(&gs);
        assert_eq!(Action::Check, actions[0]);
        assert!(!actions.contains(&Action::Fold));
    }

    #[test]
    fn test_short_stack_only_shoves() {
        let gs = GameState::new_hand(vec![3.0, 100.0, 100.0], 1.0, 0, Some(3)).unwrap();
        // Three handed the button opens, here with 3 chips.
        assert_eq!(0, gs.to_act_idx);
        let actions = abstraction().legal_actions(&gs);
        assert_eq!(vec![Action::Fold, Action::Call, Action::AllIn], actions);
    }

    #[test]
    fn test_stack_below_call_cannot_raise() {
        let mut gs = GameState::new_hand(vec![100.0, 5.0], 1.0, 0, Some(3)).unwrap();
        gs.apply(Action::AllIn).unwrap();
        let actions = abstraction().legal_actions(&gs);
        assert_eq!(vec![Action::Fold, Action::Call], actions);
    }

    #[test]
    fn test_capped_round_keeps_all_in() {
        let mut gs = GameState::new_hand(vec![1000.0; 2], 1.0, 0, Some(1)).unwrap();
        gs.apply(Action::Raise(BetSize::BigBlinds(2.0))).unwrap();
        let actions = abstraction().legal_actions(&gs);
        assert_eq!(vec![Action::Fold, Action::Call, Action::AllIn], actions);
    }

    #[test]
    fn test_duplicate_amounts_dropped() {
        let config = EngineConfig {
            raise_sizes: PerStreet {
                preflop: vec![BetSize::MIN_RAISE, BetSize::BigBlinds(0.5)],
                ..EngineConfig::default().raise_sizes
            },
            ..Default::default()
        };
        let gs = GameState::new_hand(vec![100.0; 2], 1.0, 0, Some(3)).unwrap();
        let actions = ActionAbstraction::from_config(&config).legal_actions(&gs);
        // Both sizes clamp to the same min raise.
        let raises = actions.iter().filter(|a| matches!(a, Action::Raise(_))).count();
        assert_eq!(1, raises);
    }

    #[test]
    fn test_settled_round_has_no_actions() {
        let mut gs = GameState::new_hand(vec![100.0; 2], 1.0, 0, Some(3)).unwrap();
        gs.apply(Action::Call).unwrap();
        gs.apply(Action::Check).unwrap();
        assert!(abstraction().legal_actions(&gs).is_empty());
    }

    #[test]
    fn test_translate_raise() {
        let abs = abstraction();
        // Flop, 10 in the pot, nobody has bet. A 7.5 bet is 0.75 pot.
        let a = abs.translate_raise(Street::Flop, 7.5, 0.0, 0.0, 10.0, 1.0, 1.0);
        assert_eq!(Action::Raise(BetSize::PotFraction(0.75)), a);
        let a = abs.translate_raise(Street::Flop, 3.0, 0.0, 0.0, 10.0, 1.0, 1.0);
        assert_eq!(Action::Raise(BetSize::PotFraction(0.33)), a);
        let none = ActionAbstraction::new(
            &EngineConfig::default().raise_sizes,
            &PerStreet::default(),
        );
        assert_eq!(
            Action::AllIn,
            none.translate_raise(Street::River, 50.0, 0.0, 0.0, 10.0, 1.0, 1.0)
        );
    }
}
