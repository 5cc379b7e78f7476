use std::fmt;

use approx::abs_diff_eq;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::{Card, Deck, PlayerBitSet, Rankable, StrengthScore};

use super::action::{Action, BetSize};
use super::errors::GameStateError;

/// Largest table the engine models.
pub const MAX_PLAYERS: usize = 9;

/// Chip amounts below this are treated as zero.
pub const CHIP_EPSILON: f32 = 1e-3;

/// The betting street. Each street has an exact board size.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Street {
    #[default]
    Preflop,
    Flop,
    Turn,
    River,
}

impl Street {
    pub const ALL: [Street; 4] = [Street::Preflop, Street::Flop, Street::Turn, Street::River];

    /// Number of community cards on the board during this street.
    pub fn board_len(self) -> usize {
        match self {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River => 5,
        }
    }

    pub fn next(self) -> Option<Street> {
        match self {
            Street::Preflop => Some(Street::Flop),
            Street::Flop => Some(Street::Turn),
            Street::Turn => Some(Street::River),
            Street::River => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_board_len(len: usize) -> Option<Street> {
        Street::ALL.into_iter().find(|s| s.board_len() == len)
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Street::Preflop => write!(f, "Preflop"),
            Street::Flop => write!(f, "Flop"),
            Street::Turn => write!(f, "Turn"),
            Street::River => write!(f, "River"),
        }
    }
}

/// Builder for a `GameState`.
///
/// Only the shape is checked here (player count, per seat vector lengths,
/// dealer index). Card and amount sanity belongs to the validator so that a
/// malformed observation can still be represented and rejected with a reason.
///
/// # Example
///
/// ```
/// use holdem_engine::game::{GameStateBuilder, Street};
///
/// let game_state = GameStateBuilder::new()
///     .stacks(vec![100.0, 100.0])
///     .big_blind(2.0)
///     .build()
///     .unwrap();
///
/// assert_eq!(game_state.num_players, 2);
/// assert_eq!(game_state.street, Street::Preflop);
/// assert_eq!(game_state.small_blind, 1.0);
/// ```
#[derive(Default, Clone, Debug)]
pub struct GameStateBuilder {
    stacks: Option<Vec<f32>>,
    big_blind: Option<f32>,

    small_blind: Option<f32>,
    dealer_idx: Option<usize>,
    max_raises_per_round: Option<Option<u8>>,

    // Mid-hand snapshots
    street: Option<Street>,
    board: Option<Vec<Card>>,
    hands: Option<Vec<Vec<Card>>>,
    round_bets: Option<Vec<f32>>,
    contributions: Option<Vec<f32>>,
    pot: Option<f32>,
    to_act_idx: Option<usize>,
    folded: Vec<usize>,
    all_in: Vec<usize>,
    needs_action: Option<PlayerBitSet>,
    min_raise: Option<f32>,
    history: Option<Vec<Vec<Action>>>,
}

impl GameStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack behind for each seat. Required.
    pub fn stacks(mut self, stacks: Vec<f32>) -> Self {
        self.stacks = Some(stacks);
        self
    }

    /// Required.
    pub fn big_blind(mut self, bb: f32) -> Self {
        self.big_blind = Some(bb);
        self
    }

    /// Defaults to `big_blind / 2`.
    pub fn small_blind(mut self, sb: f32) -> Self {
        self.small_blind = Some(sb);
        self
    }

    pub fn dealer_idx(mut self, idx: usize) -> Self {
        self.dealer_idx = Some(idx);
        self
    }

    /// Defaults to `Some(3)`. `None` allows unlimited raises.
    pub fn max_raises_per_round(mut self, max: Option<u8>) -> Self {
        self.max_raises_per_round = Some(max);
        self
    }

    pub fn street(mut self, street: Street) -> Self {
        self.street = Some(street);
        self
    }

    pub fn board(mut self, board: Vec<Card>) -> Self {
        self.board = Some(board);
        self
    }

    /// Known hole cards per seat; an empty list where they are unknown.
    pub fn hands(mut self, hands: Vec<Vec<Card>>) -> Self {
        self.hands = Some(hands);
        self
    }

    /// Chips each seat has put in on the current street.
    pub fn round_bets(mut self, bets: Vec<f32>) -> Self {
        self.round_bets = Some(bets);
        self
    }

    /// Chips each seat has put in over the whole hand. Defaults to the round
    /// bets.
    pub fn contributions(mut self, contributions: Vec<f32>) -> Self {
        self.contributions = Some(contributions);
        self
    }

    /// Defaults to the sum of contributions.
    pub fn pot(mut self, pot: f32) -> Self {
        self.pot = Some(pot);
        self
    }

    pub fn to_act_idx(mut self, idx: usize) -> Self {
        self.to_act_idx = Some(idx);
        self
    }

    pub fn folded(mut self, seats: Vec<usize>) -> Self {
        self.folded = seats;
        self
    }

    /// Seats known to be all in. A seat with nothing behind is otherwise
    /// only treated as all in when it has a contribution, and as sitting out
    /// when it doesn't.
    pub fn all_in(mut self, seats: Vec<usize>) -> Self {
        self.all_in = seats;
        self
    }

    /// Defaults to every seat that can still act.
    pub fn needs_action(mut self, needs_action: PlayerBitSet) -> Self {
        self.needs_action = Some(needs_action);
        self
    }

    /// Defaults to the big blind.
    pub fn min_raise(mut self, min_raise: f32) -> Self {
        self.min_raise = Some(min_raise);
        self
    }

    /// Abstract actions taken so far, one list per street.
    pub fn history(mut self, history: Vec<Vec<Action>>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn build(self) -> Result<GameState, GameStateError> {
        let stacks = self.stacks.unwrap_or_default();
        let num_players = stacks.len();
        if !(2..=MAX_PLAYERS).contains(&num_players) {
            return Err(GameStateError::InvalidPlayerCount {
                actual: num_players,
            });
        }

        let big_blind = self.big_blind.unwrap_or(0.0);
        if big_blind <= 0.0 || big_blind.is_nan() {
            return Err(GameStateError::InvalidBigBlind(big_blind));
        }
        let small_blind = self.small_blind.unwrap_or(big_blind / 2.0);

        let dealer_idx = self.dealer_idx.unwrap_or(0);
        if dealer_idx >= num_players {
            return Err(GameStateError::InvalidDealerIndex {
                dealer_idx,
                num_players,
            });
        }

        let check_len = |field: &'static str, actual: usize| {
            if actual == num_players {
                Ok(())
            } else {
                Err(GameStateError::SeatCountMismatch {
                    field,
                    expected: num_players,
                    actual,
                })
            }
        };

        let hands = self.hands.unwrap_or_else(|| vec![Vec::new(); num_players]);
        check_len("hands", hands.len())?;
        let round_bets = self.round_bets.unwrap_or_else(|| vec![0.0; num_players]);
        check_len("round_bets", round_bets.len())?;
        let contributions = self.contributions.unwrap_or_else(|| round_bets.clone());
        check_len("contributions", contributions.len())?;

        let street = self.street.unwrap_or_default();
        let pot = self.pot.unwrap_or_else(|| contributions.iter().sum());
        let current_bet = round_bets.iter().fold(0.0f32, |acc, &b| acc.max(b));

        let mut player_active = PlayerBitSet::new(num_players);
        let mut player_all_in = PlayerBitSet::default();
        for seat in self.folded {
            player_active.disable(seat);
        }
        for seat in self.all_in {
            if seat < num_players && player_active.get(seat) {
                player_all_in.enable(seat);
            }
        }
        for (seat, stack) in stacks.iter().enumerate() {
            if *stack <= 0.0 && player_active.get(seat) && !player_all_in.get(seat) {
                if contributions[seat] > 0.0 {
                    player_all_in.enable(seat);
                } else {
                    // Nothing behind and nothing in: sitting out.
                    player_active.disable(seat);
                }
            }
        }

        let mut history = self.history.unwrap_or_default();
        history.resize(street.index() + 1, Vec::new());
        let raise_count = history[street.index()]
            .iter()
            .filter(|a| a.is_aggressive())
            .count() as u8;

        let mut game_state = GameState {
            num_players,
            street,
            dealer_idx,
            to_act_idx: dealer_idx,
            player_active,
            player_all_in,
            needs_action: player_active.difference(player_all_in),
            stacks,
            round_bets,
            contributions,
            pot,
            current_bet,
            min_raise: self.min_raise.unwrap_or(big_blind),
            big_blind,
            small_blind,
            raise_count,
            max_raises_per_round: self.max_raises_per_round.unwrap_or(Some(3)),
            hands,
            board: self.board.unwrap_or_default(),
            history,
        };
        if let Some(needs_action) = self.needs_action {
            game_state.needs_action = needs_action;
        }
        game_state.to_act_idx = match self.to_act_idx {
            Some(idx) => idx,
            None => game_state.first_to_act(),
        };
        Ok(game_state)
    }
}

/// The abstracted state of one hand.
///
/// `player_active` holds every seat that has not folded, including seats that
/// are all in. `needs_action` is the subset still owed a decision on the
/// current street.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub num_players: usize,
    pub street: Street,
    pub dealer_idx: usize,
    pub to_act_idx: usize,
    pub player_active: PlayerBitSet,
    pub player_all_in: PlayerBitSet,
    pub needs_action: PlayerBitSet,
    /// Chips behind for each seat.
    pub stacks: Vec<f32>,
    /// Chips put in on the current street.
    pub round_bets: Vec<f32>,
    /// Chips put in over the whole hand.
    pub contributions: Vec<f32>,
    pub pot: f32,
    /// The amount to match on this street.
    pub current_bet: f32,
    /// The last raise increment, which is also the smallest legal raise.
    pub min_raise: f32,
    pub big_blind: f32,
    pub small_blind: f32,
    /// Voluntary raises on the current street.
    pub raise_count: u8,
    pub max_raises_per_round: Option<u8>,
    /// Hole cards. Empty where a seat's cards are unknown.
    pub hands: Vec<Vec<Card>>,
    pub board: Vec<Card>,
    /// Abstract actions so far, one list per street.
    pub history: Vec<Vec<Action>>,
}

impl GameState {
    /// Start a hand: seats sit with the given stacks and the blinds are
    /// posted. No cards are dealt.
    pub fn new_hand(
        stacks: Vec<f32>,
        big_blind: f32,
        dealer_idx: usize,
        max_raises_per_round: Option<u8>,
    ) -> Result<Self, GameStateError> {
        let mut game_state = GameStateBuilder::new()
            .stacks(stacks)
            .big_blind(big_blind)
            .dealer_idx(dealer_idx)
            .max_raises_per_round(max_raises_per_round)
            .build()?;
        game_state.post_blinds();
        Ok(game_state)
    }

    fn post_blinds(&mut self) {
        let sb = self.sb_seat();
        let bb = self.bb_seat();
        if self.can_act(sb) {
            let amount = self.stacks[sb].min(self.small_blind);
            self.put_chips(sb, amount);
        }
        if self.can_act(bb) {
            let amount = self.stacks[bb].min(self.big_blind);
            self.put_chips(bb, amount);
        }
        self.current_bet = self.round_bets.iter().fold(0.0f32, |acc, &b| acc.max(b));
        self.min_raise = self.big_blind;
        self.needs_action = self.can_act_set();
        self.to_act_idx = self.first_to_act();
    }

    /// With two players the dealer posts the small blind.
    pub fn sb_seat(&self) -> usize {
        if self.num_players == 2 {
            self.dealer_idx
        } else {
            (self.dealer_idx + 1) % self.num_players
        }
    }

    pub fn bb_seat(&self) -> usize {
        if self.num_players == 2 {
            (self.dealer_idx + 1) % self.num_players
        } else {
            (self.dealer_idx + 2) % self.num_players
        }
    }

    /// Seats that have not folded and still have chips behind.
    pub fn can_act_set(&self) -> PlayerBitSet {
        self.player_active.difference(self.player_all_in)
    }

    pub fn can_act(&self, seat: usize) -> bool {
        self.can_act_set().get(seat)
    }

    /// Seats other than `seat` that could still respond to a raise.
    pub fn opponents_can_act(&self, seat: usize) -> usize {
        let mut others = self.can_act_set();
        others.disable(seat);
        others.count()
    }

    /// The first seat after `from` (exclusive, wrapping) that is in `set`.
    fn next_seat_in(&self, set: PlayerBitSet, from: usize) -> Option<usize> {
        (1..=self.num_players)
            .map(|offset| (from + offset) % self.num_players)
            .find(|seat| set.get(*seat))
    }

    fn first_to_act(&self) -> usize {
        let start = match self.street {
            Street::Preflop => self.bb_seat(),
            _ => self.dealer_idx,
        };
        self.next_seat_in(self.needs_action, start)
            .or_else(|| self.next_seat_in(self.player_active, start))
            .unwrap_or(self.dealer_idx)
    }

    /// Seat offset from the dealer, so `0` is the button.
    pub fn position_of(&self, seat: usize) -> usize {
        (seat + self.num_players - self.dealer_idx) % self.num_players
    }

    /// Whether `seat` acts last among the seats still in the hand once the
    /// flop is out.
    pub fn is_in_position(&self, seat: usize) -> bool {
        let order = |s: usize| (self.position_of(s) + self.num_players - 1) % self.num_players;
        self.player_active
            .ones()
            .filter(|s| *s != seat)
            .all(|s| order(s) < order(seat))
    }

    pub fn num_active_players(&self) -> usize {
        self.player_active.count()
    }

    pub fn current_player_stack(&self) -> f32 {
        self.stacks.get(self.to_act_idx).copied().unwrap_or(0.0)
    }

    pub fn current_player_round_bet(&self) -> f32 {
        self.round_bets.get(self.to_act_idx).copied().unwrap_or(0.0)
    }

    /// What the acting seat has to put in to call.
    pub fn to_call(&self) -> f32 {
        (self.current_bet - self.current_player_round_bet()).max(0.0)
    }

    pub fn is_raise_capped(&self) -> bool {
        self.max_raises_per_round
            .is_some_and(|max| self.raise_count >= max)
    }

    /// Raise-to total for the acting seat, not capped at its stack.
    pub fn raise_to(&self, size: BetSize) -> f32 {
        size.raise_to(
            self.current_bet,
            self.to_call(),
            self.pot,
            self.min_raise,
            self.big_blind,
        )
    }

    /// Round bet the acting seat would have after shoving.
    pub fn all_in_amount(&self) -> f32 {
        self.current_player_round_bet() + self.current_player_stack()
    }

    /// Round bet the acting seat ends up with after `action`, or `None` when
    /// no chips move.
    pub fn amount_for(&self, action: Action) -> Option<f32> {
        match action {
            Action::Fold | Action::Check => None,
            Action::Call => Some(
                self.current_player_round_bet() + self.to_call().min(self.current_player_stack()),
            ),
            Action::Raise(size) => Some(self.raise_to(size).min(self.all_in_amount())),
            Action::AllIn => Some(self.all_in_amount()),
        }
    }

    pub fn is_round_settled(&self) -> bool {
        self.needs_action.empty() || self.player_active.count() <= 1
    }

    /// The hand is over: one seat left, or the river betting is done.
    pub fn is_terminal(&self) -> bool {
        self.player_active.count() <= 1
            || (self.street == Street::River && self.is_round_settled())
    }

    /// Betting is done for this street and another street remains.
    pub fn needs_deal(&self) -> bool {
        !self.is_terminal() && self.is_round_settled()
    }

    /// Every card whose value is known: hole cards and board.
    pub fn known_cards(&self) -> Vec<Card> {
        self.hands
            .iter()
            .flatten()
            .chain(self.board.iter())
            .copied()
            .collect()
    }

    fn put_chips(&mut self, seat: usize, amount: f32) {
        self.stacks[seat] -= amount;
        self.round_bets[seat] += amount;
        self.contributions[seat] += amount;
        self.pot += amount;

        if abs_diff_eq!(self.stacks[seat], 0.0, epsilon = CHIP_EPSILON) {
            self.stacks[seat] = 0.0;
            self.player_all_in.enable(seat);
            self.needs_action.disable(seat);
        }
    }

    /// Apply an abstract action for the seat to act.
    pub fn apply(&mut self, action: Action) -> Result<(), GameStateError> {
        if self.is_round_settled() {
            return Err(GameStateError::RoundSettled);
        }
        let seat = self.to_act_idx;
        let illegal = GameStateError::IllegalAction {
            action,
            seat,
            street: self.street,
        };
        if !self.can_act(seat) {
            return Err(illegal);
        }

        let to_call = self.to_call();
        let stack = self.stacks[seat];
        let facing_bet = to_call > CHIP_EPSILON;
        let prev_bet = self.current_bet;

        match action {
            Action::Fold => {
                if !facing_bet {
                    return Err(illegal);
                }
                self.player_active.disable(seat);
            }
            Action::Check => {
                if facing_bet {
                    return Err(illegal);
                }
            }
            Action::Call => {
                if !facing_bet {
                    return Err(illegal);
                }
                self.put_chips(seat, to_call.min(stack));
            }
            Action::Raise(size) => {
                if stack <= to_call + CHIP_EPSILON || self.is_raise_capped() {
                    return Err(illegal);
                }
                let extra = (self.raise_to(size) - self.round_bets[seat]).min(stack);
                self.put_chips(seat, extra);
            }
            Action::AllIn => {
                if stack <= CHIP_EPSILON {
                    return Err(illegal);
                }
                self.put_chips(seat, stack);
            }
        }

        let new_bet = self.round_bets[seat];
        if new_bet > prev_bet + CHIP_EPSILON {
            // A new high bet re-opens the action for everyone else.
            let increment = new_bet - prev_bet;
            self.min_raise = self.min_raise.max(increment);
            self.current_bet = new_bet;
            self.raise_count = self.raise_count.saturating_add(1);
            self.needs_action = self.can_act_set();
        }
        self.needs_action.disable(seat);

        if let Some(actions) = self.history.get_mut(self.street.index()) {
            actions.push(action);
        }

        if self.player_active.count() <= 1 {
            self.needs_action = PlayerBitSet::default();
        }
        // Once nobody is owed a decision the pointer rests on a live seat.
        let next = self
            .next_seat_in(self.needs_action, seat)
            .or_else(|| self.next_seat_in(self.player_active, seat));
        if let Some(next) = next {
            self.to_act_idx = next;
        }
        Ok(())
    }

    /// Put the next street's cards on the board and reset the betting round.
    pub fn deal_street(&mut self, cards: &[Card]) -> Result<(), GameStateError> {
        if !self.is_round_settled() {
            return Err(GameStateError::RoundInProgress);
        }
        let next = self
            .street
            .next()
            .ok_or(GameStateError::CantAdvanceStreet)?;
        let expected = next.board_len().saturating_sub(self.board.len());
        if cards.len() != expected {
            return Err(GameStateError::WrongDealSize {
                street: next,
                expected,
                actual: cards.len(),
            });
        }

        self.board.extend_from_slice(cards);
        self.street = next;
        self.round_bets.iter_mut().for_each(|b| *b = 0.0);
        self.current_bet = 0.0;
        self.min_raise = self.big_blind;
        self.raise_count = 0;
        self.history.resize(next.index() + 1, Vec::new());

        let can_act = self.can_act_set();
        // Nobody left to bet against: run the board out.
        self.needs_action = if can_act.count() > 1 {
            can_act
        } else {
            PlayerBitSet::default()
        };
        self.to_act_idx = self.first_to_act();
        Ok(())
    }

    /// Deal the next street from the cards not yet seen.
    pub fn deal_next_street<R: Rng>(&mut self, rng: &mut R) -> Result<(), GameStateError> {
        let next = self
            .street
            .next()
            .ok_or(GameStateError::CantAdvanceStreet)?;
        let count = next.board_len().saturating_sub(self.board.len());
        let mut deck = Deck::without(&self.known_cards());
        let cards = deck
            .deal_n(rng, count)
            .ok_or(GameStateError::DeckExhausted)?;
        self.deal_street(&cards)
    }

    /// Top every active seat up to two hole cards.
    pub fn deal_hole_cards<R: Rng>(&mut self, rng: &mut R) -> Result<(), GameStateError> {
        let mut deck = Deck::without(&self.known_cards());
        for seat in self.player_active.ones() {
            let missing = 2usize.saturating_sub(self.hands[seat].len());
            if missing > 0 {
                let cards = deck
                    .deal_n(rng, missing)
                    .ok_or(GameStateError::DeckExhausted)?;
                self.hands[seat].extend(cards);
            }
        }
        Ok(())
    }

    /// Best five card strength of `seat` with the current board. Before the
    /// flop this only sees the hole cards.
    pub fn hand_strength(&self, seat: usize) -> Option<StrengthScore> {
        let hole = self.hands.get(seat)?;
        if hole.is_empty() {
            return None;
        }
        let cards: Vec<Card> = hole.iter().chain(self.board.iter()).copied().collect();
        Some(cards.strength())
    }

    /// Net chips won or lost by every seat at the end of the hand.
    ///
    /// A lone survivor takes the whole pot. At showdown the pot is split into
    /// layers by contribution level and each layer goes to the best hand among
    /// the seats that reached it, ties split evenly. Money in the pot beyond
    /// the recorded contributions is dead and joins the main pot.
    pub fn payoffs(&self) -> Result<Vec<f32>, GameStateError> {
        if !self.is_terminal() {
            return Err(GameStateError::HandNotComplete);
        }
        let winnings = if self.player_active.count() == 1 {
            let mut w = vec![0.0; self.num_players];
            if let Some(winner) = self.player_active.ones().next() {
                w[winner] = self.pot;
            }
            w
        } else {
            self.showdown_winnings()?
        };
        Ok(winnings
            .iter()
            .zip(self.contributions.iter())
            .map(|(won, put_in)| won - put_in)
            .collect())
    }

    fn showdown_winnings(&self) -> Result<Vec<f32>, GameStateError> {
        if self.board.len() < Street::River.board_len() {
            return Err(GameStateError::IncompleteBoard(self.board.len()));
        }
        let mut strengths: Vec<Option<StrengthScore>> = vec![None; self.num_players];
        for seat in self.player_active.ones() {
            if self.hands[seat].len() != 2 {
                return Err(GameStateError::MissingHoleCards(seat));
            }
            strengths[seat] = self.hand_strength(seat);
        }

        let mut levels: Vec<f32> = self
            .contributions
            .iter()
            .copied()
            .filter(|c| *c > 0.0)
            .collect();
        levels.sort_by(|a, b| a.total_cmp(b));
        levels.dedup_by(|a, b| (*a - *b).abs() < CHIP_EPSILON);
        if levels.is_empty() {
            levels.push(0.0);
        }

        let dead: f32 = (self.pot - self.contributions.iter().sum::<f32>()).max(0.0);
        let mut winnings = vec![0.0; self.num_players];
        let mut prev = 0.0f32;
        for (i, &level) in levels.iter().enumerate() {
            let mut layer: f32 = self
                .contributions
                .iter()
                .map(|c| c.min(level) - c.min(prev))
                .sum();
            if i == 0 {
                layer += dead;
            }

            let mut eligible: Vec<usize> = self
                .player_active
                .ones()
                .filter(|s| self.contributions[*s] + CHIP_EPSILON >= level)
                .collect();
            if eligible.is_empty() {
                // Only folded seats reached this level; the deepest live
                // seats take it.
                let deepest = self
                    .player_active
                    .ones()
                    .map(|s| self.contributions[s])
                    .fold(0.0f32, f32::max);
                eligible = self
                    .player_active
                    .ones()
                    .filter(|s| (self.contributions[*s] - deepest).abs() < CHIP_EPSILON)
                    .collect();
            }

            let best = eligible.iter().filter_map(|s| strengths[*s]).max();
            let winners: Vec<usize> = eligible
                .into_iter()
                .filter(|s| strengths[*s] == best)
                .collect();
            if !winners.is_empty() {
                let share = layer / winners.len() as f32;
                for w in winners {
                    winnings[w] += share;
                }
            }
            prev = level;
        }
        Ok(winnings)
    }
}
