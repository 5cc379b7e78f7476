use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::{Action, BetSize, CHIP_EPSILON, GameState, Street};
use crate::opponent::HandClass;

fn default_donk_bet_probability() -> f32 {
    0.05
}

fn default_min_raise_probability() -> f32 {
    0.10
}

fn default_check_behind_probability() -> f32 {
    0.15
}

fn default_check_behind_threshold() -> f32 {
    0.7
}

fn default_one() -> u32 {
    1
}

fn default_max_consecutive_three_bets() -> u32 {
    2
}

/// Bounded deviations from the mixed strategy. Off unless `enabled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntiPatternConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Chance to lead out of position instead of checking postflop.
    #[serde(default = "default_donk_bet_probability")]
    pub donk_bet_probability: f32,
    #[serde(default = "default_one")]
    pub max_donk_bets_per_hand: u32,
    /// Chance to shrink a chosen raise to the minimum.
    #[serde(default = "default_min_raise_probability")]
    pub min_raise_probability: f32,
    #[serde(default = "default_one")]
    pub max_min_raises_per_hand: u32,
    /// Chance to check instead of betting when betting dominates the mix.
    #[serde(default = "default_check_behind_probability")]
    pub check_behind_probability: f32,
    /// Bet and raise probability mass above which check behind may fire.
    #[serde(default = "default_check_behind_threshold")]
    pub check_behind_threshold: f32,
    /// 3-bets in a row before one is forced into a call.
    #[serde(default = "default_max_consecutive_three_bets")]
    pub max_consecutive_three_bets: u32,
    /// Bluff raises allowed on each street of a hand.
    #[serde(default = "default_one")]
    pub max_bluff_raises_per_street: u32,
}

impl Default for AntiPatternConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            donk_bet_probability: default_donk_bet_probability(),
            max_donk_bets_per_hand: default_one(),
            min_raise_probability: default_min_raise_probability(),
            max_min_raises_per_hand: default_one(),
            check_behind_probability: default_check_behind_probability(),
            check_behind_threshold: default_check_behind_threshold(),
            max_consecutive_three_bets: default_max_consecutive_three_bets(),
            max_bluff_raises_per_street: default_one(),
        }
    }
}

/// Counters for one agent instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiPatternState {
    /// Survives hand boundaries; only a passed 3-bet spot resets it.
    pub consecutive_three_bets: u32,
    pub donk_bets: u32,
    pub min_raises: u32,
    pub bluff_raises: [u32; 4],
}

impl AntiPatternState {
    /// Clear the per hand counters.
    pub fn reset_hand(&mut self) {
        self.donk_bets = 0;
        self.min_raises = 0;
        self.bluff_raises = [0; 4];
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntiPatternEffect {
    DonkBet,
    MinRaise,
    CheckBehind,
    ThreeBetCapped,
    BluffCapped,
}

/// The decision being humanized.
#[derive(Debug, Clone, Copy)]
pub struct AntiPatternContext<'a> {
    /// The state with the hero to act.
    pub state: &'a GameState,
    pub legal_actions: &'a [Action],
    /// The final mixed strategy, in `legal_actions` order.
    pub strategy: &'a [f32],
    pub hand_class: HandClass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Humanized {
    pub action: Action,
    pub effects: Vec<AntiPatternEffect>,
}

fn roll<R: Rng>(rng: &mut R, probability: f32) -> bool {
    probability > 0.0 && rng.random::<f32>() < probability
}

/// Perturb `action`. With the layer disabled this returns `action`
/// untouched and leaves `counters` alone.
///
/// Effects run in a fixed order, each on the output of the previous one:
/// donk bet, min raise, check behind, 3-bet cap and bluff cap.
pub fn apply<R: Rng>(
    config: &AntiPatternConfig,
    counters: &mut AntiPatternState,
    ctx: &AntiPatternContext<'_>,
    action: Action,
    rng: &mut R,
) -> Humanized {
    let mut out = Humanized {
        action,
        effects: Vec::new(),
    };
    if !config.enabled {
        return out;
    }

    let state = ctx.state;
    let hero = state.to_act_idx;
    let free = state.to_call() <= CHIP_EPSILON;

    // Donk bet.
    if state.street != Street::Preflop
        && free
        && out.action == Action::Check
        && !state.is_in_position(hero)
        && counters.donk_bets < config.max_donk_bets_per_hand
        && let Some(lead) = ctx
            .legal_actions
            .iter()
            .find(|a| matches!(a, Action::Raise(_)))
        && roll(rng, config.donk_bet_probability)
    {
        out.action = *lead;
        counters.donk_bets += 1;
        out.effects.push(AntiPatternEffect::DonkBet);
    }

    // Min raise.
    if let Action::Raise(size) = out.action
        && size != BetSize::MIN_RAISE
        && counters.min_raises < config.max_min_raises_per_hand
        && state.raise_to(BetSize::MIN_RAISE) + CHIP_EPSILON < state.all_in_amount()
        && roll(rng, config.min_raise_probability)
    {
        out.action = Action::Raise(BetSize::MIN_RAISE);
        counters.min_raises += 1;
        out.effects.push(AntiPatternEffect::MinRaise);
    }

    // Check behind.
    let aggressive_mass: f32 = ctx
        .legal_actions
        .iter()
        .zip(ctx.strategy.iter())
        .filter(|(a, _)| a.is_aggressive())
        .map(|(_, p)| *p)
        .sum();
    if out.action.is_aggressive()
        && free
        && aggressive_mass > config.check_behind_threshold
        && roll(rng, config.check_behind_probability)
    {
        out.action = Action::Check;
        out.effects.push(AntiPatternEffect::CheckBehind);
    }

    // 3-bet streak cap.
    if state.street == Street::Preflop && state.raise_count == 1 {
        if out.action.is_aggressive() {
            if counters.consecutive_three_bets >= config.max_consecutive_three_bets {
                out.action = Action::Call;
                counters.consecutive_three_bets = 0;
                out.effects.push(AntiPatternEffect::ThreeBetCapped);
            } else {
                counters.consecutive_three_bets += 1;
            }
        } else {
            counters.consecutive_three_bets = 0;
        }
    }

    // Bluff raise cap.
    if out.action.is_aggressive() && ctx.hand_class == HandClass::Bluff {
        let used = &mut counters.bluff_raises[state.street.index()];
        if *used >= config.max_bluff_raises_per_street {
            out.action = if free { Action::Check } else { Action::Fold };
            out.effects.push(AntiPatternEffect::BluffCapped);
        } else {
            *used += 1;
        }
    }

    if !out.effects.is_empty() {
        debug!(from = %action, to = %out.action, effects = ?out.effects, "Humanized action");
    }
    out
}
