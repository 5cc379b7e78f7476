use serde::{Deserialize, Serialize};

use crate::core::{Card, HandCategory, Rankable};
use crate::game::{Action, Street};

use super::profile::PlayerType;

fn default_confidence_saturation_hands() -> u32 {
    50
}

fn default_min_confidence() -> f32 {
    0.3
}

fn default_min_hands_to_classify() -> u32 {
    20
}

/// How much opponent data it takes before exploits kick in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploitConfig {
    /// Hands after which confidence reaches 1.
    #[serde(default = "default_confidence_saturation_hands")]
    pub confidence_saturation_hands: u32,
    /// Below this confidence no adjustment is made.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    #[serde(default = "default_min_hands_to_classify")]
    pub min_hands_to_classify: u32,
}

impl Default for ExploitConfig {
    fn default() -> Self {
        Self {
            confidence_saturation_hands: default_confidence_saturation_hands(),
            min_confidence: default_min_confidence(),
            min_hands_to_classify: default_min_hands_to_classify(),
        }
    }
}

impl ExploitConfig {
    /// `min(hands / saturation, 1)`
    pub fn confidence(&self, hands_observed: u32) -> f32 {
        if self.confidence_saturation_hands == 0 {
            return 1.0;
        }
        (hands_observed as f32 / self.confidence_saturation_hands as f32).min(1.0)
    }
}

/// Whether the hero's holding wants its aggression read as value or as a
/// bluff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandClass {
    Value,
    Bluff,
}

impl HandClass {
    /// Preflop: pocket pairs, any ace and two broadway cards are value.
    /// Postflop: one pair or better where a hole card is part of the made
    /// hand. For pairs and trips that means one of the matched ranks; a
    /// straight or better has to beat what the board makes on its own.
    pub fn of(hole: &[Card], board: &[Card]) -> HandClass {
        if hole.len() < 2 {
            return HandClass::Bluff;
        }
        if board.len() < Street::Flop.board_len() {
            let (a, b) = (hole[0].rank, hole[1].rank);
            let value = a == b || a == 14 || b == 14 || (a >= 10 && b >= 10);
            return if value { HandClass::Value } else { HandClass::Bluff };
        }

        let cards: Vec<Card> = hole.iter().chain(board.iter()).copied().collect();
        let score = cards.strength();
        let matched = match score.category() {
            HandCategory::HighCard => 0,
            HandCategory::OnePair | HandCategory::ThreeOfAKind => 1,
            HandCategory::TwoPair => 2,
            _ => {
                return if score > board.strength() {
                    HandClass::Value
                } else {
                    HandClass::Bluff
                };
            }
        };
        let made = &score.kickers()[..matched];
        if hole.iter().any(|c| made.contains(&c.rank)) {
            HandClass::Value
        } else {
            HandClass::Bluff
        }
    }
}

/// Multiplicative deltas applied on top of the trained strategy. `1.0`
/// leaves an action alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploitAdjustment {
    pub tag: PlayerType,
    pub street: Street,
    pub confidence: f32,
    /// Raises made with a bluff class hand.
    pub bluff_frequency: f32,
    /// Raises made with a value class hand.
    pub value_bet_frequency: f32,
    pub call_frequency: f32,
    pub fold_frequency: f32,
}

impl ExploitAdjustment {
    /// The full strength template for a classification.
    ///
    /// Fish and LAGs pay off, so bet value more and bluff less. Nits fold
    /// too much, so bluff more. Calling stations never fold, so stop
    /// bluffing. TAGs get a slight push in aggression. Unknown players get
    /// no change.
    pub fn template(tag: PlayerType, street: Street) -> Self {
        let (bluff, value, call, fold) = match tag {
            PlayerType::FishLoose | PlayerType::Lag => (0.7, 1.3, 1.1, 0.9),
            PlayerType::Nit => (1.4, 0.9, 0.8, 1.2),
            PlayerType::CallingStation => (0.3, 1.4, 0.9, 1.1),
            PlayerType::Tag => (1.1, 1.1, 1.0, 1.0),
            PlayerType::Unknown => (1.0, 1.0, 1.0, 1.0),
        };
        ExploitAdjustment {
            tag,
            street,
            confidence: 1.0,
            bluff_frequency: bluff,
            value_bet_frequency: value,
            call_frequency: call,
            fold_frequency: fold,
        }
    }

    /// Pull every delta towards `1.0`: `1 + (m - 1) * confidence`.
    pub fn scaled(mut self, confidence: f32) -> Self {
        let c = confidence.clamp(0.0, 1.0);
        let scale = |m: f32| 1.0 + (m - 1.0) * c;
        self.bluff_frequency = scale(self.bluff_frequency);
        self.value_bet_frequency = scale(self.value_bet_frequency);
        self.call_frequency = scale(self.call_frequency);
        self.fold_frequency = scale(self.fold_frequency);
        self.confidence = c;
        self
    }

    pub fn multiplier_for(&self, action: &Action, class: HandClass) -> f32 {
        match action {
            Action::Raise(_) | Action::AllIn => match class {
                HandClass::Value => self.value_bet_frequency,
                HandClass::Bluff => self.bluff_frequency,
            },
            Action::Call => self.call_frequency,
            Action::Fold => self.fold_frequency,
            Action::Check => 1.0,
        }
    }

    /// Multiply `probs` (in `actions` order) by the matching deltas and
    /// renormalize. An all zero result falls back to the input.
    pub fn apply(&self, actions: &[Action], probs: &[f32], class: HandClass) -> Vec<f32> {
        let adjusted: Vec<f32> = actions
            .iter()
            .zip(probs.iter())
            .map(|(a, p)| (p * self.multiplier_for(a, class)).max(0.0))
            .collect();
        let total: f32 = adjusted.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return probs.to_vec();
        }
        adjusted.iter().map(|p| p / total).collect()
    }
}
