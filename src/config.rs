//! # Engine configuration
//!
//! Everything tunable in the engine lives in one serde document, loaded from
//! JSON. Every field has a default so a partial document (or `{}`) is a
//! valid configuration.
//!
//! ```
//! use holdem_engine::config::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{"num_players": 2}"#).unwrap();
//! assert_eq!(config.num_players, 2);
//! assert_eq!(config.default_max_depth(), 12);
//! assert!(!config.anti_pattern.enabled);
//! ```
//!
//! A fuller example:
//!
//! ```json
//! {
//!   "num_players": 6,
//!   "max_raise_sizes_per_street": {"preflop": 2, "flop": 3, "turn": 3, "river": 3},
//!   "raise_sizes": {
//!     "preflop": [{"type": "big_blinds", "size": 2.0}],
//!     "flop": [{"type": "pot_fraction", "size": 0.33}, {"type": "pot_fraction", "size": 0.75}],
//!     "turn": [{"type": "pot_fraction", "size": 0.75}],
//!     "river": [{"type": "pot_fraction", "size": 1.0}]
//!   },
//!   "anti_pattern": {"enabled": true, "donk_bet_probability": 0.05},
//!   "decision_weights": {
//!     "preflop": {"gto_weight": 0.8, "exploit_weight": 0.2},
//!     "flop": {"gto_weight": 0.6, "exploit_weight": 0.4},
//!     "turn": {"gto_weight": 0.6, "exploit_weight": 0.4},
//!     "river": {"gto_weight": 0.5, "exploit_weight": 0.5}
//!   },
//!   "decision_budget_ms": 50
//! }
//! ```
use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cfr::{ConfigFingerprint, TrainerConfig};
use crate::decision::{Band, StyleCorrectionConfig, StyleTarget};
use crate::game::{BetSize, MAX_PLAYERS, Street};
use crate::humanize::AntiPatternConfig;
use crate::opponent::ExploitConfig;

/// One value for each street.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerStreet<T> {
    pub preflop: T,
    pub flop: T,
    pub turn: T,
    pub river: T,
}

impl<T> PerStreet<T> {
    pub fn get(&self, street: Street) -> &T {
        match street {
            Street::Preflop => &self.preflop,
            Street::Flop => &self.flop,
            Street::Turn => &self.turn,
            Street::River => &self.river,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Street, &T)> {
        Street::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}

/// How much of the final mix comes from the trained strategy and how much
/// from its exploit-adjusted copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionWeights {
    pub gto_weight: f32,
    pub exploit_weight: f32,
}

/// Errors that can occur while loading or checking a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("num_players must be between 2 and {max}, got {0}", max = MAX_PLAYERS)]
    InvalidPlayerCount(usize),

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("{field} must be between 0.0 and 1.0, got {value}")]
    InvalidProbability { field: &'static str, value: f32 },

    #[error("{street} raise size {size} must be finite and non-negative")]
    InvalidBetSize { street: Street, size: BetSize },

    #[error("{street} decision weights must be non-negative and not both zero")]
    InvalidDecisionWeights { street: Street },

    #[error("style target {limit}/{style} has an empty {field} band")]
    InvalidBand {
        limit: String,
        style: String,
        field: &'static str,
    },
}

fn default_num_players() -> usize {
    6
}

fn default_big_blind() -> f32 {
    1.0
}

fn default_starting_stack_bb() -> f32 {
    100.0
}

fn default_max_raise_sizes() -> PerStreet<usize> {
    PerStreet {
        preflop: 2,
        flop: 3,
        turn: 3,
        river: 3,
    }
}

fn default_raise_sizes() -> PerStreet<Vec<BetSize>> {
    PerStreet {
        preflop: vec![BetSize::BigBlinds(2.0), BetSize::PotFraction(1.0)],
        flop: vec![
            BetSize::PotFraction(0.33),
            BetSize::PotFraction(0.75),
            BetSize::PotFraction(1.0),
        ],
        turn: vec![
            BetSize::PotFraction(0.5),
            BetSize::PotFraction(0.75),
            BetSize::PotFraction(1.0),
        ],
        river: vec![
            BetSize::PotFraction(0.5),
            BetSize::PotFraction(1.0),
            BetSize::PotFraction(1.5),
        ],
    }
}

fn default_max_raises_per_round() -> Option<u8> {
    Some(3)
}

fn default_decision_weights() -> PerStreet<DecisionWeights> {
    let w = |gto_weight, exploit_weight| DecisionWeights {
        gto_weight,
        exploit_weight,
    };
    PerStreet {
        preflop: w(0.7, 0.3),
        flop: w(0.6, 0.4),
        turn: w(0.6, 0.4),
        river: w(0.5, 0.5),
    }
}

fn default_style_targets() -> Vec<StyleTarget> {
    let target = |limit: &str, style: &str, vpip, pfr, af, winrate| StyleTarget {
        limit: limit.to_string(),
        style: style.to_string(),
        vpip,
        pfr,
        af,
        winrate,
    };
    let b = Band::new;
    let mut targets = Vec::new();
    for limit in ["nl10", "nl25", "nl50", "nl100"] {
        targets.push(target(
            limit,
            "tag",
            b(19.0, 24.0),
            b(15.0, 20.0),
            b(2.5, 3.5),
            b(3.0, 8.0),
        ));
        targets.push(target(
            limit,
            "lag",
            b(26.0, 32.0),
            b(20.0, 26.0),
            b(3.0, 4.5),
            b(2.0, 9.0),
        ));
    }
    targets
}

fn default_decision_budget_ms() -> u64 {
    50
}

/// The complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seats at the table, 2 through 9.
    #[serde(default = "default_num_players")]
    pub num_players: usize,
    #[serde(default = "default_big_blind")]
    pub big_blind: f32,
    /// Training stacks, in big blinds.
    #[serde(default = "default_starting_stack_bb")]
    pub starting_stack_bb: f32,
    /// How many of each street's raise sizes the abstraction offers.
    #[serde(default = "default_max_raise_sizes")]
    pub max_raise_sizes_per_street: PerStreet<usize>,
    /// Candidate raise sizes in preference order.
    #[serde(default = "default_raise_sizes")]
    pub raise_sizes: PerStreet<Vec<BetSize>>,
    /// `None` is unlimited.
    #[serde(default = "default_max_raises_per_round")]
    pub max_raises_per_round: Option<u8>,
    #[serde(default)]
    pub anti_pattern: AntiPatternConfig,
    #[serde(default = "default_decision_weights")]
    pub decision_weights: PerStreet<DecisionWeights>,
    #[serde(default = "default_style_targets")]
    pub style_targets: Vec<StyleTarget>,
    #[serde(default)]
    pub exploit: ExploitConfig,
    #[serde(default)]
    pub style_correction: StyleCorrectionConfig,
    /// Wall clock budget for one decision.
    #[serde(default = "default_decision_budget_ms")]
    pub decision_budget_ms: u64,
    #[serde(default)]
    pub trainer: TrainerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_players: default_num_players(),
            big_blind: default_big_blind(),
            starting_stack_bb: default_starting_stack_bb(),
            max_raise_sizes_per_street: default_max_raise_sizes(),
            raise_sizes: default_raise_sizes(),
            max_raises_per_round: default_max_raises_per_round(),
            anti_pattern: AntiPatternConfig::default(),
            decision_weights: default_decision_weights(),
            style_targets: default_style_targets(),
            exploit: ExploitConfig::default(),
            style_correction: StyleCorrectionConfig::default(),
            decision_budget_ms: default_decision_budget_ms(),
            trainer: TrainerConfig::default(),
        }
    }
}

fn check_probability(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { field, value })
    }
}

fn check_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=MAX_PLAYERS).contains(&self.num_players) {
            return Err(ConfigError::InvalidPlayerCount(self.num_players));
        }
        check_positive("big_blind", self.big_blind)?;
        check_positive("starting_stack_bb", self.starting_stack_bb)?;

        for (street, sizes) in self.raise_sizes.iter() {
            for size in sizes {
                let v = match *size {
                    BetSize::PotFraction(f) => f,
                    BetSize::BigBlinds(x) => x,
                };
                if !v.is_finite() || v < 0.0 {
                    return Err(ConfigError::InvalidBetSize {
                        street,
                        size: *size,
                    });
                }
            }
        }

        for (street, w) in self.decision_weights.iter() {
            let ok = w.gto_weight >= 0.0
                && w.exploit_weight >= 0.0
                && w.gto_weight + w.exploit_weight > 0.0;
            if !ok {
                return Err(ConfigError::InvalidDecisionWeights { street });
            }
        }

        for target in &self.style_targets {
            let bands = [
                ("vpip", target.vpip),
                ("pfr", target.pfr),
                ("af", target.af),
                ("winrate", target.winrate),
            ];
            for (field, band) in bands {
                if band.min > band.max {
                    return Err(ConfigError::InvalidBand {
                        limit: target.limit.clone(),
                        style: target.style.clone(),
                        field,
                    });
                }
            }
        }

        let ap = &self.anti_pattern;
        check_probability("anti_pattern.donk_bet_probability", ap.donk_bet_probability)?;
        check_probability("anti_pattern.min_raise_probability", ap.min_raise_probability)?;
        check_probability(
            "anti_pattern.check_behind_probability",
            ap.check_behind_probability,
        )?;
        check_probability(
            "anti_pattern.check_behind_threshold",
            ap.check_behind_threshold,
        )?;

        check_probability("exploit.min_confidence", self.exploit.min_confidence)?;
        check_positive(
            "exploit.confidence_saturation_hands",
            self.exploit.confidence_saturation_hands as f32,
        )?;
        check_probability("style_correction.nudge", self.style_correction.nudge)?;
        check_positive(
            "style_correction.window_hands",
            self.style_correction.window_hands as f32,
        )?;
        check_positive("trainer.batch_size", self.trainer.batch_size as f32)?;
        Ok(())
    }

    /// Recursion budget for a traversal: 12 decisions heads up, three more
    /// for every four extra seats.
    pub fn default_max_depth(&self) -> usize {
        12 + (self.num_players.saturating_sub(2) * 3).div_ceil(4)
    }

    /// The trainer's depth limit, honouring an explicit override.
    pub fn max_depth(&self) -> usize {
        self.trainer.max_depth.unwrap_or_else(|| self.default_max_depth())
    }

    /// A sensible number of training iterations for the table size. Doubles
    /// with every seat past heads up.
    pub fn recommended_iterations(&self) -> u64 {
        let extra_seats = self.num_players.saturating_sub(2).min(16) as u32;
        50_000u64 << extra_seats
    }

    pub fn starting_stack(&self) -> f32 {
        self.starting_stack_bb * self.big_blind
    }

    pub fn fingerprint(&self) -> ConfigFingerprint {
        let offered = |street: Street| -> Vec<BetSize> {
            self.raise_sizes
                .get(street)
                .iter()
                .take(*self.max_raise_sizes_per_street.get(street))
                .copied()
                .collect()
        };
        ConfigFingerprint {
            max_raise_sizes_per_street: self.max_raise_sizes_per_street.clone(),
            num_players: self.num_players,
            raise_sizes: PerStreet {
                preflop: offered(Street::Preflop),
                flop: offered(Street::Flop),
                turn: offered(Street::Turn),
                river: offered(Street::River),
            },
            max_raises_per_round: self.max_raises_per_round,
            starting_stack_bb: self.starting_stack_bb,
        }
    }

    pub fn decision_budget(&self) -> Duration {
        Duration::from_millis(self.decision_budget_ms)
    }

    pub fn style_target(&self, limit: &str, style: &str) -> Option<&StyleTarget> {
        self.style_targets
            .iter()
            .find(|t| t.limit == limit && t.style == style)
    }
}
