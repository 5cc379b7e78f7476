use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::{ActionKind, ObservedAction, Street};

/// Rule based opponent classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerType {
    FishLoose,
    Nit,
    Tag,
    Lag,
    CallingStation,
    #[default]
    Unknown,
}

impl fmt::Display for PlayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlayerType::FishLoose => "fish_loose",
            PlayerType::Nit => "nit",
            PlayerType::Tag => "tag",
            PlayerType::Lag => "lag",
            PlayerType::CallingStation => "calling_station",
            PlayerType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// What one hand showed about one opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HandObservation {
    /// Put money in preflop voluntarily.
    pub vpip: bool,
    /// Raised preflop.
    pub pfr: bool,
    /// Acted preflop facing exactly one raise.
    pub three_bet_opportunity: bool,
    /// Re-raised when given that opportunity.
    pub three_bet: bool,
    /// Bets, raises and all ins on any street.
    pub aggressive_actions: u32,
    pub calls: u32,
}

impl HandObservation {
    /// Summarize `seat`'s play from the hand's full action sequence. Other
    /// seats' actions are needed to know when a re-raise was possible.
    pub fn from_actions(seat: usize, actions: &[ObservedAction]) -> Self {
        let mut obs = HandObservation::default();
        let mut preflop_raises = 0;
        for action in actions {
            if action.seat == seat {
                if action.street == Street::Preflop {
                    obs.vpip |= action.kind.is_voluntary();
                    obs.pfr |= action.kind.is_aggressive();
                    if preflop_raises == 1 && !obs.three_bet_opportunity {
                        obs.three_bet_opportunity = true;
                        obs.three_bet = action.kind.is_aggressive();
                    }
                }
                match action.kind {
                    ActionKind::Raise | ActionKind::AllIn => obs.aggressive_actions += 1,
                    ActionKind::Call => obs.calls += 1,
                    ActionKind::Fold | ActionKind::Check => {}
                }
            }
            if action.street == Street::Preflop && action.kind.is_aggressive() {
                preflop_raises += 1;
            }
        }
        obs
    }
}

/// Running statistics for one opponent. Percentages are in `0..=100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentProfile {
    pub id: String,
    pub hands_observed: u32,
    pub vpip: f32,
    pub pfr: f32,
    /// Re-raise percentage over the hands that offered one.
    pub three_bet: f32,
    pub three_bet_opportunities: u32,
    pub aggressive_actions: u64,
    pub calls: u64,
    pub player_type: PlayerType,
}

/// `(old * (n - 1) + hit * 100) / n`
fn running_percent(old: f32, n: u32, hit: bool) -> f32 {
    let n = n as f32;
    let observation = if hit { 100.0 } else { 0.0 };
    (old * (n - 1.0) + observation) / n
}

impl OpponentProfile {
    pub fn new(id: impl Into<String>) -> Self {
        OpponentProfile {
            id: id.into(),
            hands_observed: 0,
            vpip: 0.0,
            pfr: 0.0,
            three_bet: 0.0,
            three_bet_opportunities: 0,
            aggressive_actions: 0,
            calls: 0,
            player_type: PlayerType::Unknown,
        }
    }

    /// Fold one hand into the running stats and reclassify.
    pub fn record(&mut self, obs: &HandObservation, min_hands_to_classify: u32) {
        self.hands_observed += 1;
        self.vpip = running_percent(self.vpip, self.hands_observed, obs.vpip);
        self.pfr = running_percent(self.pfr, self.hands_observed, obs.pfr);
        if obs.three_bet_opportunity {
            self.three_bet_opportunities += 1;
            self.three_bet =
                running_percent(self.three_bet, self.three_bet_opportunities, obs.three_bet);
        }
        self.aggressive_actions += u64::from(obs.aggressive_actions);
        self.calls += u64::from(obs.calls);
        self.player_type = self.classify(min_hands_to_classify);
    }

    /// (bets + raises) / calls. Zero with no actions at all, infinite with
    /// aggression but no calls.
    pub fn aggression_factor(&self) -> f32 {
        if self.calls == 0 {
            if self.aggressive_actions == 0 {
                0.0
            } else {
                f32::INFINITY
            }
        } else {
            self.aggressive_actions as f32 / self.calls as f32
        }
    }

    /// The first matching rule wins; nothing is decided before
    /// `min_hands` hands.
    pub fn classify(&self, min_hands: u32) -> PlayerType {
        if self.hands_observed < min_hands {
            return PlayerType::Unknown;
        }
        let vpip = self.vpip;
        let pfr = self.pfr;
        let af = self.aggression_factor();
        if vpip >= 40.0 {
            PlayerType::FishLoose
        } else if vpip < 18.0 {
            PlayerType::Nit
        } else if af < 1.0 && vpip > 20.0 {
            PlayerType::CallingStation
        } else if (18.0..=25.0).contains(&vpip) && pfr >= 0.8 * vpip && af >= 2.0 {
            PlayerType::Tag
        } else if (28.0..=35.0).contains(&vpip) && pfr >= 0.7 * vpip && af >= 2.5 {
            PlayerType::Lag
        } else {
            PlayerType::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn act(seat: usize, street: Street, kind: ActionKind) -> ObservedAction {
        ObservedAction::new(seat, street, kind, None)
    }

    fn profile_with(vpip: f32, pfr: f32, aggressive: u64, calls: u64, hands: u32) -> OpponentProfile {
        OpponentProfile {
            hands_observed: hands,
            vpip,
            pfr,
            aggressive_actions: aggressive,
            calls,
            ..OpponentProfile::new("villain")
        }
    }

    #[test]
    fn test_observation_from_actions() {
        let actions = vec![
            act(3, Street::Preflop, ActionKind::Raise),
            act(4, Street::Preflop, ActionKind::Raise),
            act(3, Street::Preflop, ActionKind::Call),
            act(3, Street::Flop, ActionKind::Check),
            act(4, Street::Flop, ActionKind::Raise),
            act(3, Street::Flop, ActionKind::Call),
        ];
        let opener = HandObservation::from_actions(3, &actions);
        assert!(opener.vpip);
        assert!(opener.pfr);
        assert!(!opener.three_bet_opportunity);
        assert_eq!(1, opener.aggressive_actions);
        assert_eq!(2, opener.calls);

        let three_bettor = HandObservation::from_actions(4, &actions);
        assert!(three_bettor.three_bet_opportunity);
        assert!(three_bettor.three_bet);
        assert_eq!(2, three_bettor.aggressive_actions);
    }

    #[test]
    fn test_fold_to_raise_is_missed_three_bet() {
        let actions = vec![
            act(0, Street::Preflop, ActionKind::Raise),
            act(1, Street::Preflop, ActionKind::Fold),
        ];
        let obs = HandObservation::from_actions(1, &actions);
        assert!(!obs.vpip);
        assert!(obs.three_bet_opportunity);
        assert!(!obs.three_bet);
    }

    #[test]
    fn test_running_percentages() {
        let mut profile = OpponentProfile::new("villain");
        let played = HandObservation {
            vpip: true,
            ..Default::default()
        };
        profile.record(&played, 20);
        assert_relative_eq!(100.0, profile.vpip);
        profile.record(&HandObservation::default(), 20);
        assert_relative_eq!(50.0, profile.vpip);
        profile.record(&HandObservation::default(), 20);
        profile.record(&HandObservation::default(), 20);
        assert_relative_eq!(25.0, profile.vpip);
        assert_relative_eq!(0.0, profile.pfr);
        assert_eq!(4, profile.hands_observed);
        assert_eq!(0, profile.three_bet_opportunities);
    }

    #[test]
    fn test_aggression_factor() {
        assert_eq!(0.0, profile_with(0.0, 0.0, 0, 0, 0).aggression_factor());
        assert_eq!(
            f32::INFINITY,
            profile_with(0.0, 0.0, 3, 0, 0).aggression_factor()
        );
        assert_relative_eq!(2.5, profile_with(0.0, 0.0, 5, 2, 0).aggression_factor());
    }

    #[test]
    fn test_classification_cascade() {
        assert_eq!(PlayerType::Unknown, profile_with(50.0, 5.0, 1, 9, 19).classify(20));
        assert_eq!(PlayerType::FishLoose, profile_with(50.0, 5.0, 1, 9, 20).classify(20));
        assert_eq!(PlayerType::Nit, profile_with(12.0, 10.0, 9, 3, 40).classify(20));
        assert_eq!(
            PlayerType::CallingStation,
            profile_with(30.0, 5.0, 1, 4, 40).classify(20)
        );
        assert_eq!(PlayerType::Tag, profile_with(22.0, 19.0, 6, 2, 40).classify(20));
        assert_eq!(PlayerType::Lag, profile_with(30.0, 24.0, 9, 3, 40).classify(20));
        // Loose but passive enough pre-flop to miss both bands.
        assert_eq!(PlayerType::Unknown, profile_with(26.0, 10.0, 4, 2, 40).classify(20));
    }
}
