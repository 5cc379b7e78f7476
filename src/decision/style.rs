use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::game::Action;

/// An inclusive `[min, max]` target range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f32,
    pub max: f32,
}

impl Band {
    pub const fn new(min: f32, max: f32) -> Self {
        Band { min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Target statistics for one (limit, style) pair, e.g. `nl50`/`tag`.
/// Percentages are in `0..=100`, winrate in bb/100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleTarget {
    pub limit: String,
    pub style: String,
    pub vpip: Band,
    pub pfr: Band,
    pub af: Band,
    pub winrate: Band,
}

fn default_band_points() -> f32 {
    2.0
}

fn default_nudge() -> f32 {
    0.10
}

fn default_window_hands() -> usize {
    100
}

fn default_min_hands() -> usize {
    20
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleCorrectionConfig {
    /// How far outside the target band VPIP may drift before correcting.
    #[serde(default = "default_band_points")]
    pub band_points: f32,
    /// Relative change applied to call and raise probabilities.
    #[serde(default = "default_nudge")]
    pub nudge: f32,
    /// Hands in the rolling window.
    #[serde(default = "default_window_hands")]
    pub window_hands: usize,
    /// No correction until the window holds this many hands.
    #[serde(default = "default_min_hands")]
    pub min_hands: usize,
}

impl Default for StyleCorrectionConfig {
    fn default() -> Self {
        Self {
            band_points: default_band_points(),
            nudge: default_nudge(),
            window_hands: default_window_hands(),
            min_hands: default_min_hands(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleNudge {
    #[default]
    None,
    /// Playing too many hands: calls and raises scaled down.
    Tighten,
    /// Playing too few: calls and raises scaled up.
    Loosen,
}

impl StyleNudge {
    /// Pick a nudge for the observed VPIP against `target`.
    pub fn for_vpip(vpip: f32, target: &Band, config: &StyleCorrectionConfig) -> Self {
        if vpip > target.max + config.band_points {
            StyleNudge::Tighten
        } else if vpip < target.min - config.band_points {
            StyleNudge::Loosen
        } else {
            StyleNudge::None
        }
    }

    pub fn factor(&self, nudge: f32) -> f32 {
        match self {
            StyleNudge::None => 1.0,
            StyleNudge::Tighten => 1.0 - nudge,
            StyleNudge::Loosen => 1.0 + nudge,
        }
    }

    /// Scale call, raise and all in probabilities and renormalize.
    pub fn apply(&self, actions: &[Action], probs: &[f32], nudge: f32) -> Vec<f32> {
        if *self == StyleNudge::None {
            return probs.to_vec();
        }
        let factor = self.factor(nudge);
        let scaled: Vec<f32> = actions
            .iter()
            .zip(probs.iter())
            .map(|(a, p)| match a {
                Action::Call | Action::Raise(_) | Action::AllIn => p * factor,
                Action::Fold | Action::Check => *p,
            })
            .collect();
        let total: f32 = scaled.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return probs.to_vec();
        }
        scaled.iter().map(|p| p / total).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HandStyle {
    vpip: bool,
    pfr: bool,
}

/// Rolling window of the hero's own preflop stats.
#[derive(Debug, Clone)]
pub struct StyleTracker {
    capacity: usize,
    hands: VecDeque<HandStyle>,
}

impl StyleTracker {
    pub fn new(capacity: usize) -> Self {
        StyleTracker {
            capacity: capacity.max(1),
            hands: VecDeque::new(),
        }
    }

    pub fn record_hand(&mut self, vpip: bool, pfr: bool) {
        if self.hands.len() == self.capacity {
            self.hands.pop_front();
        }
        self.hands.push_back(HandStyle { vpip, pfr });
    }

    pub fn len(&self) -> usize {
        self.hands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    fn percent(&self, f: impl Fn(&HandStyle) -> bool) -> Option<f32> {
        if self.hands.is_empty() {
            return None;
        }
        let hits = self.hands.iter().filter(|h| f(h)).count();
        Some(hits as f32 * 100.0 / self.hands.len() as f32)
    }

    pub fn vpip(&self) -> Option<f32> {
        self.percent(|h| h.vpip)
    }

    pub fn pfr(&self) -> Option<f32> {
        self.percent(|h| h.pfr)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::game::BetSize;

    #[test]
    fn test_band() {
        let b = Band::new(19.0, 24.0);
        assert!(b.contains(19.0));
        assert!(b.contains(24.0));
        assert!(!b.contains(24.5));
    }

    #[test]
    fn test_nudge_selection() {
        let config = StyleCorrectionConfig::default();
        let target = Band::new(19.0, 24.0);
        assert_eq!(StyleNudge::None, StyleNudge::for_vpip(25.5, &target, &config));
        assert_eq!(StyleNudge::Tighten, StyleNudge::for_vpip(26.5, &target, &config));
        assert_eq!(StyleNudge::None, StyleNudge::for_vpip(17.5, &target, &config));
        assert_eq!(StyleNudge::Loosen, StyleNudge::for_vpip(16.0, &target, &config));
    }

    #[test]
    fn test_apply_tighten() {
        let actions = [
            Action::Fold,
            Action::Call,
            Action::Raise(BetSize::BigBlinds(2.0)),
        ];
        let probs = [0.2, 0.4, 0.4];
        let out = StyleNudge::Tighten.apply(&actions, &probs, 0.1);
        // 0.2 + 0.36 + 0.36 = 0.92
        assert_relative_eq!(0.2 / 0.92, out[0], epsilon = 1e-6);
        assert_relative_eq!(1.0, out.iter().sum::<f32>(), epsilon = 1e-6);
        assert_eq!(probs.to_vec(), StyleNudge::None.apply(&actions, &probs, 0.1));
    }

    #[test]
    fn test_tracker_window() {
        let mut tracker = StyleTracker::new(4);
        assert_eq!(None, tracker.vpip());
        tracker.record_hand(true, true);
        tracker.record_hand(true, false);
        tracker.record_hand(false, false);
        tracker.record_hand(false, false);
        assert_relative_eq!(50.0, tracker.vpip().unwrap());
        assert_relative_eq!(25.0, tracker.pfr().unwrap());
        tracker.record_hand(false, false);
        assert_eq!(4, tracker.len());
        assert_relative_eq!(25.0, tracker.vpip().unwrap());
        assert_relative_eq!(0.0, tracker.pfr().unwrap());
    }
}
