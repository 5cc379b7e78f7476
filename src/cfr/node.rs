use std::ops::Deref;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::Action;

/// A probability distribution over a node's actions, in the node's action
/// order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Strategy(Vec<f32>);

impl Strategy {
    pub fn uniform(num_actions: usize) -> Self {
        if num_actions == 0 {
            return Strategy(Vec::new());
        }
        Strategy(vec![1.0 / num_actions as f32; num_actions])
    }

    /// Normalize non-negative weights. Negative or non finite weights count
    /// as zero and an all zero input becomes uniform.
    pub fn from_weights(mut weights: Vec<f32>) -> Self {
        for w in weights.iter_mut() {
            if !w.is_finite() || *w < 0.0 {
                *w = 0.0;
            }
        }
        let total: f32 = weights.iter().sum();
        if total <= 0.0 {
            return Strategy::uniform(weights.len());
        }
        weights.iter_mut().for_each(|w| *w /= total);
        Strategy(weights)
    }

    pub fn probs(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Weighted draw of an action index.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        let total: f32 = self.0.iter().sum();
        if self.0.is_empty() || total <= 0.0 {
            return 0;
        }
        let random_value: f32 = rng.random::<f32>() * total;
        let mut cumulative = 0.0;
        for (i, p) in self.0.iter().enumerate() {
            cumulative += p;
            if random_value < cumulative {
                return i;
            }
        }
        // Float rounding can leave the draw just past the last bucket.
        self.0.iter().rposition(|p| *p > 0.0).unwrap_or(0)
    }
}

impl Deref for Strategy {
    type Target = [f32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A regret matching node of the information set store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameNode {
    /// The seat that acts here.
    pub player: usize,
    /// Legal actions; every per action vector follows this order.
    pub actions: Vec<Action>,
    /// Cumulative counterfactual regret. Can go negative.
    pub regret_sum: Vec<f32>,
    /// Cumulative reach weighted strategy. Never negative.
    pub strategy_sum: Vec<f32>,
}

impl GameNode {
    pub fn new(actions: Vec<Action>, player: usize) -> Self {
        let n = actions.len();
        GameNode {
            player,
            actions,
            regret_sum: vec![0.0; n],
            strategy_sum: vec![0.0; n],
        }
    }

    /// Replace an empty action list; a populated one is kept.
    pub fn set_actions_if_empty(&mut self, actions: &[Action]) {
        if self.actions.is_empty() && !actions.is_empty() {
            self.actions = actions.to_vec();
            self.regret_sum = vec![0.0; actions.len()];
            self.strategy_sum = vec![0.0; actions.len()];
        }
    }

    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    /// Regret matching without touching the strategy sum.
    pub fn regret_matched(&self) -> Strategy {
        Strategy::from_weights(self.regret_sum.iter().map(|r| r.max(0.0)).collect())
    }

    /// The current regret matched strategy. Adds `reach_prob` times the
    /// strategy into the strategy sum, which is what the average strategy
    /// is later built from.
    pub fn current_strategy(&mut self, reach_prob: f32) -> Strategy {
        let strategy = self.regret_matched();
        for (sum, p) in self.strategy_sum.iter_mut().zip(strategy.iter()) {
            *sum += reach_prob * p;
        }
        strategy
    }

    /// The current strategy over `legal`, which may differ from the node's
    /// own action list (a shorter stack loses raise sizes, for one).
    ///
    /// Returns the strategy in `legal` order plus, for every legal action,
    /// its index in the node. Actions the node doesn't know get no weight
    /// unless nothing known has any, in which case play is uniform. Only
    /// known actions feed the strategy sum.
    pub fn current_strategy_for(
        &mut self,
        legal: &[Action],
        reach_prob: f32,
    ) -> (Strategy, Vec<Option<usize>>) {
        if legal == self.actions.as_slice() {
            return (self.current_strategy(reach_prob), (0..legal.len()).map(Some).collect());
        }

        let mapping: Vec<Option<usize>> = legal
            .iter()
            .map(|a| self.actions.iter().position(|known| known == a))
            .collect();
        let matched = self.regret_matched();
        let strategy = Strategy::from_weights(
            mapping
                .iter()
                .map(|idx| idx.and_then(|i| matched.get(i).copied()).unwrap_or(0.0))
                .collect(),
        );
        for (idx, p) in mapping.iter().zip(strategy.iter()) {
            if let Some(sum) = idx.and_then(|i| self.strategy_sum.get_mut(i)) {
                *sum += reach_prob * p;
            }
        }
        (strategy, mapping)
    }

    /// Normalized strategy sum, uniform if never reached.
    pub fn average_strategy(&self) -> Strategy {
        Strategy::from_weights(self.strategy_sum.clone())
    }

    /// Add `delta` to an action's regret. Returns how much the node's
    /// positive regret total changed.
    pub fn add_regret(&mut self, action_idx: usize, delta: f32) -> f32 {
        match self.regret_sum.get_mut(action_idx) {
            Some(r) => {
                let before = r.max(0.0);
                *r += delta;
                r.max(0.0) - before
            }
            None => 0.0,
        }
    }

    pub fn positive_regret_total(&self) -> f32 {
        self.regret_sum.iter().map(|r| r.max(0.0)).sum()
    }

    /// Every per action vector matches the action list.
    pub fn is_consistent(&self) -> bool {
        self.regret_sum.len() == self.actions.len()
            && self.strategy_sum.len() == self.actions.len()
    }
}
