use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, event, info, trace, warn, Level};

use crate::config::{ConfigError, EngineConfig};
use crate::game::{GameState, GameStateError, sanitize, validate};

use super::action_abstraction::ActionAbstraction;
use super::checkpoint::{Checkpoint, CheckpointError};
use super::convergence::{ConvergenceHistory, normalized_regret};
use super::info_set::InfoSetKey;
use super::store::InfoSetStore;

fn default_batch_size() -> u64 {
    100
}

/// Trainer knobs inside `EngineConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Fixed RNG seed; `None` seeds from the thread RNG.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Iterations between stop checks and progress logs.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    /// Overrides the player count based depth limit.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            seed: None,
            batch_size: default_batch_size(),
            max_depth: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("couldn't set up a training hand: {0}")]
    GameState(#[from] GameStateError),
}

/// Summary of one `train` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Iterations run by this call.
    pub iterations_run: u64,
    /// Iterations in the store's lifetime, including resumed ones.
    pub total_iterations: u64,
    pub stopped_early: bool,
    pub nodes: usize,
    /// Last recorded convergence value.
    pub convergence: Option<f32>,
    /// Hands dropped because sanitizing couldn't make them valid.
    pub skipped_samples: u64,
}

/// External sampling Monte Carlo CFR over the abstracted game.
///
/// Each iteration deals a fresh hand, rotating the button, and traverses it
/// once with every seat as the traverser. The trainer owns its store; two
/// trainers never share state.
#[derive(Debug)]
pub struct Trainer {
    config: EngineConfig,
    abstraction: ActionAbstraction,
    store: InfoSetStore,
    rng: StdRng,
    iterations: u64,
    skipped_samples: u64,
    max_depth: usize,
    convergence: ConvergenceHistory,
    /// Running sum of positive regret over the store.
    positive_regret: f64,
    stop: Arc<AtomicBool>,
}

impl Trainer {
    pub fn new(config: EngineConfig) -> Result<Self, TrainerError> {
        config.validate()?;
        let rng = match config.trainer.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Ok(Trainer {
            abstraction: ActionAbstraction::from_config(&config),
            max_depth: config.max_depth(),
            store: InfoSetStore::new(),
            rng,
            iterations: 0,
            skipped_samples: 0,
            convergence: ConvergenceHistory::new(),
            positive_regret: 0.0,
            stop: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// Continue from a checkpoint written under the same configuration
    /// fingerprint.
    pub fn resume(config: EngineConfig, checkpoint: Checkpoint) -> Result<Self, TrainerError> {
        let mut trainer = Trainer::new(config)?;
        checkpoint.check_fingerprint(&trainer.config.fingerprint())?;
        trainer.iterations = checkpoint.iterations;
        trainer.store = checkpoint.into_store()?;
        trainer.positive_regret = trainer.store.positive_regret_total();
        info!(
            iterations = trainer.iterations,
            nodes = trainer.store.len(),
            "Resumed training from checkpoint"
        );
        Ok(trainer)
    }

    /// Setting the returned flag stops `train` at the next batch boundary.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn store(&self) -> &InfoSetStore {
        &self.store
    }

    pub fn into_store(self) -> InfoSetStore {
        self.store
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn convergence(&self) -> &ConvergenceHistory {
        &self.convergence
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn abstraction(&self) -> &ActionAbstraction {
        &self.abstraction
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run up to `iterations` iterations in batches, checking the stop flag
    /// before each batch.
    pub fn train(&mut self, iterations: u64) -> Result<TrainingReport, TrainerError> {
        let batch_size = self.config.trainer.batch_size.max(1);
        let mut run = 0;
        let mut stopped_early = false;

        while run < iterations {
            if self.stop.load(Ordering::Relaxed) {
                stopped_early = true;
                info!(run, "Training stopped at batch boundary");
                break;
            }
            let batch = batch_size.min(iterations - run);
            for _ in 0..batch {
                self.run_iteration()?;
            }
            run += batch;
            event!(
                Level::INFO,
                iterations = self.iterations,
                nodes = self.store.len(),
                mean_positive_regret = self.convergence.last().unwrap_or(0.0),
                "Finished training batch"
            );
        }

        Ok(TrainingReport {
            iterations_run: run,
            total_iterations: self.iterations,
            stopped_early,
            nodes: self.store.len(),
            convergence: self.convergence.last(),
            skipped_samples: self.skipped_samples,
        })
    }

    /// Deal a fresh hand and train on it.
    pub fn run_iteration(&mut self) -> Result<(), TrainerError> {
        let n = self.config.num_players;
        let dealer_idx = (self.iterations % n as u64) as usize;
        let mut state = GameState::new_hand(
            vec![self.config.starting_stack(); n],
            self.config.big_blind,
            dealer_idx,
            self.config.max_raises_per_round,
        )?;
        state.deal_hole_cards(&mut self.rng)?;
        self.run_sample(state);
        Ok(())
    }

    /// Train on a given starting state, one traversal per seat.
    ///
    /// A state that fails validation is sanitized and used if that fixes
    /// it. Missing hole cards are dealt. Returns `false` when the sample had
    /// to be skipped; the iteration still counts.
    pub fn run_sample(&mut self, state: GameState) -> bool {
        let state = match self.prepare_sample(state) {
            Some(state) => state,
            None => {
                self.skipped_samples += 1;
                self.finish_iteration();
                return false;
            }
        };

        for traverser in 0..state.num_players {
            let reach = vec![1.0; state.num_players];
            let utility = self.traverse(&state, &reach, traverser, 0);
            trace!(traverser, utility, "Traversal finished");
        }
        self.finish_iteration();
        true
    }

    fn prepare_sample(&mut self, state: GameState) -> Option<GameState> {
        let mut state = match validate(&state) {
            Ok(()) => state,
            Err(reason) => {
                warn!(%reason, "Invalid training sample, sanitizing");
                let clean = sanitize(&state);
                if let Err(reason) = validate(&clean) {
                    warn!(%reason, "Sanitized sample is still invalid, skipping");
                    return None;
                }
                clean
            }
        };
        if let Err(e) = state.deal_hole_cards(&mut self.rng) {
            warn!(error = %e, "Couldn't deal hole cards, skipping sample");
            return None;
        }
        Some(state)
    }

    fn finish_iteration(&mut self) {
        self.iterations += 1;
        self.convergence.record(normalized_regret(
            self.positive_regret,
            self.store.action_slots(),
            self.iterations,
        ));
    }

    /// One external sampling pass below `state`.
    ///
    /// * `reach` - Probability of each seat playing to this state.
    /// * `traverser` - The seat whose regrets are updated on this pass.
    /// * `depth` - Decisions made so far on this path.
    ///
    /// Returns the traverser's expected chips won or lost. Paths cut off by
    /// the depth limit are worth zero.
    pub fn traverse(&mut self, state: &GameState, reach: &[f32], traverser: usize, depth: usize) -> f32 {
        if state.is_terminal() {
            return match state.payoffs() {
                Ok(payoffs) => payoffs.get(traverser).copied().unwrap_or(0.0),
                Err(e) => {
                    warn!(error = %e, "Terminal state without a payoff");
                    0.0
                }
            };
        }

        if state.needs_deal() {
            let mut next = state.clone();
            return match next.deal_next_street(&mut self.rng) {
                Ok(()) => self.traverse(&next, reach, traverser, depth),
                Err(e) => {
                    warn!(error = %e, "Couldn't deal the next street");
                    0.0
                }
            };
        }

        if depth >= self.max_depth {
            return 0.0;
        }

        let actions = self.abstraction.legal_actions(state);
        if actions.is_empty() {
            debug!(seat = state.to_act_idx, "No legal actions at a decision");
            return 0.0;
        }
        let player = state.to_act_idx;
        let key = InfoSetKey::from_state(state);
        let own_reach = reach.get(player).copied().unwrap_or(0.0);
        let (strategy, mapping) = self
            .store
            .get_or_create_node(&key, &actions, player)
            .current_strategy_for(&actions, own_reach);
        if mapping.iter().any(Option::is_none) {
            warn!(
                %key,
                unmatched = mapping.iter().filter(|m| m.is_none()).count(),
                "Legal actions missing from the stored node"
            );
        }

        if player == traverser {
            let mut utilities = vec![0.0; actions.len()];
            for (i, action) in actions.iter().enumerate() {
                let mut next = state.clone();
                if let Err(e) = next.apply(*action) {
                    warn!(error = %e, %action, "Legal action rejected");
                    continue;
                }
                let mut next_reach = reach.to_vec();
                next_reach[player] *= strategy[i];
                utilities[i] = self.traverse(&next, &next_reach, traverser, depth + 1);
            }

            let node_utility: f32 = utilities
                .iter()
                .zip(strategy.iter())
                .map(|(u, p)| u * p)
                .sum();
            let counterfactual_reach: f32 = reach
                .iter()
                .enumerate()
                .filter(|(seat, _)| *seat != traverser)
                .map(|(_, r)| *r)
                .product();

            if let Some(node) = self.store.get_mut(&key) {
                for (idx, utility) in mapping.iter().zip(utilities.iter()) {
                    if let Some(idx) = idx {
                        self.positive_regret += node
                            .add_regret(*idx, counterfactual_reach * (utility - node_utility))
                            as f64;
                    }
                }
            }
            node_utility
        } else {
            let idx = strategy.sample(&mut self.rng);
            let mut next = state.clone();
            if let Err(e) = next.apply(actions[idx]) {
                warn!(error = %e, action = %actions[idx], "Sampled action rejected");
                return 0.0;
            }
            let mut next_reach = reach.to_vec();
            next_reach[player] *= strategy[idx];
            self.traverse(&next, &next_reach, traverser, depth + 1)
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::from_store(&self.store, self.iterations, self.config.fingerprint())
    }

    pub fn save_checkpoint(
        &self,
        path: impl AsRef<std::path::Path> + std::fmt::Debug,
    ) -> Result<(), TrainerError> {
        self.checkpoint().save(path)?;
        Ok(())
    }
}
