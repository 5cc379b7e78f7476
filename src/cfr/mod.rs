//! Counterfactual regret minimization over the abstracted game.
//!
//! [`Trainer`] runs external sampling MCCFR self play and accumulates
//! regrets into an [`InfoSetStore`] it owns. The store is handed to serving
//! only through a [`Checkpoint`].
mod action_abstraction;
mod checkpoint;
mod convergence;
mod info_set;
mod node;
mod store;
mod trainer;

pub use action_abstraction::ActionAbstraction;
pub use checkpoint::{
    CHECKPOINT_FORMAT_VERSION, Checkpoint, CheckpointError, CheckpointNode, ConfigFingerprint,
};
pub use convergence::{
    ConvergenceHistory, DEFAULT_HISTORY_CAPACITY, normalized_positive_regret, normalized_regret,
};
pub use info_set::InfoSetKey;
pub use node::{GameNode, Strategy};
pub use store::InfoSetStore;
pub use trainer::{Trainer, TrainerConfig, TrainerError, TrainingReport};
