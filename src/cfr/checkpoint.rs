//! # Checkpoint artifact
//!
//! A checkpoint is the whole information set store written as one
//! self-describing JSON document:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "iterations": 50000,
//!   "fingerprint": {
//!     "max_raise_sizes_per_street": {"preflop": 2, "flop": 3, "turn": 3, "river": 3},
//!     "num_players": 6,
//!     "raise_sizes": {
//!       "preflop": [{"type": "big_blinds", "size": 2.0}, {"type": "pot_fraction", "size": 1.0}],
//!       "flop": [{"type": "pot_fraction", "size": 0.33}],
//!       "turn": [{"type": "pot_fraction", "size": 0.5}],
//!       "river": [{"type": "pot_fraction", "size": 1.0}]
//!     },
//!     "max_raises_per_round": 3,
//!     "starting_stack_bb": 100.0
//!   },
//!   "node_count": 1,
//!   "nodes": [
//!     {
//!       "key": "preflop|3||",
//!       "player": 3,
//!       "actions": [{"type": "fold"}, {"type": "call"}, {"type": "all_in"}],
//!       "regret_sum": [0.0, 1.5, -0.5],
//!       "strategy_sum": [10.0, 30.0, 2.0]
//!     }
//!   ]
//! }
//! ```
//!
//! Saving writes to a temporary file next to the target and renames it over
//! the target, so a reader sees either the previous checkpoint or the new
//! one and never a partial write.
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::PerStreet;
use crate::game::{Action, BetSize};

use super::info_set::InfoSetKey;
use super::node::GameNode;
use super::store::InfoSetStore;

pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// The parts of the configuration that shape the trained tree. A checkpoint
/// is only meaningful for a configuration with the same fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFingerprint {
    pub max_raise_sizes_per_street: PerStreet<usize>,
    pub num_players: usize,
    /// The raise sizes the abstraction actually offers on each street.
    pub raise_sizes: PerStreet<Vec<BetSize>>,
    pub max_raises_per_round: Option<u8>,
    pub starting_stack_bb: f32,
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported checkpoint format version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("checkpoint declares {declared} nodes but contains {actual}")]
    NodeCountMismatch { declared: usize, actual: usize },

    #[error("node {key} has {actions} actions but {regrets} regrets and {strategies} strategy sums")]
    MalformedNode {
        key: String,
        actions: usize,
        regrets: usize,
        strategies: usize,
    },

    #[error("checkpoint fingerprint {found:?} does not match configuration {expected:?}")]
    FingerprintMismatch {
        expected: ConfigFingerprint,
        found: ConfigFingerprint,
    },
}

/// One serialized node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointNode {
    pub key: InfoSetKey,
    pub player: usize,
    pub actions: Vec<Action>,
    pub regret_sum: Vec<f32>,
    pub strategy_sum: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub format_version: u32,
    pub iterations: u64,
    pub fingerprint: ConfigFingerprint,
    pub node_count: usize,
    pub nodes: Vec<CheckpointNode>,
}

impl Checkpoint {
    /// Snapshot a store. Nodes are ordered by key so the same store always
    /// serializes to the same bytes.
    pub fn from_store(store: &InfoSetStore, iterations: u64, fingerprint: ConfigFingerprint) -> Self {
        let mut nodes: Vec<CheckpointNode> = store
            .iter()
            .map(|(key, node)| CheckpointNode {
                key: key.clone(),
                player: node.player,
                actions: node.actions.clone(),
                regret_sum: node.regret_sum.clone(),
                strategy_sum: node.strategy_sum.clone(),
            })
            .collect();
        nodes.sort_by(|a, b| a.key.cmp(&b.key));
        Checkpoint {
            format_version: CHECKPOINT_FORMAT_VERSION,
            iterations,
            fingerprint,
            node_count: nodes.len(),
            nodes,
        }
    }

    /// Rebuild the store. The checkpoint is validated first.
    pub fn into_store(self) -> Result<InfoSetStore, CheckpointError> {
        self.validate()?;
        let mut store = InfoSetStore::new();
        for node in self.nodes {
            store.insert(
                node.key,
                GameNode {
                    player: node.player,
                    actions: node.actions,
                    regret_sum: node.regret_sum,
                    strategy_sum: node.strategy_sum,
                },
            );
        }
        Ok(store)
    }

    /// Structural checks: known version, declared node count and per node
    /// vector lengths.
    pub fn validate(&self) -> Result<(), CheckpointError> {
        if self.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.format_version,
                expected: CHECKPOINT_FORMAT_VERSION,
            });
        }
        if self.node_count != self.nodes.len() {
            return Err(CheckpointError::NodeCountMismatch {
                declared: self.node_count,
                actual: self.nodes.len(),
            });
        }
        for node in &self.nodes {
            let n = node.actions.len();
            if node.regret_sum.len() != n || node.strategy_sum.len() != n {
                return Err(CheckpointError::MalformedNode {
                    key: node.key.to_string(),
                    actions: n,
                    regrets: node.regret_sum.len(),
                    strategies: node.strategy_sum.len(),
                });
            }
        }
        Ok(())
    }

    pub fn check_fingerprint(&self, expected: &ConfigFingerprint) -> Result<(), CheckpointError> {
        if &self.fingerprint == expected {
            Ok(())
        } else {
            Err(CheckpointError::FingerprintMismatch {
                expected: expected.clone(),
                found: self.fingerprint.clone(),
            })
        }
    }

    /// Write the checkpoint atomically.
    #[instrument(level = "debug", skip(self), fields(nodes = self.node_count, iterations = self.iterations))]
    pub fn save(&self, path: impl AsRef<Path> + std::fmt::Debug) -> Result<(), CheckpointError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            debug!(?parent, "Creating checkpoint directory");
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = temp_path_for(path);
        let result = self.write_to(&tmp_path).and_then(|_| {
            std::fs::rename(&tmp_path, path)?;
            Ok(())
        });
        if result.is_err() {
            // Best effort; the original error is what matters.
            let _ = std::fs::remove_file(&tmp_path);
        }
        result
    }

    fn write_to(&self, path: &Path) -> Result<(), CheckpointError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Read and validate a checkpoint.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let file = File::open(path.as_ref())?;
        let checkpoint: Checkpoint = serde_json::from_reader(BufReader::new(file))?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "checkpoint".to_string());
    path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::now_v7()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn sample_store() -> InfoSetStore {
        let mut store = InfoSetStore::new();
        let node = store.get_or_create_node(
            &InfoSetKey::from("preflop|3||".to_string()),
            &[Action::Fold, Action::Call, Action::AllIn],
            3,
        );
        node.add_regret(1, 1.5);
        node.current_strategy(1.0);
        store.get_or_create_node(
            &InfoSetKey::from("flop|1|2c3d4h|c,k/".to_string()),
            &[Action::Check, Action::AllIn],
            1,
        );
        store
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("holdem-engine-{}", uuid::Uuid::now_v7()))
            .join(name)
    }

    #[test]
    fn test_save_and_load() {
        let store = sample_store();
        let fingerprint = EngineConfig::default().fingerprint();
        let checkpoint = Checkpoint::from_store(&store, 42, fingerprint.clone());
        assert_eq!(2, checkpoint.node_count);

        let path = temp_file("cp.json");
        checkpoint.save(&path).unwrap();
        let loaded = Checkpoint::load(&path).unwrap();
        assert_eq!(checkpoint, loaded);
        assert!(loaded.check_fingerprint(&fingerprint).is_ok());
        assert_eq!(store, loaded.into_store().unwrap());

        // No temporary files left next to the checkpoint.
        let dir = path.parent().unwrap();
        assert_eq!(1, std::fs::read_dir(dir).unwrap().count());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let err = Checkpoint::load(temp_file("missing.json")).unwrap_err();
        assert!(matches!(err, CheckpointError::Io(_)));
    }

    #[test]
    fn test_corrupt_file() {
        let path = temp_file("corrupt.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{\"format_version\": 1, \"nodes\": [").unwrap();
        let err = Checkpoint::load(&path).unwrap_err();
        assert!(matches!(err, CheckpointError::Json(_)));
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_validation_errors() {
        let fingerprint = EngineConfig::default().fingerprint();
        let mut checkpoint = Checkpoint::from_store(&sample_store(), 1, fingerprint);

        let mut wrong_version = checkpoint.clone();
        wrong_version.format_version = 7;
        assert!(matches!(
            wrong_version.validate(),
            Err(CheckpointError::UnsupportedVersion { found: 7, .. })
        ));

        let mut wrong_count = checkpoint.clone();
        wrong_count.node_count = 5;
        assert!(matches!(
            wrong_count.into_store(),
            Err(CheckpointError::NodeCountMismatch {
                declared: 5,
                actual: 2
            })
        ));

        checkpoint.nodes[0].regret_sum.pop();
        assert!(matches!(
            checkpoint.validate(),
            Err(CheckpointError::MalformedNode { .. })
        ));
    }

    #[test]
    fn test_fingerprint_mismatch() {
        let checkpoint =
            Checkpoint::from_store(&sample_store(), 1, EngineConfig::default().fingerprint());
        let heads_up = EngineConfig {
            num_players: 2,
            ..Default::default()
        };
        assert!(matches!(
            checkpoint.check_fingerprint(&heads_up.fingerprint()),
            Err(CheckpointError::FingerprintMismatch { .. })
        ));

        let deeper = EngineConfig {
            starting_stack_bb: 200.0,
            ..Default::default()
        };
        assert!(checkpoint.check_fingerprint(&deeper.fingerprint()).is_err());

        let uncapped = EngineConfig {
            max_raises_per_round: None,
            ..Default::default()
        };
        assert!(checkpoint.check_fingerprint(&uncapped.fingerprint()).is_err());
    }
}
