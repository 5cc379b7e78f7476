use std::{collections::HashMap, path::Path, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::cfr::{Checkpoint, CheckpointError, ConfigFingerprint, InfoSetKey, InfoSetStore};
use crate::game::Action;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("checkpoint load failed: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("format key must not be empty")]
    EmptyFormatKey,
}

/// The average strategy of one information set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStrategy {
    pub actions: Vec<Action>,
    pub probs: Vec<f32>,
}

impl NodeStrategy {
    pub fn probability_of(&self, action: &Action) -> f32 {
        self.actions
            .iter()
            .position(|a| a == action)
            .and_then(|i| self.probs.get(i).copied())
            .unwrap_or(0.0)
    }
}

/// Read only average strategies from one trained store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySnapshot {
    pub iterations: u64,
    pub fingerprint: ConfigFingerprint,
    strategies: HashMap<InfoSetKey, NodeStrategy>,
}

impl StrategySnapshot {
    pub fn from_store(store: &InfoSetStore, iterations: u64, fingerprint: ConfigFingerprint) -> Self {
        let strategies = store
            .iter()
            .map(|(key, node)| {
                (
                    key.clone(),
                    NodeStrategy {
                        actions: node.actions.clone(),
                        probs: node.average_strategy().into_inner(),
                    },
                )
            })
            .collect();
        StrategySnapshot {
            iterations,
            fingerprint,
            strategies,
        }
    }

    pub fn from_checkpoint(checkpoint: Checkpoint) -> Result<Self, CheckpointError> {
        let iterations = checkpoint.iterations;
        let fingerprint = checkpoint.fingerprint.clone();
        let store = checkpoint.into_store()?;
        Ok(Self::from_store(&store, iterations, fingerprint))
    }

    pub fn get(&self, key: &InfoSetKey) -> Option<&NodeStrategy> {
        self.strategies.get(key)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Trained strategies for serving, one active snapshot per game format key
/// (for example a stake level).
///
/// Lookups clone an `Arc` under a short read lock, so an in flight decision
/// keeps the snapshot it started with even if a new one is installed
/// meanwhile. A failed load only affects its own format key.
#[derive(Debug, Default)]
pub struct StrategyCache {
    snapshots: RwLock<HashMap<String, Arc<StrategySnapshot>>>,
    failures: RwLock<HashMap<String, String>>,
}

impl StrategyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `snapshot` the active one for `format_key`, returning the one it
    /// replaced.
    pub fn install(
        &self,
        format_key: &str,
        snapshot: StrategySnapshot,
    ) -> Result<Option<Arc<StrategySnapshot>>, CacheError> {
        if format_key.is_empty() {
            return Err(CacheError::EmptyFormatKey);
        }
        info!(
            format_key,
            nodes = snapshot.len(),
            iterations = snapshot.iterations,
            "Installing strategy snapshot"
        );
        let previous = self
            .snapshots
            .write()
            .insert(format_key.to_string(), Arc::new(snapshot));
        self.failures.write().remove(format_key);
        Ok(previous)
    }

    /// Load a checkpoint file and install it for `format_key`.
    ///
    /// On failure the error is logged and remembered in `load_failures`, and
    /// whatever was serving that key before keeps serving it.
    pub fn load_checkpoint(
        &self,
        format_key: &str,
        path: impl AsRef<Path>,
        expected: &ConfigFingerprint,
    ) -> Result<Arc<StrategySnapshot>, CacheError> {
        let path = path.as_ref();
        let loaded = Checkpoint::load(path)
            .and_then(|cp| {
                cp.check_fingerprint(expected)?;
                Ok(cp)
            })
            .and_then(StrategySnapshot::from_checkpoint);

        match loaded {
            Ok(snapshot) => {
                self.install(format_key, snapshot)?;
                self.snapshot(format_key).ok_or(CacheError::EmptyFormatKey)
            }
            Err(e) => {
                error!(format_key, ?path, error = %e, "Failed to load strategy checkpoint");
                self.failures
                    .write()
                    .insert(format_key.to_string(), e.to_string());
                Err(e.into())
            }
        }
    }

    pub fn snapshot(&self, format_key: &str) -> Option<Arc<StrategySnapshot>> {
        self.snapshots.read().get(format_key).cloned()
    }

    /// The average strategy for `key` under `format_key`, if trained.
    pub fn lookup(&self, format_key: &str, key: &InfoSetKey) -> Option<NodeStrategy> {
        self.snapshot(format_key)?.get(key).cloned()
    }

    pub fn formats(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.snapshots.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Format keys whose last load failed, with the reason.
    pub fn load_failures(&self) -> HashMap<String, String> {
        self.failures.read().clone()
    }
}
