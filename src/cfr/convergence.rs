use serde::{Deserialize, Serialize};

use super::store::InfoSetStore;

/// Mean positive regret per (node, action) pair, divided by the number of
/// iterations run so far. Tends to zero as play converges.
pub fn normalized_positive_regret(store: &InfoSetStore, iterations: u64) -> f32 {
    normalized_regret(store.positive_regret_total(), store.action_slots(), iterations)
}

/// The same metric from running totals, without walking a store.
pub fn normalized_regret(positive_regret_total: f64, action_slots: usize, iterations: u64) -> f32 {
    if iterations == 0 || action_slots == 0 {
        return 0.0;
    }
    (positive_regret_total / action_slots as f64 / iterations as f64) as f32
}

/// Entries kept before the history starts folding itself in half.
pub const DEFAULT_HISTORY_CAPACITY: usize = 4096;

fn default_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_stride() -> u64 {
    1
}

/// The convergence metric recorded after every training iteration.
///
/// Memory is bounded: once `capacity` entries are stored, neighbouring
/// entries are averaged in pairs and each later entry covers twice as many
/// iterations. Every entry covers `stride` iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceHistory {
    values: Vec<f32>,
    #[serde(default = "default_stride")]
    stride: u64,
    #[serde(default = "default_capacity")]
    capacity: usize,
    #[serde(default)]
    pending_sum: f64,
    #[serde(default)]
    pending_count: u64,
    #[serde(default)]
    last: Option<f32>,
}

impl Default for ConvergenceHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ConvergenceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// `capacity` is rounded down to an even number, at least two.
    pub fn with_capacity(capacity: usize) -> Self {
        ConvergenceHistory {
            values: Vec::new(),
            stride: 1,
            capacity: (capacity.max(2)) & !1,
            pending_sum: 0.0,
            pending_count: 0,
            last: None,
        }
    }

    pub fn record(&mut self, value: f32) {
        self.last = Some(value);
        self.pending_sum += value as f64;
        self.pending_count += 1;
        if self.pending_count < self.stride {
            return;
        }
        self.values
            .push((self.pending_sum / self.pending_count as f64) as f32);
        self.pending_sum = 0.0;
        self.pending_count = 0;

        if self.values.len() >= self.capacity {
            self.values = self
                .values
                .chunks(2)
                .map(|pair| pair.iter().sum::<f32>() / pair.len() as f32)
                .collect();
            self.stride *= 2;
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Iterations averaged into each stored entry.
    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The most recently recorded value, even if it is still waiting to be
    /// folded into an entry.
    pub fn last(&self) -> Option<f32> {
        self.last
    }

    /// Mean of the first `window` entries, `None` when fewer were stored.
    pub fn first_window_mean(&self, window: usize) -> Option<f32> {
        mean(self.values.get(..window)?)
    }

    /// Mean of the last `window` entries, `None` when fewer were stored.
    pub fn last_window_mean(&self, window: usize) -> Option<f32> {
        let start = self.values.len().checked_sub(window)?;
        mean(&self.values[start..])
    }

    /// Trailing moving average; entry `i` averages entries `i + 1 - window`
    /// through `i`.
    pub fn moving_average(&self, window: usize) -> Vec<f32> {
        if window == 0 {
            return Vec::new();
        }
        self.values
            .windows(window)
            .filter_map(mean)
            .collect()
    }
}

fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}
