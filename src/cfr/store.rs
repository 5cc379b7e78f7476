use std::collections::{HashMap, hash_map::Entry};

use crate::game::Action;

use super::info_set::InfoSetKey;
use super::node::{GameNode, Strategy};

/// Information set key to regret matching node.
///
/// Nodes are created lazily on first visit and never removed. A store is an
/// ordinary owned value; every trainer holds its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoSetStore {
    nodes: HashMap<InfoSetKey, GameNode>,
    /// Total (node, action) pairs, kept as nodes are added.
    action_slots: usize,
}

impl InfoSetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the node for `key`, creating it with `legal_actions` when
    /// missing. An existing node only takes the given actions if its own
    /// list is empty.
    pub fn get_or_create_node(
        &mut self,
        key: &InfoSetKey,
        legal_actions: &[Action],
        player: usize,
    ) -> &mut GameNode {
        match self.nodes.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let node = entry.into_mut();
                if node.actions.is_empty() {
                    self.action_slots += legal_actions.len();
                    node.set_actions_if_empty(legal_actions);
                }
                node
            }
            Entry::Vacant(entry) => {
                self.action_slots += legal_actions.len();
                entry.insert(GameNode::new(legal_actions.to_vec(), player))
            }
        }
    }

    pub fn get(&self, key: &InfoSetKey) -> Option<&GameNode> {
        self.nodes.get(key)
    }

    pub fn get_mut(&mut self, key: &InfoSetKey) -> Option<&mut GameNode> {
        self.nodes.get_mut(key)
    }

    pub fn insert(&mut self, key: InfoSetKey, node: GameNode) -> Option<GameNode> {
        self.action_slots += node.num_actions();
        let previous = self.nodes.insert(key, node);
        if let Some(old) = &previous {
            self.action_slots -= old.num_actions();
        }
        previous
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InfoSetKey, &GameNode)> {
        self.nodes.iter()
    }

    pub fn average_strategy(&self, key: &InfoSetKey) -> Option<Strategy> {
        self.nodes.get(key).map(GameNode::average_strategy)
    }

    /// Number of (node, action) pairs across the store.
    pub fn action_slots(&self) -> usize {
        self.action_slots
    }

    /// Sum of `max(regret, 0)` over every (node, action) pair. Walks the
    /// whole store.
    pub fn positive_regret_total(&self) -> f64 {
        self.nodes
            .values()
            .map(|node| node.positive_regret_total() as f64)
            .sum()
    }

    /// Mean of `max(regret, 0)` over every (node, action) pair.
    pub fn mean_positive_regret(&self) -> f32 {
        let (total, count) = self
            .nodes
            .values()
            .fold((0.0f64, 0usize), |(total, count), node| {
                (
                    total + node.positive_regret_total() as f64,
                    count + node.num_actions(),
                )
            });
        if count == 0 {
            0.0
        } else {
            (total / count as f64) as f32
        }
    }
}
