use std::{collections::HashMap, sync::Arc};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::game::Street;

use super::exploit::{ExploitAdjustment, ExploitConfig};
use super::profile::{HandObservation, OpponentProfile};

/// Per opponent running profiles.
///
/// The outer map is only write locked to add a new opponent. Each profile
/// sits behind its own mutex, so updates for different opponents never
/// wait on each other while two updates for the same opponent are
/// serialized.
#[derive(Debug, Default)]
pub struct OpponentProfiler {
    config: ExploitConfig,
    profiles: RwLock<HashMap<String, Arc<Mutex<OpponentProfile>>>>,
}

impl OpponentProfiler {
    pub fn new(config: ExploitConfig) -> Self {
        OpponentProfiler {
            config,
            profiles: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ExploitConfig {
        &self.config
    }

    fn entry(&self, id: &str) -> Arc<Mutex<OpponentProfile>> {
        if let Some(existing) = self.profiles.read().get(id) {
            return existing.clone();
        }
        self.profiles
            .write()
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(OpponentProfile::new(id))))
            .clone()
    }

    /// A copy of the current profile.
    pub fn get_profile(&self, id: &str) -> Option<OpponentProfile> {
        let profile = self.profiles.read().get(id)?.clone();
        let guard = profile.lock();
        Some(guard.clone())
    }

    /// Fold one observed hand into `id`'s profile, creating it on first
    /// sight. Returns the updated profile.
    pub fn update_profile(&self, id: &str, observation: &HandObservation) -> OpponentProfile {
        let profile = self.entry(id);
        let mut guard = profile.lock();
        guard.record(observation, self.config.min_hands_to_classify);
        debug!(
            id,
            hands = guard.hands_observed,
            vpip = guard.vpip,
            pfr = guard.pfr,
            player_type = %guard.player_type,
            "Updated opponent profile"
        );
        guard.clone()
    }

    /// The confidence scaled exploit for `id`, or `None` when there isn't
    /// enough data to trust one.
    pub fn suggest_exploit(&self, id: &str, street: Street) -> Option<ExploitAdjustment> {
        let profile = self.get_profile(id)?;
        let confidence = self.config.confidence(profile.hands_observed);
        if confidence < self.config.min_confidence {
            debug!(id, confidence, "Not enough hands to exploit");
            return None;
        }
        Some(ExploitAdjustment::template(profile.player_type, street).scaled(confidence))
    }

    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }
}
