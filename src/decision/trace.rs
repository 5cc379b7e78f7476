use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DecisionWeights;
use crate::game::{Action, Street};
use crate::humanize::AntiPatternEffect;
use crate::opponent::{ExploitAdjustment, HandClass};

use super::style::StyleNudge;

/// Where the decision pipeline was when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStage {
    State,
    Strategy,
    Exploit,
    Style,
    Sample,
    Humanize,
}

/// Everything the router looked at and produced for one decision. Kept for
/// observability only; nothing reads it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    pub id: Uuid,
    pub hand_id: Option<String>,
    pub format_key: String,
    pub street: Option<Street>,
    pub info_set_key: Option<String>,
    pub legal_actions: Vec<Action>,
    /// Whether the cache had a trained strategy for the key.
    pub strategy_found: bool,
    pub gto: Vec<f32>,
    pub primary_opponent: Option<String>,
    pub exploit: Option<ExploitAdjustment>,
    pub hand_class: Option<HandClass>,
    pub exploited: Vec<f32>,
    pub weights: Option<DecisionWeights>,
    pub mixed: Vec<f32>,
    pub hero_vpip: Option<f32>,
    pub style_nudge: StyleNudge,
    pub final_weights: Vec<f32>,
    pub sampled: Option<Action>,
    pub humanized: Vec<AntiPatternEffect>,
    pub last_stage: Option<DecisionStage>,
    pub elapsed_micros: u64,
}

impl DecisionTrace {
    pub fn new(format_key: &str, hand_id: Option<String>) -> Self {
        DecisionTrace {
            id: Uuid::now_v7(),
            hand_id,
            format_key: format_key.to_string(),
            street: None,
            info_set_key: None,
            legal_actions: Vec::new(),
            strategy_found: false,
            gto: Vec::new(),
            primary_opponent: None,
            exploit: None,
            hand_class: None,
            exploited: Vec::new(),
            weights: None,
            mixed: Vec::new(),
            hero_vpip: None,
            style_nudge: StyleNudge::None,
            final_weights: Vec::new(),
            sampled: None,
            humanized: Vec::new(),
            last_stage: None,
            elapsed_micros: 0,
        }
    }
}
