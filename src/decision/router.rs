use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, event, instrument, warn};

use crate::cfr::{ActionAbstraction, InfoSetKey, Strategy};
use crate::config::{DecisionWeights, EngineConfig};
use crate::game::{Action, ActionKind, CHIP_EPSILON, GameState, ObservedAction, Street, validate};
use crate::humanize::{self, AntiPatternContext, AntiPatternState};
use crate::opponent::{HandClass, HandObservation, OpponentProfile, OpponentProfiler};
use crate::strategy::StrategyCache;

use super::request::GameStateRequest;
use super::style::{StyleNudge, StyleTracker};
use super::trace::{DecisionStage, DecisionTrace};

/// How a decision was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// The full pipeline ran.
    Ok,
    /// The request couldn't be turned into a trustworthy state.
    Fallback { reason: String },
    /// The wall clock budget ran out after `stage`.
    TimedOut { stage: DecisionStage },
}

/// The router's answer for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: ActionKind,
    /// The hero's total round bet after the action; `None` for fold and
    /// check.
    pub amount: Option<f32>,
    /// The abstract action behind `action` when the pipeline chose it.
    pub abstract_action: Option<Action>,
    pub outcome: DecisionOutcome,
    pub trace: DecisionTrace,
}

impl Decision {
    pub fn is_fallback(&self) -> bool {
        !matches!(self.outcome, DecisionOutcome::Ok)
    }
}

/// Mutable state owned by one agent instance.
#[derive(Debug)]
struct AgentState {
    anti_pattern: AntiPatternState,
    style: StyleTracker,
    current_hand: Option<String>,
    hand_vpip: bool,
    hand_pfr: bool,
}

impl AgentState {
    fn new(window_hands: usize) -> Self {
        AgentState {
            anti_pattern: AntiPatternState::default(),
            style: StyleTracker::new(window_hands),
            current_hand: None,
            hand_vpip: false,
            hand_pfr: false,
        }
    }

    /// Close out the current hand, if any, into the rolling window.
    fn finish_hand(&mut self) {
        if self.current_hand.take().is_some() {
            self.style.record_hand(self.hand_vpip, self.hand_pfr);
        }
        self.hand_vpip = false;
        self.hand_pfr = false;
        self.anti_pattern.reset_hand();
    }

    /// Switch to `hand_id` if it is a new hand. Requests without an id
    /// never cross a hand boundary.
    fn enter_hand(&mut self, hand_id: Option<&str>) {
        let Some(hand_id) = hand_id else {
            return;
        };
        if self.current_hand.as_deref() != Some(hand_id) {
            self.finish_hand();
            self.current_hand = Some(hand_id.to_string());
        }
    }
}

/// Blend the trained strategy with its exploit adjusted copy:
/// `normalize(gto_weight * gto + exploit_weight * exploited)`.
///
/// Both inputs follow the same action order. The result always sums to one;
/// degenerate input becomes uniform.
pub fn mix(gto: &[f32], exploited: &[f32], weights: &DecisionWeights) -> Vec<f32> {
    let blended = gto
        .iter()
        .zip(exploited.iter())
        .map(|(g, e)| weights.gto_weight * g + weights.exploit_weight * e)
        .collect();
    Strategy::from_weights(blended).into_inner()
}

/// Turns a [`GameStateRequest`] into one action.
///
/// The pipeline looks the state's information set up in the strategy cache,
/// adjusts it against the primary opponent, nudges it towards the hero's
/// style target, samples and finally humanizes the sample. Each stage's
/// weights land in the returned [`DecisionTrace`].
///
/// Strategy and profiler reads need no router lock. The agent's own
/// counters sit behind a mutex, so concurrent decisions for one router are
/// serialized only around those updates.
#[derive(Debug)]
pub struct DecisionRouter {
    config: EngineConfig,
    abstraction: ActionAbstraction,
    cache: Arc<StrategyCache>,
    profiler: Arc<OpponentProfiler>,
    agent: Mutex<AgentState>,
}

impl DecisionRouter {
    pub fn new(
        config: EngineConfig,
        cache: Arc<StrategyCache>,
        profiler: Arc<OpponentProfiler>,
    ) -> Self {
        let abstraction = ActionAbstraction::from_config(&config);
        let agent = Mutex::new(AgentState::new(config.style_correction.window_hands));
        DecisionRouter {
            config,
            abstraction,
            cache,
            profiler,
            agent,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<StrategyCache> {
        &self.cache
    }

    pub fn profiler(&self) -> &Arc<OpponentProfiler> {
        &self.profiler
    }

    /// The hero's rolling VPIP over finished hands.
    pub fn hero_vpip(&self) -> Option<f32> {
        self.agent.lock().style.vpip()
    }

    /// The hero's rolling PFR over finished hands.
    pub fn hero_pfr(&self) -> Option<f32> {
        self.agent.lock().style.pfr()
    }

    pub fn anti_pattern_state(&self) -> AntiPatternState {
        self.agent.lock().anti_pattern.clone()
    }

    /// Close the current hand now instead of waiting for the next hand id.
    pub fn finish_hand(&self) {
        self.agent.lock().finish_hand();
    }

    /// Feed one finished hand's actions for `opponent_id`, who sat in
    /// `seat`, into the profiler.
    pub fn observe_hand(
        &self,
        opponent_id: &str,
        seat: usize,
        actions: &[ObservedAction],
    ) -> OpponentProfile {
        let observation = HandObservation::from_actions(seat, actions);
        self.profiler.update_profile(opponent_id, &observation)
    }

    /// Decide with the thread's rng.
    ///
    /// * `limit` - The format key, e.g. `nl50`. Picks the strategy snapshot
    ///   and, with `style`, the style target.
    /// * `style` - The style the hero aims for, e.g. `tag`.
    pub fn decide(&self, request: &GameStateRequest, limit: &str, style: &str) -> Decision {
        self.decide_with_rng(request, limit, style, &mut rand::rng())
    }

    /// Decide with the configured wall clock budget.
    pub fn decide_with_rng<R: Rng>(
        &self,
        request: &GameStateRequest,
        limit: &str,
        style: &str,
        rng: &mut R,
    ) -> Decision {
        self.decide_within(request, limit, style, self.config.decision_budget(), rng)
    }

    /// Decide, giving up with a check or fold once `budget` has passed.
    /// The budget is checked between stages; a stage in progress always
    /// finishes.
    #[instrument(level = "debug", skip(self, request, rng), fields(hand_id = ?request.hand_id))]
    pub fn decide_within<R: Rng>(
        &self,
        request: &GameStateRequest,
        limit: &str,
        style: &str,
        budget: Duration,
        rng: &mut R,
    ) -> Decision {
        let started = Instant::now();
        let deadline = started + budget;
        let mut trace = DecisionTrace::new(limit, request.hand_id.clone());

        let state = match request.to_game_state(&self.abstraction, self.config.max_raises_per_round)
        {
            Ok(state) => state,
            Err(e) => return fallback(request, trace, started, format!("bad request: {e}")),
        };
        if let Err(e) = validate(&state) {
            return fallback(request, trace, started, format!("invalid state: {e}"));
        }
        trace.street = Some(state.street);
        self.agent.lock().enter_hand(request.hand_id.as_deref());

        let legal = self.abstraction.legal_actions(&state);
        if legal.is_empty() {
            return fallback(
                request,
                trace,
                started,
                format!("seat {} has no legal action", state.to_act_idx),
            );
        }
        trace.legal_actions = legal.clone();
        trace.last_stage = Some(DecisionStage::State);
        if Instant::now() >= deadline {
            return timed_out(&state, trace, started, DecisionStage::State);
        }

        // GTO strategy, uniform when the key was never trained.
        let key = InfoSetKey::from_state(&state);
        trace.info_set_key = Some(key.as_str().to_string());
        let gto = match self.cache.lookup(limit, &key) {
            Some(node) => {
                trace.strategy_found = true;
                Strategy::from_weights(legal.iter().map(|a| node.probability_of(a)).collect())
            }
            None => {
                debug!(limit, key = key.as_str(), "No trained strategy, using uniform");
                Strategy::uniform(legal.len())
            }
        }
        .into_inner();
        trace.gto = gto.clone();
        trace.last_stage = Some(DecisionStage::Strategy);
        if Instant::now() >= deadline {
            return timed_out(&state, trace, started, DecisionStage::Strategy);
        }

        // Exploit the primary opponent.
        let hero = state.to_act_idx;
        let hand_class = HandClass::of(&state.hands[hero], &state.board);
        trace.hand_class = Some(hand_class);
        trace.primary_opponent = request.opponent_ids.first().cloned();
        let exploit = request
            .opponent_ids
            .first()
            .and_then(|id| self.profiler.suggest_exploit(id, state.street));
        let exploited = match &exploit {
            Some(adjustment) => adjustment.apply(&legal, &gto, hand_class),
            None => gto.clone(),
        };
        let weights = *self.config.decision_weights.get(state.street);
        let mixed = mix(&gto, &exploited, &weights);
        trace.exploit = exploit;
        trace.exploited = exploited;
        trace.weights = Some(weights);
        trace.mixed = mixed.clone();
        trace.last_stage = Some(DecisionStage::Exploit);
        if Instant::now() >= deadline {
            return timed_out(&state, trace, started, DecisionStage::Exploit);
        }

        // Style correction.
        let hero_vpip = {
            let agent = self.agent.lock();
            if agent.style.len() >= self.config.style_correction.min_hands {
                agent.style.vpip()
            } else {
                None
            }
        };
        let nudge = match (hero_vpip, self.config.style_target(limit, style)) {
            (Some(vpip), Some(target)) => {
                StyleNudge::for_vpip(vpip, &target.vpip, &self.config.style_correction)
            }
            _ => StyleNudge::None,
        };
        let final_weights = nudge.apply(&legal, &mixed, self.config.style_correction.nudge);
        trace.hero_vpip = hero_vpip;
        trace.style_nudge = nudge;
        trace.final_weights = final_weights.clone();
        trace.last_stage = Some(DecisionStage::Style);
        if Instant::now() >= deadline {
            return timed_out(&state, trace, started, DecisionStage::Style);
        }

        let idx = Strategy::from_weights(final_weights.clone()).sample(rng);
        let sampled = legal[idx];
        trace.sampled = Some(sampled);
        trace.last_stage = Some(DecisionStage::Sample);
        if Instant::now() >= deadline {
            return timed_out(&state, trace, started, DecisionStage::Sample);
        }

        let action = {
            let mut agent = self.agent.lock();
            let ctx = AntiPatternContext {
                state: &state,
                legal_actions: &legal,
                strategy: &final_weights,
                hand_class,
            };
            let humanized = humanize::apply(
                &self.config.anti_pattern,
                &mut agent.anti_pattern,
                &ctx,
                sampled,
                rng,
            );
            if state.street == Street::Preflop {
                agent.hand_vpip |= humanized.action.kind().is_voluntary();
                agent.hand_pfr |= humanized.action.is_aggressive();
            }
            trace.humanized = humanized.effects;
            humanized.action
        };
        trace.last_stage = Some(DecisionStage::Humanize);
        trace.elapsed_micros = elapsed_micros(started);

        event!(
            Level::DEBUG,
            limit,
            key = key.as_str(),
            action = %action,
            elapsed_micros = trace.elapsed_micros,
            "Decided"
        );
        Decision {
            action: action.kind(),
            amount: state.amount_for(action),
            abstract_action: Some(action),
            outcome: DecisionOutcome::Ok,
            trace,
        }
    }
}

fn elapsed_micros(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX)
}

fn check_or_fold(to_call: f32) -> ActionKind {
    if to_call <= CHIP_EPSILON {
        ActionKind::Check
    } else {
        ActionKind::Fold
    }
}

fn fallback(
    request: &GameStateRequest,
    mut trace: DecisionTrace,
    started: Instant,
    reason: String,
) -> Decision {
    warn!(hand_id = ?request.hand_id, reason = %reason, "Rejected decision request");
    trace.elapsed_micros = elapsed_micros(started);
    Decision {
        action: check_or_fold(request.to_call()),
        amount: None,
        abstract_action: None,
        outcome: DecisionOutcome::Fallback { reason },
        trace,
    }
}

fn timed_out(
    state: &GameState,
    mut trace: DecisionTrace,
    started: Instant,
    stage: DecisionStage,
) -> Decision {
    trace.elapsed_micros = elapsed_micros(started);
    warn!(
        ?stage,
        elapsed_micros = trace.elapsed_micros,
        "Decision budget exceeded"
    );
    Decision {
        action: check_or_fold(state.to_call()),
        amount: None,
        abstract_action: None,
        outcome: DecisionOutcome::TimedOut { stage },
        trace,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::cfr::InfoSetStore;
    use crate::opponent::PlayerType;
    use crate::strategy::StrategySnapshot;

    fn router(config: EngineConfig) -> DecisionRouter {
        DecisionRouter::new(
            config,
            Arc::new(StrategyCache::new()),
            Arc::new(OpponentProfiler::default()),
        )
    }

    fn utg_request(hand_id: &str) -> GameStateRequest {
        GameStateRequest {
            hand_id: Some(hand_id.to_string()),
            street: Street::Preflop,
            hero_seat: 3,
            dealer_seat: 0,
            hero_cards: vec![(14, 0), (13, 0)],
            board: vec![],
            stacks: vec![100.0, 99.5, 99.0, 100.0, 100.0, 100.0],
            bets: vec![0.0, 0.5, 1.0, 0.0, 0.0, 0.0],
            pot: 1.5,
            big_blind: 1.0,
            folded: vec![],
            opponent_ids: vec!["villain".to_string()],
            history: vec![],
        }
    }

    /// Install a snapshot that always calls at the request's decision point.
    fn install_always_call(router: &DecisionRouter, request: &GameStateRequest) {
        let abstraction = ActionAbstraction::from_config(router.config());
        let state = request
            .to_game_state(&abstraction, router.config().max_raises_per_round)
            .unwrap();
        let legal = abstraction.legal_actions(&state);
        let mut store = InfoSetStore::new();
        let node = store.get_or_create_node(&InfoSetKey::from_state(&state), &legal, 3);
        for (sum, action) in node.strategy_sum.iter_mut().zip(legal.iter()) {
            *sum = if *action == Action::Call { 10.0 } else { 0.0 };
        }
        let snapshot = StrategySnapshot::from_store(&store, 1, router.config().fingerprint());
        router.cache().install("nl50", snapshot).unwrap();
    }

    #[test]
    fn test_mix_sums_to_one() {
        let weights = DecisionWeights {
            gto_weight: 0.6,
            exploit_weight: 0.4,
        };
        let mixed = mix(&[0.2, 0.5, 0.3], &[0.1, 0.1, 0.8], &weights);
        assert_relative_eq!(1.0, mixed.iter().sum::<f32>(), epsilon = 1e-6);
        assert_relative_eq!(0.6 * 0.3 + 0.4 * 0.8, mixed[2], epsilon = 1e-6);

        let degenerate = mix(&[0.0, 0.0], &[0.0, 0.0], &weights);
        assert_eq!(vec![0.5, 0.5], degenerate);
    }

    #[test]
    fn test_uniform_without_strategy() {
        let router = router(EngineConfig::default());
        let mut rng = StdRng::seed_from_u64(7);
        let decision = router.decide_within(
            &utg_request("h1"),
            "nl50",
            "tag",
            Duration::from_secs(5),
            &mut rng,
        );
        assert_eq!(DecisionOutcome::Ok, decision.outcome);
        assert!(!decision.trace.strategy_found);
        let n = decision.trace.legal_actions.len() as f32;
        for p in &decision.trace.gto {
            assert_relative_eq!(1.0 / n, *p, epsilon = 1e-6);
        }
        assert_eq!(Some(DecisionStage::Humanize), decision.trace.last_stage);
        let action = decision.abstract_action.unwrap();
        assert!(decision.trace.legal_actions.contains(&action));
    }

    #[test]
    fn test_trained_strategy_is_followed() {
        let router = router(EngineConfig::default());
        let request = utg_request("h1");
        install_always_call(&router, &request);
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..20 {
            let decision = router.decide_within(
                &request,
                "nl50",
                "tag",
                Duration::from_secs(5),
                &mut rng,
            );
            assert!(decision.trace.strategy_found);
            assert_eq!(ActionKind::Call, decision.action);
            assert_eq!(Some(1.0), decision.amount);
        }
    }

    #[test]
    fn test_invalid_state_falls_back() {
        let router = router(EngineConfig::default());
        let mut request = utg_request("h1");
        request.hero_cards = vec![(14, 3), (14, 3)];
        let mut rng = StdRng::seed_from_u64(9);
        let decision =
            router.decide_within(&request, "nl50", "tag", Duration::from_secs(5), &mut rng);
        assert_eq!(ActionKind::Fold, decision.action);
        assert_eq!(None, decision.amount);
        match decision.outcome {
            DecisionOutcome::Fallback { reason } => assert!(reason.contains("more than once")),
            other => panic!("expected a fallback, got {other:?}"),
        }
    }

    #[test_log::test]
    fn test_zero_budget_times_out() {
        let router = router(EngineConfig::default());
        let mut rng = StdRng::seed_from_u64(10);
        let decision =
            router.decide_within(&utg_request("h1"), "nl50", "tag", Duration::ZERO, &mut rng);
        assert_eq!(
            DecisionOutcome::TimedOut {
                stage: DecisionStage::State
            },
            decision.outcome
        );
        // UTG faces the big blind.
        assert_eq!(ActionKind::Fold, decision.action);
        assert!(decision.is_fallback());
    }

    #[test]
    fn test_hand_boundary_feeds_style_window() {
        let router = router(EngineConfig::default());
        let first = utg_request("h1");
        install_always_call(&router, &first);
        let mut rng = StdRng::seed_from_u64(11);
        let budget = Duration::from_secs(5);
        router.decide_within(&first, "nl50", "tag", budget, &mut rng);
        assert_eq!(None, router.hero_vpip());

        router.decide_within(&utg_request("h2"), "nl50", "tag", budget, &mut rng);
        assert_eq!(Some(100.0), router.hero_vpip());
        assert_eq!(Some(0.0), router.hero_pfr());

        router.finish_hand();
        assert_eq!(Some(100.0), router.hero_vpip());
    }

    #[test]
    fn test_exploit_applied_after_enough_hands() {
        let router = router(EngineConfig::default());
        let hand = vec![
            ObservedAction::new(3, Street::Preflop, ActionKind::Call, Some(1.0)),
            ObservedAction::new(4, Street::Preflop, ActionKind::Call, Some(1.0)),
        ];
        for _ in 0..50 {
            router.observe_hand("villain", 4, &hand);
        }
        let profile = router.profiler().get_profile("villain").unwrap();
        assert_eq!(PlayerType::FishLoose, profile.player_type);

        let mut rng = StdRng::seed_from_u64(12);
        let decision = router.decide_within(
            &utg_request("h1"),
            "nl50",
            "tag",
            Duration::from_secs(5),
            &mut rng,
        );
        let exploit = decision.trace.exploit.unwrap();
        assert_eq!(PlayerType::FishLoose, exploit.tag);
        assert_relative_eq!(1.0, exploit.confidence);
        assert_ne!(decision.trace.gto, decision.trace.exploited);
        assert_relative_eq!(
            1.0,
            decision.trace.mixed.iter().sum::<f32>(),
            epsilon = 1e-5
        );
    }
}
