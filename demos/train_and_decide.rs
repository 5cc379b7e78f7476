//! Train a small heads up strategy, write a checkpoint, serve it and ask
//! for a few decisions.
//!
//! ```text
//! cargo run --example train_and_decide -- 2000
//! RUST_LOG=debug cargo run --example train_and_decide
//! ```
use std::sync::Arc;

use holdem_engine::cfr::Trainer;
use holdem_engine::config::EngineConfig;
use holdem_engine::decision::{DecisionRouter, GameStateRequest};
use holdem_engine::game::{ActionKind, ObservedAction, Street};
use holdem_engine::opponent::OpponentProfiler;
use holdem_engine::strategy::StrategyCache;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn init_tracing_from_env() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn main() {
    init_tracing_from_env();

    let iterations = std::env::args()
        .nth(1)
        .map(|s| s.parse::<u64>().expect("invalid number of iterations"))
        .unwrap_or(1000);

    let config = EngineConfig::from_json(
        r#"{
            "num_players": 2,
            "starting_stack_bb": 10.0,
            "anti_pattern": {"enabled": true},
            "trainer": {"seed": 1, "batch_size": 250}
        }"#,
    )
    .expect("invalid config");

    let mut trainer = Trainer::new(config.clone()).expect("couldn't build trainer");
    let report = trainer.train(iterations).expect("training failed");
    println!(
        "Trained {} iterations, {} information sets, mean positive regret {:?}",
        report.total_iterations, report.nodes, report.convergence
    );

    let path = std::env::temp_dir().join("holdem_engine_demo_checkpoint.json");
    trainer.save_checkpoint(&path).expect("couldn't save checkpoint");

    let cache = Arc::new(StrategyCache::new());
    cache
        .load_checkpoint("nl10", &path, &config.fingerprint())
        .expect("couldn't load checkpoint");
    let router = DecisionRouter::new(config, cache, Arc::new(OpponentProfiler::default()));

    // A villain who limps every hand.
    let limp = [ObservedAction::new(
        1,
        Street::Preflop,
        ActionKind::Call,
        Some(1.0),
    )];
    for _ in 0..30 {
        router.observe_hand("villain", 1, &limp);
    }
    if let Some(profile) = router.profiler().get_profile("villain") {
        println!(
            "villain: {} hands, vpip {:.0}, pfr {:.0}, {}",
            profile.hands_observed, profile.vpip, profile.pfr, profile.player_type
        );
    }

    for (hand, cards) in [[(14, 0), (14, 1)], [(7, 2), (2, 3)], [(13, 0), (12, 0)]]
        .into_iter()
        .enumerate()
    {
        let request = GameStateRequest {
            hand_id: Some(format!("demo-{hand}")),
            street: Street::Preflop,
            hero_seat: 0,
            dealer_seat: 0,
            hero_cards: cards.to_vec(),
            board: vec![],
            stacks: vec![9.5, 9.0],
            bets: vec![0.5, 1.0],
            pot: 1.5,
            big_blind: 1.0,
            folded: vec![],
            opponent_ids: vec!["villain".to_string()],
            history: vec![],
        };
        let decision = router.decide(&request, "nl10", "tag");
        println!(
            "{:?}: {:?} {:?} ({:?})",
            cards, decision.action, decision.amount, decision.outcome
        );
        println!(
            "  gto {:?}\n  final {:?}",
            decision.trace.gto, decision.trace.final_weights
        );
    }

    let _ = std::fs::remove_file(&path);
}
