use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use holdem_engine::cfr::Trainer;
use holdem_engine::config::EngineConfig;
use holdem_engine::decision::{DecisionRouter, GameStateRequest};
use holdem_engine::game::Street;
use holdem_engine::opponent::OpponentProfiler;
use holdem_engine::strategy::{StrategyCache, StrategySnapshot};
use rand::{SeedableRng, rngs::StdRng};

/// Short stacks keep the tree small enough to bench many iterations.
const TOY_CONFIG_JSON: &str = r#"{
  "num_players": 2,
  "starting_stack_bb": 10.0,
  "trainer": {"seed": 7, "batch_size": 10}
}"#;

fn config(num_players: usize) -> EngineConfig {
    let mut config = EngineConfig::from_json(TOY_CONFIG_JSON).expect("Failed to parse config");
    config.num_players = num_players;
    config
}

fn bench_training_iterations(c: &mut Criterion) {
    let mut group = c.benchmark_group("mccfr_iterations");
    group.sample_size(10);

    for num_players in [2, 3, 6] {
        group.bench_with_input(
            BenchmarkId::new("num_players", num_players),
            &num_players,
            |b, &num_players| {
                b.iter(|| {
                    let mut trainer = Trainer::new(config(num_players)).unwrap();
                    trainer.train(10).unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_decide(c: &mut Criterion) {
    let config = config(2);
    let mut trainer = Trainer::new(config.clone()).unwrap();
    trainer.train(200).unwrap();

    let cache = Arc::new(StrategyCache::new());
    let snapshot = StrategySnapshot::from_store(
        trainer.store(),
        trainer.iterations(),
        config.fingerprint(),
    );
    cache.install("nl10", snapshot).unwrap();
    let router = DecisionRouter::new(config, cache, Arc::new(OpponentProfiler::default()));

    let request = GameStateRequest {
        hand_id: None,
        street: Street::Preflop,
        hero_seat: 0,
        dealer_seat: 0,
        hero_cards: vec![(14, 0), (13, 0)],
        board: vec![],
        stacks: vec![9.5, 9.0],
        bets: vec![0.5, 1.0],
        pot: 1.5,
        big_blind: 1.0,
        folded: vec![],
        opponent_ids: vec!["villain".to_string()],
        history: vec![],
    };
    let mut rng = StdRng::seed_from_u64(1);
    c.bench_function("decide_preflop", |b| {
        b.iter(|| router.decide_with_rng(&request, "nl10", "tag", &mut rng))
    });
}

criterion_group!(benches, bench_training_iterations, bench_decide);
criterion_main!(benches);
