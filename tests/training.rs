use approx::assert_relative_eq;
use holdem_engine::cfr::{Checkpoint, CheckpointError, InfoSetKey, Trainer, TrainerError};
use holdem_engine::config::EngineConfig;
use holdem_engine::core::Card;
use holdem_engine::game::{Action, BetSize, GameState, GameStateBuilder, validate};

fn toy_config(seed: u64) -> EngineConfig {
    let mut config = EngineConfig {
        num_players: 2,
        starting_stack_bb: 4.0,
        ..Default::default()
    };
    config.trainer.seed = Some(seed);
    config.trainer.batch_size = 50;
    config
}

/// Check the hand down from the button with fixed cards.
fn checked_down(hero: &str, villain: &str, board: &str) -> GameState {
    let mut state = GameState::new_hand(vec![10.0, 10.0], 1.0, 0, Some(3)).unwrap();
    state.hands = vec![
        Card::parse_many(hero).unwrap(),
        Card::parse_many(villain).unwrap(),
    ];
    let board = Card::parse_many(board).unwrap();
    // Small blind completes, big blind checks.
    state.apply(Action::Call).unwrap();
    state.apply(Action::Check).unwrap();
    for cards in [&board[..3], &board[3..4], &board[4..5]] {
        state.deal_street(cards).unwrap();
        state.apply(Action::Check).unwrap();
        state.apply(Action::Check).unwrap();
    }
    assert!(state.is_terminal());
    state
}

#[test_log::test]
fn test_scripted_showdown_payoff() {
    let mut trainer = Trainer::new(toy_config(1)).unwrap();

    // Aces beat queens; each seat put in one big blind.
    let state = checked_down("AsAh", "QcQd", "2c7d9hJs3d");
    assert_relative_eq!(2.0, state.pot);
    assert_relative_eq!(1.0, trainer.traverse(&state, &[1.0, 1.0], 0, 0));
    assert_relative_eq!(-1.0, trainer.traverse(&state, &[1.0, 1.0], 1, 0));

    // Royal flush on the board plays for both.
    let split = checked_down("2c3d", "4h5h", "TsJsQsKsAs");
    assert_relative_eq!(0.0, trainer.traverse(&split, &[1.0, 1.0], 0, 0));
    assert_relative_eq!(0.0, trainer.traverse(&split, &[1.0, 1.0], 1, 0));

    // Terminal states never touch the store.
    assert!(trainer.store().is_empty());
}

#[test]
fn test_all_in_side_pot_payoff() {
    let mut trainer = Trainer::new(toy_config(2)).unwrap();
    let mut state = GameState::new_hand(vec![30.0, 10.0], 1.0, 0, Some(3)).unwrap();
    state.hands = vec![
        Card::parse_many("7c2d").unwrap(),
        Card::parse_many("AsAh").unwrap(),
    ];
    // Button shoves 30, big blind calls off 10.
    state.apply(Action::AllIn).unwrap();
    state.apply(Action::Call).unwrap();
    let board = Card::parse_many("3c8d9hJsKd").unwrap();
    state.deal_street(&board[..3]).unwrap();
    state.deal_street(&board[3..4]).unwrap();
    state.deal_street(&board[4..5]).unwrap();
    assert!(state.is_terminal());

    // The uncalled 20 goes back to the button.
    assert_relative_eq!(-10.0, trainer.traverse(&state, &[1.0, 1.0], 0, 0));
    assert_relative_eq!(10.0, trainer.traverse(&state, &[1.0, 1.0], 1, 0));
}

#[test_log::test]
fn test_convergence_smoke() {
    let mut trainer = Trainer::new(toy_config(42)).unwrap();
    let report = trainer.train(400).unwrap();
    assert_eq!(400, report.iterations_run);

    let history = trainer.convergence();
    assert_eq!(400, history.len());
    let first = history.first_window_mean(50).unwrap();
    let last = history.last_window_mean(50).unwrap();
    assert!(
        last < first,
        "mean positive regret went from {first} to {last}"
    );

    for (_, node) in trainer.store().iter() {
        let sum: f32 = node.average_strategy().iter().sum();
        assert_relative_eq!(1.0, sum, epsilon = 1e-2);
    }
}

#[test]
fn test_checkpoint_resume_round_trip() {
    let config = toy_config(7);
    let mut trainer = Trainer::new(config.clone()).unwrap();
    trainer.train(60).unwrap();

    let path = std::env::temp_dir().join(format!(
        "holdem-engine-training-{}.json",
        uuid::Uuid::now_v7()
    ));
    trainer.save_checkpoint(&path).unwrap();

    let loaded = Checkpoint::load(&path).unwrap();
    assert_eq!(60, loaded.iterations);
    assert_eq!(trainer.store().len(), loaded.node_count);

    let mut resumed = Trainer::resume(config, loaded).unwrap();
    assert_eq!(trainer.store(), resumed.store());
    let report = resumed.train(20).unwrap();
    assert_eq!(80, report.total_iterations);

    std::fs::remove_file(&path).unwrap();
}

#[test_log::test]
fn test_odd_samples_then_regular_training() {
    let mut trainer = Trainer::new(toy_config(11)).unwrap();

    // A short stacked button only has fold or call at the root.
    let short = GameState::new_hand(vec![1.0, 4.0], 1.0, 0, Some(3)).unwrap();
    assert!(trainer.run_sample(short));

    // A duplicated card and a negative stack get cleaned up first.
    let ace = Card::from_pair(14, 3).unwrap();
    let corrupt = GameStateBuilder::new()
        .stacks(vec![4.0, -2.0])
        .big_blind(1.0)
        .round_bets(vec![0.5, 1.0])
        .hands(vec![vec![ace, ace], vec![]])
        .build()
        .unwrap();
    assert!(validate(&corrupt).is_err());
    assert!(trainer.run_sample(corrupt));

    let report = trainer.train(100).unwrap();
    assert_eq!(102, report.total_iterations);
    assert_eq!(0, report.skipped_samples);

    let root = trainer
        .store()
        .get(&InfoSetKey::from("preflop|0||".to_string()))
        .unwrap();
    assert!(root.is_consistent());
    for (_, node) in trainer.store().iter() {
        let sum: f32 = node.average_strategy().iter().sum();
        assert_relative_eq!(1.0, sum, epsilon = 1e-2);
    }
}

#[test]
fn test_resume_rejects_changed_tree_shape() {
    let config = toy_config(12);
    let mut trainer = Trainer::new(config.clone()).unwrap();
    trainer.train(30).unwrap();
    let checkpoint = trainer.checkpoint();

    let mut resized = config.clone();
    resized.raise_sizes.preflop = vec![BetSize::BigBlinds(3.0)];
    let deeper = EngineConfig {
        starting_stack_bb: 40.0,
        ..config.clone()
    };
    let uncapped = EngineConfig {
        max_raises_per_round: None,
        ..config.clone()
    };
    for changed in [resized, deeper, uncapped] {
        assert!(matches!(
            Trainer::resume(changed, checkpoint.clone()),
            Err(TrainerError::Checkpoint(
                CheckpointError::FingerprintMismatch { .. }
            ))
        ));
    }

    // The unchanged configuration still resumes and keeps training.
    let mut resumed = Trainer::resume(config, checkpoint).unwrap();
    assert_eq!(40, resumed.train(10).unwrap().total_iterations);
}
