//! Invariants that must hold for any search.

use std::collections::HashSet;

use engine_core::{Board, CallSite, DeterminizationError, Determinize, PlayerId};
use games_jass::{Card, JassGame, JassKnowledge, PLAYERS};
use games_tictactoe::TicTacToe;
use mcts::{
    Determinization, Determinizer, MctsTree, RandomRollout, SearchConfig, SearchOrchestrator,
    TreeSearch,
};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

fn position_after(moves: &[usize]) -> TicTacToe {
    let mut board = TicTacToe::new();
    for &pick in moves {
        let legal = board.legal_moves(CallSite::TreePolicy);
        if legal.is_empty() {
            break;
        }
        board.apply(&legal[pick % legal.len()]);
    }
    board
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After every simulation each node's optimistic bound is at least its
    /// pessimistic bound, for every player.
    #[test]
    fn prop_bounds_stay_consistent(
        opening in prop::collection::vec(0usize..9, 0..5),
        seed in any::<u64>(),
        steps in 1u64..200,
    ) {
        let board = position_after(&opening);
        prop_assume!(!board.is_terminal());

        let config = SearchConfig::for_testing();
        let policy = RandomRollout;
        let mut search = TreeSearch::new(board, &policy, &config, ChaCha20Rng::seed_from_u64(seed));
        for _ in 0..steps {
            search.simulate();
            for node in search.tree().arena() {
                prop_assert!(node.bounds.is_consistent(), "{:?}", node.bounds);
            }
        }
        let root = search.tree().get(search.tree().root());
        prop_assert_eq!(root.games, steps);
    }
}

#[test]
fn test_root_visits_equal_simulations() {
    let config = SearchConfig::for_testing();
    let policy = RandomRollout;
    let mut search = TreeSearch::new(
        TicTacToe::new(),
        &policy,
        &config,
        ChaCha20Rng::seed_from_u64(3),
    );
    search.run_iterations(777);

    let tree = search.tree();
    assert_eq!(tree.get(tree.root()).games, 777);
    let visits: u64 = tree.root_move_stats().iter().map(|m| m.visits).sum();
    assert_eq!(visits, 777);
}

#[test]
fn test_root_reuse_preserves_subtree() {
    let config = SearchConfig::for_testing();
    let policy = RandomRollout;
    let mut search = TreeSearch::new(
        TicTacToe::new(),
        &policy,
        &config,
        ChaCha20Rng::seed_from_u64(8),
    );
    search.run_iterations(2000);
    let tree: MctsTree<u8> = search.into_tree();

    let center = tree.find_child(tree.root(), &4).unwrap();
    let before = tree.get(center).clone();
    let grandchildren: Vec<(u8, u64, Vec<f64>)> = before
        .children
        .iter()
        .map(|&c| {
            let node = tree.get(c);
            (node.mv.unwrap(), node.games, node.score.clone())
        })
        .collect();

    let promoted = tree.advance(&4).unwrap();
    let root = promoted.get(promoted.root());
    assert_eq!(root.games, before.games);
    assert_eq!(root.score, before.score);
    assert!(root.parent.is_none());

    let after: Vec<(u8, u64, Vec<f64>)> = root
        .children
        .iter()
        .map(|&c| {
            let node = promoted.get(c);
            (node.mv.unwrap(), node.games, node.score.clone())
        })
        .collect();
    assert_eq!(after, grandchildren);
}

#[test]
fn test_fixed_seed_is_deterministic() {
    let mut rng = ChaCha20Rng::seed_from_u64(31);
    let game = JassGame::deal(&mut rng, 0);
    let knowledge = JassKnowledge::from_game(&game, 0);

    let decide = || {
        let config = SearchConfig::for_testing()
            .with_threads(1)
            .with_determinizations(3)
            .with_iterations(150)
            .with_seed(99);
        let mut orchestrator = SearchOrchestrator::with_random_rollouts(config).unwrap();
        orchestrator.decide(&knowledge).unwrap()
    };

    let first = decide();
    let second = decide();
    assert_eq!(first.mv, second.mv);
    assert_eq!(first.moves, second.moves);
    assert_eq!(first.stats.iterations, second.stats.iterations);
}

#[test]
fn test_stop_handle_ends_search() {
    use std::sync::atomic::Ordering;
    use std::time::{Duration, Instant};

    let config = SearchConfig::for_testing()
        .with_threads(2)
        .with_iterations(u64::MAX)
        .with_time_budget(Duration::from_secs(60));
    let mut orchestrator = SearchOrchestrator::with_random_rollouts(config).unwrap();
    let stop = orchestrator.stop_handle();

    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        stop.store(true, Ordering::Relaxed);
    });

    let start = Instant::now();
    let decision = orchestrator
        .decide(&engine_core::PerfectInformation::new(TicTacToe::new()))
        .unwrap();
    stopper.join().unwrap();

    assert!(start.elapsed() < Duration::from_secs(30));
    assert!(decision.stats.iterations >= 9);
}

/// Knowledge whose constrained sampling never succeeds.
struct AlwaysRejects(JassKnowledge);

impl Determinize for AlwaysRejects {
    type Board = JassGame;
    type Hidden = Card;

    fn sample(&self, _rng: &mut ChaCha20Rng) -> Result<JassGame, DeterminizationError> {
        Err(DeterminizationError::Infeasible("rejected".into()))
    }

    fn sample_relaxed(&self, rng: &mut ChaCha20Rng) -> JassGame {
        self.0.sample_relaxed(rng)
    }

    fn impossible_for(&self, player: PlayerId) -> HashSet<Card> {
        self.0.impossible_for(player)
    }
}

#[test]
fn test_relaxed_determinization_stays_consistent() {
    let mut rng = ChaCha20Rng::seed_from_u64(17);
    let determinizer = Determinizer::new(2);
    let mut relaxed_with_voids = 0;

    for declarer in 0..8 {
        let mut game = JassGame::deal(&mut rng, declarer % PLAYERS);
        while !game.is_terminal() {
            let observer = game.current_player();
            let has_voids = (0..PLAYERS).any(|p| !game.impossible(p).is_empty());
            if has_voids {
                let knowledge = AlwaysRejects(JassKnowledge::from_game(&game, observer));
                for _ in 0..5 {
                    let Determinization { board, relaxed } =
                        determinizer.sample(&knowledge, &mut rng);
                    assert!(relaxed);
                    assert_eq!(board.hand(observer), game.hand(observer));
                    for p in 0..PLAYERS {
                        let impossible = knowledge.impossible_for(p);
                        assert_eq!(board.hand(p).len(), game.hand(p).len());
                        for card in board.hand(p).iter() {
                            assert!(
                                !impossible.contains(&card),
                                "seat {p} was dealt excluded card {card}"
                            );
                        }
                    }
                    relaxed_with_voids += 1;
                }
            }

            let legal = game.legal_moves(CallSite::Playout);
            let pick = rng.gen_range(0..legal.len());
            game.apply(&legal[pick]);
        }
    }
    assert!(relaxed_with_voids > 0);
}
