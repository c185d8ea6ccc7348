//! Single-tree MCTS search.
//!
//! Implements the core MCTS cycle over one private tree:
//! 1. Selection: descend with UCB1 while nodes are fully expanded
//! 2. Expansion: materialize one unvisited child
//! 3. Simulation: score the new state with the playout policy
//! 4. Backpropagation: update statistics and proven bounds up to the root

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use engine_core::Board;
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

use crate::config::{ConfigError, SearchConfig};
use crate::node::NodeId;
use crate::playout::{simulate, PlayoutPolicy};
use crate::selection::{select_child, weighted_index, SelectionParams};
use crate::tree::MctsTree;

/// Errors that can occur during MCTS search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("No legal moves available")]
    NoLegalMoves,

    #[error("Search finished without a root child to choose from")]
    NoRootChild,

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Counters describing one search call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchStats {
    /// Completed simulations
    pub iterations: u64,
    /// Nodes in the searched trees when the search finished
    pub nodes: u64,
    pub max_depth: u32,
    /// Simulations whose playout policy failed and were rolled out randomly
    pub evaluator_fallbacks: u64,
    /// Determinizations that needed relaxed constraints
    pub relaxed_determinizations: u64,
    /// Trees searched (determinizations, or 1 for a shared tree)
    pub trees: usize,
    pub elapsed_ms: u64,
}

impl SearchStats {
    /// Fold the counters of another tree into these.
    pub fn absorb(&mut self, other: &SearchStats) {
        self.iterations += other.iterations;
        self.nodes += other.nodes;
        self.max_depth = self.max_depth.max(other.max_depth);
        self.evaluator_fallbacks += other.evaluator_fallbacks;
        self.relaxed_determinizations += other.relaxed_determinizations;
        self.trees += other.trees;
    }
}

/// When to stop issuing simulations.
///
/// The root is always fully expanded first, whatever the budget says, so
/// that every legal move has been tried at least once.
#[derive(Debug, Clone, Copy)]
pub struct Budget<'a> {
    pub deadline: Option<Instant>,
    pub iterations: Option<u64>,
    pub stop: &'a AtomicBool,
}

impl<'a> Budget<'a> {
    /// Budget of `config` starting at `start`.
    pub fn new(config: &SearchConfig, start: Instant, stop: &'a AtomicBool) -> Self {
        Self {
            deadline: config.time_budget.map(|d| start + d),
            iterations: config.iterations,
            stop,
        }
    }

    /// Whether another simulation may start after `done` completed ones.
    pub fn allows(&self, done: u64, root_settled: bool) -> bool {
        if !root_settled {
            return true;
        }
        if self.stop.load(Ordering::Relaxed) {
            return false;
        }
        let time_left = self.deadline.map_or(true, |d| Instant::now() < d);
        let runs_left = self.iterations.map_or(true, |n| done < n);
        time_left && runs_left
    }
}

impl From<&SearchConfig> for SelectionParams {
    fn from(config: &SearchConfig) -> Self {
        Self {
            exploration: config.exploration,
            optimistic_bias: config.optimistic_bias,
            pessimistic_bias: config.pessimistic_bias,
        }
    }
}

/// MCTS search over one private tree.
pub struct TreeSearch<'a, B: Board, P: ?Sized> {
    tree: MctsTree<B::Move>,
    root_board: B,
    policy: &'a P,
    config: &'a SearchConfig,
    params: SelectionParams,
    rng: ChaCha20Rng,
    iterations: u64,
    fallbacks: u64,
    max_depth: u32,
}

impl<'a, B, P> TreeSearch<'a, B, P>
where
    B: Board,
    P: PlayoutPolicy<B> + ?Sized,
{
    /// Create a new search rooted at `board`.
    pub fn new(board: B, policy: &'a P, config: &'a SearchConfig, rng: ChaCha20Rng) -> Self {
        let tree = MctsTree::new(&board);
        Self::with_tree(tree, board, policy, config, rng)
    }

    /// Continue searching an existing tree whose root state is `board`.
    pub fn with_tree(
        tree: MctsTree<B::Move>,
        board: B,
        policy: &'a P,
        config: &'a SearchConfig,
        rng: ChaCha20Rng,
    ) -> Self {
        Self {
            tree,
            root_board: board,
            policy,
            config,
            params: SelectionParams::from(config),
            rng,
            iterations: 0,
            fallbacks: 0,
            max_depth: 0,
        }
    }

    /// Run simulations until `budget` is spent. Returns the number run.
    pub fn run(&mut self, budget: &Budget<'_>) -> u64 {
        let before = self.iterations;
        while budget.allows(self.iterations - before, self.root_settled()) {
            self.simulate();
        }
        self.iterations - before
    }

    /// Run exactly `n` simulations.
    pub fn run_iterations(&mut self, n: u64) {
        for _ in 0..n {
            self.simulate();
        }
    }

    /// Run a single simulation (select -> expand -> simulate -> backpropagate).
    pub fn simulate(&mut self) {
        let mut board = self.root_board.clone();
        let (leaf_id, depth) = self.select(&mut board);

        let proven = self.tree.get(leaf_id).terminal;
        let scores = if proven {
            board.scores()
        } else {
            let result = simulate(self.policy, &board, self.config.playouts, &mut self.rng);
            self.fallbacks += u64::from(result.fallbacks);
            result.scores
        };

        self.tree.backpropagate(leaf_id, &scores);
        if proven {
            self.tree
                .propagate_bounds(leaf_id, &scores, self.config.pruning);
        }

        self.iterations += 1;
        self.max_depth = self.max_depth.max(depth);

        trace!(
            leaf = leaf_id.0,
            depth = depth,
            proven = proven,
            "MCTS simulation complete"
        );
    }

    /// Descend from the root, replaying moves onto `board`.
    ///
    /// Returns the node to simulate from (a freshly materialized child, a
    /// terminal node, or a node with nothing left to select) and its depth.
    fn select(&mut self, board: &mut B) -> (NodeId, u32) {
        let mut current = self.tree.root();
        let mut depth = 0;

        loop {
            if self.tree.get(current).terminal {
                return (current, depth);
            }
            if !self.tree.get(current).is_expanded() {
                self.tree.expand(current, board);
            }

            let node = self.tree.get(current);
            let next = if let Some(weights) = &node.chance_weights {
                weighted_index(weights, &mut self.rng).map(|i| node.children[i])
            } else if node.has_unvisited() {
                return self.materialize(current, board, depth);
            } else {
                let views = self.tree.child_views(current);
                select_child(node.games, &views, &self.params).map(|i| node.children[i])
            };

            let Some(child) = next else {
                return (current, depth);
            };
            if let Some(mv) = &self.tree.get(child).mv {
                board.apply(mv);
            }
            current = child;
            depth += 1;
        }
    }

    /// Move one random unvisited move of `node_id` into its children.
    fn materialize(&mut self, node_id: NodeId, board: &mut B, depth: u32) -> (NodeId, u32) {
        let Some(unvisited) = self.tree.get_mut(node_id).unvisited.as_mut() else {
            return (node_id, depth);
        };
        let idx = self.rng.gen_range(0..unvisited.len());
        let mv = unvisited.remove(idx);

        board.apply(&mv);
        let child = self.tree.add_child(node_id, mv, board);
        (child, depth + 1)
    }

    /// Root is terminal, or every root move has been tried.
    pub fn root_settled(&self) -> bool {
        let root = self.tree.get(self.tree.root());
        root.terminal || root.is_fully_expanded()
    }

    pub fn tree(&self) -> &MctsTree<B::Move> {
        &self.tree
    }

    pub fn into_tree(self) -> MctsTree<B::Move> {
        self.tree
    }

    pub fn root_board(&self) -> &B {
        &self.root_board
    }

    /// Counters for the simulations run by this search so far.
    pub fn stats(&self) -> SearchStats {
        SearchStats {
            iterations: self.iterations,
            nodes: self.tree.len() as u64,
            max_depth: self.max_depth,
            evaluator_fallbacks: self.fallbacks,
            relaxed_determinizations: 0,
            trees: 1,
            elapsed_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playout::RandomRollout;
    use engine_core::{CallSite, PlayerId, Scores};
    use rand::SeedableRng;

    /// Pick one of three doors; door 2 wins, the others lose.
    #[derive(Debug, Clone)]
    struct Doors {
        opened: Option<u8>,
    }

    impl Board for Doors {
        type Move = u8;

        fn current_player(&self) -> PlayerId {
            0
        }

        fn player_count(&self) -> usize {
            2
        }

        fn legal_moves(&self, _site: CallSite) -> Vec<u8> {
            match self.opened {
                Some(_) => vec![],
                None => vec![0, 1, 2],
            }
        }

        fn apply(&mut self, mv: &u8) {
            self.opened = Some(*mv);
        }

        fn is_terminal(&self) -> bool {
            self.opened.is_some()
        }

        fn scores(&self) -> Scores {
            if self.opened == Some(2) {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            }
        }
    }

    #[test]
    fn test_root_visits_equal_iterations() {
        let config = SearchConfig::for_testing();
        let mut search = TreeSearch::new(
            Doors { opened: None },
            &RandomRollout,
            &config,
            ChaCha20Rng::seed_from_u64(42),
        );
        search.run_iterations(25);

        let tree = search.tree();
        assert_eq!(tree.get(tree.root()).games, 25);
        assert_eq!(search.stats().iterations, 25);
        assert!(search.root_settled());
    }

    #[test]
    fn test_budget_expands_root_first() {
        let config = SearchConfig::for_testing().with_iterations(0);
        let stop = AtomicBool::new(false);
        let budget = Budget::new(&config, Instant::now(), &stop);
        let mut search = TreeSearch::new(
            Doors { opened: None },
            &RandomRollout,
            &config,
            ChaCha20Rng::seed_from_u64(42),
        );

        let ran = search.run(&budget);
        assert_eq!(ran, 3);
        assert_eq!(search.tree().get(search.tree().root()).children.len(), 3);
    }

    #[test]
    fn test_stop_flag_ends_search() {
        let config = SearchConfig::for_testing().with_iterations(1_000_000);
        let stop = AtomicBool::new(true);
        let budget = Budget::new(&config, Instant::now(), &stop);
        let mut search = TreeSearch::new(
            Doors { opened: None },
            &RandomRollout,
            &config,
            ChaCha20Rng::seed_from_u64(42),
        );

        assert_eq!(search.run(&budget), 3);
    }

    #[test]
    fn test_proven_doors_are_pruned() {
        let config = SearchConfig::for_testing();
        let mut search = TreeSearch::new(
            Doors { opened: None },
            &RandomRollout,
            &config,
            ChaCha20Rng::seed_from_u64(7),
        );
        search.run_iterations(30);

        let tree = search.tree();
        let root = tree.get(tree.root());
        assert_eq!(root.bounds.pessimistic[0], 1.0);
        for &child in &root.children {
            assert!(tree.get(child).pruned);
        }
        // The fallback keeps visiting the winning door.
        let winner = tree.find_child(tree.root(), &2).unwrap();
        assert!(tree.get(winner).games >= 25);
    }

    #[test]
    fn test_stats_absorb() {
        let mut total = SearchStats::default();
        let one = SearchStats {
            iterations: 10,
            nodes: 5,
            max_depth: 3,
            evaluator_fallbacks: 1,
            relaxed_determinizations: 1,
            trees: 1,
            elapsed_ms: 0,
        };
        total.absorb(&one);
        total.absorb(&SearchStats {
            max_depth: 7,
            ..one.clone()
        });
        assert_eq!(total.iterations, 20);
        assert_eq!(total.nodes, 10);
        assert_eq!(total.max_depth, 7);
        assert_eq!(total.trees, 2);
    }
}
