//! Search orchestration across threads and determinizations.
//!
//! The orchestrator owns the worker pool and the configuration. For hidden
//! information it samples one determinization per task, searches each in a
//! private tree and merges the root statistics; for perfect information it
//! grows one tree with every thread and keeps it between moves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use engine_core::{Board, CallSite, Determinize};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{merge, select_final, MoveStats};
use crate::config::{Parallelism, SearchConfig};
use crate::determinizer::Determinizer;
use crate::playout::{PlayoutPolicy, RandomRollout};
use crate::search::{Budget, SearchError, SearchStats, TreeSearch};
use crate::shared::{SharedTree, SharedWorker};
use crate::tree::MctsTree;

/// Outcome of one decision.
#[derive(Debug, Clone, Serialize)]
pub struct Decision<M> {
    /// Move to play
    pub mv: M,
    /// Root statistics the choice was made from, in discovery order
    pub moves: Vec<MoveStats<M>>,
    pub stats: SearchStats,
}

/// A tree kept alive between decisions.
enum Retained<M> {
    Arena(MctsTree<M>),
    Shared(SharedTree<M>),
}

impl<M: Clone + PartialEq + Send + Sync> Retained<M> {
    fn root_moves(&self) -> Option<Vec<M>> {
        match self {
            Retained::Arena(tree) => tree.root_moves(),
            Retained::Shared(tree) => tree.root_moves(),
        }
    }

    fn root_player(&self) -> usize {
        match self {
            Retained::Arena(tree) => tree.get(tree.root()).player,
            Retained::Shared(tree) => tree.root().player(),
        }
    }

    fn advance(self, mv: &M) -> Option<Self> {
        match self {
            Retained::Arena(tree) => tree.advance(mv).map(Retained::Arena),
            Retained::Shared(tree) => tree.advance(mv).map(Retained::Shared),
        }
    }
}

/// Result of one independent-tree task.
struct TaskOutcome<M> {
    moves: Vec<MoveStats<M>>,
    stats: SearchStats,
    had_moves: bool,
}

/// Runs searches under a budget and turns them into decisions.
pub struct SearchOrchestrator<B: Board, P = RandomRollout> {
    config: SearchConfig,
    policy: P,
    pool: rayon::ThreadPool,
    stop: Arc<AtomicBool>,
    decisions: u64,
    retained: Option<Retained<B::Move>>,
}

impl<B: Board> SearchOrchestrator<B, RandomRollout> {
    /// Orchestrator using uniform random rollouts.
    pub fn with_random_rollouts(config: SearchConfig) -> Result<Self, SearchError> {
        Self::new(config, RandomRollout)
    }
}

impl<B, P> SearchOrchestrator<B, P>
where
    B: Board,
    P: PlayoutPolicy<B>,
{
    /// Validate `config` and start the worker pool.
    pub fn new(config: SearchConfig, policy: P) -> Result<Self, SearchError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("mcts-worker-{i}"))
            .build()?;

        Ok(Self {
            config,
            policy,
            pool,
            stop: Arc::new(AtomicBool::new(false)),
            decisions: 0,
            retained: None,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Change how many determinizations later decisions run, e.g. to follow
    /// [`StrengthLevel::determinizations_for`](crate::StrengthLevel::determinizations_for)
    /// as the game progresses.
    pub fn set_determinizations(&mut self, n: usize) -> Result<(), SearchError> {
        let config = self.config.clone().with_determinizations(n);
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Flag that ends the running search once set. Simulations already in
    /// flight finish and are counted; the root is still fully expanded.
    ///
    /// A stop requested between decisions ends the next one as soon as its
    /// root is expanded. Every call to [`decide`](Self::decide) clears the
    /// flag before returning.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Choose a move for the player to move in `knowledge`'s game.
    pub fn decide<D>(&mut self, knowledge: &D) -> Result<Decision<B::Move>, SearchError>
    where
        D: Determinize<Board = B>,
    {
        let start = Instant::now();
        let seed = self.config.seed.wrapping_add(self.decisions);
        self.decisions += 1;

        let shared = match self.config.parallelism {
            Parallelism::Auto => !knowledge.has_hidden_information(),
            Parallelism::IndependentTrees => false,
            Parallelism::SharedTree => true,
        };

        let searched = if shared {
            self.search_shared(knowledge, seed, start)
        } else {
            self.retained = None;
            self.search_independent(knowledge, seed, start)
        };
        self.stop.store(false, Ordering::Relaxed);
        let (moves, mut stats) = searched?;
        stats.elapsed_ms = start.elapsed().as_millis() as u64;

        let idx = select_final(
            &moves,
            self.config.final_selection,
            self.config.optimistic_bias,
            self.config.pessimistic_bias,
        )
        .ok_or(SearchError::NoRootChild)?;
        let mv = moves[idx].mv.clone();

        info!(
            iterations = stats.iterations,
            trees = stats.trees,
            nodes = stats.nodes,
            elapsed_ms = stats.elapsed_ms,
            policy = %self.config.final_selection,
            chosen = ?mv,
            "MCTS decision"
        );

        Ok(Decision { mv, moves, stats })
    }

    /// Commit a move that was actually played (by anyone).
    ///
    /// A retained tree is advanced to the matching child and keeps its
    /// statistics; if the move was never explored the tree is dropped.
    pub fn advance(&mut self, mv: &B::Move) {
        if let Some(retained) = self.retained.take() {
            self.retained = retained.advance(mv);
            if self.retained.is_none() {
                debug!(mv = ?mv, "move not in retained tree, discarding it");
            }
        }
    }

    /// Forget any retained tree.
    pub fn reset(&mut self) {
        self.retained = None;
    }

    fn search_independent<D>(
        &self,
        knowledge: &D,
        seed: u64,
        start: Instant,
    ) -> Result<(Vec<MoveStats<B::Move>>, SearchStats), SearchError>
    where
        D: Determinize<Board = B>,
    {
        let config = &self.config;
        let policy = &self.policy;
        let stop = self.stop.as_ref();
        let determinizer = Determinizer::new(config.determinization_attempts);
        let tasks = config.determinization_count();

        let outcomes: Vec<TaskOutcome<B::Move>> = self.pool.install(|| {
            (0..tasks)
                .into_par_iter()
                .map(|task| {
                    let mut rng = ChaCha20Rng::seed_from_u64(seed);
                    rng.set_stream(task as u64);

                    let sample = determinizer.sample(knowledge, &mut rng);
                    let had_moves = has_moves(&sample.board);
                    let mut search = TreeSearch::new(sample.board, policy, config, rng);
                    if had_moves {
                        search.run(&Budget::new(config, start, stop));
                    }

                    let mut stats = search.stats();
                    stats.relaxed_determinizations = u64::from(sample.relaxed);
                    debug!(
                        task,
                        iterations = stats.iterations,
                        nodes = stats.nodes,
                        relaxed = sample.relaxed,
                        "determinization searched"
                    );
                    TaskOutcome {
                        moves: search.tree().root_move_stats(),
                        stats,
                        had_moves,
                    }
                })
                .collect()
        });

        if !outcomes.iter().any(|o| o.had_moves) {
            return Err(SearchError::NoLegalMoves);
        }

        let mut stats = SearchStats::default();
        for outcome in &outcomes {
            stats.absorb(&outcome.stats);
        }
        let moves = merge(outcomes.into_iter().map(|o| o.moves));
        Ok((moves, stats))
    }

    fn search_shared<D>(
        &mut self,
        knowledge: &D,
        seed: u64,
        start: Instant,
    ) -> Result<(Vec<MoveStats<B::Move>>, SearchStats), SearchError>
    where
        D: Determinize<Board = B>,
    {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let sample = Determinizer::new(self.config.determinization_attempts)
            .sample(knowledge, &mut rng);
        let board = sample.board;
        if !has_moves(&board) {
            return Err(SearchError::NoLegalMoves);
        }

        let retained = self
            .retained
            .take()
            .filter(|tree| matches_board(tree, &board));
        if retained.is_some() {
            debug!("reusing retained tree");
        }

        let config = &self.config;
        let policy = &self.policy;
        let stop = self.stop.as_ref();
        let budget = Budget::new(config, start, stop);

        let (retained, mut stats) = if config.threads == 1 {
            let tree = match retained {
                Some(Retained::Arena(tree)) => tree,
                _ => MctsTree::new(&board),
            };
            let mut search = TreeSearch::with_tree(tree, board, policy, config, rng);
            search.run(&budget);
            let stats = search.stats();
            (Retained::Arena(search.into_tree()), stats)
        } else {
            let tree = match retained {
                Some(Retained::Shared(tree)) => tree,
                _ => SharedTree::new(&board),
            };
            let mut slots: Vec<Option<SearchStats>> = vec![None; config.threads];
            self.pool.scope(|s| {
                for (worker, slot) in slots.iter_mut().enumerate() {
                    let (tree, board, budget) = (&tree, &board, &budget);
                    s.spawn(move |_| {
                        let mut rng = ChaCha20Rng::seed_from_u64(seed);
                        rng.set_stream(worker as u64);
                        let worker_stats =
                            SharedWorker::new(tree, board, policy, config, rng).run(budget);
                        *slot = Some(worker_stats);
                    });
                }
            });

            let mut stats = SearchStats::default();
            for worker_stats in slots.iter().flatten() {
                stats.absorb(worker_stats);
            }
            let tree_stats = tree.stats();
            stats.nodes = tree_stats.total_nodes as u64;
            stats.max_depth = stats.max_depth.max(tree_stats.max_depth);
            (Retained::Shared(tree), stats)
        };

        stats.trees = 1;
        stats.relaxed_determinizations = u64::from(sample.relaxed);
        let moves = match &retained {
            Retained::Arena(tree) => tree.root_move_stats(),
            Retained::Shared(tree) => tree.root_move_stats(),
        };
        self.retained = Some(retained);
        Ok((moves, stats))
    }
}

fn has_moves<B: Board>(board: &B) -> bool {
    !board.is_terminal() && !board.legal_moves(CallSite::TreePolicy).is_empty()
}

/// A retained tree can only be reused for the board its root describes.
fn matches_board<B: Board>(tree: &Retained<B::Move>, board: &B) -> bool {
    if tree.root_player() != board.current_player() {
        return false;
    }
    let Some(known) = tree.root_moves() else {
        return false;
    };
    let legal = board.legal_moves(CallSite::TreePolicy);
    known.len() == legal.len() && legal.iter().all(|mv| known.contains(mv))
}
