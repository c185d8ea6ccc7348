//! Shared search tree for tree parallelism.
//!
//! Every worker thread descends, expands and backpropagates on the same tree.
//! Visit counts and score sums are atomics. Each node serializes the move of a
//! legal move from "unvisited" to "child" behind its expansion mutex, so a
//! given child is materialized by exactly one thread. Concurrent selection
//! over in-flight simulations is tolerated; there is no virtual loss.
//!
//! Lock order is expansion, then children, then bounds. No code path takes
//! them in the opposite direction.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use engine_core::{Board, CallSite, PlayerId};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use tracing::trace;

use crate::aggregate::MoveStats;
use crate::bounds;
use crate::config::SearchConfig;
use crate::node::Bounds;
use crate::playout::{simulate, PlayoutPolicy};
use crate::search::{Budget, SearchStats};
use crate::selection::{select_child, weighted_index, ChildView, SelectionParams};
use crate::tree::TreeStats;

/// Thread-safe f64 using bit-casting on AtomicU64
#[derive(Debug, Default)]
pub struct AtomicF64 {
    inner: AtomicU64,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            inner: AtomicU64::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn load(&self, ordering: Ordering) -> f64 {
        f64::from_bits(self.inner.load(ordering))
    }

    /// Lock-free fetch-add using compare-and-swap.
    ///
    /// `ordering` applies to the successful exchange only, so any ordering
    /// valid for a read-modify-write (including `AcqRel`) is accepted.
    #[inline]
    pub fn fetch_add(&self, value: f64, ordering: Ordering) -> f64 {
        let mut current_bits = self.inner.load(Ordering::Relaxed);
        loop {
            let current = f64::from_bits(current_bits);
            let new_bits = (current + value).to_bits();
            match self.inner.compare_exchange_weak(
                current_bits,
                new_bits,
                ordering,
                Ordering::Relaxed,
            ) {
                Ok(_) => return current,
                Err(actual) => current_bits = actual,
            }
        }
    }
}

#[derive(Debug)]
struct Expansion<M> {
    /// `None` until the legal moves have been generated
    unvisited: Option<Vec<M>>,
    chance_weights: Option<Vec<f64>>,
}

/// A node of the shared tree.
#[derive(Debug)]
pub struct SharedNode<M> {
    /// Non-owning back-reference; cleared when the node becomes the root
    parent: Mutex<Weak<SharedNode<M>>>,
    mv: Option<M>,
    player: PlayerId,
    terminal: bool,
    games: AtomicU64,
    score: Vec<AtomicF64>,
    bounds: Mutex<Bounds>,
    pruned: AtomicBool,
    expansion: Mutex<Expansion<M>>,
    children: RwLock<Vec<Arc<SharedNode<M>>>>,
}

impl<M: Clone + PartialEq> SharedNode<M> {
    fn new<B: Board<Move = M>>(parent: Weak<SharedNode<M>>, mv: Option<M>, board: &B) -> Self {
        let player_count = board.player_count();
        Self {
            parent: Mutex::new(parent),
            mv,
            player: board.current_player(),
            terminal: board.is_terminal(),
            games: AtomicU64::new(0),
            score: (0..player_count).map(|_| AtomicF64::default()).collect(),
            bounds: Mutex::new(Bounds::unknown(player_count)),
            pruned: AtomicBool::new(false),
            expansion: Mutex::new(Expansion {
                unvisited: None,
                chance_weights: None,
            }),
            children: RwLock::new(Vec::new()),
        }
    }

    pub fn mv(&self) -> Option<&M> {
        self.mv.as_ref()
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn games(&self) -> u64 {
        self.games.load(Ordering::Acquire)
    }

    pub fn score(&self, player: PlayerId) -> f64 {
        self.score[player].load(Ordering::Acquire)
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds.lock().clone()
    }

    pub fn is_pruned(&self) -> bool {
        self.pruned.load(Ordering::Acquire)
    }

    pub fn parent(&self) -> Option<Arc<SharedNode<M>>> {
        self.parent.lock().upgrade()
    }

    pub fn children(&self) -> Vec<Arc<SharedNode<M>>> {
        self.children.read().clone()
    }

    fn is_settled(&self) -> bool {
        self.terminal
            || self
                .expansion
                .lock()
                .unvisited
                .as_ref()
                .is_some_and(Vec::is_empty)
    }

    fn view(&self, player: PlayerId) -> ChildView {
        let bounds = self.bounds.lock();
        ChildView {
            games: self.games.load(Ordering::Acquire),
            score: self.score[player].load(Ordering::Acquire),
            optimistic: bounds.optimistic[player],
            pessimistic: bounds.pessimistic[player],
            pruned: self.pruned.load(Ordering::Acquire),
        }
    }

    fn record(&self, scores: &[f64]) {
        for (total, &value) in self.score.iter().zip(scores) {
            total.fetch_add(value, Ordering::AcqRel);
        }
        self.games.fetch_add(1, Ordering::AcqRel);
    }

    /// Recompute bounds from the children. Returns whether they changed.
    ///
    /// Bounds only ever tighten. The recomputed interval is intersected with
    /// the stored one, so a snapshot taken before another thread's update
    /// cannot widen it again.
    fn refresh_bounds(&self) -> bool {
        let (has_unvisited, chance) = {
            let expansion = self.expansion.lock();
            (
                expansion.unvisited.as_ref().is_some_and(|u| !u.is_empty()),
                expansion.chance_weights.is_some(),
            )
        };
        let child_bounds: Vec<Bounds> = self
            .children
            .read()
            .iter()
            .map(|c| c.bounds.lock().clone())
            .collect();

        let Some(combined) = bounds::combine(
            self.player,
            self.score.len(),
            chance,
            has_unvisited,
            &child_bounds,
        ) else {
            return false;
        };

        let mut current = self.bounds.lock();
        let tightened = current.tightened(&combined);
        if *current == tightened {
            false
        } else {
            *current = tightened;
            true
        }
    }

    fn prune_children(&self) {
        if self.expansion.lock().chance_weights.is_some() {
            return;
        }
        let own = self.bounds.lock().clone();
        for child in self.children.read().iter() {
            if !child.pruned.load(Ordering::Acquire)
                && bounds::should_prune(self.player, &own, &child.bounds.lock())
            {
                child.pruned.store(true, Ordering::Release);
            }
        }
    }
}

/// What a descent step does next.
enum Step<M> {
    Descend(Arc<SharedNode<M>>),
    Leaf(Arc<SharedNode<M>>),
    Stay,
}

/// Search tree shared by all worker threads.
#[derive(Debug)]
pub struct SharedTree<M> {
    root: Arc<SharedNode<M>>,
}

impl<M: Clone + PartialEq + Send + Sync> SharedTree<M> {
    /// Create a new tree whose root is `board`.
    pub fn new<B: Board<Move = M>>(board: &B) -> Self {
        Self {
            root: Arc::new(SharedNode::new(Weak::new(), None, board)),
        }
    }

    pub fn root(&self) -> &Arc<SharedNode<M>> {
        &self.root
    }

    /// Root is terminal, or every root move has been tried.
    pub fn root_settled(&self) -> bool {
        self.root.is_settled()
    }

    /// Per-move statistics of the root's children, in discovery order.
    pub fn root_move_stats(&self) -> Vec<MoveStats<M>> {
        let player = self.root.player;
        self.root
            .children()
            .iter()
            .filter_map(|child| {
                let bounds = child.bounds();
                Some(MoveStats {
                    mv: child.mv.clone()?,
                    visits: child.games(),
                    score: child.score(player),
                    optimistic: bounds.optimistic[player],
                    pessimistic: bounds.pessimistic[player],
                })
            })
            .collect()
    }

    /// Moves known at the root: materialized children first, then the
    /// unvisited ones. `None` before the root is expanded.
    pub fn root_moves(&self) -> Option<Vec<M>> {
        let unvisited = self.root.expansion.lock().unvisited.clone()?;
        let mut moves: Vec<M> = self
            .root
            .children()
            .iter()
            .filter_map(|c| c.mv.clone())
            .collect();
        moves.extend(unvisited);
        Some(moves)
    }

    /// Promote the child reached by `mv` to root.
    ///
    /// Siblings and the old root are released once the last reference to
    /// them goes away; the new root's parent reference is cleared. Returns
    /// `None` when the move was never materialized.
    pub fn advance(self, mv: &M) -> Option<Self> {
        let child = self
            .root
            .children()
            .into_iter()
            .find(|c| c.mv.as_ref() == Some(mv))?;
        *child.parent.lock() = Weak::new();
        child.pruned.store(false, Ordering::Release);
        Some(Self { root: child })
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        let mut total_nodes = 0;
        let mut max_depth = 0;
        let mut stack = vec![(self.root.clone(), 0u32)];
        while let Some((node, depth)) = stack.pop() {
            total_nodes += 1;
            max_depth = max_depth.max(depth);
            stack.extend(node.children().into_iter().map(|c| (c, depth + 1)));
        }
        TreeStats {
            total_nodes,
            root_games: self.root.games(),
            max_depth,
        }
    }
}

/// One thread's share of a shared-tree search.
pub struct SharedWorker<'a, B: Board, P: ?Sized> {
    tree: &'a SharedTree<B::Move>,
    root_board: &'a B,
    policy: &'a P,
    config: &'a SearchConfig,
    params: SelectionParams,
    rng: ChaCha20Rng,
    iterations: u64,
    fallbacks: u64,
    max_depth: u32,
}

impl<'a, B, P> SharedWorker<'a, B, P>
where
    B: Board,
    P: PlayoutPolicy<B> + ?Sized,
{
    pub fn new(
        tree: &'a SharedTree<B::Move>,
        root_board: &'a B,
        policy: &'a P,
        config: &'a SearchConfig,
        rng: ChaCha20Rng,
    ) -> Self {
        Self {
            tree,
            root_board,
            policy,
            config,
            params: SelectionParams::from(config),
            rng,
            iterations: 0,
            fallbacks: 0,
            max_depth: 0,
        }
    }

    /// Run simulations until `budget` is spent. Returns this worker's
    /// counters.
    pub fn run(mut self, budget: &Budget<'_>) -> SearchStats {
        while budget.allows(self.iterations, self.tree.root_settled()) {
            self.simulate();
        }
        SearchStats {
            iterations: self.iterations,
            nodes: 0,
            max_depth: self.max_depth,
            evaluator_fallbacks: self.fallbacks,
            relaxed_determinizations: 0,
            trees: 0,
            elapsed_ms: 0,
        }
    }

    /// Run a single simulation on the shared tree.
    pub fn simulate(&mut self) {
        let mut board = self.root_board.clone();
        let (leaf, depth) = self.select(&mut board);

        let proven = leaf.terminal;
        let scores = if proven {
            board.scores()
        } else {
            let result = simulate(self.policy, &board, self.config.playouts, &mut self.rng);
            self.fallbacks += u64::from(result.fallbacks);
            result.scores
        };

        let mut current = Some(leaf.clone());
        while let Some(node) = current {
            node.record(&scores);
            current = node.parent();
        }

        if proven {
            propagate_bounds(&leaf, &scores, self.config.pruning);
        }

        self.iterations += 1;
        self.max_depth = self.max_depth.max(depth);
        trace!(depth = depth, proven = proven, "shared simulation complete");
    }

    fn select(&mut self, board: &mut B) -> (Arc<SharedNode<B::Move>>, u32) {
        let mut node = self.tree.root.clone();
        let mut depth = 0;

        loop {
            if node.terminal {
                return (node, depth);
            }
            match self.step(&node, board) {
                Step::Leaf(child) => return (child, depth + 1),
                Step::Stay => return (node, depth),
                Step::Descend(child) => {
                    if let Some(mv) = &child.mv {
                        board.apply(mv);
                    }
                    node = child;
                    depth += 1;
                }
            }
        }
    }

    fn step(&mut self, node: &Arc<SharedNode<B::Move>>, board: &mut B) -> Step<B::Move> {
        {
            let mut expansion = node.expansion.lock();
            if expansion.unvisited.is_none() {
                let moves = board.legal_moves(CallSite::TreePolicy);
                let weights = board
                    .chance_weights()
                    .filter(|w| w.len() == moves.len() && !moves.is_empty());
                match weights {
                    Some(weights) => {
                        let children: Vec<_> = moves
                            .into_iter()
                            .map(|mv| {
                                let mut child_board = board.clone();
                                child_board.apply(&mv);
                                Arc::new(SharedNode::new(
                                    Arc::downgrade(node),
                                    Some(mv),
                                    &child_board,
                                ))
                            })
                            .collect();
                        node.children.write().extend(children);
                        expansion.chance_weights = Some(weights);
                        expansion.unvisited = Some(Vec::new());
                    }
                    None => expansion.unvisited = Some(moves),
                }
            }

            let chance_idx = expansion
                .chance_weights
                .as_ref()
                .map(|weights| weighted_index(weights, &mut self.rng));
            if let Some(idx) = chance_idx {
                drop(expansion);
                return match idx.and_then(|i| node.children.read().get(i).cloned()) {
                    Some(child) => Step::Descend(child),
                    None => Step::Stay,
                };
            }

            if let Some(unvisited) = expansion.unvisited.as_mut().filter(|u| !u.is_empty()) {
                let idx = self.rng.gen_range(0..unvisited.len());
                let mv = unvisited.remove(idx);
                board.apply(&mv);
                let child = Arc::new(SharedNode::new(Arc::downgrade(node), Some(mv), &*board));
                node.children.write().push(child.clone());
                return Step::Leaf(child);
            }
        }

        let children = node.children();
        let views: Vec<ChildView> = children.iter().map(|c| c.view(node.player)).collect();
        match select_child(node.games(), &views, &self.params) {
            Some(i) => Step::Descend(children[i].clone()),
            None => Step::Stay,
        }
    }
}

/// Seed a proven leaf's bounds and walk them up while they keep changing.
fn propagate_bounds<M: Clone + PartialEq>(leaf: &Arc<SharedNode<M>>, scores: &[f64], prune: bool) {
    *leaf.bounds.lock() = Bounds::exact(scores);

    let mut current = leaf.clone();
    while let Some(parent) = current.parent() {
        let changed = parent.refresh_bounds();
        if prune {
            parent.prune_children();
        }
        if !changed {
            break;
        }
        current = parent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playout::RandomRollout;
    use engine_core::Scores;
    use rand::SeedableRng;
    use std::time::Instant;

    /// Two moves each; after three plies player 0 wins if the sum is odd.
    #[derive(Debug, Clone)]
    struct Parity {
        moves: Vec<u8>,
    }

    impl Board for Parity {
        type Move = u8;

        fn current_player(&self) -> PlayerId {
            self.moves.len() % 2
        }

        fn player_count(&self) -> usize {
            2
        }

        fn legal_moves(&self, _site: CallSite) -> Vec<u8> {
            if self.is_terminal() {
                vec![]
            } else {
                vec![0, 1]
            }
        }

        fn apply(&mut self, mv: &u8) {
            self.moves.push(*mv);
        }

        fn is_terminal(&self) -> bool {
            self.moves.len() >= 3
        }

        fn scores(&self) -> Scores {
            let sum: u8 = self.moves.iter().sum();
            if sum % 2 == 1 {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            }
        }
    }

    #[test]
    fn test_atomic_f64() {
        let value = AtomicF64::new(1.5);
        assert_eq!(value.fetch_add(2.0, Ordering::AcqRel), 1.5);
        assert_eq!(value.load(Ordering::Acquire), 3.5);
    }

    #[test]
    fn test_atomic_f64_concurrent_adds() {
        let value = Arc::new(AtomicF64::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let value = value.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        value.fetch_add(0.5, Ordering::AcqRel);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(value.load(Ordering::Acquire), 2000.0);
    }

    #[test]
    fn test_single_worker() {
        let board = Parity { moves: vec![] };
        let tree = SharedTree::new(&board);
        let config = SearchConfig::for_testing().with_iterations(200);
        let stop = AtomicBool::new(false);
        let budget = Budget::new(&config, Instant::now(), &stop);

        let worker = SharedWorker::new(
            &tree,
            &board,
            &RandomRollout,
            &config,
            ChaCha20Rng::seed_from_u64(1),
        );
        let stats = worker.run(&budget);

        assert_eq!(stats.iterations, 200);
        assert_eq!(tree.root().games(), 200);
        // Player 0 can always force an odd sum with the last move.
        let root_bounds = tree.root().bounds();
        assert_eq!(root_bounds.pessimistic[0], 1.0);
        assert!(root_bounds.is_consistent());
        assert_no_duplicate_children(&tree);
    }

    /// Every node has at most one child per legal move.
    fn assert_no_duplicate_children(tree: &SharedTree<u8>) {
        let mut stack = vec![tree.root().clone()];
        let mut total = 0;
        while let Some(node) = stack.pop() {
            total += 1;
            let children = node.children();
            let mut moves: Vec<u8> = children.iter().filter_map(|c| c.mv().copied()).collect();
            moves.sort();
            moves.dedup();
            assert_eq!(moves.len(), children.len());
            assert!(node.bounds().is_consistent());
            stack.extend(children);
        }
        // 1 + 2 + 4 + 8 nodes in a complete tree of depth 3.
        assert!(total <= 15);
        assert_eq!(tree.stats().total_nodes, total);
    }

    #[test]
    fn test_concurrent_workers_count_every_simulation() {
        let board = Parity { moves: vec![] };
        let tree = SharedTree::new(&board);
        let config = SearchConfig::for_testing().with_iterations(500);
        let stop = AtomicBool::new(false);
        let budget = Budget::new(&config, Instant::now(), &stop);

        let total: u64 = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4u64)
                .map(|i| {
                    let tree = &tree;
                    let board = &board;
                    let config = &config;
                    let budget = &budget;
                    s.spawn(move || {
                        let mut rng = ChaCha20Rng::seed_from_u64(9);
                        rng.set_stream(i);
                        SharedWorker::new(tree, board, &RandomRollout, config, rng)
                            .run(budget)
                            .iterations
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(total, 2000);
        assert_eq!(tree.root().games(), 2000);
        let visits: u64 = tree.root_move_stats().iter().map(|s| s.visits).sum();
        assert_eq!(visits, 2000);
        assert_no_duplicate_children(&tree);
    }

    #[test]
    fn test_stale_child_bounds_do_not_widen_parent() {
        let board = Parity { moves: vec![] };
        let tree = SharedTree::new(&board);
        let config = SearchConfig::for_testing().with_iterations(200);
        let stop = AtomicBool::new(false);
        let budget = Budget::new(&config, Instant::now(), &stop);
        SharedWorker::new(
            &tree,
            &board,
            &RandomRollout,
            &config,
            ChaCha20Rng::seed_from_u64(1),
        )
        .run(&budget);
        let proven = tree.root().bounds();
        assert_eq!(proven.pessimistic[0], 1.0);

        // Children as another thread would have seen them before any proof.
        for child in tree.root().children() {
            *child.bounds.lock() = Bounds::unknown(2);
        }
        assert!(!tree.root().refresh_bounds());
        assert_eq!(tree.root().bounds(), proven);
    }

    #[test]
    fn test_advance_promotes_child() {
        let board = Parity { moves: vec![] };
        let tree = SharedTree::new(&board);
        let config = SearchConfig::for_testing().with_iterations(100);
        let stop = AtomicBool::new(false);
        let budget = Budget::new(&config, Instant::now(), &stop);
        SharedWorker::new(
            &tree,
            &board,
            &RandomRollout,
            &config,
            ChaCha20Rng::seed_from_u64(3),
        )
        .run(&budget);

        let before = tree
            .root_move_stats()
            .into_iter()
            .find(|s| s.mv == 1)
            .unwrap();
        let advanced = tree.advance(&1).unwrap();

        assert!(advanced.root().parent().is_none());
        assert_eq!(advanced.root().games(), before.visits);
        assert_eq!(advanced.root().score(0), before.score);

        let mut moves = advanced.root_moves().unwrap();
        moves.sort();
        assert_eq!(moves, vec![0, 1]);
    }
}
