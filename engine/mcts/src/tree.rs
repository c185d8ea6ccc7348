//! MCTS tree structure with arena allocation.
//!
//! The tree uses arena allocation for efficient node storage and
//! cache-friendly traversal. Nodes are stored in a contiguous Vec
//! and referenced by NodeId indices. Boards are never stored: a node's state
//! is rebuilt by replaying moves from the root board.

use std::collections::VecDeque;

use engine_core::{Board, CallSite};

use crate::aggregate::MoveStats;
use crate::bounds;
use crate::node::{Bounds, MctsNode, NodeId};
use crate::selection::ChildView;

/// MCTS tree with arena-based node storage.
#[derive(Debug, Clone)]
pub struct MctsTree<M> {
    /// Arena storing all nodes
    nodes: Vec<MctsNode<M>>,

    /// Root node index (always 0 after construction or compaction)
    root: NodeId,
}

impl<M: Clone + PartialEq> MctsTree<M> {
    /// Create a new tree whose root is `board`.
    pub fn new<B: Board<Move = M>>(board: &B) -> Self {
        let root = MctsNode::new_root(
            board.current_player(),
            board.player_count(),
            board.is_terminal(),
        );
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Get the root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a reference to a node by ID.
    #[inline]
    pub fn get(&self, id: NodeId) -> &MctsNode<M> {
        &self.nodes[id.0 as usize]
    }

    /// Get a mutable reference to a node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut MctsNode<M> {
        &mut self.nodes[id.0 as usize]
    }

    /// Allocate a new node and return its ID.
    pub fn allocate(&mut self, node: MctsNode<M>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get the total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty (should never be true after construction).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get the arena slice for read access.
    #[inline]
    pub fn arena(&self) -> &[MctsNode<M>] {
        &self.nodes
    }

    /// Every legal move at the root has a child.
    pub fn root_fully_expanded(&self) -> bool {
        self.get(self.root).is_fully_expanded()
    }

    /// Generate the legal moves of `node_id`, whose state is `board`.
    ///
    /// Chance nodes get every child materialized at once together with the
    /// outcome weights; regular nodes queue their moves as unvisited.
    pub fn expand<B: Board<Move = M>>(&mut self, node_id: NodeId, board: &B) {
        let moves = board.legal_moves(CallSite::TreePolicy);
        let weights = board.chance_weights().filter(|w| w.len() == moves.len());

        match weights {
            Some(weights) if !moves.is_empty() => {
                for mv in moves {
                    let mut child_board = board.clone();
                    child_board.apply(&mv);
                    self.add_child(node_id, mv, &child_board);
                }
                let node = self.get_mut(node_id);
                node.chance_weights = Some(weights);
                node.unvisited = Some(Vec::new());
            }
            _ => self.get_mut(node_id).unvisited = Some(moves),
        }
    }

    /// Add a child reached by `mv`; `board` is the state after the move.
    /// Returns the new child's NodeId.
    pub fn add_child<B: Board<Move = M>>(&mut self, parent_id: NodeId, mv: M, board: &B) -> NodeId {
        let child = MctsNode::new_child(
            parent_id,
            Some(mv),
            board.current_player(),
            board.player_count(),
            board.is_terminal(),
        );
        let child_id = self.allocate(child);

        // Add to parent's children
        self.get_mut(parent_id).children.push(child_id);

        child_id
    }

    /// Child of `node_id` reached by `mv`, if materialized.
    pub fn find_child(&self, node_id: NodeId, mv: &M) -> Option<NodeId> {
        self.get(node_id)
            .children
            .iter()
            .copied()
            .find(|&c| self.get(c).mv.as_ref() == Some(mv))
    }

    /// Selection view of `node_id`'s children from its player's perspective.
    pub fn child_views(&self, node_id: NodeId) -> Vec<ChildView> {
        let node = self.get(node_id);
        let player = node.player;
        node.children
            .iter()
            .map(|&c| {
                let child = self.get(c);
                ChildView {
                    games: child.games,
                    score: child.score[player],
                    optimistic: child.bounds.optimistic[player],
                    pessimistic: child.bounds.pessimistic[player],
                    pruned: child.pruned,
                }
            })
            .collect()
    }

    /// Add a simulation result to every node from `leaf_id` to the root.
    pub fn backpropagate(&mut self, leaf_id: NodeId, scores: &[f64]) {
        let mut current_id = leaf_id;

        while current_id.is_some() {
            let node = self.get_mut(current_id);
            node.games += 1;
            for (total, value) in node.score.iter_mut().zip(scores) {
                *total += value;
            }
            current_id = node.parent;
        }
    }

    /// Seed the bounds of a proven terminal leaf and propagate them upward.
    ///
    /// Each ancestor's bounds are recomputed from its children and, when
    /// `prune` is set, its children are re-checked for domination. The walk
    /// stops after the first ancestor whose bounds did not change.
    pub fn propagate_bounds(&mut self, leaf_id: NodeId, scores: &[f64], prune: bool) {
        self.get_mut(leaf_id).bounds = Bounds::exact(scores);

        let mut current_id = leaf_id;
        loop {
            let parent_id = self.get(current_id).parent;
            if parent_id.is_none() {
                break;
            }
            let changed = self.refresh_bounds(parent_id);
            if prune {
                self.prune_children(parent_id);
            }
            if !changed {
                break;
            }
            current_id = parent_id;
        }
    }

    /// Recompute `node_id`'s bounds from its children. Returns whether they
    /// changed.
    fn refresh_bounds(&mut self, node_id: NodeId) -> bool {
        let node = self.get(node_id);
        let combined = bounds::combine(
            node.player,
            node.score.len(),
            node.is_chance(),
            node.has_unvisited(),
            node.children.iter().map(|&c| &self.get(c).bounds),
        );
        match combined {
            Some(bounds) if bounds != node.bounds => {
                self.get_mut(node_id).bounds = bounds;
                true
            }
            _ => false,
        }
    }

    /// Mark children of `node_id` that cannot beat its pessimistic bound.
    fn prune_children(&mut self, node_id: NodeId) {
        let node = self.get(node_id);
        if node.is_chance() {
            return;
        }
        let dominated: Vec<NodeId> = node
            .children
            .iter()
            .copied()
            .filter(|&c| {
                let child = self.get(c);
                !child.pruned && bounds::should_prune(node.player, &node.bounds, &child.bounds)
            })
            .collect();
        for c in dominated {
            self.get_mut(c).pruned = true;
        }
    }

    /// Per-move statistics of the root's children, in discovery order, from
    /// the root player's perspective.
    pub fn root_move_stats(&self) -> Vec<MoveStats<M>> {
        let root = self.get(self.root);
        let player = root.player;
        root.children
            .iter()
            .filter_map(|&c| {
                let child = self.get(c);
                let mv = child.mv.clone()?;
                Some(MoveStats {
                    mv,
                    visits: child.games,
                    score: child.score[player],
                    optimistic: child.bounds.optimistic[player],
                    pessimistic: child.bounds.pessimistic[player],
                })
            })
            .collect()
    }

    /// Moves known at the root: materialized children first, then the
    /// unvisited ones. `None` before the root is expanded.
    pub fn root_moves(&self) -> Option<Vec<M>> {
        let root = self.get(self.root);
        let unvisited = root.unvisited.as_ref()?;
        Some(
            root.children
                .iter()
                .filter_map(|&c| self.get(c).mv.clone())
                .chain(unvisited.iter().cloned())
                .collect(),
        )
    }

    /// Promote the child reached by `mv` to root.
    ///
    /// The child's subtree is copied into a fresh arena with its statistics
    /// intact; siblings and the old root are dropped. Returns `None` when the
    /// move was never materialized.
    pub fn advance(&self, mv: &M) -> Option<Self> {
        let new_root = self.find_child(self.root, mv)?;

        // Breadth-first copy keeps parents ahead of their children.
        let mut order = Vec::new();
        let mut queue = VecDeque::from([new_root]);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            queue.extend(self.get(id).children.iter().copied());
        }

        let mut remap = vec![NodeId::NONE; self.nodes.len()];
        for (new_idx, old) in order.iter().enumerate() {
            remap[old.0 as usize] = NodeId(new_idx as u32);
        }

        let nodes = order
            .iter()
            .map(|&old| {
                let mut node = self.get(old).clone();
                if old == new_root {
                    node.parent = NodeId::NONE;
                    node.mv = None;
                    node.pruned = false;
                } else {
                    node.parent = remap[node.parent.0 as usize];
                }
                for child in &mut node.children {
                    *child = remap[child.0 as usize];
                }
                node
            })
            .collect();

        Some(Self {
            nodes,
            root: NodeId(0),
        })
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        let root = self.get(self.root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_games: root.games,
            max_depth: self.compute_max_depth(),
        }
    }

    fn compute_max_depth(&self) -> u32 {
        let mut max_depth = 0;
        let mut stack = vec![(self.root, 0u32)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            stack.extend(self.get(id).children.iter().map(|&c| (c, depth + 1)));
        }
        max_depth
    }
}

/// Statistics about an MCTS tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_games: u64,
    pub max_depth: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{PlayerId, Scores};

    /// Each player in turn picks a digit; the game ends after `depth` picks.
    /// Player 0 scores the mean of the digits / 2.
    #[derive(Debug, Clone)]
    struct Digits {
        picks: Vec<u8>,
        depth: usize,
        chance: bool,
    }

    impl Digits {
        fn new(depth: usize) -> Self {
            Self {
                picks: Vec::new(),
                depth,
                chance: false,
            }
        }
    }

    impl Board for Digits {
        type Move = u8;

        fn current_player(&self) -> PlayerId {
            self.picks.len() % 2
        }

        fn player_count(&self) -> usize {
            2
        }

        fn legal_moves(&self, _site: CallSite) -> Vec<u8> {
            if self.is_terminal() {
                vec![]
            } else {
                vec![0, 1, 2]
            }
        }

        fn apply(&mut self, mv: &u8) {
            self.picks.push(*mv);
        }

        fn is_terminal(&self) -> bool {
            self.picks.len() >= self.depth
        }

        fn scores(&self) -> Scores {
            let mean = self.picks.iter().map(|&p| f64::from(p)).sum::<f64>()
                / self.picks.len().max(1) as f64;
            vec![mean / 2.0, 1.0 - mean / 2.0]
        }

        fn chance_weights(&self) -> Option<Vec<f64>> {
            self.chance.then(|| vec![1.0, 1.0, 2.0])
        }
    }

    fn board_after(moves: &[u8], depth: usize) -> Digits {
        let mut board = Digits::new(depth);
        for mv in moves {
            board.apply(mv);
        }
        board
    }

    #[test]
    fn test_new_tree() {
        let tree = MctsTree::new(&Digits::new(2));

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), NodeId(0));

        let root = tree.get(tree.root());
        assert!(root.parent.is_none());
        assert!(!root.terminal);
        assert!(!root.is_expanded());
        assert!(!tree.root_fully_expanded());
    }

    #[test]
    fn test_expand_queues_moves() {
        let mut tree = MctsTree::new(&Digits::new(2));
        tree.expand(tree.root(), &Digits::new(2));

        let root = tree.get(tree.root());
        assert_eq!(root.unvisited, Some(vec![0, 1, 2]));
        assert!(root.children.is_empty());
        assert_eq!(tree.root_moves(), Some(vec![0, 1, 2]));
    }

    #[test]
    fn test_expand_chance_node_materializes_all() {
        let mut board = Digits::new(2);
        board.chance = true;
        let mut tree = MctsTree::new(&board);
        tree.expand(tree.root(), &board);

        let root = tree.get(tree.root());
        assert_eq!(root.children.len(), 3);
        assert!(root.is_fully_expanded());
        assert_eq!(root.chance_weights, Some(vec![1.0, 1.0, 2.0]));
    }

    #[test]
    fn test_add_child() {
        let mut tree = MctsTree::new(&Digits::new(2));
        let child_id = tree.add_child(tree.root(), 1, &board_after(&[1], 2));

        assert_eq!(tree.len(), 2);
        assert_eq!(child_id, NodeId(1));

        let child = tree.get(child_id);
        assert_eq!(child.parent, tree.root());
        assert_eq!(child.mv, Some(1));
        assert_eq!(child.player, 1);
        assert_eq!(tree.find_child(tree.root(), &1), Some(child_id));
        assert_eq!(tree.find_child(tree.root(), &2), None);
    }

    #[test]
    fn test_backpropagate() {
        let mut tree = MctsTree::new(&Digits::new(3));

        // Create a chain: root -> child -> grandchild
        let child_id = tree.add_child(tree.root(), 0, &board_after(&[0], 3));
        let grandchild_id = tree.add_child(child_id, 1, &board_after(&[0, 1], 3));

        tree.backpropagate(grandchild_id, &[0.75, 0.25]);
        tree.backpropagate(child_id, &[0.25, 0.75]);

        assert_eq!(tree.get(grandchild_id).games, 1);
        assert_eq!(tree.get(child_id).games, 2);
        assert_eq!(tree.get(tree.root()).games, 2);
        assert_eq!(tree.get(tree.root()).score, vec![1.0, 1.0]);
        assert_eq!(tree.get(grandchild_id).score, vec![0.75, 0.25]);
    }

    #[test]
    fn test_bounds_stay_open_while_moves_unvisited() {
        let mut tree = MctsTree::new(&Digits::new(1));
        let root_board = Digits::new(1);
        tree.expand(tree.root(), &root_board);
        tree.get_mut(tree.root()).unvisited = Some(vec![1, 2]);
        let leaf = tree.add_child(tree.root(), 0, &board_after(&[0], 1));

        tree.propagate_bounds(leaf, &[0.0, 1.0], true);

        let root = tree.get(tree.root());
        assert_eq!(root.bounds.optimistic[0], 1.0);
        assert_eq!(root.bounds.pessimistic[1], 0.0);
        assert!(root.bounds.is_consistent());
        // A proven loss cannot beat the minimum the mover already has.
        assert!(tree.get(leaf).pruned);
    }

    #[test]
    fn test_proven_root_prunes_worse_children() {
        let root_board = Digits::new(1);
        let mut tree = MctsTree::new(&root_board);
        tree.expand(tree.root(), &root_board);
        tree.get_mut(tree.root()).unvisited = Some(Vec::new());

        let ids: Vec<NodeId> = [0u8, 1, 2]
            .iter()
            .map(|&mv| tree.add_child(tree.root(), mv, &board_after(&[mv], 1)))
            .collect();
        for &id in &ids {
            let scores = board_after(&[tree.get(id).mv.unwrap()], 1).scores();
            tree.propagate_bounds(id, &scores, true);
        }

        let root = tree.get(tree.root());
        assert_eq!(root.bounds, Bounds::exact(&[1.0, 0.0]));
        assert!(tree.get(ids[0]).pruned);
        assert!(tree.get(ids[1]).pruned);
        // The best move is pruned as well (its optimistic bound equals what
        // the root already guarantees); selection falls back to it.
        assert!(tree.get(ids[2]).pruned);
    }

    #[test]
    fn test_no_pruning_when_disabled() {
        let root_board = Digits::new(1);
        let mut tree = MctsTree::new(&root_board);
        tree.expand(tree.root(), &root_board);
        tree.get_mut(tree.root()).unvisited = Some(Vec::new());
        let leaf = tree.add_child(tree.root(), 0, &board_after(&[0], 1));

        tree.propagate_bounds(leaf, &[0.0, 1.0], false);
        assert!(!tree.get(leaf).pruned);
        assert_eq!(tree.get(tree.root()).bounds, Bounds::exact(&[0.0, 1.0]));
    }

    #[test]
    fn test_advance_preserves_subtree() {
        let mut tree = MctsTree::new(&Digits::new(3));
        let a = tree.add_child(tree.root(), 0, &board_after(&[0], 3));
        let b = tree.add_child(tree.root(), 1, &board_after(&[1], 3));
        let a1 = tree.add_child(a, 2, &board_after(&[0, 2], 3));
        tree.backpropagate(a1, &[0.5, 0.5]);
        tree.backpropagate(a, &[0.0, 1.0]);
        tree.backpropagate(b, &[1.0, 0.0]);

        let advanced = tree.advance(&0).unwrap();
        assert_eq!(advanced.len(), 2);

        let root = advanced.get(advanced.root());
        assert!(root.parent.is_none());
        assert!(root.mv.is_none());
        assert_eq!(root.games, 2);
        assert_eq!(root.score, vec![0.5, 1.5]);

        let child = advanced.get(root.children[0]);
        assert_eq!(child.parent, advanced.root());
        assert_eq!(child.mv, Some(2));
        assert_eq!(child.games, 1);

        assert!(tree.advance(&2).is_none());
    }

    #[test]
    fn test_root_move_stats() {
        let mut tree = MctsTree::new(&Digits::new(1));
        let a = tree.add_child(tree.root(), 2, &board_after(&[2], 1));
        let b = tree.add_child(tree.root(), 0, &board_after(&[0], 1));
        tree.backpropagate(a, &[1.0, 0.0]);
        tree.backpropagate(a, &[1.0, 0.0]);
        tree.backpropagate(b, &[0.0, 1.0]);

        let stats = tree.root_move_stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].mv, 2);
        assert_eq!(stats[0].visits, 2);
        assert_eq!(stats[0].score, 2.0);
        assert_eq!(stats[1].mv, 0);
        assert_eq!(stats[1].score, 0.0);
    }

    #[test]
    fn test_tree_stats() {
        let mut tree = MctsTree::new(&Digits::new(3));
        let a = tree.add_child(tree.root(), 0, &board_after(&[0], 3));
        tree.add_child(a, 0, &board_after(&[0, 0], 3));

        let stats = tree.stats();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.root_games, 0);
    }
}
