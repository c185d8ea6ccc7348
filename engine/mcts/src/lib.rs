//! Determinized Monte Carlo Tree Search with score-bounds pruning.
//!
//! This crate searches any game implementing the `engine-core` [`Board`]
//! trait. Games with hidden information are handled by sampling complete
//! boards from what the deciding player knows (a [`Determinize`]
//! implementation) and searching each sample as a perfect-information game.
//!
//! # Overview
//!
//! Each simulation consists of four phases:
//!
//! 1. **Selection**: descend through fully expanded nodes by UCB1, skipping
//!    children whose optimistic bound cannot beat the parent's pessimistic one
//! 2. **Expansion**: materialize one untried move, chosen uniformly at random
//! 3. **Simulation**: score the new board with a [`PlayoutPolicy`] (random
//!    rollout by default, or the board's own evaluator when it has one)
//! 4. **Backpropagation**: add the score vector along the path to the root
//!    and tighten score bounds where a terminal state was reached
//!
//! # Usage
//!
//! ```rust,ignore
//! use engine_core::PerfectInformation;
//! use games_tictactoe::TicTacToe;
//! use mcts::{SearchConfig, SearchOrchestrator};
//!
//! let board = TicTacToe::from_rows(["XX.", "OO.", "..."]).unwrap();
//! let config = SearchConfig::for_testing().with_iterations(1000);
//! let mut orchestrator = SearchOrchestrator::with_random_rollouts(config)?;
//!
//! let decision = orchestrator.decide(&PerfectInformation::new(board))?;
//! println!("Best move: {:?}", decision.mv);
//! println!("Iterations: {}", decision.stats.iterations);
//! ```
//!
//! # Configuration
//!
//! [`SearchConfig`] controls the search:
//!
//! - `exploration`: UCB1 constant (default: √2)
//! - `threads` / `determinizations`: worker threads and sampled boards
//! - `iterations` / `time_budget`: per-tree budget, whichever ends first
//! - `final_selection`: robust, max or bound-secure child
//! - `pruning`: enable score-bounds pruning
//!
//! [`StrengthLevel`] bundles these into named presets.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      SearchOrchestrator                      │
//! │  hidden information             perfect information          │
//! │  ┌─────────────┐ ┌───────────┐  ┌──────────────────────────┐ │
//! │  │Determinizer │→│TreeSearch │  │ SharedTree + SharedWorker│ │
//! │  │ (per task)  │ │ (MctsTree)│  │ (one tree, all threads)  │ │
//! │  └─────────────┘ └─────┬─────┘  └────────────┬─────────────┘ │
//! │                        ▼                     ▼               │
//! │              merge root MoveStats → select_final             │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod aggregate;
pub mod bounds;
pub mod config;
pub mod determinizer;
pub mod node;
pub mod orchestrator;
pub mod playout;
pub mod search;
pub mod selection;
pub mod shared;
pub mod tree;

// Re-export main types
pub use aggregate::{merge, select_final, MoveStats};
pub use config::{ConfigError, FinalSelectionPolicy, Parallelism, SearchConfig, StrengthLevel};
pub use determinizer::{Determinization, Determinizer};
pub use engine_core::{Board, Determinize};
pub use node::{Bounds, MctsNode, NodeId};
pub use orchestrator::{Decision, SearchOrchestrator};
pub use playout::{
    random_rollout, EstimatorPlayout, ExactSolver, HeuristicPlayout, PlayoutPolicy, RandomRollout,
};
pub use search::{Budget, SearchError, SearchStats, TreeSearch};
pub use shared::{SharedNode, SharedTree, SharedWorker};
pub use tree::{MctsTree, TreeStats};
