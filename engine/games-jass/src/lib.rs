//! Jass, a four-player trick-taking card game, for the search engine
//!
//! Four seats in two teams (0 and 2 against 1 and 3) play out nine tricks
//! from a 36-card deck after one seat declares the mode: a trump suit,
//! top-down or bottom-up. Each team scores its share of the 157 points.
//!
//! Besides the [`JassGame`] board this crate supplies what the search needs
//! for the hidden hands: [`JassKnowledge`] deals the unseen cards
//! consistently with one seat's view, and [`JassHeuristic`] gives playouts
//! a better-than-random opponent.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::{Board, CallSite, Determinize};
//! use games_jass::{JassGame, JassKnowledge};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! let game = JassGame::deal(&mut rng, 0);
//! assert_eq!(game.legal_moves(CallSite::TreePolicy).len(), 6);
//!
//! // Seat 1 sees only its own cards; sampling fills in the rest.
//! let knowledge = JassKnowledge::from_game(&game, 1);
//! let sampled = knowledge.sample(&mut rng).unwrap();
//! assert_eq!(sampled.hand(1), game.hand(1));
//! ```

pub mod cards;
pub mod game;
pub mod heuristic;
pub mod knowledge;
pub mod mode;

pub use cards::{parse_cards, Card, CardSet, ParseCardError, Rank, Suit, DECK_SIZE};
pub use game::{GameError, JassGame, JassMove, HAND_SIZE, PLAYERS, TEAM_OF};
pub use heuristic::{best_mode, JassHeuristic};
pub use knowledge::{HandEstimator, JassKnowledge};
pub use mode::{Mode, ParseModeError, LAST_TRICK_BONUS, TOTAL_POINTS};
