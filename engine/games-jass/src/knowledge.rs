//! What one seat knows about the cards, and dealing consistent hands from it.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use engine_core::{Determinize, DeterminizationError, PlayerId};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;
use tracing::trace;

use crate::cards::{Card, CardSet};
use crate::game::{JassGame, PLAYERS};

/// Learned prior over who holds which card.
pub trait HandEstimator: Send + Sync {
    /// Relative likelihood that `player` holds `card`. Only the ratio between
    /// players matters; non-positive weights are treated as zero.
    fn weight(&self, card: Card, player: PlayerId) -> f64;
}

/// Card knowledge of one seat.
///
/// Holds only what the observer may know: their own hand, the cards out of
/// play, how many cards every other seat still holds and which suits each
/// seat has shown to be void in. Other seats' hands are never retained.
#[derive(Clone)]
pub struct JassKnowledge {
    observer: PlayerId,
    /// Game with only the observer's hand filled in
    public: JassGame,
    own: CardSet,
    /// Cards held by somebody other than the observer
    unknown: CardSet,
    sizes: [usize; PLAYERS],
    estimator: Option<Arc<dyn HandEstimator>>,
}

impl fmt::Debug for JassKnowledge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JassKnowledge")
            .field("observer", &self.observer)
            .field("own", &self.own)
            .field("unknown", &self.unknown.len())
            .field("sizes", &self.sizes)
            .field("estimator", &self.estimator.is_some())
            .finish()
    }
}

impl JassKnowledge {
    /// Knowledge of `observer` in `game`.
    pub fn from_game(game: &JassGame, observer: PlayerId) -> Self {
        let own = game.hand(observer);
        let sizes: [usize; PLAYERS] = std::array::from_fn(|p| game.hand(p).len());
        let unknown = CardSet::full().difference(own).difference(game.played());

        let mut hands = [CardSet::EMPTY; PLAYERS];
        hands[observer] = own;

        Self {
            observer,
            public: game.redeal(hands),
            own,
            unknown,
            sizes,
            estimator: None,
        }
    }

    /// Bias dealing towards `estimator`'s beliefs.
    pub fn with_estimator(mut self, estimator: Arc<dyn HandEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn observer(&self) -> PlayerId {
        self.observer
    }

    /// Seats other than the observer that could hold `card` and still have
    /// room for it.
    fn candidates(&self, card: Card, room: &[usize; PLAYERS]) -> Vec<PlayerId> {
        (0..PLAYERS)
            .filter(|&p| room[p] > 0 && !self.public.impossible(p).contains(card))
            .collect()
    }

    fn pick(&self, card: Card, candidates: &[PlayerId], rng: &mut ChaCha20Rng) -> PlayerId {
        if let Some(estimator) = &self.estimator {
            let weights = candidates
                .iter()
                .map(|&p| estimator.weight(card, p).max(0.0));
            if let Ok(dist) = WeightedIndex::new(weights) {
                return candidates[dist.sample(rng)];
            }
        }
        candidates[rng.gen_range(0..candidates.len())]
    }

    fn room(&self) -> [usize; PLAYERS] {
        let mut room = self.sizes;
        room[self.observer] = 0;
        room
    }

    fn hands(&self) -> [CardSet; PLAYERS] {
        let mut hands = [CardSet::EMPTY; PLAYERS];
        hands[self.observer] = self.own;
        hands
    }
}

/// Seat card `c` on one of its candidate seats, moving already seated cards
/// along an augmenting path when every candidate seat is full.
fn place(
    c: usize,
    candidates: &[Vec<PlayerId>],
    room: &[usize; PLAYERS],
    seats: &mut [Vec<usize>; PLAYERS],
    visited: &mut [bool; PLAYERS],
) -> bool {
    for &seat in &candidates[c] {
        if visited[seat] {
            continue;
        }
        visited[seat] = true;
        if seats[seat].len() < room[seat] {
            seats[seat].push(c);
            return true;
        }
        let held = seats[seat].clone();
        for (slot, &other) in held.iter().enumerate() {
            if place(other, candidates, room, seats, visited) {
                seats[seat][slot] = c;
                return true;
            }
        }
    }
    false
}

impl Determinize for JassKnowledge {
    type Board = JassGame;
    type Hidden = Card;

    fn has_hidden_information(&self) -> bool {
        !self.unknown.is_empty()
    }

    /// Deal the unknown cards most-constrained first: the card with the
    /// fewest seats able to take it is placed next.
    fn sample(&self, rng: &mut ChaCha20Rng) -> Result<JassGame, DeterminizationError> {
        let mut hands = self.hands();
        let mut room = self.room();
        let mut remaining = self.unknown.to_vec();

        while !remaining.is_empty() {
            let Some((idx, candidates)) = remaining
                .iter()
                .enumerate()
                .map(|(i, &card)| (i, self.candidates(card, &room)))
                .min_by_key(|(_, candidates)| candidates.len())
            else {
                break;
            };

            let card = remaining.swap_remove(idx);
            if candidates.is_empty() {
                return Err(DeterminizationError::Infeasible(format!(
                    "no seat can hold {card}"
                )));
            }
            let player = self.pick(card, &candidates, rng);
            trace!(%card, player, "dealt hidden card");
            hands[player].insert(card);
            room[player] -= 1;
        }

        Ok(self.public.redeal(hands))
    }

    /// Deal the unknown cards so that as many as possible land on a seat
    /// that may hold them. Exclusions are broken only for cards that no
    /// complete assignment can place.
    fn sample_relaxed(&self, rng: &mut ChaCha20Rng) -> JassGame {
        let room = self.room();
        let mut cards = self.unknown.to_vec();
        cards.shuffle(rng);

        let candidates: Vec<Vec<PlayerId>> = cards
            .iter()
            .map(|&card| {
                let mut seats = self.candidates(card, &room);
                seats.shuffle(rng);
                seats
            })
            .collect();

        let mut seats: [Vec<usize>; PLAYERS] = std::array::from_fn(|_| Vec::new());
        let mut stranded = Vec::new();
        for c in 0..cards.len() {
            let mut visited = [false; PLAYERS];
            if !place(c, &candidates, &room, &mut seats, &mut visited) {
                stranded.push(c);
            }
        }

        let mut hands = self.hands();
        for (player, held) in seats.iter().enumerate() {
            for &c in held {
                hands[player].insert(cards[c]);
            }
        }
        if !stranded.is_empty() {
            trace!(stranded = stranded.len(), "dealing cards against exclusions");
        }
        let mut stranded = stranded.into_iter();
        for player in 0..PLAYERS {
            let free = room[player] - seats[player].len();
            for c in stranded.by_ref().take(free) {
                hands[player].insert(cards[c]);
            }
        }
        self.public.redeal(hands)
    }

    fn impossible_for(&self, player: PlayerId) -> HashSet<Card> {
        let excluded = if player == self.observer {
            CardSet::full().difference(self.own)
        } else {
            self.public
                .impossible(player)
                .union(self.own)
                .union(self.public.played())
        };
        excluded.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::parse_cards;
    use crate::game::JassMove;
    use crate::cards::Suit;
    use crate::mode::Mode;
    use engine_core::Board;

    fn set(s: &str) -> CardSet {
        parse_cards(s).unwrap().into_iter().collect()
    }

    /// Clubs led; seat 1 shows a spade and is known to hold no clubs.
    fn game_with_void() -> JassGame {
        let hands = [
            set("AC 6H 7H"),
            set("6S KH 8D"),
            set("KC QC 9D"),
            set("JC AS TS"),
        ];
        let mut game = JassGame::from_hands(hands, Some(Mode::TopDown), 0).unwrap();
        game.apply(&JassMove::Play("AC".parse().unwrap()));
        game.apply(&JassMove::Play("6S".parse().unwrap()));
        game
    }

    #[test]
    fn test_knowledge_hides_other_hands() {
        let game = game_with_void();
        let knowledge = JassKnowledge::from_game(&game, 2);
        assert_eq!(knowledge.public.hand(2), game.hand(2));
        assert!(knowledge.public.hand(0).is_empty());
        assert!(knowledge.public.hand(1).is_empty());
        assert_eq!(knowledge.unknown.len(), 2 + 2 + 3);
    }

    #[test]
    fn test_sample_respects_voids() {
        let game = game_with_void();
        let knowledge = JassKnowledge::from_game(&game, 2);
        let mut rng = ChaCha20Rng::seed_from_u64(7);

        for _ in 0..200 {
            let board = knowledge.sample(&mut rng).unwrap();
            assert_eq!(board.hand(2), game.hand(2));
            assert!(!board.hand(1).has_suit(Suit::Clubs));
            for p in 0..PLAYERS {
                assert_eq!(board.hand(p).len(), game.hand(p).len());
            }
            assert_eq!(board.trick(), game.trick());
            assert_eq!(board.current_player(), 2);
        }
    }

    #[test]
    fn test_contradictory_voids_are_infeasible() {
        let game = game_with_void();
        let mut knowledge = JassKnowledge::from_game(&game, 2);
        for p in [0, 1, 3] {
            knowledge
                .public
                .mark_impossible(p, CardSet::of_suit(Suit::Spades));
        }

        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert!(matches!(
            knowledge.sample(&mut rng),
            Err(DeterminizationError::Infeasible(_))
        ));

        let relaxed = knowledge.sample_relaxed(&mut rng);
        assert_eq!(relaxed.hand(2), game.hand(2));
        for p in 0..PLAYERS {
            assert_eq!(relaxed.hand(p).len(), game.hand(p).len());
        }
    }

    #[test]
    fn test_relaxed_sample_keeps_voids_when_possible() {
        let game = game_with_void();
        let knowledge = JassKnowledge::from_game(&game, 2);
        let mut rng = ChaCha20Rng::seed_from_u64(11);

        for _ in 0..500 {
            let board = knowledge.sample_relaxed(&mut rng);
            assert_eq!(board.hand(2), game.hand(2));
            assert!(!board.hand(1).has_suit(Suit::Clubs), "{:?}", board.hand(1));
            for p in 0..PLAYERS {
                assert_eq!(board.hand(p).len(), game.hand(p).len());
            }
        }
    }

    #[test]
    fn test_relaxed_sample_needs_reassignment() {
        // Seat 1 may only hold spades and seat 3 may hold anything, so a
        // greedy fill that gives seat 3 the spades first strands them.
        let game = game_with_void();
        let mut knowledge = JassKnowledge::from_game(&game, 2);
        for suit in [Suit::Clubs, Suit::Hearts, Suit::Diamonds] {
            knowledge.public.mark_impossible(1, CardSet::of_suit(suit));
        }
        knowledge
            .public
            .mark_impossible(0, CardSet::of_suit(Suit::Spades));
        let unknown_spades = knowledge.unknown.intersection(CardSet::of_suit(Suit::Spades));
        assert_eq!(unknown_spades.len(), knowledge.sizes[1]);

        let mut rng = ChaCha20Rng::seed_from_u64(5);
        for _ in 0..200 {
            let board = knowledge.sample_relaxed(&mut rng);
            assert_eq!(board.hand(1), unknown_spades);
            assert!(!board.hand(0).has_suit(Suit::Spades));
        }
    }

    #[test]
    fn test_estimator_bias() {
        struct SpadesWithSeatThree;
        impl HandEstimator for SpadesWithSeatThree {
            fn weight(&self, card: Card, player: PlayerId) -> f64 {
                match (card.suit, player) {
                    (Suit::Spades, 3) => 1.0,
                    (Suit::Spades, _) => 0.0,
                    _ => 1.0,
                }
            }
        }

        let game = game_with_void();
        let knowledge =
            JassKnowledge::from_game(&game, 2).with_estimator(Arc::new(SpadesWithSeatThree));
        let spades = set("AS TS");
        let mut rng = ChaCha20Rng::seed_from_u64(3);

        let hits = (0..200)
            .filter(|_| {
                let board = knowledge.sample(&mut rng).unwrap();
                board.hand(3).intersection(spades) == spades
            })
            .count();
        // Unbiased dealing puts both spades with seat 3 about one time in seven.
        assert!(hits > 120, "hits = {hits}");
    }

    #[test]
    fn test_impossible_for() {
        let game = game_with_void();
        let knowledge = JassKnowledge::from_game(&game, 2);

        let seat1 = knowledge.impossible_for(1);
        for card in CardSet::of_suit(Suit::Clubs).iter() {
            assert!(seat1.contains(&card));
        }
        assert!(seat1.contains(&"9D".parse().unwrap()));
        assert!(!seat1.contains(&"KH".parse().unwrap()));

        let own = knowledge.impossible_for(2);
        assert_eq!(own.len(), 36 - 3);
    }

    #[test]
    fn test_no_hidden_information_when_all_known() {
        let hands = [set("AC"), set("6S"), set("KC"), set("JC")];
        let game = JassGame::from_hands(hands, Some(Mode::TopDown), 0).unwrap();
        let mut done = game.clone();
        for mv in ["AC", "6S", "KC"] {
            done.apply(&JassMove::Play(mv.parse().unwrap()));
        }
        let knowledge = JassKnowledge::from_game(&done, 3);
        assert!(!knowledge.has_hidden_information());
    }
}
