//! Rule-of-thumb move choice for playouts.

use engine_core::{Board, MoveHeuristic};

use crate::cards::{Card, CardSet, Rank};
use crate::game::{JassGame, JassMove, PLAYERS};
use crate::mode::Mode;

/// Plays like a cautious club player.
///
/// Declares the mode its hand is strongest in. Leads a card nobody can beat
/// when it has one, takes tricks with the cheapest winning card, gives
/// points to a partner who is already winning and otherwise sheds its least
/// valuable card.
#[derive(Debug, Clone, Copy, Default)]
pub struct JassHeuristic;

impl JassHeuristic {
    pub fn new() -> Self {
        Self
    }
}

impl MoveHeuristic<JassGame> for JassHeuristic {
    fn choose(&self, board: &JassGame, moves: &[JassMove]) -> Option<JassMove> {
        let hand = board.hand(board.current_player());
        let Some(mode) = board.mode() else {
            return Some(JassMove::Declare(best_mode(hand)));
        };

        let cards: Vec<Card> = moves
            .iter()
            .filter_map(|mv| match mv {
                JassMove::Play(card) => Some(*card),
                JassMove::Declare(_) => None,
            })
            .collect();
        if cards.is_empty() {
            return None;
        }

        let card = if board.trick().is_empty() {
            lead(board, mode, hand, &cards)
        } else {
            follow(board, mode, &cards)
        };
        Some(JassMove::Play(card))
    }
}

/// Mode with the highest hand strength; the first one wins ties.
pub fn best_mode(hand: CardSet) -> Mode {
    let mut best = Mode::ALL[0];
    let mut best_strength = 0;
    for mode in Mode::ALL {
        let strength = hand_strength(hand, mode);
        if strength > best_strength {
            best = mode;
            best_strength = strength;
        }
    }
    best
}

fn hand_strength(hand: CardSet, mode: Mode) -> u32 {
    hand.iter()
        .map(|card| match mode {
            Mode::Trump(trump) if card.suit == trump => match card.rank {
                Rank::Jack => 5,
                Rank::Nine => 4,
                Rank::Ace => 3,
                _ => 1,
            },
            Mode::Trump(_) | Mode::TopDown => match card.rank {
                Rank::Ace => 3,
                Rank::King => 1,
                _ => 0,
            },
            Mode::BottomUp => match card.rank {
                Rank::Six => 3,
                Rank::Seven => 1,
                _ => 0,
            },
        })
        .sum()
}

/// No card still out can beat `card` within its suit.
fn is_master(card: Card, mode: Mode, known: CardSet) -> bool {
    CardSet::of_suit(card.suit)
        .iter()
        .filter(|&other| mode.beats(other, card))
        .all(|other| known.contains(other))
}

fn cheapest(mode: Mode, cards: &[Card]) -> Card {
    *cards
        .iter()
        .min_by_key(|&&c| (mode.points(c), mode.is_trump(c)))
        .unwrap_or(&cards[0])
}

fn lead(board: &JassGame, mode: Mode, hand: CardSet, cards: &[Card]) -> Card {
    let known = hand.union(board.played());
    let trump = mode.trump();
    let masters = cards
        .iter()
        .filter(|&&c| is_master(c, mode, known))
        .copied();
    // Prefer cashing plain masters over drawing trumps.
    let mut best: Option<Card> = None;
    for card in masters {
        match best {
            None => best = Some(card),
            Some(b) if Some(b.suit) == trump && Some(card.suit) != trump => best = Some(card),
            _ => {}
        }
    }
    best.unwrap_or_else(|| cheapest(mode, cards))
}

fn follow(board: &JassGame, mode: Mode, cards: &[Card]) -> Card {
    let me = board.current_player();
    let trick = board.trick();
    let best = trick[mode.trick_winner(trick)];

    if board.trick_winner() == Some((me + 2) % PLAYERS) {
        // Partner has it: add points, but keep trumps.
        let plain: Vec<Card> = cards.iter().copied().filter(|&c| !mode.is_trump(c)).collect();
        let pool = if plain.is_empty() { cards } else { &plain };
        return *pool
            .iter()
            .max_by_key(|&&c| mode.points(c))
            .unwrap_or(&cards[0]);
    }

    let winners: Vec<Card> = cards.iter().copied().filter(|&c| mode.beats(c, best)).collect();
    if winners.is_empty() {
        cheapest(mode, cards)
    } else {
        cheapest(mode, &winners)
    }
}
