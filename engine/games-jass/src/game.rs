//! The four-player trick-taking board.

use std::fmt;

use engine_core::game_utils::{draw, team_scores};
use engine_core::{Board, CallSite, PlayerId, Scores};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::cards::{Card, CardSet, Rank, Suit};
use crate::mode::{Mode, LAST_TRICK_BONUS};

pub const PLAYERS: usize = 4;
pub const HAND_SIZE: usize = 9;

/// Team of each seat; partners sit opposite each other.
pub const TEAM_OF: [usize; PLAYERS] = [0, 1, 0, 1];

// Filler for unused trick slots; never read past `trick_len`.
const NO_CARD: Card = Card::new(Suit::Hearts, Rank::Six);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum JassMove {
    /// Choose the mode for this hand
    Declare(Mode),
    Play(Card),
}

impl fmt::Display for JassMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JassMove::Declare(mode) => write!(f, "declare {mode}"),
            JassMove::Play(card) => write!(f, "play {card}"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Card {0} is dealt to more than one player")]
    DuplicateCard(Card),

    #[error("Hands hold {0:?} cards, expected equal sizes")]
    UnevenHands([usize; PLAYERS]),

    #[error("Seat {0} does not exist")]
    NoSuchSeat(PlayerId),

    #[error("{mv} is not legal for seat {player}")]
    IllegalMove { player: PlayerId, mv: JassMove },
}

/// Complete state of one hand of the game.
///
/// The first board of a hand asks the declarer to choose a mode; the
/// declarer then leads the first trick. Scores are each team's share of the
/// points made in the hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JassGame {
    hands: [CardSet; PLAYERS],
    mode: Option<Mode>,
    trick: [Card; PLAYERS],
    trick_len: usize,
    leader: PlayerId,
    to_move: PlayerId,
    points: [u32; 2],
    played: CardSet,
    /// Cards each seat has shown it cannot hold, from failing to follow suit
    impossible: [CardSet; PLAYERS],
}

impl JassGame {
    /// Shuffle and deal nine cards to each seat, `declarer` to choose.
    pub fn deal<R: Rng + ?Sized>(rng: &mut R, declarer: PlayerId) -> Self {
        let mut deck: Vec<Card> = Card::deck().collect();
        deck.shuffle(rng);

        let mut hands = [CardSet::EMPTY; PLAYERS];
        for (i, card) in deck.into_iter().enumerate() {
            hands[i / HAND_SIZE].insert(card);
        }
        Self::with_hands_unchecked(hands, None, declarer % PLAYERS)
    }

    /// Start from explicit hands, before any card of the current trick is
    /// played. With `mode` unset the `leader` declares first.
    pub fn from_hands(
        hands: [CardSet; PLAYERS],
        mode: Option<Mode>,
        leader: PlayerId,
    ) -> Result<Self, GameError> {
        if leader >= PLAYERS {
            return Err(GameError::NoSuchSeat(leader));
        }

        let mut seen = CardSet::EMPTY;
        for hand in &hands {
            if let Some(card) = seen.intersection(*hand).iter().next() {
                return Err(GameError::DuplicateCard(card));
            }
            seen = seen.union(*hand);
        }

        let sizes = hands.map(CardSet::len);
        if sizes.iter().any(|&n| n != sizes[0]) {
            return Err(GameError::UnevenHands(sizes));
        }

        let mut game = Self::with_hands_unchecked(hands, mode, leader);
        // Cards nobody holds are out of the hand already.
        game.played = CardSet::full().difference(seen);
        Ok(game)
    }

    fn with_hands_unchecked(
        hands: [CardSet; PLAYERS],
        mode: Option<Mode>,
        leader: PlayerId,
    ) -> Self {
        Self {
            hands,
            mode,
            trick: [NO_CARD; PLAYERS],
            trick_len: 0,
            leader,
            to_move: leader,
            points: [0, 0],
            played: CardSet::EMPTY,
            impossible: [CardSet::EMPTY; PLAYERS],
        }
    }

    /// Same public state with different hands.
    pub(crate) fn redeal(&self, hands: [CardSet; PLAYERS]) -> Self {
        Self {
            hands,
            ..self.clone()
        }
    }

    pub fn hand(&self, player: PlayerId) -> CardSet {
        self.hands[player]
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// Cards of the trick in progress, lead first.
    pub fn trick(&self) -> &[Card] {
        &self.trick[..self.trick_len]
    }

    pub fn leader(&self) -> PlayerId {
        self.leader
    }

    /// Points made so far by each team.
    pub fn points(&self) -> [u32; 2] {
        self.points
    }

    /// Cards no longer in any hand, including the current trick.
    pub fn played(&self) -> CardSet {
        self.played
    }

    /// Cards `player` has shown it cannot hold.
    pub fn impossible(&self, player: PlayerId) -> CardSet {
        self.impossible[player]
    }

    /// Tricks still to be completed, counting the one in progress.
    pub fn tricks_left(&self) -> usize {
        self.hands.iter().map(|h| h.len()).max().unwrap_or(0)
    }

    /// Seat currently winning the trick in progress.
    pub fn trick_winner(&self) -> Option<PlayerId> {
        let mode = self.mode?;
        if self.trick_len == 0 {
            return None;
        }
        Some((self.leader + mode.trick_winner(self.trick())) % PLAYERS)
    }

    /// Apply a move after checking it is legal.
    pub fn play(&mut self, mv: JassMove) -> Result<(), GameError> {
        if !self.legal_moves(CallSite::TreePolicy).contains(&mv) {
            return Err(GameError::IllegalMove {
                player: self.to_move,
                mv,
            });
        }
        self.apply(&mv);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn mark_impossible(&mut self, player: PlayerId, cards: CardSet) {
        self.impossible[player] = self.impossible[player].union(cards);
    }

    /// Record what a card played off-suit reveals about the player's hand.
    fn infer_voids(&mut self, player: PlayerId, card: Card, mode: Mode) {
        let Some(&lead) = self.trick().first() else {
            return;
        };
        let led = lead.suit;
        if card.suit == led {
            return;
        }

        let revealed = match mode.trump() {
            // Trumping in is always allowed, so it shows nothing.
            Some(trump) if card.suit == trump => return,
            // Only the jack of trumps may stay behind.
            Some(trump) if led == trump => {
                let mut trumps = CardSet::of_suit(trump);
                trumps.remove(Card::new(trump, Rank::Jack));
                trumps
            }
            _ => CardSet::of_suit(led),
        };
        self.impossible[player] = self.impossible[player].union(revealed);
    }

    fn finish_trick(&mut self, mode: Mode) {
        let winner = (self.leader + mode.trick_winner(self.trick())) % PLAYERS;
        let mut points: u32 = self.trick().iter().map(|&c| mode.points(c)).sum();
        if self.hands.iter().all(|h| h.is_empty()) {
            points += LAST_TRICK_BONUS;
        }
        self.points[TEAM_OF[winner]] += points;
        self.trick_len = 0;
        self.leader = winner;
        self.to_move = winner;
    }
}

impl Board for JassGame {
    type Move = JassMove;

    fn current_player(&self) -> PlayerId {
        self.to_move
    }

    fn player_count(&self) -> usize {
        PLAYERS
    }

    fn legal_moves(&self, _site: CallSite) -> Vec<JassMove> {
        if self.is_terminal() {
            return Vec::new();
        }
        match self.mode {
            None => Mode::ALL.into_iter().map(JassMove::Declare).collect(),
            Some(mode) => mode
                .legal_cards(self.hands[self.to_move], self.trick())
                .iter()
                .map(JassMove::Play)
                .collect(),
        }
    }

    fn apply(&mut self, mv: &JassMove) {
        debug_assert_eq!(
            matches!(mv, JassMove::Declare(_)),
            self.mode.is_none(),
            "{mv} is out of phase"
        );
        match (*mv, self.mode) {
            (JassMove::Declare(mode), None) => self.mode = Some(mode),
            (JassMove::Play(card), Some(mode)) => {
                let player = self.to_move;
                debug_assert!(
                    self.hands[player].contains(card),
                    "seat {player} does not hold {card}"
                );
                if !self.hands[player].remove(card) {
                    return;
                }
                self.infer_voids(player, card, mode);
                self.played.insert(card);
                self.trick[self.trick_len] = card;
                self.trick_len += 1;

                if self.trick_len == PLAYERS {
                    self.finish_trick(mode);
                } else {
                    self.to_move = (player + 1) % PLAYERS;
                }
            }
            _ => {}
        }
    }

    fn is_terminal(&self) -> bool {
        self.trick_len == 0 && self.hands.iter().all(|h| h.is_empty())
    }

    /// Each team's share of the points made in this hand. A hand that
    /// started part-way through is scored over the points still in play.
    fn scores(&self) -> Scores {
        let total = self.points[0] + self.points[1];
        if total == 0 {
            return draw(PLAYERS);
        }
        let team_points = self.points.map(f64::from);
        team_scores(&team_points, &TEAM_OF, f64::from(total))
    }
}
