//! Game modes: trump suit, top-down and bottom-up.
//!
//! A mode decides which cards may be played, who wins a trick and how many
//! points each card is worth. Every mode distributes 152 card points plus
//! the last-trick bonus.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::cards::{Card, CardSet, Rank, Suit};

/// Points for winning the last trick.
pub const LAST_TRICK_BONUS: u32 = 5;
/// Card points plus the last-trick bonus.
pub const TOTAL_POINTS: u32 = 157;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Mode {
    Trump(Suit),
    /// No trump, aces high
    TopDown,
    /// No trump, sixes high
    BottomUp,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Trump(Suit::Hearts),
        Mode::Trump(Suit::Diamonds),
        Mode::Trump(Suit::Clubs),
        Mode::Trump(Suit::Spades),
        Mode::TopDown,
        Mode::BottomUp,
    ];

    pub fn trump(self) -> Option<Suit> {
        match self {
            Mode::Trump(suit) => Some(suit),
            _ => None,
        }
    }

    pub fn is_trump(self, card: Card) -> bool {
        self.trump() == Some(card.suit)
    }

    /// Points `card` is worth in a won trick.
    pub fn points(self, card: Card) -> u32 {
        use Rank::*;
        match self {
            Mode::Trump(trump) if card.suit == trump => match card.rank {
                Jack => 20,
                Nine => 14,
                Ace => 11,
                Ten => 10,
                King => 4,
                Queen => 3,
                Six | Seven | Eight => 0,
            },
            Mode::Trump(_) => match card.rank {
                Ace => 11,
                Ten => 10,
                King => 4,
                Queen => 3,
                Jack => 2,
                Six | Seven | Eight | Nine => 0,
            },
            Mode::TopDown => match card.rank {
                Ace => 11,
                Ten => 10,
                Eight => 8,
                King => 4,
                Queen => 3,
                Jack => 2,
                Six | Seven | Nine => 0,
            },
            Mode::BottomUp => match card.rank {
                Six => 11,
                Ten => 10,
                Eight => 8,
                King => 4,
                Queen => 3,
                Jack => 2,
                Seven | Nine | Ace => 0,
            },
        }
    }

    /// Strength of `card` within its own suit; higher wins.
    fn strength(self, card: Card) -> u8 {
        let natural = card.rank as u8;
        match self {
            Mode::Trump(trump) if card.suit == trump => match card.rank {
                Rank::Jack => 20,
                Rank::Nine => 19,
                _ => natural,
            },
            Mode::BottomUp => 8 - natural,
            _ => natural,
        }
    }

    /// Whether `challenger` takes the trick from the current `best` card.
    pub fn beats(self, challenger: Card, best: Card) -> bool {
        if challenger.suit == best.suit {
            return self.strength(challenger) > self.strength(best);
        }
        self.is_trump(challenger)
    }

    /// Index into `trick` of the winning card. `trick[0]` led.
    pub fn trick_winner(self, trick: &[Card]) -> usize {
        let mut best = 0;
        for (i, &card) in trick.iter().enumerate().skip(1) {
            if self.beats(card, trick[best]) {
                best = i;
            }
        }
        best
    }

    /// Cards of `hand` that may be played onto `trick`.
    ///
    /// Suit must be followed when possible. In a trump mode a trump may be
    /// played at any time, but not below a trump already in the trick
    /// unless the hand holds nothing else. The jack of trumps never has to
    /// follow a trump lead.
    pub fn legal_cards(self, hand: CardSet, trick: &[Card]) -> CardSet {
        let Some(&lead) = trick.first() else {
            return hand;
        };
        let led = lead.suit;

        let Some(trump) = self.trump() else {
            let follow = hand.intersection(CardSet::of_suit(led));
            return if follow.is_empty() { hand } else { follow };
        };

        let trumps = hand.intersection(CardSet::of_suit(trump));
        if trumps == hand {
            return hand;
        }

        let mut legal = CardSet::EMPTY;
        for card in hand.iter() {
            let allowed = if card.suit == trump && led != trump {
                // No undertrumping.
                trick
                    .iter()
                    .filter(|c| c.suit == trump)
                    .all(|&c| self.beats(card, c))
            } else if led == trump && trumps == CardSet::from_iter([Card::new(trump, Rank::Jack)]) {
                true
            } else {
                !hand.has_suit(led) || card.suit == led
            };
            if allowed {
                legal.insert(card);
            }
        }

        legal
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Trump(suit) => write!(f, "trump-{}", format!("{suit:?}").to_lowercase()),
            Mode::TopDown => f.write_str("top-down"),
            Mode::BottomUp => f.write_str("bottom-up"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown mode: {0:?}")]
pub struct ParseModeError(pub String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();
        Mode::ALL
            .into_iter()
            .find(|m| m.to_string().replace('-', "") == normalized)
            .ok_or_else(|| ParseModeError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::parse_cards;

    fn set(s: &str) -> CardSet {
        parse_cards(s).unwrap().into_iter().collect()
    }

    fn cards(s: &str) -> Vec<Card> {
        parse_cards(s).unwrap()
    }

    #[test]
    fn test_every_mode_totals_157() {
        for mode in Mode::ALL {
            let points: u32 = Card::deck().map(|c| mode.points(c)).sum();
            assert_eq!(points + LAST_TRICK_BONUS, TOTAL_POINTS, "{mode}");
        }
    }

    #[test]
    fn test_trump_order() {
        let mode = Mode::Trump(Suit::Hearts);
        let order = cards("JH 9H AH KH QH TH 8H 7H 6H");
        for pair in order.windows(2) {
            assert!(mode.beats(pair[0], pair[1]), "{} > {}", pair[0], pair[1]);
            assert!(!mode.beats(pair[1], pair[0]));
        }
        // Any trump beats any plain card; an off-suit plain card never wins.
        assert!(mode.beats(cards("6H")[0], cards("AS")[0]));
        assert!(!mode.beats(cards("AC")[0], cards("6S")[0]));
    }

    #[test]
    fn test_trick_winner() {
        let trick = cards("TS AS 6H KS");
        assert_eq!(Mode::Trump(Suit::Hearts).trick_winner(&trick), 2);
        assert_eq!(Mode::TopDown.trick_winner(&trick), 1);
        assert_eq!(Mode::BottomUp.trick_winner(&trick), 0);
        assert_eq!(Mode::Trump(Suit::Clubs).trick_winner(&trick), 1);
    }

    #[test]
    fn test_must_follow_suit() {
        let hand = set("AS 6S KH 7C");
        let legal = Mode::TopDown.legal_cards(hand, &cards("9S"));
        assert_eq!(legal, set("AS 6S"));

        let void = Mode::TopDown.legal_cards(hand, &cards("9D"));
        assert_eq!(void, hand);

        assert_eq!(Mode::BottomUp.legal_cards(hand, &[]), hand);
    }

    #[test]
    fn test_trump_may_always_be_played() {
        let mode = Mode::Trump(Suit::Hearts);
        let hand = set("AS 6S KH 7C");
        assert_eq!(mode.legal_cards(hand, &cards("9S")), set("AS 6S KH"));
    }

    #[test]
    fn test_no_undertrumping() {
        let mode = Mode::Trump(Suit::Hearts);
        let hand = set("7H JH 8C");
        // Spades led, someone trumped with the ace; 7H would undertrump.
        let legal = mode.legal_cards(hand, &cards("9S AH"));
        assert_eq!(legal, set("JH 8C"));
    }

    #[test]
    fn test_only_trumps_may_undertrump() {
        let mode = Mode::Trump(Suit::Hearts);
        let hand = set("7H 8H");
        assert_eq!(mode.legal_cards(hand, &cards("9S AH")), hand);
    }

    #[test]
    fn test_jack_of_trumps_need_not_follow() {
        let mode = Mode::Trump(Suit::Hearts);
        let hand = set("JH 7C AS");
        assert_eq!(mode.legal_cards(hand, &cards("9H")), hand);

        let hand = set("JH 6H 7C");
        assert_eq!(mode.legal_cards(hand, &cards("9H")), set("JH 6H"));
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("top-down".parse::<Mode>(), Ok(Mode::TopDown));
        assert_eq!("BottomUp".parse::<Mode>(), Ok(Mode::BottomUp));
        assert_eq!("trump_spades".parse::<Mode>(), Ok(Mode::Trump(Suit::Spades)));
        assert!("spades".parse::<Mode>().is_err());
    }
}
