//! Card types for a 36-card Swiss deck and a compact card set.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Cards per suit.
pub const RANKS: usize = 9;
/// Cards in the deck.
pub const DECK_SIZE: usize = 36;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    fn index(self) -> usize {
        self as usize
    }

    fn letter(self) -> char {
        match self {
            Suit::Hearts => 'H',
            Suit::Diamonds => 'D',
            Suit::Clubs => 'C',
            Suit::Spades => 'S',
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Rank {
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; RANKS] = [
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    fn letter(self) -> char {
        match self {
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }
}

// Ord on Card is suit then natural rank, for stable sorting only.
// Trick resolution goes through `Mode`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub const fn new(suit: Suit, rank: Rank) -> Self {
        Self { suit, rank }
    }

    /// Position in the deck, 0..36.
    pub fn index(self) -> usize {
        self.suit.index() * RANKS + self.rank as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index >= DECK_SIZE {
            return None;
        }
        Some(Self {
            suit: Suit::ALL[index / RANKS],
            rank: Rank::ALL[index % RANKS],
        })
    }

    /// All 36 cards in deck order.
    pub fn deck() -> impl Iterator<Item = Card> {
        (0..DECK_SIZE).filter_map(Card::from_index)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.letter(), self.suit.letter())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Parse card: {0:?}")]
pub struct ParseCardError(pub String);

/// Parses `"AS"`, `"TH"`, `"6C"`: rank letter then suit letter.
impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCardError(s.to_string());
        let mut chars = s.chars();
        let (Some(rank_ch), Some(suit_ch), None) = (chars.next(), chars.next(), chars.next())
        else {
            return Err(err());
        };
        let rank = Rank::ALL
            .into_iter()
            .find(|r| r.letter() == rank_ch.to_ascii_uppercase())
            .ok_or_else(err)?;
        let suit = Suit::ALL
            .into_iter()
            .find(|s| s.letter() == suit_ch.to_ascii_uppercase())
            .ok_or_else(err)?;
        Ok(Card { suit, rank })
    }
}

/// Parse a whitespace separated list of cards.
pub fn parse_cards(s: &str) -> Result<Vec<Card>, ParseCardError> {
    s.split_whitespace().map(str::parse).collect()
}

/// Set of cards as a bit mask over deck indices.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct CardSet(u64);

impl CardSet {
    pub const EMPTY: CardSet = CardSet(0);

    pub fn full() -> Self {
        CardSet((1u64 << DECK_SIZE) - 1)
    }

    /// The nine cards of `suit`.
    pub fn of_suit(suit: Suit) -> Self {
        CardSet(((1u64 << RANKS) - 1) << (suit.index() * RANKS))
    }

    pub fn contains(self, card: Card) -> bool {
        self.0 & (1 << card.index()) != 0
    }

    pub fn insert(&mut self, card: Card) {
        self.0 |= 1 << card.index();
    }

    pub fn remove(&mut self, card: Card) -> bool {
        let had = self.contains(card);
        self.0 &= !(1 << card.index());
        had
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: CardSet) -> CardSet {
        CardSet(self.0 | other.0)
    }

    pub fn intersection(self, other: CardSet) -> CardSet {
        CardSet(self.0 & other.0)
    }

    pub fn difference(self, other: CardSet) -> CardSet {
        CardSet(self.0 & !other.0)
    }

    pub fn has_suit(self, suit: Suit) -> bool {
        !self.intersection(CardSet::of_suit(suit)).is_empty()
    }

    /// Cards in deck order.
    pub fn iter(self) -> impl Iterator<Item = Card> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let index = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            Card::from_index(index)
        })
    }

    pub fn to_vec(self) -> Vec<Card> {
        self.iter().collect()
    }
}

impl FromIterator<Card> for CardSet {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        let mut set = CardSet::EMPTY;
        for card in iter {
            set.insert(card);
        }
        set
    }
}
