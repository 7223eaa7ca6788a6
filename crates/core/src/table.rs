//! Shared table state: stock and discard piles plus the per-player card
//! spots holding laid-down packs. Exactly one player mutates this at a time;
//! the orchestrator guarantees turn-sequential access.

use crate::{sum_value, Card, CardId, GameConfig, Rank, RngState, SetupError, Suit};
use serde::{Deserialize, Serialize};

pub type PlayerId = usize;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SpotId {
    pub player: PlayerId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SpotKind {
    Set,
    Run,
}

/// Result of a successful fit probe. A displaced joker is one the incoming
/// card would free from the pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fit {
    pub displaced_joker: Option<Card>,
}

/// A face-up pile. The top of the pile is the end of the vector.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CardStack {
    cards: Vec<Card>,
}

impl CardStack {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A pile with a known order; the last card is the top.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// The full Rummy stock: two 52-card decks plus four jokers, shuffled.
    pub fn rummy_stock(rng: &mut RngState) -> Self {
        let mut cards = Vec::with_capacity(108);
        let mut next_id: CardId = 1;
        for _ in 0..2 {
            for suit in Suit::ALL {
                for rank in Rank::RUN_ORDER {
                    cards.push(Card::new(next_id, suit, rank));
                    next_id += 1;
                }
            }
        }
        for suit in Suit::ALL {
            cards.push(Card::new(next_id, suit, Rank::Joker));
            next_id += 1;
        }
        rng.shuffle(&mut cards);
        Self { cards }
    }

    pub fn peek(&self) -> Option<&Card> {
        self.cards.last()
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn add(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// A table position holding one laid-down pack. Typed as set or run once the
/// first pack lands on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSpot {
    pub id: SpotId,
    pub kind: Option<SpotKind>,
    pub cards: Vec<Card>,
}

impl CardSpot {
    pub fn new(id: SpotId) -> Self {
        Self {
            id,
            kind: None,
            cards: Vec::new(),
        }
    }

    pub fn has_cards(&self) -> bool {
        !self.cards.is_empty()
    }

    pub fn value(&self, config: &GameConfig) -> i64 {
        sum_value(&self.cards, config)
    }

    pub fn reset(&mut self) {
        self.kind = None;
        self.cards.clear();
    }

    /// Lowest represented run rank index. Jokers may pad either end, so the
    /// base comes from the first real member.
    fn run_low(&self) -> Option<usize> {
        for (pos, card) in self.cards.iter().enumerate() {
            if !card.is_joker() {
                return card.rank.run_index().map(|idx| idx.saturating_sub(pos));
            }
        }
        None
    }

    fn set_rank(&self) -> Option<Rank> {
        self.cards.iter().find(|card| !card.is_joker()).map(|card| card.rank)
    }

    /// Whether `card` can legally join this pack, and which joker it would
    /// free if so. Empty or untyped spots accept nothing here; they are
    /// filled by the lay sequencer, not by single attachments.
    pub fn can_fit(&self, card: &Card) -> Option<Fit> {
        if !self.has_cards() {
            return None;
        }
        match self.kind? {
            SpotKind::Set => self.can_fit_set(card),
            SpotKind::Run => self.can_fit_run(card),
        }
    }

    fn can_fit_set(&self, card: &Card) -> Option<Fit> {
        if card.is_joker() {
            if self.cards.len() < 4 {
                return Some(Fit {
                    displaced_joker: None,
                });
            }
            return None;
        }
        if self.set_rank()? != card.rank {
            return None;
        }
        let suit_taken = self
            .cards
            .iter()
            .any(|member| !member.is_joker() && member.suit == card.suit);
        if suit_taken {
            return None;
        }
        if self.cards.len() < 4 {
            return Some(Fit {
                displaced_joker: None,
            });
        }
        let joker = self.cards.iter().find(|member| member.is_joker())?;
        Some(Fit {
            displaced_joker: Some(*joker),
        })
    }

    fn can_fit_run(&self, card: &Card) -> Option<Fit> {
        let low = self.run_low()?;
        let high = low + self.cards.len() - 1;
        if card.is_joker() {
            if low > 0 || high + 1 < Rank::RUN_ORDER.len() {
                return Some(Fit {
                    displaced_joker: None,
                });
            }
            return None;
        }
        let run_suit = self
            .cards
            .iter()
            .find(|member| !member.is_joker())
            .map(|member| member.suit)?;
        if card.suit != run_suit {
            return None;
        }
        let idx = card.rank.run_index()?;
        if idx + 1 == low || idx == high + 1 {
            return Some(Fit {
                displaced_joker: None,
            });
        }
        if idx >= low && idx <= high {
            let member = self.cards[idx - low];
            if member.is_joker() {
                return Some(Fit {
                    displaced_joker: Some(member),
                });
            }
        }
        None
    }

    /// Insert a card, keeping runs ordered by represented rank. A card that
    /// replaces a joker lands next to it; the joker leaves in a separate
    /// remove step.
    pub fn add_card(&mut self, card: Card) {
        let insert_at = match (self.kind, self.run_low()) {
            (Some(SpotKind::Run), Some(low)) => {
                let high = low + self.cards.len() - 1;
                if card.is_joker() {
                    if high + 1 < Rank::RUN_ORDER.len() {
                        self.cards.len()
                    } else {
                        0
                    }
                } else {
                    match card.rank.run_index() {
                        Some(idx) if idx + 1 == low => 0,
                        Some(idx) if idx > low && idx <= high => idx - low,
                        _ => self.cards.len(),
                    }
                }
            }
            _ => self.cards.len(),
        };
        self.cards.insert(insert_at, card);
    }

    pub fn remove_card(&mut self, id: CardId) -> Option<Card> {
        let pos = self.cards.iter().position(|card| card.id == id)?;
        Some(self.cards.remove(pos))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub stock: CardStack,
    pub discard: CardStack,
    spots: Vec<Vec<CardSpot>>,
}

impl Table {
    pub fn new(players: usize, config: &GameConfig, rng: &mut RngState) -> Self {
        let spots = (0..players)
            .map(|player| {
                (0..config.spots_per_player)
                    .map(|index| CardSpot::new(SpotId { player, index }))
                    .collect()
            })
            .collect();
        Self {
            stock: CardStack::rummy_stock(rng),
            discard: CardStack::empty(),
            spots,
        }
    }

    pub fn player_count(&self) -> usize {
        self.spots.len()
    }

    pub fn spot(&self, id: SpotId) -> Result<&CardSpot, SetupError> {
        self.spots
            .get(id.player)
            .and_then(|spots| spots.get(id.index))
            .ok_or(SetupError::UnknownSpot(id))
    }

    pub fn spot_mut(&mut self, id: SpotId) -> Result<&mut CardSpot, SetupError> {
        self.spots
            .get_mut(id.player)
            .and_then(|spots| spots.get_mut(id.index))
            .ok_or(SetupError::UnknownSpot(id))
    }

    pub fn player_spots(&self, player: PlayerId) -> Result<&[CardSpot], SetupError> {
        self.spots
            .get(player)
            .map(Vec::as_slice)
            .ok_or(SetupError::UnknownPlayer(player))
    }

    pub fn empty_spot_id(&self, player: PlayerId) -> Option<SpotId> {
        self.spots
            .get(player)?
            .iter()
            .find(|spot| !spot.has_cards())
            .map(|spot| spot.id)
    }

    /// Every spot id, the given player's spots first, then the opponents'.
    pub fn spot_ids_from(&self, player: PlayerId) -> Vec<SpotId> {
        let mut ids = Vec::new();
        if let Some(own) = self.spots.get(player) {
            ids.extend(own.iter().map(|spot| spot.id));
        }
        for (other, spots) in self.spots.iter().enumerate() {
            if other != player {
                ids.extend(spots.iter().map(|spot| spot.id));
            }
        }
        ids
    }

    /// Total value a player has laid down.
    pub fn laid_value(&self, player: PlayerId, config: &GameConfig) -> i64 {
        self.spots
            .get(player)
            .map(|spots| spots.iter().map(|spot| spot.value(config)).sum())
            .unwrap_or(0)
    }

    /// Turn the discard pile back into stock when the stock runs dry.
    pub fn reshuffle_if_needed(&mut self, rng: &mut RngState) {
        if !self.stock.is_empty() || self.discard.is_empty() {
            return;
        }
        let mut cards = std::mem::take(&mut self.discard.cards);
        rng.shuffle(&mut cards);
        self.stock.cards = cards;
    }

    pub fn reset_spots(&mut self) {
        for spots in &mut self.spots {
            for spot in spots {
                spot.reset();
            }
        }
    }
}
