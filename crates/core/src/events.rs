use crate::{Card, CardCombo, PlayerId, Single, SpotId};
use serde::{Deserialize, Serialize};

/// Where a dispatched card is headed. Opaque to the engine beyond identity;
/// the orchestrator owns positioning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MoveTarget {
    Hand(PlayerId),
    Spot(SpotId),
    DiscardPile,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    /// Full ranked list of deduplicated combos, for display only.
    CombosChanged {
        player: PlayerId,
        combos: Vec<CardCombo>,
    },
    /// Current single-attachment plan, for display only.
    SinglesChanged {
        player: PlayerId,
        singles: Vec<Single>,
    },
    /// Exactly one of these is outstanding per player at any time; the
    /// orchestrator answers it with `Player::move_finished`.
    CardMoveRequested {
        player: PlayerId,
        card: Card,
        target: MoveTarget,
    },
    DrewFromStock { player: PlayerId },
    DrewFromDiscard { player: PlayerId, card: Card },
    LaidDown {
        player: PlayerId,
        spot: SpotId,
        card: Card,
    },
    JokerReturned { player: PlayerId, joker: Card },
    Discarded { player: PlayerId, card: Card },
    /// The player's hand is empty; the round is over.
    HandEmptied { player: PlayerId },
    TurnFinished { player: PlayerId },
}

#[derive(Debug, Default)]
pub struct EventBus {
    queue: Vec<Event>,
}

impl EventBus {
    pub fn push(&mut self, event: Event) {
        self.queue.push(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.queue.drain(..)
    }
}
