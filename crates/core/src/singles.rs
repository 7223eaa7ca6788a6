//! Fixpoint search for leftover cards that can join packs already on the
//! table, own or opponents'.

use crate::{Card, PlayerId, SpotId, Table};
use serde::{Deserialize, Serialize};

/// A leftover card planned onto an existing pack, together with the joker it
/// would free from that pack, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Single {
    pub card: Card,
    pub target: SpotId,
    pub displaced_joker: Option<Card>,
}

/// Plan every leftover card that fits some laid pack. Repeated passes over
/// (spot x remaining card) until a pass accepts nothing new. Jokers join the
/// candidate pool only once, and only when exactly one non-joker card would
/// otherwise remain unplanned (a last-resort attempt to go out).
pub fn plan_singles(leftover: &[Card], player: PlayerId, table: &Table) -> Vec<Single> {
    let mut planned: Vec<Single> = Vec::new();
    let jokers: Vec<Card> = leftover.iter().copied().filter(Card::is_joker).collect();
    let mut available: Vec<Card> = leftover
        .iter()
        .copied()
        .filter(|card| !card.is_joker())
        .collect();
    let mut allowed_jokers = false;

    let spot_ids = table.spot_ids_from(player);
    loop {
        let mut fit_any = false;
        for &spot_id in &spot_ids {
            let Ok(spot) = table.spot(spot_id) else {
                continue;
            };
            for card in &available {
                if planned.iter().any(|entry| entry.card.id == card.id) {
                    continue;
                }
                let Some(fit) = spot.can_fit(card) else {
                    continue;
                };
                // A second card of the same rank and suit cannot join the
                // same pack.
                let duplicate = planned.iter().any(|entry| {
                    entry.target == spot_id
                        && entry.card.suit == card.suit
                        && entry.card.rank == card.rank
                });
                if duplicate {
                    continue;
                }
                planned.push(Single {
                    card: *card,
                    target: spot_id,
                    displaced_joker: fit.displaced_joker,
                });
                fit_any = true;
            }
        }

        if !fit_any && !allowed_jokers && !jokers.is_empty() {
            let unplanned = available
                .iter()
                .filter(|card| !planned.iter().any(|entry| entry.card.id == card.id))
                .count();
            if unplanned == 1 {
                log::warn!("player {player} may win by laying single jokers");
                available.extend(jokers.iter().copied());
                allowed_jokers = true;
                fit_any = true;
            }
        }

        if !fit_any {
            break;
        }
    }

    planned
}
