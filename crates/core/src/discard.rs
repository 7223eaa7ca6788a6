//! Discard selection: give up the least useful card while preserving the
//! best achievable future combo.

use crate::{possible_runs, possible_sets, Card, EventBus, Player, Table};

impl Player {
    /// Pick the card to discard. Falls back step by step; a card is always
    /// found, and a joker is never chosen while a real card is available.
    pub(crate) fn choose_discard(&mut self, table: &Table, events: &mut EventBus) -> Card {
        let mut candidates: Vec<Card> = self.hand.clone();

        // Before the first lay-down, hold on to everything that could still
        // become part of a meld or a single attachment.
        if !self.has_laid_down {
            candidates = self.keep_usable_cards(candidates, table, events);
        }

        if candidates.is_empty() {
            log::warn!(
                "player {}: no discard candidate found, choosing at random",
                self.id
            );
            let idx = self.rng.pick_index(self.hand.len());
            if let Some(&card) = self.hand.get(idx) {
                candidates.push(card);
            }
        }

        let Some(&highest) = candidates
            .iter()
            .max_by_key(|card| card.value(&self.config))
        else {
            // Hand empty at discard time would be a sequencing defect.
            log::error!("player {}: discarding from an empty hand", self.id);
            return Card::new(0, crate::Suit::Clubs, crate::Rank::Ace);
        };

        if highest.is_joker() {
            let real: Vec<Card> = candidates
                .iter()
                .copied()
                .filter(|card| !card.is_joker())
                .collect();
            if !real.is_empty() {
                let idx = self.rng.pick_index(real.len());
                return real[idx];
            }
        }
        highest
    }

    /// Strip every card that belongs to a possible meld or planned single
    /// from the candidate list, with the documented fallbacks when that
    /// leaves nothing to discard.
    fn keep_usable_cards(
        &mut self,
        mut candidates: Vec<Card>,
        table: &Table,
        events: &mut EventBus,
    ) -> Vec<Card> {
        for run in &self.possible_runs {
            candidates.retain(|card| !run.contains(card.id));
        }
        for set in &self.possible_sets {
            candidates.retain(|card| !set.contains(card.id));
        }

        // The whole hand is tied up in potential melds. Look for a card
        // whose removal leaves the achievable value untouched.
        if candidates.is_empty() {
            let max_value = self
                .best_of(&self.possible_sets, &self.possible_runs)
                .value(&self.config);
            let mut safe: Vec<Card> = Vec::new();
            for &card in &self.hand {
                let mut hypothetical = self.hand.clone();
                hypothetical.retain(|held| held.id != card.id);
                let hypo_value = self
                    .best_of(&possible_sets(&hypothetical), &possible_runs(&hypothetical))
                    .value(&self.config);
                if hypo_value == max_value {
                    safe.push(card);
                }
            }

            if let Some(&best) = safe.iter().max_by_key(|card| card.value(&self.config)) {
                candidates.push(best);
            } else {
                // Every card matters; sacrifice the cheapest whole pack.
                let min_run = self
                    .possible_runs
                    .iter()
                    .min_by_key(|run| run.value(&self.config));
                let min_set = self
                    .possible_sets
                    .iter()
                    .min_by_key(|set| set.value(&self.config));
                match (min_run, min_set) {
                    (Some(run), Some(set)) => {
                        if run.value(&self.config) < set.value(&self.config) {
                            candidates.extend(run.cards.iter().copied());
                        } else {
                            candidates.extend(set.cards.iter().copied());
                        }
                    }
                    (Some(run), None) => candidates.extend(run.cards.iter().copied()),
                    (None, Some(set)) => candidates.extend(set.cards.iter().copied()),
                    (None, None) => {
                        log::warn!(
                            "player {}: no pack available to sacrifice for a discard",
                            self.id
                        );
                    }
                }
            }
        }

        // Cards already planned as single attachments stay in hand; they
        // will join a pack on a later turn.
        if candidates.len() > 1 {
            self.update_singles(table, events);
            let single_cards: Vec<Card> = self.singles.iter().map(|single| single.card).collect();
            candidates.retain(|card| !single_cards.iter().any(|single| single.id == card.id));
            if candidates.is_empty() {
                if let Some(&best) = single_cards
                    .iter()
                    .max_by_key(|card| card.value(&self.config))
                {
                    candidates.push(best);
                }
            }
        }

        if candidates.len() > 1 {
            // Duo (near-meld) exclusion would go here; intentionally left
            // out, matching observed behavior.
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use crate::{Card, EventBus, GameConfig, Player, Rank, RngState, SpotKind, Suit, Table};

    fn card(id: u32, rank: Rank, suit: Suit) -> Card {
        Card::new(id, suit, rank)
    }

    fn fixture(hand: Vec<Card>, has_laid_down: bool, config: GameConfig) -> (Player, Table) {
        let mut rng = RngState::from_seed(7);
        let table = Table::new(2, &config, &mut rng);
        let mut player = Player::new(0, config, 42);
        player.hand = hand;
        player.has_laid_down = has_laid_down;
        player.recompute_melds();
        (player, table)
    }

    #[test]
    fn never_discards_a_joker_while_a_real_card_remains() {
        let config = GameConfig {
            joker_value: 20,
            ..GameConfig::default()
        };
        let (mut player, table) = fixture(
            vec![
                card(1, Rank::Joker, Suit::Clubs),
                card(2, Rank::Five, Suit::Clubs),
            ],
            true,
            config,
        );
        let mut events = EventBus::default();
        let choice = player.choose_discard(&table, &mut events);
        assert_eq!(choice.id, 2);
    }

    #[test]
    fn meld_cards_stay_in_hand_before_the_first_lay_down() {
        let (mut player, table) = fixture(
            vec![
                card(1, Rank::Seven, Suit::Clubs),
                card(2, Rank::Seven, Suit::Diamonds),
                card(3, Rank::Seven, Suit::Hearts),
                card(4, Rank::King, Suit::Spades),
            ],
            false,
            GameConfig::default(),
        );
        let mut events = EventBus::default();
        let choice = player.choose_discard(&table, &mut events);
        assert_eq!(choice.id, 4);
    }

    #[test]
    fn fully_melded_hand_gives_up_a_card_that_costs_nothing() {
        // Two copies of the five: either one completes the run, so one of
        // them can go without lowering the achievable value.
        let (mut player, table) = fixture(
            vec![
                card(1, Rank::Four, Suit::Clubs),
                card(2, Rank::Five, Suit::Clubs),
                card(3, Rank::Five, Suit::Clubs),
                card(4, Rank::Six, Suit::Clubs),
            ],
            false,
            GameConfig::default(),
        );
        let mut events = EventBus::default();
        let choice = player.choose_discard(&table, &mut events);
        assert_eq!(choice.rank, Rank::Five);
    }

    #[test]
    fn when_every_card_matters_the_cheapest_pack_is_sacrificed() {
        let (mut player, table) = fixture(
            vec![
                card(1, Rank::Seven, Suit::Clubs),
                card(2, Rank::Seven, Suit::Diamonds),
                card(3, Rank::Seven, Suit::Hearts),
            ],
            false,
            GameConfig::default(),
        );
        let mut events = EventBus::default();
        let choice = player.choose_discard(&table, &mut events);
        assert_eq!(choice.rank, Rank::Seven);
    }

    #[test]
    fn planned_single_attachments_are_not_discarded() {
        let (mut player, mut table) = fixture(
            vec![
                card(1, Rank::Seven, Suit::Spades),
                card(2, Rank::King, Suit::Diamonds),
                card(3, Rank::Two, Suit::Clubs),
            ],
            false,
            GameConfig::default(),
        );
        let spot_id = crate::SpotId { player: 1, index: 0 };
        let spot = table.spot_mut(spot_id).expect("spot");
        spot.kind = Some(SpotKind::Set);
        for c in [
            card(10, Rank::Seven, Suit::Clubs),
            card(11, Rank::Seven, Suit::Diamonds),
            card(12, Rank::Seven, Suit::Hearts),
        ] {
            spot.add_card(c);
        }
        let mut events = EventBus::default();
        let choice = player.choose_discard(&table, &mut events);
        assert_eq!(choice.id, 2);
        assert!(player
            .planned_singles()
            .iter()
            .any(|single| single.card.id == 1));
    }
}
