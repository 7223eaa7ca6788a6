//! Per-player turn state machine: draw decision, lay sequencing one card at
//! a time, joker returns, and the discard that ends the turn.

use crate::{
    all_combos, plan_singles, possible_joker_sets, possible_runs, possible_sets, ranked_unique,
    sum_value, Card, CardCombo, CardId, Event, EventBus, GameConfig, MoveTarget, PlayerId,
    RngState, Run, Set, SetupError, Single, SpotId, SpotKind, Table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayStage {
    Sets,
    Runs,
    Singles,
}

/// Position inside the lay sequence. The in-flight card doubles as the
/// mutual-exclusion guard: no second move is dispatched while it is Some.
#[derive(Debug, Clone, PartialEq)]
pub struct LayProgress {
    pub stage: LayStage,
    pub pack_idx: usize,
    pub card_idx: usize,
    pub spot: Option<SpotId>,
    pub in_flight: Option<Card>,
}

impl LayProgress {
    fn start(stage: LayStage) -> Self {
        Self {
            stage,
            pack_idx: 0,
            card_idx: 0,
            spot: None,
            in_flight: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnState {
    Idle,
    Drawing { serving: bool, card: Card },
    Waiting { ticks: u32 },
    Laying(LayProgress),
    Returning {
        joker: Card,
        spot: SpotId,
        in_flight: bool,
    },
    Discarding { card: Card },
}

#[derive(Debug, Clone)]
pub struct Player {
    pub(crate) id: PlayerId,
    pub(crate) config: GameConfig,
    pub(crate) rng: RngState,
    pub(crate) hand: Vec<Card>,
    pub(crate) state: TurnState,
    pub(crate) has_laid_down: bool,
    pub(crate) round: u32,
    pub(crate) possible_sets: Vec<Set>,
    pub(crate) possible_runs: Vec<Run>,
    pub(crate) laydown: CardCombo,
    pub(crate) singles: Vec<Single>,
}

impl Player {
    pub fn new(id: PlayerId, config: GameConfig, seed: u64) -> Self {
        Self {
            id,
            config,
            rng: RngState::from_seed(seed),
            hand: Vec::new(),
            state: TurnState::Idle,
            has_laid_down: false,
            round: 0,
            possible_sets: Vec::new(),
            possible_runs: Vec::new(),
            laydown: CardCombo::default(),
            singles: Vec::new(),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, TurnState::Idle)
    }

    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    pub fn hand_len(&self) -> usize {
        self.hand.len()
    }

    pub fn hand_value(&self) -> i64 {
        sum_value(&self.hand, &self.config)
    }

    pub fn has_laid_down(&self) -> bool {
        self.has_laid_down
    }

    pub fn planned_laydown(&self) -> &CardCombo {
        &self.laydown
    }

    pub fn planned_singles(&self) -> &[Single] {
        &self.singles
    }

    /// New-round reset: hand, flags, and published lists all go back to
    /// empty. Table spots are reset separately by the orchestrator.
    pub fn reset(&mut self, events: &mut EventBus) {
        self.hand.clear();
        self.state = TurnState::Idle;
        self.has_laid_down = false;
        self.round = 0;
        self.possible_sets.clear();
        self.possible_runs.clear();
        self.laydown = CardCombo::default();
        self.singles.clear();
        events.push(Event::CombosChanged {
            player: self.id,
            combos: Vec::new(),
        });
        events.push(Event::SinglesChanged {
            player: self.id,
            singles: Vec::new(),
        });
    }

    /// Deal one card of the initial hand. The card lands in the hand when
    /// the orchestrator confirms the move.
    pub fn serve(&mut self, table: &mut Table, events: &mut EventBus) -> Result<(), SetupError> {
        let card = table.stock.draw().ok_or(SetupError::StockExhausted)?;
        self.state = TurnState::Drawing {
            serving: true,
            card,
        };
        self.request_move(card, MoveTarget::Hand(self.id), events);
        Ok(())
    }

    /// Start a turn: decide where to draw from, then draw. A player who has
    /// already laid down peeks at the discard pile and takes it when the
    /// top card strictly improves the best achievable combo value.
    pub fn begin_turn(
        &mut self,
        table: &mut Table,
        round: u32,
        events: &mut EventBus,
    ) -> Result<(), SetupError> {
        self.round = round;

        let mut from_discard = false;
        if self.has_laid_down {
            if let Some(&top) = table.discard.peek() {
                let mut hypothetical = self.hand.clone();
                hypothetical.push(top);
                let hypo_value = self
                    .best_of(&possible_sets(&hypothetical), &possible_runs(&hypothetical))
                    .value(&self.config);
                let current_value = self
                    .best_of(&possible_sets(&self.hand), &possible_runs(&self.hand))
                    .value(&self.config);
                from_discard = hypo_value > current_value;
            }
        }

        let card = if from_discard {
            let card = table.discard.draw().ok_or(SetupError::StockExhausted)?;
            events.push(Event::DrewFromDiscard {
                player: self.id,
                card,
            });
            card
        } else {
            table.reshuffle_if_needed(&mut self.rng);
            let card = table.stock.draw().ok_or(SetupError::StockExhausted)?;
            events.push(Event::DrewFromStock { player: self.id });
            card
        };

        self.state = TurnState::Drawing {
            serving: false,
            card,
        };
        self.request_move(card, MoveTarget::Hand(self.id), events);
        Ok(())
    }

    /// Advance the cooperative clock: the Waiting gate counts ticks, and the
    /// lay/return sequencers dispatch their next move when none is in
    /// flight. Never dispatches more than one move per player.
    pub fn tick(&mut self, table: &mut Table, events: &mut EventBus) {
        match self.state.clone() {
            TurnState::Waiting { ticks } => {
                let ticks = ticks + 1;
                if ticks >= self.config.wait_ticks {
                    self.start_playing(table, events);
                } else {
                    self.state = TurnState::Waiting { ticks };
                }
            }
            TurnState::Laying(progress) if progress.in_flight.is_none() => {
                self.dispatch_lay_move(table, events);
            }
            TurnState::Returning {
                joker,
                spot,
                in_flight: false,
            } => {
                self.state = TurnState::Returning {
                    joker,
                    spot,
                    in_flight: true,
                };
                if let Ok(target) = table.spot_mut(spot) {
                    target.remove_card(joker.id);
                }
                self.request_move(joker, MoveTarget::Hand(self.id), events);
            }
            _ => {}
        }
    }

    /// The single confirmation entry point: the orchestrator reports that
    /// the dispatched card finished moving.
    pub fn move_finished(&mut self, card_id: CardId, table: &mut Table, events: &mut EventBus) {
        match self.state.clone() {
            TurnState::Drawing { serving, card } if card.id == card_id => {
                self.draw_finished(serving, card, table, events);
            }
            TurnState::Laying(progress) => {
                if progress.in_flight.map(|card| card.id) == Some(card_id) {
                    self.lay_move_finished(progress, table, events);
                }
            }
            TurnState::Returning {
                joker, in_flight, ..
            } if in_flight && joker.id == card_id => {
                self.return_finished(joker, table, events);
            }
            TurnState::Discarding { card } if card.id == card_id => {
                self.discard_finished(card, table, events);
            }
            _ => {
                log::error!(
                    "player {}: unexpected move confirmation for card {card_id}",
                    self.id
                );
            }
        }
    }

    fn draw_finished(
        &mut self,
        serving: bool,
        card: Card,
        table: &mut Table,
        events: &mut EventBus,
    ) {
        self.hand.push(card);
        if serving {
            self.state = TurnState::Idle;
            return;
        }

        self.recompute_melds();
        self.refresh_laydown(events);
        self.update_singles(table, events);

        if self.config.may_lay_down(self.round) {
            if !self.has_laid_down {
                self.has_laid_down = self.laydown.value(&self.config) >= self.config.min_lay_value;
            }
            // At least one card must remain in the hand after laying down.
            if self.has_laid_down && self.laydown.card_count() == self.hand.len() {
                self.keep_one_card();
            }
        }

        self.state = TurnState::Waiting { ticks: 0 };
    }

    fn start_playing(&mut self, table: &mut Table, events: &mut EventBus) {
        if !self.config.may_lay_down(self.round) || !self.has_laid_down {
            self.start_discard(table, events);
            return;
        }

        let mut progress = LayProgress::start(LayStage::Sets);
        if self.laydown.sets.is_empty() {
            progress.stage = LayStage::Runs;
            if self.laydown.runs.is_empty() {
                self.laying_done(table, events);
                return;
            }
        }
        self.state = TurnState::Laying(progress);
        self.dispatch_lay_move(table, events);
    }

    fn dispatch_lay_move(&mut self, table: &mut Table, events: &mut EventBus) {
        let TurnState::Laying(mut progress) = self.state.clone() else {
            return;
        };

        let (card, spot_id) = match progress.stage {
            LayStage::Singles => {
                let Some(single) = self.singles.get(progress.card_idx) else {
                    log::error!("player {}: single index out of range", self.id);
                    self.start_discard(table, events);
                    return;
                };
                (single.card, single.target)
            }
            stage => {
                let spot_id = match progress.spot {
                    Some(spot) => spot,
                    None => {
                        let Some(spot_id) = table.empty_spot_id(self.id) else {
                            // No free spot for the next pack. Keep the cards
                            // in hand and finish the turn instead.
                            log::warn!("player {}: no empty card spot available", self.id);
                            self.start_discard(table, events);
                            return;
                        };
                        let kind = if stage == LayStage::Runs {
                            SpotKind::Run
                        } else {
                            SpotKind::Set
                        };
                        if let Ok(spot) = table.spot_mut(spot_id) {
                            spot.kind = Some(kind);
                        }
                        progress.spot = Some(spot_id);
                        spot_id
                    }
                };
                let card = match stage {
                    LayStage::Sets => self
                        .laydown
                        .sets
                        .get(progress.pack_idx)
                        .and_then(|set| set.cards.get(progress.card_idx))
                        .copied(),
                    _ => self
                        .laydown
                        .runs
                        .get(progress.pack_idx)
                        .and_then(|run| run.cards.get(progress.card_idx))
                        .copied(),
                };
                let Some(card) = card else {
                    log::error!("player {}: lay index out of range", self.id);
                    self.start_discard(table, events);
                    return;
                };
                (card, spot_id)
            }
        };

        self.hand.retain(|held| held.id != card.id);
        progress.in_flight = Some(card);
        self.state = TurnState::Laying(progress);
        self.request_move(card, MoveTarget::Spot(spot_id), events);
    }

    fn lay_move_finished(
        &mut self,
        mut progress: LayProgress,
        table: &mut Table,
        events: &mut EventBus,
    ) {
        let Some(card) = progress.in_flight.take() else {
            return;
        };
        let Some(spot_id) = (match progress.stage {
            LayStage::Singles => self.singles.get(progress.card_idx).map(|s| s.target),
            _ => progress.spot,
        }) else {
            log::error!("player {}: lay confirmation without a target", self.id);
            self.start_discard(table, events);
            return;
        };
        if let Ok(spot) = table.spot_mut(spot_id) {
            spot.add_card(card);
        }
        events.push(Event::LaidDown {
            player: self.id,
            spot: spot_id,
            card,
        });

        let (card_count, pack_count) = match progress.stage {
            LayStage::Sets => (
                self.laydown
                    .sets
                    .get(progress.pack_idx)
                    .map(Set::len)
                    .unwrap_or(0),
                self.laydown.sets.len(),
            ),
            LayStage::Runs => (
                self.laydown
                    .runs
                    .get(progress.pack_idx)
                    .map(Run::len)
                    .unwrap_or(0),
                self.laydown.runs.len(),
            ),
            LayStage::Singles => (self.singles.len(), 1),
        };

        // A non-joker single landing on a set pack may free the joker it
        // replaces; the joker travels back before anything else happens.
        if progress.stage == LayStage::Singles && !card.is_joker() {
            let is_set_spot = table
                .spot(spot_id)
                .map(|spot| spot.kind == Some(SpotKind::Set))
                .unwrap_or(false);
            if is_set_spot {
                if let Some(joker) = self
                    .singles
                    .get(progress.card_idx)
                    .and_then(|single| single.displaced_joker)
                {
                    self.state = TurnState::Returning {
                        joker,
                        spot: spot_id,
                        in_flight: false,
                    };
                    return;
                }
            }
        }

        if progress.card_idx + 1 < card_count {
            progress.card_idx += 1;
            self.state = TurnState::Laying(progress);
            return;
        }

        // Current pack fully laid; move on to the next one.
        progress.card_idx = 0;
        progress.pack_idx += 1;
        progress.spot = None;

        if progress.pack_idx < pack_count {
            self.state = TurnState::Laying(progress);
            return;
        }

        match progress.stage {
            LayStage::Sets if !self.laydown.runs.is_empty() => {
                progress.pack_idx = 0;
                progress.stage = LayStage::Runs;
                self.state = TurnState::Laying(progress);
            }
            _ => self.laying_done(table, events),
        }
    }

    fn return_finished(&mut self, joker: Card, table: &mut Table, events: &mut EventBus) {
        self.hand.push(joker);
        events.push(Event::JokerReturned {
            player: self.id,
            joker,
        });

        // The returned joker changes what is possible; everything is
        // recomputed from scratch.
        self.recompute_melds();
        self.refresh_laydown(events);
        self.update_singles(table, events);
        if self.laydown.card_count() == self.hand.len() {
            self.keep_one_card();
        }
        self.state = TurnState::Waiting { ticks: 0 };
    }

    fn laying_done(&mut self, table: &mut Table, events: &mut EventBus) {
        // A single remaining card ends the round trivially; discard it.
        if self.hand.len() == 1 {
            self.start_discard(table, events);
            return;
        }

        self.update_singles(table, events);
        if self.singles.len() == self.hand.len() {
            self.keep_one_card();
        }

        if self.singles.is_empty() {
            self.start_discard(table, events);
        } else {
            self.state = TurnState::Laying(LayProgress::start(LayStage::Singles));
        }
    }

    fn start_discard(&mut self, table: &mut Table, events: &mut EventBus) {
        let card = self.choose_discard(table, events);
        self.hand.retain(|held| held.id != card.id);
        self.state = TurnState::Discarding { card };
        self.request_move(card, MoveTarget::DiscardPile, events);
    }

    fn discard_finished(&mut self, card: Card, table: &mut Table, events: &mut EventBus) {
        table.discard.add(card);
        events.push(Event::Discarded {
            player: self.id,
            card,
        });

        // Refresh the published combo and single lists for observers.
        self.recompute_melds();
        let combos = all_combos(&self.possible_sets, &self.possible_runs, self.hand.len());
        events.push(Event::CombosChanged {
            player: self.id,
            combos: ranked_unique(&combos, &self.config),
        });
        self.update_singles(table, events);

        if self.hand.is_empty() {
            events.push(Event::HandEmptied { player: self.id });
        }
        events.push(Event::TurnFinished { player: self.id });
        self.state = TurnState::Idle;
    }

    /// Puts one card back from the planned lay-down so the hand keeps at
    /// least one card. Preference: a planned single, then the last card of
    /// an oversized pack, then a whole pack.
    pub(crate) fn keep_one_card(&mut self) {
        if self.singles.pop().is_some() {
            return;
        }

        if let Some(set) = self.laydown.sets.iter_mut().find(|set| set.len() == 4) {
            if let Some(card) = set.remove_last_card() {
                self.possible_sets.retain(|set| !set.contains(card.id));
                return;
            }
        }

        if let Some(run) = self.laydown.runs.iter_mut().find(|run| run.len() > 3) {
            if let Some(card) = run.remove_last_card() {
                self.possible_runs.retain(|run| !run.contains(card.id));
                return;
            }
        }

        log::warn!(
            "player {}: no single card to keep back, keeping a whole pack",
            self.id
        );
        if let Some(set) = self.laydown.remove_last_set() {
            self.possible_sets.retain(|other| !other.intersects(&set));
        } else if let Some(run) = self.laydown.remove_last_run() {
            self.possible_runs.retain(|other| !other.intersects(&run));
        } else {
            log::error!(
                "player {}: keep-one-card had nothing to remove, this should never happen",
                self.id
            );
        }
    }

    pub(crate) fn recompute_melds(&mut self) {
        self.possible_sets = possible_sets(&self.hand);
        self.possible_sets.extend(possible_joker_sets(&self.hand));
        self.possible_runs = possible_runs(&self.hand);
    }

    /// Recompute the chosen lay-down and publish the full ranked combo list.
    /// Publishing never affects which combo is chosen.
    fn refresh_laydown(&mut self, events: &mut EventBus) {
        let combos = all_combos(&self.possible_sets, &self.possible_runs, self.hand.len());
        events.push(Event::CombosChanged {
            player: self.id,
            combos: ranked_unique(&combos, &self.config),
        });
        let config = &self.config;
        let mut ranked = combos;
        ranked.sort_by_key(|combo| (-combo.value(config), combo.pack_count()));
        self.laydown = ranked.into_iter().next().unwrap_or_default();
    }

    pub(crate) fn best_of(&self, sets: &[Set], runs: &[Run]) -> CardCombo {
        crate::best_combo(sets, runs, self.hand.len(), &self.config)
    }

    pub(crate) fn update_singles(&mut self, table: &Table, events: &mut EventBus) {
        let laid_ids = self.laydown.card_ids();
        let leftover: Vec<Card> = self
            .hand
            .iter()
            .copied()
            .filter(|card| !laid_ids.contains(&card.id))
            .collect();
        self.singles = plan_singles(&leftover, self.id, table);
        events.push(Event::SinglesChanged {
            player: self.id,
            singles: self.singles.clone(),
        });
    }

    fn request_move(&self, card: Card, target: MoveTarget, events: &mut EventBus) {
        events.push(Event::CardMoveRequested {
            player: self.id,
            card,
            target,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CardStack, Rank, Suit};

    fn cfg() -> GameConfig {
        GameConfig {
            min_lay_value: 10,
            earliest_lay_round: 1,
            wait_ticks: 1,
            ..GameConfig::default()
        }
    }

    fn card(id: u32, rank: Rank, suit: Suit) -> Card {
        Card::new(id, suit, rank)
    }

    fn table_with_stock(stock: Vec<Card>) -> Table {
        let mut rng = RngState::from_seed(1);
        let mut table = Table::new(2, &cfg(), &mut rng);
        table.stock = CardStack::from_cards(stock);
        table
    }

    fn player_with_hand(hand: Vec<Card>, has_laid_down: bool) -> Player {
        let mut player = Player::new(0, cfg(), 42);
        player.hand = hand;
        player.has_laid_down = has_laid_down;
        player
    }

    /// Confirm every requested move and tick until the player goes idle.
    /// Panics if more than one move is ever in flight at once.
    fn run_turn(player: &mut Player, table: &mut Table, events: &mut EventBus) -> Vec<Event> {
        let mut log = Vec::new();
        for _ in 0..500 {
            let pending: Vec<Event> = events.drain().collect();
            let requests: Vec<(u32, MoveTarget)> = pending
                .iter()
                .filter_map(|event| match event {
                    Event::CardMoveRequested { card, target, .. } => Some((card.id, *target)),
                    _ => None,
                })
                .collect();
            assert!(requests.len() <= 1, "two moves in flight: {pending:?}");
            log.extend(pending);
            if let Some(&(card_id, _)) = requests.first() {
                player.move_finished(card_id, table, events);
                continue;
            }
            if player.is_idle() {
                return log;
            }
            player.tick(table, events);
        }
        panic!("turn did not complete");
    }

    #[test]
    fn serving_lands_in_hand_and_goes_idle() {
        let mut table = table_with_stock(vec![card(1, Rank::Nine, Suit::Clubs)]);
        let mut events = EventBus::default();
        let mut player = Player::new(0, cfg(), 42);
        player.serve(&mut table, &mut events).expect("serve");
        run_turn(&mut player, &mut table, &mut events);
        assert_eq!(player.hand_len(), 1);
        assert!(player.is_idle());
    }

    #[test]
    fn draw_prefers_discard_pile_when_it_improves_the_combo() {
        let mut table = table_with_stock(vec![card(50, Rank::Queen, Suit::Spades)]);
        table.discard.add(card(60, Rank::Seven, Suit::Clubs));
        let mut events = EventBus::default();
        let mut player = player_with_hand(
            vec![
                card(1, Rank::Four, Suit::Clubs),
                card(2, Rank::Five, Suit::Clubs),
                card(3, Rank::Six, Suit::Clubs),
                card(4, Rank::Nine, Suit::Diamonds),
            ],
            true,
        );
        player.begin_turn(&mut table, 3, &mut events).expect("turn");
        let drawn: Vec<Event> = events.drain().collect();
        assert!(drawn.iter().any(|event| matches!(
            event,
            Event::DrewFromDiscard { card, .. } if card.id == 60
        )));
        assert!(table.discard.peek().is_none());
    }

    #[test]
    fn draw_takes_stock_when_discard_top_adds_nothing() {
        let mut table = table_with_stock(vec![card(50, Rank::Queen, Suit::Spades)]);
        table.discard.add(card(60, Rank::Nine, Suit::Spades));
        let mut events = EventBus::default();
        let mut player = player_with_hand(
            vec![
                card(1, Rank::Four, Suit::Clubs),
                card(2, Rank::Five, Suit::Clubs),
                card(3, Rank::Six, Suit::Clubs),
            ],
            true,
        );
        player.begin_turn(&mut table, 3, &mut events).expect("turn");
        let drawn: Vec<Event> = events.drain().collect();
        assert!(drawn
            .iter()
            .any(|event| matches!(event, Event::DrewFromStock { .. })));
        assert_eq!(table.discard.peek().map(|c| c.id), Some(60));
    }

    #[test]
    fn player_who_has_not_laid_down_never_peeks() {
        let mut table = table_with_stock(vec![card(50, Rank::Queen, Suit::Spades)]);
        table.discard.add(card(60, Rank::Seven, Suit::Clubs));
        let mut events = EventBus::default();
        let mut player = player_with_hand(
            vec![
                card(1, Rank::Four, Suit::Clubs),
                card(2, Rank::Five, Suit::Clubs),
                card(3, Rank::Six, Suit::Clubs),
            ],
            false,
        );
        player.begin_turn(&mut table, 3, &mut events).expect("turn");
        let drawn: Vec<Event> = events.drain().collect();
        assert!(drawn
            .iter()
            .any(|event| matches!(event, Event::DrewFromStock { .. })));
    }

    #[test]
    fn full_hand_combo_triggers_keep_one_card_and_lays_the_rest() {
        // Three threes in hand, the fourth on the stock: the best combo
        // would consume the whole hand, so one card must be kept back.
        let mut table = table_with_stock(vec![card(4, Rank::Three, Suit::Spades)]);
        let mut events = EventBus::default();
        let mut player = player_with_hand(
            vec![
                card(1, Rank::Three, Suit::Clubs),
                card(2, Rank::Three, Suit::Diamonds),
                card(3, Rank::Three, Suit::Hearts),
            ],
            false,
        );
        player.begin_turn(&mut table, 1, &mut events).expect("turn");

        // Confirm the draw only, then inspect the waiting state.
        let drawn: Vec<Event> = events.drain().collect();
        let request = drawn.iter().find_map(|event| match event {
            Event::CardMoveRequested { card, .. } => Some(card.id),
            _ => None,
        });
        player.move_finished(request.expect("draw dispatched"), &mut table, &mut events);
        assert!(matches!(player.state(), TurnState::Waiting { .. }));
        assert!(player.has_laid_down());
        assert_eq!(player.planned_laydown().card_count(), 3);
        assert_eq!(player.hand_len(), 4);

        let log = run_turn(&mut player, &mut table, &mut events);
        assert!(log.iter().any(|e| matches!(e, Event::TurnFinished { .. })));
        assert_eq!(player.hand_len(), 0);

        let spot = table.spot(SpotId { player: 0, index: 0 }).expect("spot");
        assert_eq!(spot.kind, Some(SpotKind::Set));
        assert_eq!(spot.cards.len(), 3);
        // The kept fourth three went to the discard pile.
        assert_eq!(table.discard.peek().map(|c| c.rank), Some(Rank::Three));
        assert!(log.iter().any(|e| matches!(e, Event::HandEmptied { .. })));
    }

    #[test]
    fn single_onto_set_displaces_and_returns_the_joker() {
        let mut table = table_with_stock(vec![card(40, Rank::Queen, Suit::Spades)]);
        let joker = card(110, Rank::Joker, Suit::Spades);
        let opp_spot = SpotId { player: 1, index: 0 };
        {
            let spot = table.spot_mut(opp_spot).expect("spot");
            spot.kind = Some(SpotKind::Set);
            for c in [
                card(100, Rank::Seven, Suit::Clubs),
                card(101, Rank::Seven, Suit::Diamonds),
                card(102, Rank::Seven, Suit::Hearts),
                joker,
            ] {
                spot.add_card(c);
            }
        }
        let mut events = EventBus::default();
        let mut player = player_with_hand(
            vec![
                card(1, Rank::Seven, Suit::Spades),
                card(2, Rank::Nine, Suit::Diamonds),
                card(3, Rank::Two, Suit::Clubs),
            ],
            true,
        );
        player.begin_turn(&mut table, 5, &mut events).expect("turn");
        let log = run_turn(&mut player, &mut table, &mut events);

        assert!(log.iter().any(|e| matches!(e, Event::JokerReturned { .. })));
        let spot = table.spot(opp_spot).expect("spot");
        assert_eq!(spot.cards.len(), 4);
        assert!(spot.cards.iter().all(|c| !c.is_joker()));
        assert!(spot.cards.iter().any(|c| c.id == 1));
        // The joker is back in hand; the queen was the discard of choice.
        assert!(player.hand().iter().any(Card::is_joker));
        assert_eq!(table.discard.peek().map(|c| c.id), Some(40));
        assert!(player.is_idle());
    }

    #[test]
    fn before_earliest_round_the_turn_is_draw_and_discard_only() {
        let config = GameConfig {
            earliest_lay_round: 3,
            ..cfg()
        };
        let mut table = table_with_stock(vec![card(9, Rank::Nine, Suit::Diamonds)]);
        let mut events = EventBus::default();
        let mut player = Player::new(0, config, 42);
        player.hand = vec![
            card(1, Rank::Three, Suit::Clubs),
            card(2, Rank::Three, Suit::Diamonds),
            card(3, Rank::Three, Suit::Hearts),
            card(4, Rank::King, Suit::Spades),
        ];
        player.begin_turn(&mut table, 1, &mut events).expect("turn");
        let log = run_turn(&mut player, &mut table, &mut events);

        assert!(!player.has_laid_down());
        assert!(log.iter().all(|e| !matches!(e, Event::LaidDown { .. })));
        // The threes stay in hand; the unusable king goes.
        assert_eq!(table.discard.peek().map(|c| c.id), Some(4));
        assert_eq!(player.hand_len(), 4);
    }

    #[test]
    fn keep_one_card_prefers_singles_then_oversized_packs() {
        let mut player = player_with_hand(Vec::new(), true);
        player.singles = vec![Single {
            card: card(1, Rank::Four, Suit::Clubs),
            target: SpotId { player: 1, index: 0 },
            displaced_joker: None,
        }];
        player.keep_one_card();
        assert!(player.singles.is_empty());

        // No singles left: the quad set loses its last card.
        let quad = Set {
            rank: Rank::Three,
            cards: vec![
                card(1, Rank::Three, Suit::Clubs),
                card(2, Rank::Three, Suit::Diamonds),
                card(3, Rank::Three, Suit::Hearts),
                card(4, Rank::Three, Suit::Spades),
            ],
        };
        player.laydown = CardCombo {
            sets: vec![quad.clone()],
            runs: Vec::new(),
        };
        player.possible_sets = vec![quad];
        player.keep_one_card();
        assert_eq!(player.laydown.sets[0].len(), 3);
        // Possible sets containing the stripped card are purged.
        assert!(player.possible_sets.is_empty());
    }

    #[test]
    fn keep_one_card_drops_a_whole_triple_when_nothing_smaller_works() {
        let mut player = player_with_hand(Vec::new(), true);
        let triple = Set {
            rank: Rank::Three,
            cards: vec![
                card(1, Rank::Three, Suit::Clubs),
                card(2, Rank::Three, Suit::Diamonds),
                card(3, Rank::Three, Suit::Hearts),
            ],
        };
        player.laydown = CardCombo {
            sets: vec![triple.clone()],
            runs: Vec::new(),
        };
        player.possible_sets = vec![triple];
        player.keep_one_card();
        assert!(player.laydown.sets.is_empty());
        assert!(player.possible_sets.is_empty());
    }

    #[test]
    fn reset_clears_state_and_publishes_empty_lists() {
        let mut events = EventBus::default();
        let mut player = player_with_hand(vec![card(1, Rank::Two, Suit::Clubs)], true);
        player.reset(&mut events);
        assert_eq!(player.hand_len(), 0);
        assert!(!player.has_laid_down());
        let published: Vec<Event> = events.drain().collect();
        assert!(published.iter().any(|event| matches!(
            event,
            Event::CombosChanged { combos, .. } if combos.is_empty()
        )));
        assert!(published.iter().any(|event| matches!(
            event,
            Event::SinglesChanged { singles, .. } if singles.is_empty()
        )));
    }

    #[test]
    fn exhausted_stock_reshuffles_the_discard_pile() {
        let mut table = table_with_stock(Vec::new());
        table.discard.add(card(1, Rank::Nine, Suit::Clubs));
        table.discard.add(card(2, Rank::Four, Suit::Hearts));
        let mut events = EventBus::default();
        let mut player = player_with_hand(Vec::new(), false);
        player.begin_turn(&mut table, 1, &mut events).expect("turn");

        // The discard pile became the new stock and the draw went through.
        assert!(table.discard.is_empty());
        assert_eq!(table.stock.len(), 1);
        let drawn: Vec<Event> = events.drain().collect();
        assert!(drawn
            .iter()
            .any(|event| matches!(event, Event::DrewFromStock { .. })));
    }
}
