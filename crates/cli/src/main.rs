//! Terminal driver: plays a full two-player game, acting as the
//! orchestrator the engine expects. Card moves are confirmed instantly;
//! there is no animation layer here.

use romme_core::{Event, EventBus, GameConfig, Player, PlayerId, SetupError, Table};

#[derive(Debug, Clone, Copy)]
struct CliOptions {
    seed: u64,
    max_rounds: u32,
    json: bool,
}

fn parse_cli_options(args: &[String]) -> CliOptions {
    let mut options = CliOptions {
        seed: 20480,
        max_rounds: 200,
        json: false,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => options.json = true,
            "--seed" => {
                if let Some(value) = iter.next().and_then(|raw| raw.parse().ok()) {
                    options.seed = value;
                }
            }
            "--rounds" => {
                if let Some(value) = iter.next().and_then(|raw| raw.parse().ok()) {
                    options.max_rounds = value;
                }
            }
            "--help" | "-h" => {
                println!("usage: romme-cli [--seed N] [--rounds N] [--json]");
                std::process::exit(0);
            }
            other => {
                if let Ok(value) = other.parse() {
                    options.seed = value;
                }
            }
        }
    }
    options
}

struct Game {
    config: GameConfig,
    table: Table,
    players: Vec<Player>,
    events: EventBus,
    json: bool,
    round: u32,
    winner: Option<PlayerId>,
}

impl Game {
    fn new(options: CliOptions) -> Self {
        let config = GameConfig::default();
        let mut rng = romme_core::RngState::from_seed(options.seed);
        let table = Table::new(2, &config, &mut rng);
        let players = (0..2)
            .map(|id| Player::new(id, config.clone(), options.seed.wrapping_add(id as u64 + 1)))
            .collect();
        Self {
            config,
            table,
            players,
            events: EventBus::default(),
            json: options.json,
            round: 0,
            winner: None,
        }
    }

    fn serve_hands(&mut self) -> Result<(), SetupError> {
        for _ in 0..self.config.serve_count {
            for idx in 0..self.players.len() {
                self.players[idx].serve(&mut self.table, &mut self.events)?;
                self.pump(idx);
            }
        }
        Ok(())
    }

    /// Drain events, confirming every requested move immediately, until the
    /// player settles. Returns true while the game should continue.
    fn pump(&mut self, idx: usize) -> bool {
        let mut steps = 0u32;
        loop {
            let pending: Vec<Event> = self.events.drain().collect();
            let mut confirmed = false;
            for event in pending {
                self.report(&event);
                match event {
                    Event::CardMoveRequested { player, card, .. } => {
                        self.players[player].move_finished(
                            card.id,
                            &mut self.table,
                            &mut self.events,
                        );
                        confirmed = true;
                    }
                    Event::HandEmptied { player } => {
                        self.winner = Some(player);
                    }
                    Event::TurnFinished { .. } => return self.winner.is_none(),
                    _ => {}
                }
            }
            if confirmed {
                continue;
            }
            if self.players[idx].is_idle() {
                return self.winner.is_none();
            }
            self.players[idx].tick(&mut self.table, &mut self.events);
            steps += 1;
            if steps > 10_000 {
                log::error!("player {idx} made no progress, aborting");
                return false;
            }
        }
    }

    fn report(&self, event: &Event) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(err) => log::error!("event serialize failed: {err}"),
            }
            return;
        }
        match event {
            Event::DrewFromStock { player } => println!("p{player} draws from stock"),
            Event::DrewFromDiscard { player, card } => {
                println!("p{player} takes {card} from the discard pile")
            }
            Event::LaidDown { player, card, spot } => {
                println!("p{player} lays {card} onto spot {}:{}", spot.player, spot.index)
            }
            Event::JokerReturned { player, .. } => println!("p{player} takes a joker back"),
            Event::Discarded { player, card } => println!("p{player} discards {card}"),
            Event::HandEmptied { player } => println!("p{player} went out!"),
            _ => {}
        }
    }

    fn play(&mut self, max_rounds: u32) {
        self.round = 1;
        while self.round <= max_rounds && self.winner.is_none() {
            for idx in 0..self.players.len() {
                let round = self.round;
                if let Err(err) =
                    self.players[idx].begin_turn(&mut self.table, round, &mut self.events)
                {
                    println!("game over: {err}");
                    return;
                }
                if !self.pump(idx) {
                    return;
                }
            }
            self.round += 1;
        }
    }

    fn summary(&self) {
        println!("--- after round {} ---", self.round);
        for player in &self.players {
            let packs = self
                .table
                .player_spots(player.id())
                .map(|spots| spots.iter().filter(|spot| spot.has_cards()).count())
                .unwrap_or(0);
            println!(
                "p{}: {} cards in hand worth {}, {} packs worth {} on the table",
                player.id(),
                player.hand_len(),
                player.hand_value(),
                packs,
                self.table.laid_value(player.id(), &self.config)
            );
        }
        match self.winner {
            Some(winner) => println!("winner: p{winner}"),
            None => println!("no winner within the round limit"),
        }
    }
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_cli_options(&args);

    let mut game = Game::new(options);
    if let Err(err) = game.serve_hands() {
        eprintln!("setup error: {err}");
        std::process::exit(1);
    }
    game.play(options.max_rounds);
    game.summary();
}
