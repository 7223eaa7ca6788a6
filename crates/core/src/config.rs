use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Minimum combo value required for a player's first lay-down.
    pub min_lay_value: i64,
    /// Round number (1-based) from which laying down is permitted.
    pub earliest_lay_round: u32,
    /// Ticks a player waits in the Waiting state before playing.
    pub wait_ticks: u32,
    /// Point value of a joker card.
    pub joker_value: i64,
    /// Cards served to each player at the start of a round.
    pub serve_count: usize,
    /// Table spots available to each player for laid-down packs.
    pub spots_per_player: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_lay_value: 40,
            earliest_lay_round: 2,
            wait_ticks: 2,
            joker_value: 0,
            serve_count: 13,
            spots_per_player: 8,
        }
    }
}

impl GameConfig {
    pub fn may_lay_down(&self, round: u32) -> bool {
        round >= self.earliest_lay_round
    }
}
