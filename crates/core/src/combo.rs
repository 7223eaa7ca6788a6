//! Exhaustive enumeration of legal lay-down combinations and their ranking.

use crate::{CardId, GameConfig, Rank, Run, Set, Suit};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A candidate lay-down: sets and runs with pairwise disjoint members.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CardCombo {
    pub sets: Vec<Set>,
    pub runs: Vec<Run>,
}

impl CardCombo {
    pub fn value(&self, config: &GameConfig) -> i64 {
        let sets: i64 = self.sets.iter().map(|set| set.value(config)).sum();
        let runs: i64 = self.runs.iter().map(|run| run.value(config)).sum();
        sets + runs
    }

    pub fn card_count(&self) -> usize {
        let sets: usize = self.sets.iter().map(Set::len).sum();
        let runs: usize = self.runs.iter().map(Run::len).sum();
        sets + runs
    }

    pub fn pack_count(&self) -> usize {
        self.sets.len() + self.runs.len()
    }

    pub fn card_ids(&self) -> HashSet<CardId> {
        let mut ids = HashSet::with_capacity(self.card_count());
        for set in &self.sets {
            ids.extend(set.cards.iter().map(|card| card.id));
        }
        for run in &self.runs {
            ids.extend(run.cards.iter().map(|card| card.id));
        }
        ids
    }

    pub fn contains(&self, id: CardId) -> bool {
        self.sets.iter().any(|set| set.contains(id))
            || self.runs.iter().any(|run| run.contains(id))
    }

    pub fn remove_last_set(&mut self) -> Option<Set> {
        self.sets.pop()
    }

    pub fn remove_last_run(&mut self) -> Option<Run> {
        self.runs.pop()
    }

    /// Appearance equality: same multiset of pack shapes, regardless of which
    /// physical copies make them up. Used to deduplicate the published list.
    pub fn looks_equal(&self, other: &CardCombo) -> bool {
        fn sorted<T: Ord>(mut items: Vec<T>) -> Vec<T> {
            items.sort();
            items
        }
        let my_sets: Vec<(Rank, usize)> = sorted(self.sets.iter().map(Set::shape).collect());
        let their_sets: Vec<(Rank, usize)> = sorted(other.sets.iter().map(Set::shape).collect());
        if my_sets != their_sets {
            return false;
        }
        let my_runs: Vec<(Suit, Vec<Rank>)> = sorted(self.runs.iter().map(Run::shape).collect());
        let their_runs: Vec<(Suit, Vec<Rank>)> = sorted(other.runs.iter().map(Run::shape).collect());
        my_runs == their_runs
    }
}

impl fmt::Display for CardCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for set in &self.sets {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{set}")?;
            first = false;
        }
        for run in &self.runs {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{run}")?;
            first = false;
        }
        if first {
            write!(f, "(empty)")?;
        }
        Ok(())
    }
}

/// Every non-empty subset of the given melds whose members are pairwise
/// disjoint and whose total card count fits the hand.
pub fn all_combos(sets: &[Set], runs: &[Run], hand_len: usize) -> Vec<CardCombo> {
    let mut results = Vec::new();
    let mut current = CardCombo::default();
    let mut used: HashSet<CardId> = HashSet::new();
    pick_sets(sets, runs, hand_len, 0, &mut current, &mut used, &mut results);
    results
}

fn pick_sets(
    sets: &[Set],
    runs: &[Run],
    hand_len: usize,
    from: usize,
    current: &mut CardCombo,
    used: &mut HashSet<CardId>,
    results: &mut Vec<CardCombo>,
) {
    pick_runs(runs, hand_len, 0, current, used, results);
    for idx in from..sets.len() {
        let set = &sets[idx];
        if current.card_count() + set.len() > hand_len {
            continue;
        }
        if set.cards.iter().any(|card| used.contains(&card.id)) {
            continue;
        }
        for card in &set.cards {
            used.insert(card.id);
        }
        current.sets.push(set.clone());
        pick_sets(sets, runs, hand_len, idx + 1, current, used, results);
        current.sets.pop();
        for card in &set.cards {
            used.remove(&card.id);
        }
    }
}

fn pick_runs(
    runs: &[Run],
    hand_len: usize,
    from: usize,
    current: &mut CardCombo,
    used: &mut HashSet<CardId>,
    results: &mut Vec<CardCombo>,
) {
    if current.pack_count() > 0 {
        results.push(current.clone());
    }
    for idx in from..runs.len() {
        let run = &runs[idx];
        if current.card_count() + run.len() > hand_len {
            continue;
        }
        if run.cards.iter().any(|card| used.contains(&card.id)) {
            continue;
        }
        for card in &run.cards {
            used.insert(card.id);
        }
        current.runs.push(run.clone());
        pick_runs(runs, hand_len, idx + 1, current, used, results);
        current.runs.pop();
        for card in &run.cards {
            used.remove(&card.id);
        }
    }
}

/// The maximum-value combo. Ties break toward fewer packs, then toward the
/// earlier-enumerated combo (stable). Empty input yields the empty combo.
pub fn best_combo(sets: &[Set], runs: &[Run], hand_len: usize, config: &GameConfig) -> CardCombo {
    let mut combos = all_combos(sets, runs, hand_len);
    combos.sort_by_key(|combo| (-combo.value(config), combo.pack_count()));
    combos.into_iter().next().unwrap_or_default()
}

/// The display list: deduplicated by appearance, ranked by value descending.
pub fn ranked_unique(combos: &[CardCombo], config: &GameConfig) -> Vec<CardCombo> {
    let mut unique: Vec<CardCombo> = Vec::new();
    for combo in combos {
        if unique.iter().all(|kept| !kept.looks_equal(combo)) {
            unique.push(combo.clone());
        }
    }
    unique.sort_by_key(|combo| -combo.value(config));
    unique
}
