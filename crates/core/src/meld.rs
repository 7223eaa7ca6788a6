//! Meld enumeration: every set, run, and joker-completed set a card
//! collection can produce. Pure functions, inputs never mutated.

use crate::{sum_value, Card, CardId, GameConfig, Rank, Suit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 3-4 cards of one rank, each from a distinct suit. Jokers may stand in
/// for missing suits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Set {
    pub rank: Rank,
    pub cards: Vec<Card>,
}

/// Three or more consecutive cards of one suit, ace low.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Run {
    pub suit: Suit,
    pub cards: Vec<Card>,
}

impl Set {
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn value(&self, config: &GameConfig) -> i64 {
        sum_value(&self.cards, config)
    }

    pub fn contains(&self, id: CardId) -> bool {
        self.cards.iter().any(|card| card.id == id)
    }

    pub fn intersects(&self, other: &Set) -> bool {
        self.cards.iter().any(|card| other.contains(card.id))
    }

    pub fn remove_last_card(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// Shape used for appearance equality: rank plus member count.
    pub fn shape(&self) -> (Rank, usize) {
        (self.rank, self.cards.len())
    }
}

impl Run {
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn value(&self, config: &GameConfig) -> i64 {
        sum_value(&self.cards, config)
    }

    pub fn contains(&self, id: CardId) -> bool {
        self.cards.iter().any(|card| card.id == id)
    }

    pub fn intersects(&self, other: &Run) -> bool {
        self.cards.iter().any(|card| other.contains(card.id))
    }

    pub fn remove_last_card(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// Shape used for appearance equality: suit plus the rank sequence.
    pub fn shape(&self) -> (Suit, Vec<Rank>) {
        (self.suit, self.cards.iter().map(|card| card.rank).collect())
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Set[")?;
        for (i, card) in self.cards.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{card}")?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Run[")?;
        for (i, card) in self.cards.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{card}")?;
        }
        write!(f, "]")
    }
}

fn id_key(cards: &[Card]) -> BTreeSet<CardId> {
    cards.iter().map(|card| card.id).collect()
}

fn cartesian_product(lists: &[&[Card]]) -> Vec<Vec<Card>> {
    fn recurse(
        lists: &[&[Card]],
        index: usize,
        current: &mut Vec<Card>,
        results: &mut Vec<Vec<Card>>,
    ) {
        if index == lists.len() {
            results.push(current.clone());
            return;
        }
        for &card in lists[index] {
            current.push(card);
            recurse(lists, index + 1, current, results);
            current.pop();
        }
    }
    let mut results = Vec::new();
    let mut current = Vec::with_capacity(lists.len());
    recurse(lists, 0, &mut current, &mut results);
    results
}

fn joker_combinations(jokers: &[Card], k: usize) -> Vec<Vec<Card>> {
    if k == 0 {
        return vec![Vec::new()];
    }
    if jokers.len() < k {
        return Vec::new();
    }
    fn recurse(
        jokers: &[Card],
        start: usize,
        k: usize,
        current: &mut Vec<Card>,
        results: &mut Vec<Vec<Card>>,
    ) {
        if current.len() == k {
            results.push(current.clone());
            return;
        }
        for idx in start..jokers.len() {
            current.push(jokers[idx]);
            recurse(jokers, idx + 1, k, current, results);
            current.pop();
        }
    }
    let mut results = Vec::new();
    let mut current = Vec::with_capacity(k);
    recurse(jokers, 0, k, &mut current, &mut results);
    results
}

/// Cards of one rank bucketed per suit. Duplicate rank+suit copies (the
/// stock is a double deck) land in the same bucket.
fn rank_suit_buckets(cards: &[Card]) -> Vec<(Rank, [Vec<Card>; 4])> {
    let mut buckets: Vec<(Rank, [Vec<Card>; 4])> = Rank::RUN_ORDER
        .iter()
        .map(|rank| (*rank, [Vec::new(), Vec::new(), Vec::new(), Vec::new()]))
        .collect();
    for card in cards {
        if card.is_joker() {
            continue;
        }
        if let Some(pos) = card.rank.run_index() {
            let suit_idx = Suit::ALL.iter().position(|s| *s == card.suit).unwrap_or(0);
            buckets[pos].1[suit_idx].push(*card);
        }
    }
    buckets
}

fn enumerate_sets(cards: &[Card], jokers: &[Card], min_jokers: usize) -> Vec<Set> {
    let buckets = rank_suit_buckets(cards);
    let max_jokers = jokers.len();
    let mut results = Vec::new();
    let mut seen: BTreeSet<BTreeSet<CardId>> = BTreeSet::new();

    for (rank, suit_lists) in &buckets {
        for target_size in 3..=4usize {
            for subset_mask in 1usize..(1 << 4) {
                let real_count = subset_mask.count_ones() as usize;
                if real_count < 2 || real_count > target_size {
                    continue;
                }
                let jokers_needed = target_size - real_count;
                if jokers_needed < min_jokers || jokers_needed > max_jokers {
                    continue;
                }
                let mut lists: Vec<&[Card]> = Vec::with_capacity(real_count);
                let mut valid = true;
                for (suit_idx, list) in suit_lists.iter().enumerate() {
                    if subset_mask & (1 << suit_idx) == 0 {
                        continue;
                    }
                    if list.is_empty() {
                        valid = false;
                        break;
                    }
                    lists.push(list.as_slice());
                }
                if !valid {
                    continue;
                }

                for real_cards in cartesian_product(&lists) {
                    for joker_cards in joker_combinations(jokers, jokers_needed) {
                        let mut members = real_cards.clone();
                        members.extend(joker_cards);
                        if seen.insert(id_key(&members)) {
                            results.push(Set {
                                rank: *rank,
                                cards: members,
                            });
                        }
                    }
                }
            }
        }
    }
    results
}

/// All sets of 3-4 same-rank distinct-suit cards, real cards only.
pub fn possible_sets(cards: &[Card]) -> Vec<Set> {
    enumerate_sets(cards, &[], 0)
}

/// Joker-completed sets: every set shape with at least two real cards whose
/// missing suits the jokers in hand can fill.
pub fn possible_joker_sets(cards: &[Card]) -> Vec<Set> {
    let jokers: Vec<Card> = cards.iter().copied().filter(Card::is_joker).collect();
    if jokers.is_empty() {
        return Vec::new();
    }
    enumerate_sets(cards, &jokers, 1)
}

/// All runs of 3+ consecutive same-suit cards, real cards only, ace low.
pub fn possible_runs(cards: &[Card]) -> Vec<Run> {
    let mut results = Vec::new();
    let mut seen: BTreeSet<BTreeSet<CardId>> = BTreeSet::new();

    for suit in Suit::ALL {
        let mut rank_lists: Vec<Vec<Card>> = vec![Vec::new(); Rank::RUN_ORDER.len()];
        for card in cards {
            if card.suit == suit && !card.is_joker() {
                if let Some(pos) = card.rank.run_index() {
                    rank_lists[pos].push(*card);
                }
            }
        }
        for start in 0..rank_lists.len() {
            if rank_lists[start].is_empty() {
                continue;
            }
            let mut current = Vec::new();
            explore_run(&rank_lists, suit, start, &mut current, &mut seen, &mut results);
        }
    }
    results
}

fn explore_run(
    rank_lists: &[Vec<Card>],
    suit: Suit,
    position: usize,
    current: &mut Vec<Card>,
    seen: &mut BTreeSet<BTreeSet<CardId>>,
    results: &mut Vec<Run>,
) {
    for &card in &rank_lists[position] {
        current.push(card);
        if current.len() >= 3 && seen.insert(id_key(current)) {
            results.push(Run {
                suit,
                cards: current.clone(),
            });
        }
        if position + 1 < rank_lists.len() && !rank_lists[position + 1].is_empty() {
            explore_run(rank_lists, suit, position + 1, current, seen, results);
        }
        current.pop();
    }
}
