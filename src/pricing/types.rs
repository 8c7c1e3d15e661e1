use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::pricing::labels::{base_market, Market};

/// Join key between consensus pricing and stored bets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BetKey {
    pub market: Market,
    pub label: String,
}

impl BetKey {
    pub fn new(market: Market, label: impl Into<String>) -> Self {
        Self {
            market,
            label: label.into(),
        }
    }

    /// Convenience for tests and sheet rows: market given as a raw key.
    pub fn from_raw(market: &str, label: impl Into<String>) -> Self {
        Self::new(base_market(market), label)
    }
}

impl fmt::Display for BetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.market, self.label)
    }
}

/// A line value held in thousandths so it can key maps (7.5 -> 7500).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Line(i64);

impl Line {
    pub fn from_f64(point: f64) -> Option<Self> {
        if point.is_finite() {
            Some(Line((point * 1000.0).round() as i64))
        } else {
            None
        }
    }

    pub fn abs(self) -> Self {
        Line(self.0.abs())
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

/// Groups the outcomes that form one two-sided market instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PairKey {
    /// Moneyline: every outcome of the market pairs together.
    Moneyline,
    /// Totals by point, spreads by absolute point. `None` when the quote carried no point.
    Line(Option<Line>),
    /// Team totals pair per team and point.
    TeamLine(String, Option<Line>),
}

/// One book's side of a pair as it entered the devig step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookLine {
    pub probability: f64,
    pub price: i32,
}

/// No-vig pricing for one BetKey at one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevigResult {
    pub book_probabilities: BTreeMap<String, f64>,
    /// Prices each contributing book actually quoted for this label.
    pub book_prices: BTreeMap<String, i32>,
    pub consensus_probability: Option<f64>,
    pub consensus_odds: Option<i32>,
    /// Best (highest) price among the contributing books only.
    pub best_price: Option<i32>,
    pub books: Vec<String>,
    pub notes: Vec<String>,
}

impl DevigResult {
    pub fn has_consensus(&self) -> bool {
        self.consensus_probability.is_some() && self.consensus_odds.is_some()
    }
}

/// Consensus results for one event, ordered by BetKey.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsensusTable {
    results: BTreeMap<BetKey, DevigResult>,
}

impl ConsensusTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: BetKey, result: DevigResult) {
        self.results.insert(key, result);
    }

    pub fn get(&self, key: &BetKey) -> Option<&DevigResult> {
        self.results.get(key)
    }

    pub fn contains(&self, key: &BetKey) -> bool {
        self.results.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BetKey, &DevigResult)> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
