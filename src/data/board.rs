use dashmap::DashMap;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::info;

use crate::data::types::EventOdds;
use crate::pricing::consensus::compute_consensus;
use crate::pricing::types::{BetKey, ConsensusTable, DevigResult};

/// Consensus tables for every event in a run, keyed by event id.
pub struct ConsensusBoard {
    tables: DashMap<String, ConsensusTable>,
}

impl ConsensusBoard {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    /// Compute consensus for each event. Events are independent, so with
    /// `parallel` they run on the rayon pool and merge by id.
    pub fn build(
        events: &BTreeMap<String, EventOdds>,
        allowed_books: &[String],
        parallel: bool,
    ) -> Self {
        let board = Self::new();

        if parallel {
            events.par_iter().for_each(|(event_id, event)| {
                board.insert(event_id.clone(), compute_consensus(event, allowed_books));
            });
        } else {
            for (event_id, event) in events {
                board.insert(event_id.clone(), compute_consensus(event, allowed_books));
            }
        }

        info!(
            "Consensus built for {} events ({} priced keys)",
            board.len(),
            board.priced_keys()
        );
        board
    }

    pub fn insert(&self, event_id: String, table: ConsensusTable) {
        self.tables.insert(event_id, table);
    }

    pub fn has_event(&self, event_id: &str) -> bool {
        self.tables.contains_key(event_id)
    }

    /// Consensus for one BetKey at one event, if the event was priced and the key exists.
    pub fn lookup(&self, event_id: &str, key: &BetKey) -> Option<DevigResult> {
        self.tables
            .get(event_id)
            .and_then(|table| table.get(key).cloned())
    }

    /// Total BetKeys across all events.
    pub fn priced_keys(&self) -> usize {
        self.tables.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn clear(&self) {
        self.tables.clear();
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Default for ConsensusBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::{BookmakerOdds, MarketOdds, Outcome};
    use crate::pricing::labels::Market;

    fn h2h_event(book: &str, a: i32, b: i32) -> EventOdds {
        EventOdds {
            id: None,
            sport_key: None,
            home_team: None,
            away_team: None,
            bookmakers: vec![BookmakerOdds {
                key: book.to_string(),
                title: None,
                markets: vec![MarketOdds {
                    key: "h2h".to_string(),
                    outcomes: vec![Outcome::new("A", a, None), Outcome::new("B", b, None)],
                }],
            }],
        }
    }

    fn events(count: usize) -> BTreeMap<String, EventOdds> {
        (0..count)
            .map(|i| (format!("evt{}", i), h2h_event("pinnacle", -110 - i as i32, 100)))
            .collect()
    }

    #[test]
    fn test_lookup_by_event_and_key() {
        let board = ConsensusBoard::build(&events(3), &["pinnacle".to_string()], false);
        let key = BetKey::new(Market::H2h, "A");

        assert_eq!(board.len(), 3);
        assert!(board.has_event("evt2"));
        assert!(board.lookup("evt0", &key).unwrap().has_consensus());
        assert!(board.lookup("missing", &key).is_none());
        assert!(board.lookup("evt0", &BetKey::new(Market::H2h, "C")).is_none());
    }

    #[test]
    fn test_parallel_build_matches_sequential() {
        let all = events(25);
        let books = vec!["pinnacle".to_string()];
        let sequential = ConsensusBoard::build(&all, &books, false);
        let parallel = ConsensusBoard::build(&all, &books, true);

        assert_eq!(parallel.len(), sequential.len());
        let key = BetKey::new(Market::H2h, "B");
        for event_id in all.keys() {
            assert_eq!(
                parallel.lookup(event_id, &key),
                sequential.lookup(event_id, &key)
            );
        }
    }

    #[test]
    fn test_clear() {
        let board = ConsensusBoard::build(&events(2), &[], false);
        assert!(!board.is_empty());
        board.clear();
        assert!(board.is_empty());
    }
}
