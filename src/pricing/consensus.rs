use std::collections::BTreeMap;
use tracing::debug;

use crate::data::types::EventOdds;
use crate::pricing::odds::probability_to_american;
use crate::pricing::quotes::{extract_book_quotes, pair_quotes_by_point, PairedQuotes};
use crate::pricing::types::{BookLine, ConsensusTable, DevigResult};

pub const NO_VALID_BOOKS: &str = "no valid books";

/// Devig every allowed book at an event and average them per BetKey.
pub fn compute_consensus(event: &EventOdds, allowed_books: &[String]) -> ConsensusTable {
    let groups = extract_book_quotes(event, allowed_books);
    let paired = pair_quotes_by_point(&groups);
    aggregate(paired)
}

/// Combine per-book no-vig probabilities with an unweighted mean.
pub fn aggregate(paired: PairedQuotes) -> ConsensusTable {
    let PairedQuotes {
        per_book,
        mut notes,
    } = paired;
    let mut table = ConsensusTable::new();

    for (key, lines) in per_book {
        let mut result = consensus_for(&lines);
        if let Some(mut extra) = notes.remove(&key) {
            result.notes.append(&mut extra);
        }
        debug!(
            "{} consensus={:?} odds={:?} books={:?}",
            key, result.consensus_probability, result.consensus_odds, result.books
        );
        table.insert(key, result);
    }

    table
}

/// Consensus for one BetKey from its contributing books.
pub fn consensus_for(lines: &BTreeMap<String, BookLine>) -> DevigResult {
    let book_probabilities: BTreeMap<String, f64> = lines
        .iter()
        .map(|(book, line)| (book.clone(), line.probability))
        .collect();
    let book_prices: BTreeMap<String, i32> = lines
        .iter()
        .map(|(book, line)| (book.clone(), line.price))
        .collect();
    // BTreeMap keys are already sorted
    let books: Vec<String> = lines.keys().cloned().collect();

    if books.is_empty() {
        return DevigResult {
            book_probabilities,
            book_prices,
            consensus_probability: None,
            consensus_odds: None,
            best_price: None,
            books,
            notes: vec![NO_VALID_BOOKS.to_string()],
        };
    }

    let consensus = book_probabilities.values().sum::<f64>() / book_probabilities.len() as f64;
    let odds = probability_to_american(consensus).ok();
    let best_price = book_prices.values().copied().max();

    DevigResult {
        book_probabilities,
        book_prices,
        consensus_probability: Some(consensus),
        consensus_odds: odds,
        best_price,
        books,
        notes: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::{BookmakerOdds, MarketOdds, Outcome};
    use crate::pricing::devig::devig_two_way;
    use crate::pricing::labels::Market;
    use crate::pricing::types::BetKey;

    fn two_book_event(market: &str, first: Vec<Outcome>, second: Vec<Outcome>) -> EventOdds {
        EventOdds {
            id: Some("evt".to_string()),
            sport_key: None,
            home_team: None,
            away_team: None,
            bookmakers: vec![
                BookmakerOdds {
                    key: "book1".to_string(),
                    title: None,
                    markets: vec![MarketOdds {
                        key: market.to_string(),
                        outcomes: first,
                    }],
                },
                BookmakerOdds {
                    key: "book2".to_string(),
                    title: None,
                    markets: vec![MarketOdds {
                        key: market.to_string(),
                        outcomes: second,
                    }],
                },
            ],
        }
    }

    fn allowed() -> Vec<String> {
        vec!["book1".to_string(), "book2".to_string()]
    }

    #[test]
    fn test_moneyline_consensus() {
        let event = two_book_event(
            "h2h",
            vec![Outcome::new("A", -110, None), Outcome::new("B", -110, None)],
            vec![Outcome::new("A", -105, None), Outcome::new("B", -115, None)],
        );
        let table = compute_consensus(&event, &allowed());

        let a = table.get(&BetKey::new(Market::H2h, "A")).unwrap();
        assert!(table.contains(&BetKey::new(Market::H2h, "B")));
        assert_eq!(a.books, vec!["book1", "book2"]);

        let p1 = a.book_probabilities["book1"];
        let p2 = a.book_probabilities["book2"];
        assert_eq!(p1, 0.5);
        assert!(p2 > 0.0 && p2 < 1.0);
        assert_eq!(a.consensus_probability, Some((p1 + p2) / 2.0));
        assert_eq!(
            a.consensus_odds,
            Some(probability_to_american((p1 + p2) / 2.0).unwrap())
        );
    }

    #[test]
    fn test_totals_consensus_is_mean_of_devigged_books() {
        let event = two_book_event(
            "totals",
            vec![
                Outcome::new("Over", -110, Some("7.5")),
                Outcome::new("Under", -110, Some("7.5")),
            ],
            vec![
                Outcome::new("Over", -105, Some("7.5")),
                Outcome::new("Under", -115, Some("7.5")),
            ],
        );
        let table = compute_consensus(&event, &allowed());

        let over = table.get(&BetKey::new(Market::Totals, "Over 7.5")).unwrap();
        let (p1, _) = devig_two_way(-110, -110);
        let (p2, _) = devig_two_way(-105, -115);
        assert_eq!(over.consensus_probability, Some((p1 + p2) / 2.0));
        assert_eq!(over.best_price, Some(-105));
        assert!(over.notes.is_empty());
    }

    #[test]
    fn test_spread_pairing() {
        let event = EventOdds {
            id: None,
            sport_key: None,
            home_team: None,
            away_team: None,
            bookmakers: vec![BookmakerOdds {
                key: "book1".to_string(),
                title: None,
                markets: vec![MarketOdds {
                    key: "spreads".to_string(),
                    outcomes: vec![
                        Outcome::new("A", -110, Some("-3.5")),
                        Outcome::new("B", -110, Some("3.5")),
                    ],
                }],
            }],
        };
        let table = compute_consensus(&event, &["book1".to_string()]);

        let a = table.get(&BetKey::new(Market::Spreads, "A -3.5")).unwrap();
        let b = table.get(&BetKey::new(Market::Spreads, "B +3.5")).unwrap();
        assert_eq!(a.consensus_probability, Some(0.5));
        assert_eq!(b.consensus_probability, Some(0.5));
    }

    #[test]
    fn test_missing_counterpart_leaves_key_absent() {
        let event = two_book_event(
            "totals",
            vec![Outcome::new("Over", -110, Some("7.5"))],
            vec![],
        );
        let table = compute_consensus(&event, &allowed());
        assert!(table.is_empty());
        assert!(table.get(&BetKey::new(Market::Totals, "Over 7.5")).is_none());
    }

    #[test]
    fn test_best_price_uses_contributing_books_only() {
        // book2 only quotes one side, so its +105 on A must not leak into best price
        let event = two_book_event(
            "h2h",
            vec![Outcome::new("A", -110, None), Outcome::new("B", -110, None)],
            vec![Outcome::new("A", 105, None)],
        );
        let table = compute_consensus(&event, &allowed());

        let a = table.get(&BetKey::new(Market::H2h, "A")).unwrap();
        assert_eq!(a.books, vec!["book1"]);
        assert_eq!(a.book_prices.keys().collect::<Vec<_>>(), vec!["book1"]);
        assert_eq!(a.best_price, Some(-110));
    }

    #[test]
    fn test_no_books_is_explicitly_null() {
        let result = consensus_for(&BTreeMap::new());
        assert_eq!(result.consensus_probability, None);
        assert_eq!(result.consensus_odds, None);
        assert!(!result.has_consensus());
        assert_eq!(result.notes, vec![NO_VALID_BOOKS]);
    }

    #[test]
    fn test_disallowed_books_are_invisible() {
        let event = two_book_event(
            "h2h",
            vec![Outcome::new("A", -110, None), Outcome::new("B", -110, None)],
            vec![Outcome::new("A", -200, None), Outcome::new("B", 170, None)],
        );
        let table = compute_consensus(&event, &["book1".to_string()]);
        let a = table.get(&BetKey::new(Market::H2h, "A")).unwrap();
        assert_eq!(a.books, vec!["book1"]);
        assert_eq!(a.consensus_probability, Some(0.5));
    }
}
