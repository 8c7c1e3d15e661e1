use regex::Regex;

use crate::data::aliases::normalize_book;
use crate::data::types::{DetailedOddsRow, Outcome};
use crate::pricing::labels::{
    base_market, build_label, normalize_team, normalize_text, team_total_label, Market,
};
use crate::pricing::odds::parse_american;
use crate::pricing::quotes::normalize_market_and_label;
use crate::pricing::types::BetKey;

/// Turns a bet sheet's free-text market and selection into a BetKey.
pub struct BetParser {
    totals: Regex,
    team_totals: Regex,
    trailing_line: Regex,
}

impl BetParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            totals: Regex::new(r"(?i)^(over|under)\s+(\d+(?:\.\d+)?)$")?,
            team_totals: Regex::new(r"(?i)^(.+?)\s+(over|under)\s+(\d+(?:\.\d+)?)$")?,
            trailing_line: Regex::new(r"(?:^|\s)([+-])?(\d+(?:\.\d+)?)$")?,
        })
    }

    /// - "Over 7.5" / "under 7½" -> totals, "Over 7.5"
    /// - a selection ending in a signed number -> spreads, as written
    /// - a spreads selection ending in an unsigned number gains "+"
    /// - anything else keeps its market with the selection as the label
    ///
    /// Team names in h2h and spreads labels get the same spelling fixes as
    /// feed outcomes.
    pub fn parse(&self, market: &str, bet: &str) -> BetKey {
        let mut key = self.parse_selection(market, bet);
        if matches!(key.market, Market::H2h | Market::Spreads) {
            key.label = normalize_team(&key.label);
        }
        key
    }

    fn parse_selection(&self, market: &str, bet: &str) -> BetKey {
        let bet = normalize_text(bet);

        if let Some(caps) = self.totals.captures(&bet) {
            let label = build_label("totals", &caps[1], &caps[2]);
            return BetKey::new(Market::Totals, label);
        }

        let market = canonical_bet_market(market);

        if market == Market::TeamTotals {
            if let Some(caps) = self.team_totals.captures(&bet) {
                return BetKey::new(market, team_total_label(&caps[1], &caps[2], &caps[3]));
            }
            return BetKey::new(market, bet);
        }

        if let Some(caps) = self.trailing_line.captures(&bet) {
            if caps.get(1).is_some() {
                return BetKey::new(Market::Spreads, bet);
            }
            if market == Market::Spreads {
                if let Some(number) = caps.get(2) {
                    let label = format!("{}+{}", &bet[..number.start()], number.as_str());
                    return BetKey::new(market, label);
                }
            }
        }

        BetKey::new(market, bet)
    }
}

/// Bet sheets write markets loosely ("Spread", "Totals (Game)", "ML").
pub fn canonical_bet_market(market: &str) -> Market {
    let lower = market.trim().to_lowercase();
    if lower.starts_with("spread") {
        Market::Spreads
    } else if lower.starts_with("team_total") || lower.starts_with("team total") {
        Market::TeamTotals
    } else if lower.starts_with("total") {
        Market::Totals
    } else {
        base_market(&lower)
    }
}

/// A raw book quote picked as a closing line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosingQuote {
    pub bookmaker: String,
    pub price: i32,
    /// True when the quote came from the book the bet was placed at.
    pub exact_book: bool,
}

/// BetKey a Detailed Odds row prices, using the same normalizer as the consensus path.
pub fn row_key(row: &DetailedOddsRow) -> BetKey {
    let outcome = Outcome {
        name: row.outcome_name.clone(),
        price: None,
        point: Some(row.outcome_point.clone()).filter(|p| !p.trim().is_empty()),
        description: Some(row.description.clone()).filter(|d| !d.trim().is_empty()),
    };
    match normalize_market_and_label(&row.api_market, &outcome) {
        Some((market, label, _)) => BetKey::new(market, label),
        None => BetKey::new(
            base_market(&row.api_market),
            build_label(&row.api_market, &row.outcome_name, &row.outcome_point),
        ),
    }
}

/// Find a closing quote for a bet among one event's Detailed Odds rows.
/// The bet's own book wins; otherwise the first book offering the same
/// market and label.
pub fn pick_closing_line(
    event_rows: &[DetailedOddsRow],
    key: &BetKey,
    bookmaker: &str,
) -> Option<ClosingQuote> {
    let target_book = normalize_book(bookmaker);
    let wanted_label = comparable(&key.label);

    let candidates: Vec<(String, i32)> = event_rows
        .iter()
        .filter_map(|row| {
            let row_key = row_key(row);
            if row_key.market != key.market || comparable(&row_key.label) != wanted_label {
                return None;
            }
            let price = parse_american(&row.odds).ok()?;
            Some((normalize_book(&row.bookmaker), price))
        })
        .collect();

    if let Some((book, price)) = candidates.iter().find(|(book, _)| *book == target_book) {
        return Some(ClosingQuote {
            bookmaker: book.clone(),
            price: *price,
            exact_book: true,
        });
    }

    candidates.into_iter().next().map(|(book, price)| ClosingQuote {
        bookmaker: book,
        price,
        exact_book: false,
    })
}

fn comparable(label: &str) -> String {
    normalize_text(label).to_lowercase()
}
