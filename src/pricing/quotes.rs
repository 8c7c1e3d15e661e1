use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use crate::data::types::{EventOdds, Outcome};
use crate::pricing::devig::{devig_two_way, is_untrusted, overround};
use crate::pricing::labels::{base_market, build_label, normalize_text, team_total_label, Market};
use crate::pricing::types::{BetKey, BookLine, Line, PairKey};

/// One book's quotes for one market instance, labels in the order the book sent them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookQuote {
    pub quotes: Vec<(String, Option<i32>)>,
}

impl BookQuote {
    /// Record a label's price. A repeated label keeps its position and takes the new price.
    pub fn offer(&mut self, label: String, price: Option<i32>) {
        match self.quotes.iter_mut().find(|(existing, _)| *existing == label) {
            Some(entry) => entry.1 = price,
            None => self.quotes.push((label, price)),
        }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// `{(market, pair_key): {book: BookQuote}}`
pub type QuoteGroups = BTreeMap<(Market, PairKey), BTreeMap<String, BookQuote>>;

/// Per-book devigged lines for every BetKey that at least one book priced.
#[derive(Debug, Clone, Default)]
pub struct PairedQuotes {
    pub per_book: BTreeMap<BetKey, BTreeMap<String, BookLine>>,
    pub notes: BTreeMap<BetKey, Vec<String>>,
}

/// Normalize one outcome into `(market, label, pair_key)`.
/// Markets outside h2h / spreads / totals / team_totals return `None`.
pub fn normalize_market_and_label(
    market_key: &str,
    outcome: &Outcome,
) -> Option<(Market, String, PairKey)> {
    let market = base_market(market_key);
    let point_text = outcome.point_text();
    let line = outcome.point_value().and_then(Line::from_f64);

    match market {
        Market::H2h => {
            let label = build_label(market_key, &outcome.name, &point_text);
            Some((market, label, PairKey::Moneyline))
        }
        Market::Spreads => {
            let label = build_label(market_key, &outcome.name, &point_text);
            Some((market, label, PairKey::Line(line.map(Line::abs))))
        }
        Market::Totals => {
            let label = build_label(market_key, &outcome.name, &point_text);
            Some((market, label, PairKey::Line(line)))
        }
        Market::TeamTotals => {
            let (team, side) = split_team_total(outcome);
            let label = team_total_label(&team, &side, &point_text);
            Some((market, label, PairKey::TeamLine(team, line)))
        }
        Market::Other(_) => None,
    }
}

fn split_team_total(outcome: &Outcome) -> (String, String) {
    let name = normalize_text(&outcome.name);

    if let Some(team) = outcome.description.as_deref().map(normalize_text) {
        if !team.is_empty() {
            return (team, name);
        }
    }

    // "New York Yankees Over" -> ("New York Yankees", "Over")
    let tokens: Vec<&str> = name.split(' ').collect();
    match tokens
        .iter()
        .position(|t| t.eq_ignore_ascii_case("over") || t.eq_ignore_ascii_case("under"))
    {
        Some(idx) if idx > 0 => (tokens[..idx].join(" "), tokens[idx].to_string()),
        _ => {
            let team = tokens.first().copied().unwrap_or_default().to_string();
            let side = tokens.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
            (team, side)
        }
    }
}

/// Group an event's outcomes by market instance and book, keeping only allowed books.
/// An empty allow-list admits every book.
pub fn extract_book_quotes(event: &EventOdds, allowed_books: &[String]) -> QuoteGroups {
    let allowed: HashSet<&str> = allowed_books.iter().map(String::as_str).collect();
    let mut groups = QuoteGroups::new();

    for bookmaker in &event.bookmakers {
        if !allowed.is_empty() && !allowed.contains(bookmaker.key.as_str()) {
            continue;
        }
        for market in &bookmaker.markets {
            for outcome in &market.outcomes {
                let Some((market_name, label, pair_key)) =
                    normalize_market_and_label(&market.key, outcome)
                else {
                    continue;
                };
                groups
                    .entry((market_name, pair_key))
                    .or_default()
                    .entry(bookmaker.key.clone())
                    .or_default()
                    .offer(label, outcome.price);
            }
        }
    }

    groups
}

/// Pair opposite sides per book and devig them.
///
/// The first two labels a book offered under a pair key form the pair. A book
/// with a single side contributes nothing. More than two labels breaks the
/// two-way assumption; the first two are still used and the keys get a note.
pub fn pair_quotes_by_point(groups: &QuoteGroups) -> PairedQuotes {
    let mut paired = PairedQuotes::default();

    for ((market, pair_key), books) in groups {
        for (book, quote) in books {
            if quote.len() < 2 {
                debug!(
                    "Incomplete pair: {} has {} side(s) for {} {:?}",
                    book,
                    quote.len(),
                    market,
                    pair_key
                );
                continue;
            }

            let (label1, price1) = &quote.quotes[0];
            let (label2, price2) = &quote.quotes[1];
            let key1 = BetKey::new(market.clone(), label1.clone());
            let key2 = BetKey::new(market.clone(), label2.clone());

            if quote.len() > 2 {
                warn!(
                    "{} offered {} outcomes for {} {:?}; pairing the first two",
                    book,
                    quote.len(),
                    market,
                    pair_key
                );
                let note = format!(
                    "{} offered {} outcomes for one line; paired first two",
                    book,
                    quote.len()
                );
                paired.notes.entry(key1.clone()).or_default().push(note.clone());
                paired.notes.entry(key2.clone()).or_default().push(note);
            }

            let (Some(price1), Some(price2)) = (*price1, *price2) else {
                debug!("Missing price from {} for {} {:?}", book, market, pair_key);
                continue;
            };

            let probabilities = devig_two_way(price1, price2);
            if is_untrusted(probabilities) {
                debug!(
                    "Untrusted pair from {}: {} / {} for {}",
                    book, price1, price2, market
                );
                continue;
            }

            if let Some(margin) = overround(price1, price2) {
                debug!(
                    "{} {} [{} {} / {} {}] margin {:.2}%",
                    book,
                    market,
                    label1,
                    price1,
                    label2,
                    price2,
                    margin * 100.0
                );
            }

            paired.per_book.entry(key1).or_default().insert(
                book.clone(),
                BookLine {
                    probability: probabilities.0,
                    price: price1,
                },
            );
            paired.per_book.entry(key2).or_default().insert(
                book.clone(),
                BookLine {
                    probability: probabilities.1,
                    price: price2,
                },
            );
        }
    }

    paired
}
