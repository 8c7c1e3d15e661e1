//! Header and bookmaker aliases for sheet exports.
//!
//! Different exports name the same column differently ("Bookmaker", "Book",
//! "Sportsbook"). Headers are resolved once into a [`ColumnMap`]; nothing
//! downstream looks at raw header text.

use csv::StringRecord;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    BetId,
    EventId,
    Market,
    Bet,
    Bookmaker,
    Odds,
    Stake,
    Result,
    ClosingLine,
    ClvPct,
    ApiMarket,
    OutcomeName,
    Description,
    OutcomePoint,
}

impl Field {
    /// Accepted header names, most specific first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::BetId => &["Bet ID", "Bet ID#", "Ticket", "Ticket #"],
            Field::EventId => &["Event ID", "EventId", "Event"],
            Field::Market => &["Market", "Bet Type"],
            Field::Bet => &["Bet", "Selection", "Pick"],
            Field::Bookmaker => &["Bookmaker", "Book", "Sportsbook"],
            Field::Odds => &["Odds", "American", "Price"],
            Field::Stake => &["Stake", "Risk", "Wager"],
            Field::Result => &["Result", "Status"],
            Field::ClosingLine => &["Closing Line"],
            Field::ClvPct => &["CLV%", "CLV"],
            Field::ApiMarket => &["API Market", "Market"],
            Field::OutcomeName => &["Outcome Name (Normalized)", "Label", "Outcome", "Bet"],
            Field::Description => &["Description", "Team"],
            Field::OutcomePoint => &["Outcome Point", "Point"],
        }
    }
}

/// Fields read from the bet tracking export.
pub const BET_FIELDS: &[Field] = &[
    Field::BetId,
    Field::EventId,
    Field::Market,
    Field::Bet,
    Field::Bookmaker,
    Field::Odds,
    Field::Stake,
    Field::Result,
    Field::ClosingLine,
    Field::ClvPct,
];

/// Fields read from the Detailed Odds export.
pub const DETAILED_ODDS_FIELDS: &[Field] = &[
    Field::EventId,
    Field::Bookmaker,
    Field::ApiMarket,
    Field::OutcomeName,
    Field::Description,
    Field::OutcomePoint,
    Field::Odds,
];

#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    columns: HashMap<Field, usize>,
}

impl ColumnMap {
    pub fn resolve(header: &StringRecord, fields: &[Field]) -> Self {
        let normalized: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
        let mut columns = HashMap::new();

        for &field in fields {
            let found = field.aliases().iter().find_map(|alias| {
                let alias = alias.to_lowercase();
                normalized.iter().position(|h| *h == alias)
            });
            if let Some(idx) = found {
                columns.insert(field, idx);
            }
        }

        Self { columns }
    }

    pub fn index(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// Trimmed cell text, empty when the column or cell is absent.
    pub fn get<'a>(&self, record: &'a StringRecord, field: Field) -> &'a str {
        self.index(field)
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .unwrap_or("")
    }

    pub fn missing(&self, required: &[Field]) -> Vec<Field> {
        required
            .iter()
            .copied()
            .filter(|f| !self.columns.contains_key(f))
            .collect()
    }
}

/// Map a site's spelling of a bookmaker onto the odds feed's identifier.
pub fn normalize_book(name: &str) -> String {
    let key = name.trim().to_lowercase();
    match key.as_str() {
        "betonline" | "betonline.ag" | "betonline_ag" => "betonlineag".to_string(),
        "draft kings" => "draftkings".to_string(),
        "fan duel" => "fanduel".to_string(),
        "pinnacle sports" | "pinnacle.com" => "pinnacle".to_string(),
        _ => key,
    }
}
