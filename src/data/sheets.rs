use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::data::aliases::{normalize_book, ColumnMap, Field, BET_FIELDS, DETAILED_ODDS_FIELDS};
use crate::data::types::{BetRecord, BookmakerOdds, DetailedOddsRow, EventOdds, MarketOdds, Outcome};
use crate::pricing::odds::parse_american;

const REQUIRED_BET_FIELDS: &[Field] = &[Field::EventId, Field::Market, Field::Bet, Field::Odds];
const OPTIONAL_ODDS_FIELDS: &[Field] = &[Field::Description, Field::OutcomePoint];

/// Load a bet tracking export. `header_row` is 1-based; rows above it are ignored.
pub fn load_bets(path: impl AsRef<Path>, header_row: usize) -> Result<Vec<BetRecord>> {
    let path = path.as_ref();
    let (header, rows) = read_sheet(path, header_row)?;
    let columns = ColumnMap::resolve(&header, BET_FIELDS);

    let missing = columns.missing(REQUIRED_BET_FIELDS);
    if !missing.is_empty() {
        bail!("Bet sheet {} is missing columns: {:?}", path.display(), missing);
    }

    let bets: Vec<BetRecord> = rows
        .iter()
        .map(|row| bet_from_row(&columns, row))
        .collect();

    info!("Loaded {} bets from {}", bets.len(), path.display());
    Ok(bets)
}

/// Load a Detailed Odds export (header on the first row).
pub fn load_detailed_odds(path: impl AsRef<Path>) -> Result<Vec<DetailedOddsRow>> {
    let path = path.as_ref();
    let (header, rows) = read_sheet(path, 1)?;
    let columns = ColumnMap::resolve(&header, DETAILED_ODDS_FIELDS);

    let missing = columns.missing(DETAILED_ODDS_FIELDS);
    if missing.iter().any(|f| !OPTIONAL_ODDS_FIELDS.contains(f)) {
        bail!("Detailed Odds sheet {} is missing columns: {:?}", path.display(), missing);
    }

    let odds_rows: Vec<DetailedOddsRow> = rows
        .iter()
        .map(|row| DetailedOddsRow {
            event_id: columns.get(row, Field::EventId).to_string(),
            bookmaker: columns.get(row, Field::Bookmaker).to_string(),
            api_market: columns.get(row, Field::ApiMarket).to_string(),
            outcome_name: columns.get(row, Field::OutcomeName).to_string(),
            description: columns.get(row, Field::Description).to_string(),
            outcome_point: columns.get(row, Field::OutcomePoint).to_string(),
            odds: columns.get(row, Field::Odds).to_string(),
        })
        .collect();

    info!("Loaded {} detailed odds rows from {}", odds_rows.len(), path.display());
    Ok(odds_rows)
}

const EXPORT_HEADER: [&str; 10] = [
    "Bet ID",
    "Event ID",
    "Market",
    "Bet",
    "Bookmaker",
    "Odds",
    "Stake",
    "Result",
    "Closing Line",
    "CLV%",
];

/// Write bets, closing lines included, as a sheet `load_bets` reads back
/// with its header on row 1.
pub fn export_bets(path: impl AsRef<Path>, bets: &[BetRecord]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create bet export: {}", path.display()))?;
    writer.write_record(EXPORT_HEADER)?;

    for bet in bets {
        let stake = bet.stake.map(|s| s.to_string()).unwrap_or_default();
        writer.write_record([
            bet.bet_id.as_str(),
            bet.event_id.as_str(),
            bet.market.as_str(),
            bet.bet.as_str(),
            bet.bookmaker.as_str(),
            bet.odds.as_str(),
            stake.as_str(),
            bet.result.as_deref().unwrap_or_default(),
            bet.closing_line.as_deref().unwrap_or_default(),
            bet.clv_pct.as_deref().unwrap_or_default(),
        ])?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write bet export: {}", path.display()))?;
    info!("Exported {} bets to {}", bets.len(), path.display());
    Ok(())
}

/// Rebuild per-event payloads from Detailed Odds rows.
/// Rows missing an event, book, market or parseable odds are dropped.
pub fn build_events(rows: &[DetailedOddsRow]) -> BTreeMap<String, EventOdds> {
    // event -> book -> market -> outcomes, books and markets in first-seen order
    let mut grouped: BTreeMap<String, Vec<(String, Vec<(String, Vec<Outcome>)>)>> = BTreeMap::new();

    for row in rows {
        let event_id = row.event_id.trim();
        let book = normalize_book(&row.bookmaker);
        let market = row.api_market.trim();
        if event_id.is_empty() || book.is_empty() || market.is_empty() {
            continue;
        }
        let Ok(price) = parse_american(&row.odds) else {
            debug!("Dropping detailed odds row with odds {:?}", row.odds);
            continue;
        };

        let point = row.outcome_point.trim();
        let mut outcome = Outcome::new(
            &row.outcome_name,
            price,
            (!point.is_empty()).then_some(point),
        );
        let team = row.description.trim();
        if !team.is_empty() {
            outcome.description = Some(team.to_string());
        }

        let books = grouped.entry(event_id.to_string()).or_default();
        let idx = match books.iter().position(|(key, _)| *key == book) {
            Some(idx) => idx,
            None => {
                books.push((book, Vec::new()));
                books.len() - 1
            }
        };
        let markets = &mut books[idx].1;
        match markets.iter_mut().find(|(key, _)| key == market) {
            Some((_, outcomes)) => outcomes.push(outcome),
            None => markets.push((market.to_string(), vec![outcome])),
        }
    }

    grouped
        .into_iter()
        .map(|(event_id, books)| {
            let bookmakers = books
                .into_iter()
                .map(|(key, markets)| BookmakerOdds {
                    key,
                    title: None,
                    markets: markets
                        .into_iter()
                        .map(|(key, outcomes)| MarketOdds { key, outcomes })
                        .collect(),
                })
                .collect();
            let event = EventOdds {
                id: Some(event_id.clone()),
                sport_key: None,
                home_team: None,
                away_team: None,
                bookmakers,
            };
            (event_id, event)
        })
        .collect()
}

fn read_sheet(path: &Path, header_row: usize) -> Result<(StringRecord, Vec<StringRecord>)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open sheet: {}", path.display()))?;

    let mut records = reader.records();
    let skip = header_row.saturating_sub(1);
    for _ in 0..skip {
        if records.next().is_none() {
            bail!("Sheet {} has fewer than {} rows", path.display(), header_row);
        }
    }

    let header = match records.next() {
        Some(record) => {
            record.with_context(|| format!("Failed to read header of {}", path.display()))?
        }
        None => bail!("Sheet {} has no header row", path.display()),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record.with_context(|| format!("Failed to read row of {}", path.display()))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(record);
    }

    Ok((header, rows))
}

fn bet_from_row(columns: &ColumnMap, row: &StringRecord) -> BetRecord {
    let event_id = columns.get(row, Field::EventId).to_string();
    let market = columns.get(row, Field::Market).to_string();
    let bet = columns.get(row, Field::Bet).to_string();
    let bookmaker = columns.get(row, Field::Bookmaker).to_string();
    let odds = columns.get(row, Field::Odds).to_string();

    let bet_id = match columns.get(row, Field::BetId) {
        "" => format!("{}|{}|{}|{}|{}", event_id, market, bet, bookmaker, odds),
        id => id.to_string(),
    };

    BetRecord {
        bet_id,
        event_id,
        market,
        bet,
        bookmaker,
        odds,
        stake: parse_money(columns.get(row, Field::Stake)),
        result: non_empty(columns.get(row, Field::Result)),
        closing_line: non_empty(columns.get(row, Field::ClosingLine)),
        clv_pct: non_empty(columns.get(row, Field::ClvPct)),
    }
}

/// "$1,250.00" -> 1250.0
fn parse_money(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<f64>().ok()
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}
