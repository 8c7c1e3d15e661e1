use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{info, warn};

use crate::data::board::ConsensusBoard;
use crate::data::odds_api::markets_for_bet;
use crate::data::types::{BetRecord, DetailedOddsRow};
use crate::monitoring::logger::CsvLogger;
use crate::scoring::persistence::BetLedger;
use crate::scoring::scorer::ClvScorer;
use crate::scoring::types::{ClvScore, SyncSummary};

/// Detailed Odds rows grouped by event id.
pub fn rows_by_event(rows: &[DetailedOddsRow]) -> HashMap<String, Vec<DetailedOddsRow>> {
    let mut grouped: HashMap<String, Vec<DetailedOddsRow>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.event_id.trim().to_string())
            .or_default()
            .push(row.clone());
    }
    grouped
}

/// API markets to request per event for the bets still waiting on a closing line.
pub fn odds_requests(bets: &[BetRecord]) -> BTreeMap<String, BTreeSet<&'static str>> {
    let mut requests: BTreeMap<String, BTreeSet<&'static str>> = BTreeMap::new();
    for bet in bets {
        let event_id = bet.event_id.trim();
        let markets = markets_for_bet(&bet.market);
        if event_id.is_empty() || markets.is_empty() || has_clv(bet) {
            continue;
        }
        requests
            .entry(event_id.to_string())
            .or_default()
            .extend(markets.iter().copied());
    }
    requests
}

pub fn has_clv(bet: &BetRecord) -> bool {
    bet.clv_pct
        .as_deref()
        .map_or(false, |clv| !clv.trim().is_empty())
}

/// Ledger bets for this pass, with the sheet's bets folded in. Outside dry run
/// the sheet is imported first. In dry run the ledger is left untouched and
/// sheet bets it doesn't know yet are appended in memory, first row per id.
pub fn bets_for_pass(
    ledger: &BetLedger,
    sheet_bets: &[BetRecord],
    dry_run: bool,
) -> Result<Vec<BetRecord>> {
    if !dry_run {
        let inserted = ledger.import_bets(sheet_bets)?;
        info!("Imported {} new bets ({} in ledger)", inserted, ledger.count_bets()?);
        return ledger.load_bets();
    }

    let mut bets = ledger.load_bets()?;
    let mut seen: HashSet<String> = bets.iter().map(|bet| bet.bet_id.clone()).collect();
    let known = bets.len();
    for bet in sheet_bets {
        if seen.insert(bet.bet_id.clone()) {
            bets.push(bet.clone());
        }
    }
    info!("[dry run] {} sheet bets scored without import", bets.len() - known);
    Ok(bets)
}

/// Bets without a CLV yet. A written closing line is final.
pub fn pending_bets(bets: Vec<BetRecord>) -> Vec<BetRecord> {
    bets.into_iter().filter(|bet| !has_clv(bet)).collect()
}

/// Score bets in ledger order. Skipped bets are logged and counted, never fatal.
pub fn score_bets(
    scorer: &ClvScorer,
    bets: &[BetRecord],
    board: &ConsensusBoard,
    rows: &HashMap<String, Vec<DetailedOddsRow>>,
) -> (Vec<ClvScore>, SyncSummary) {
    let mut scores = Vec::new();
    let mut summary = SyncSummary::default();

    for bet in bets {
        let event_rows = rows
            .get(bet.event_id.trim())
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        match scorer.score_bet(bet, board, event_rows) {
            Ok(score) => {
                summary.record_score(&score);
                scores.push(score);
            }
            Err(reason) => {
                warn!("Skipping bet {}: {}", bet.bet_id, reason);
                summary.record_skip(&reason);
            }
        }
    }

    (scores, summary)
}

/// Persist scores to the ledger and the audit log. Returns rows updated.
pub fn write_back(
    ledger: &BetLedger,
    logger: Option<&CsvLogger>,
    bets: &[BetRecord],
    scores: &[ClvScore],
) -> Result<usize> {
    let entry_odds: HashMap<&str, &str> = bets
        .iter()
        .map(|bet| (bet.bet_id.as_str(), bet.odds.as_str()))
        .collect();
    let mut updated = 0;

    for score in scores {
        if !ledger.record_clv(score)? {
            warn!("Bet {} vanished from the ledger before write-back", score.bet_id);
            continue;
        }
        updated += 1;

        if let Some(logger) = logger {
            let odds = entry_odds.get(score.bet_id.as_str()).copied().unwrap_or_default();
            if let Err(e) = logger.log_clv(score, odds) {
                warn!("Failed to log CLV for {}: {:#}", score.bet_id, e);
            }
        }
    }

    info!("Wrote closing line and CLV for {} bets", updated);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::data::sheets::build_events;

    fn bet(bet_id: &str, market: &str, selection: &str, odds: &str) -> BetRecord {
        BetRecord {
            bet_id: bet_id.to_string(),
            event_id: "evt1".to_string(),
            market: market.to_string(),
            bet: selection.to_string(),
            bookmaker: "fanduel".to_string(),
            odds: odds.to_string(),
            stake: None,
            result: None,
            closing_line: None,
            clv_pct: None,
        }
    }

    fn row(book: &str, market: &str, name: &str, point: &str, odds: &str) -> DetailedOddsRow {
        DetailedOddsRow {
            event_id: "evt1".to_string(),
            bookmaker: book.to_string(),
            api_market: market.to_string(),
            outcome_name: name.to_string(),
            description: String::new(),
            outcome_point: point.to_string(),
            odds: odds.to_string(),
        }
    }

    fn sheet() -> Vec<DetailedOddsRow> {
        vec![
            row("pinnacle", "totals", "Over", "7.5", "-110"),
            row("pinnacle", "totals", "Under", "7.5", "-110"),
            row("fanduel", "totals", "Over", "7.5", "-105"),
            row("fanduel", "totals", "Under", "7.5", "-115"),
            // lone side: no consensus, only the direct quote
            row("fanduel", "spreads", "Yankees", "-1.5", "+140"),
        ]
    }

    #[test]
    fn test_odds_requests_skip_scored_and_props() {
        let mut scored = bet("b2", "spreads", "Yankees -1.5", "+150");
        scored.clv_pct = Some("+1.20".to_string());
        let mut other_event = bet("b4", "ML", "Yankees", "-120");
        other_event.event_id = "evt2".to_string();

        let requests = odds_requests(&[
            bet("b1", "totals", "Over 7.5", "-105"),
            scored,
            bet("b3", "player_points", "Judge 1.5", "-110"),
            other_event,
        ]);

        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests["evt1"].iter().copied().collect::<Vec<_>>(),
            vec!["alternate_totals", "totals"]
        );
        assert!(requests["evt2"].contains("h2h"));
    }

    #[test]
    fn test_dry_run_leaves_ledger_untouched() {
        let ledger = BetLedger::new(":memory:").unwrap();
        ledger.import_bets(&[bet("b1", "totals", "Over 7.5", "-105")]).unwrap();

        let sheet_bets = vec![
            bet("b1", "totals", "Over 7.5", "-130"),
            bet("b2", "ML", "Yankees", "-120"),
            bet("b2", "ML", "Yankees", "+100"),
        ];
        let bets = bets_for_pass(&ledger, &sheet_bets, true).unwrap();

        assert_eq!(ledger.count_bets().unwrap(), 1);
        let ids: Vec<&str> = bets.iter().map(|b| b.bet_id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "b2"]);
        assert_eq!(bets[0].odds, "-105");
        assert_eq!(bets[1].odds, "-120");

        let bets = bets_for_pass(&ledger, &sheet_bets, false).unwrap();
        assert_eq!(ledger.count_bets().unwrap(), 2);
        assert_eq!(bets.len(), 2);
    }

    #[test]
    fn test_pending_bets() {
        let mut scored = bet("b1", "totals", "Over 7.5", "-105");
        scored.clv_pct = Some("-3.44".to_string());
        let mut blank = bet("b2", "totals", "Over 7.5", "-105");
        blank.clv_pct = Some("  ".to_string());

        let pending = pending_bets(vec![scored, blank, bet("b3", "ML", "Yankees", "-120")]);
        let ids: Vec<&str> = pending.iter().map(|b| b.bet_id.as_str()).collect();
        assert_eq!(ids, vec!["b2", "b3"]);
    }

    #[test]
    fn test_sync_pass_scores_and_writes_back() {
        let rows = sheet();
        let events = build_events(&rows);
        let board = ConsensusBoard::build(&events, &[], false);
        let scorer = ClvScorer::new(&ScoringConfig { book_fallback: true }).unwrap();

        let bets = vec![
            bet("b1", "totals", "Over 7.5", "-105"),
            bet("b2", "spreads", "Yankees -1.5", "+150"),
            bet("b3", "ML", "Red Sox", "+110"),
            bet("b4", "", "Over 7.5", "-110"),
        ];

        let ledger = BetLedger::new(":memory:").unwrap();
        ledger.import_bets(&bets).unwrap();
        let bets = ledger.load_bets().unwrap();

        let (scores, summary) = score_bets(&scorer, &bets, &board, &rows_by_event(&rows));
        assert_eq!(summary.scored, 2);
        assert_eq!(summary.from_fallback, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.skipped_by_reason["unmatched_bet"], 1);
        assert_eq!(summary.skipped_by_reason["missing_fields"], 1);
        assert_eq!(scores[0].bet_id, "b1");
        assert_eq!(scores[1].closing_line(), "+140");

        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("clv.csv");
        let logger = CsvLogger::new(log_path.to_str().unwrap().to_string()).unwrap();

        assert_eq!(write_back(&ledger, Some(&logger), &bets, &scores).unwrap(), 2);
        assert_eq!(ledger.count_scored().unwrap(), 2);

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(log.lines().count(), 3);
        let lines: Vec<&str> = log.lines().collect();
        assert!(lines[1].contains(",consensus,"));
        assert!(lines[2].contains(",book:fanduel,"));
    }
}
